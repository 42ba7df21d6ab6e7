//! The resolved unit of work produced by a prepare hook.

use std::fmt;
use std::sync::Arc;

use crate::args::CallArgs;
use crate::client::ApiClient;
use crate::error::ApiError;
use crate::http::HttpResponse;

/// The callable a plan dispatches: the owning client is passed explicitly on
/// every call.
pub type DispatchFn = dyn Fn(&ApiClient, &CallArgs) -> Result<HttpResponse, ApiError> + Send + Sync;

/// A callable together with the arguments it will be dispatched with.
///
/// Built fresh for every call by the prepare phase and consumed by the
/// dispatch phase, so concurrent calls never share one.
#[derive(Clone)]
pub struct CallPlan {
    pub call: Arc<DispatchFn>,
    pub args: CallArgs,
}

impl CallPlan {
    pub fn new<F>(call: F, args: CallArgs) -> Self
    where
        F: Fn(&ApiClient, &CallArgs) -> Result<HttpResponse, ApiError> + Send + Sync + 'static,
    {
        Self {
            call: Arc::new(call),
            args,
        }
    }

    pub fn with_args(mut self, args: CallArgs) -> Self {
        self.args = args;
        self
    }

    /// Run the callable against `client`.
    pub fn dispatch(&self, client: &ApiClient) -> Result<HttpResponse, ApiError> {
        (self.call)(client, &self.args)
    }
}

impl Default for CallPlan {
    /// A plan whose callable does nothing and answers `204 No Content`.
    fn default() -> Self {
        Self::new(|_, _| Ok(HttpResponse::empty()), CallArgs::default())
    }
}

impl fmt::Debug for CallPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallPlan").field("args", &self.args).finish_non_exhaustive()
    }
}
