//! The blocking client: request lifecycle and the low-level `invoke`.
//!
//! # Design
//! Every call goes through three phases on the caller's thread:
//!
//! 1. **prepare** turns the call arguments into a `CallPlan`,
//! 2. **dispatch** runs the plan's callable, which ends in `invoke`,
//! 3. **finalize** turns the raw `HttpResponse` into a `Reply` or an error.
//!
//! `ApiClient` is a cheap handle around shared state, so hooks and worker
//! tasks can hold on to it without lifetimes leaking into their signatures.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::args::{CallArgs, Reply};
use crate::config::ClientConfig;
use crate::endpoint::{Endpoint, RequestParts};
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::plan::CallPlan;
use crate::schema::{ApiSchema, BaseKind, Binding};
use crate::transport::{Transport, UreqTransport};

/// Shared surface of the blocking and pooled clients.
pub trait ClientBase {
    /// The base an API must be declared on to be served by this client.
    const BASE: BaseKind;

    /// What a bound method returns.
    type Output;

    fn schema(&self) -> &Arc<ApiSchema>;

    /// Invoke the user-facing method bound as `name`.
    fn dispatch(&self, name: &str, args: CallArgs) -> Self::Output;
}

struct Inner {
    schema: Arc<ApiSchema>,
    config: ClientConfig,
    transport: Arc<dyn Transport>,
}

/// Client that runs each call to completion on the calling thread.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<Inner>,
}

impl ApiClient {
    /// Create a client that talks HTTP through `ureq`.
    pub fn new(schema: Arc<ApiSchema>, config: ClientConfig) -> Result<Self, ApiError> {
        Self::with_transport(schema, config, UreqTransport::new())
    }

    pub fn with_transport(
        schema: Arc<ApiSchema>,
        config: ClientConfig,
        transport: impl Transport + 'static,
    ) -> Result<Self, ApiError> {
        schema.expect_base(BaseKind::Blocking)?;
        Ok(Self::assemble(schema, config, Arc::new(transport)))
    }

    pub(crate) fn assemble(schema: Arc<ApiSchema>, config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            inner: Arc::new(Inner {
                schema,
                config,
                transport,
            }),
        }
    }

    pub fn schema(&self) -> &Arc<ApiSchema> {
        &self.inner.schema
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Call the method bound as `name`: its `call_for` override when one was
    /// declared, the prepare/dispatch/finalize lifecycle otherwise.
    pub fn call(&self, name: &str, args: CallArgs) -> Result<Reply, ApiError> {
        let binding = self.inner.schema.binding(name)?;
        self.call_binding(binding, args)
    }

    /// Handle to the method bound as `name`.
    pub fn method(&self, name: &str) -> Result<BoundMethod<'_>, ApiError> {
        let binding = self.inner.schema.binding(name)?;
        Ok(BoundMethod { client: self, binding })
    }

    /// Run prepare → dispatch → finalize for `name`, ignoring any `call_for`
    /// override. This is what overrides use to reach the lifecycle.
    pub fn run(&self, name: &str, args: CallArgs) -> Result<Reply, ApiError> {
        let binding = self.inner.schema.binding(name)?;
        self.run_binding(binding, args)
    }

    /// The prepare hook resolved for `name`.
    pub fn prepare(&self, name: &str, args: CallArgs) -> Result<CallPlan, ApiError> {
        self.inner.schema.binding(name)?.prepare(self, args)
    }

    /// The finalize hook resolved for `name`.
    pub fn finalize(&self, name: &str, response: HttpResponse, args: &CallArgs) -> Result<Reply, ApiError> {
        self.inner.schema.binding(name)?.finalize(self, response, args)
    }

    pub(crate) fn call_binding(&self, binding: &Binding, args: CallArgs) -> Result<Reply, ApiError> {
        match binding.call_override() {
            Some(call) => call(self, binding.name(), args),
            None => self.run_binding(binding, args),
        }
    }

    pub(crate) fn run_binding(&self, binding: &Binding, args: CallArgs) -> Result<Reply, ApiError> {
        trace!(method = binding.name(), "prepare");
        let plan = binding.prepare(self, args)?;
        trace!(method = binding.name(), "dispatch");
        let response = plan.dispatch(self)?;
        trace!(method = binding.name(), status = response.status, "finalize");
        binding.finalize(self, response, &plan.args)
    }

    /// Send one request: `path` is appended to the base URL, per-call
    /// headers replace default headers of the same name, and the configured
    /// credentials are attached. The response is returned uninspected.
    pub fn invoke(&self, method: HttpMethod, path: &str, parts: RequestParts) -> Result<HttpResponse, ApiError> {
        let config = &self.inner.config;
        let url = join_url(&config.base_url, path);
        let headers = merge_headers(&config.default_headers, parts.headers);
        debug!(%method, %url, query = parts.query.len(), "invoking endpoint");
        self.inner.transport.send(HttpRequest {
            method,
            url,
            query: parts.query,
            headers,
            body: parts.body,
            auth: config.auth.clone(),
        })
    }
}

impl ClientBase for ApiClient {
    const BASE: BaseKind = BaseKind::Blocking;
    type Output = Result<Reply, ApiError>;

    fn schema(&self) -> &Arc<ApiSchema> {
        ApiClient::schema(self)
    }

    fn dispatch(&self, name: &str, args: CallArgs) -> Self::Output {
        self.call(name, args)
    }
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("api", &self.inner.schema.name())
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

/// One bound method of a blocking client.
#[derive(Debug, Clone, Copy)]
pub struct BoundMethod<'a> {
    client: &'a ApiClient,
    binding: &'a Binding,
}

impl BoundMethod<'_> {
    pub fn name(&self) -> &str {
        self.binding.name()
    }

    pub fn endpoint(&self) -> &Endpoint {
        self.binding.endpoint()
    }

    pub fn call(&self, args: CallArgs) -> Result<Reply, ApiError> {
        self.client.call_binding(self.binding, args)
    }
}

/// Append `path` to `base`, keeping exactly one `/` between them.
fn join_url(base: &str, path: &str) -> String {
    if path.is_empty() {
        return base.to_string();
    }
    match (base.ends_with('/'), path.starts_with('/')) {
        (true, true) => format!("{base}{}", &path[1..]),
        (false, false) => format!("{base}/{path}"),
        _ => format!("{base}{path}"),
    }
}

fn merge_headers(defaults: &[(String, String)], overrides: Vec<(String, String)>) -> Vec<(String, String)> {
    let mut headers: Vec<(String, String)> = defaults
        .iter()
        .filter(|(name, _)| !overrides.iter().any(|(o, _)| o.eq_ignore_ascii_case(name)))
        .cloned()
        .collect();
    headers.extend(overrides);
    headers
}
