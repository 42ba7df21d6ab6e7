//! Declaring an API: endpoints plus hooks, wired once into bindings.
//!
//! # Design
//! An `ApiBuilder` plays the role of a class body. It collects named
//! endpoints, optional hooks that apply to every endpoint (`prepare`,
//! `finalize`) and hooks for a single endpoint (`prepare_for`, `call_for`,
//! `finalize_for`). `build` validates the declaration and resolves, per
//! endpoint, which hook runs in each phase:
//!
//! 1. a hook declared for that endpoint,
//! 2. otherwise the API-wide hook,
//! 3. otherwise the default in [`crate::hooks`].
//!
//! The resulting `ApiSchema` is immutable and shared by every client created
//! from it.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::args::{CallArgs, Reply};
use crate::client::ApiClient;
use crate::endpoint::Endpoint;
use crate::error::ApiError;
use crate::hooks;
use crate::http::HttpResponse;
use crate::plan::CallPlan;

/// Prepare hook: turns call arguments into a `CallPlan`.
pub type PrepareFn = dyn Fn(&ApiClient, &str, CallArgs) -> Result<CallPlan, ApiError> + Send + Sync;

/// Replacement for the user-facing method of one endpoint.
pub type CallFn = dyn Fn(&ApiClient, &str, CallArgs) -> Result<Reply, ApiError> + Send + Sync;

/// Finalize hook: turns a raw response into the value handed to the caller.
pub type FinalizeFn = dyn Fn(&ApiClient, &str, HttpResponse, &CallArgs) -> Result<Reply, ApiError> + Send + Sync;

/// The client base an API is declared on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaseKind {
    /// Calls run on the caller's thread and return the finalized reply.
    Blocking,
    /// Calls are submitted to a worker pool and return a `PendingResult`.
    Pooled,
}

impl fmt::Display for BaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BaseKind::Blocking => f.write_str("blocking"),
            BaseKind::Pooled => f.write_str("pooled"),
        }
    }
}

/// The resolved hooks of one endpoint.
#[derive(Clone)]
pub struct Binding {
    name: String,
    endpoint: Arc<Endpoint>,
    prepare: Arc<PrepareFn>,
    call: Option<Arc<CallFn>>,
    finalize: Arc<FinalizeFn>,
}

impl Binding {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn endpoint(&self) -> &Arc<Endpoint> {
        &self.endpoint
    }

    /// Whether the user-facing method was replaced with `call_for`.
    pub fn has_call_override(&self) -> bool {
        self.call.is_some()
    }

    pub(crate) fn prepare(&self, client: &ApiClient, args: CallArgs) -> Result<CallPlan, ApiError> {
        (self.prepare)(client, &self.name, args)
    }

    pub(crate) fn finalize(&self, client: &ApiClient, response: HttpResponse, args: &CallArgs) -> Result<Reply, ApiError> {
        (self.finalize)(client, &self.name, response, args)
    }

    pub(crate) fn call_override(&self) -> Option<&Arc<CallFn>> {
        self.call.as_ref()
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("name", &self.name)
            .field("endpoint", &self.endpoint)
            .field("call_override", &self.call.is_some())
            .finish_non_exhaustive()
    }
}

/// A fully wired API declaration.
#[derive(Debug)]
pub struct ApiSchema {
    name: String,
    base: BaseKind,
    bindings: BTreeMap<String, Binding>,
}

impl ApiSchema {
    pub fn builder(name: impl Into<String>) -> ApiBuilder {
        ApiBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base(&self) -> BaseKind {
        self.base
    }

    pub fn binding(&self, name: &str) -> Result<&Binding, ApiError> {
        self.bindings
            .get(name)
            .ok_or_else(|| ApiError::UnknownMethod(name.to_string()))
    }

    pub fn endpoint(&self, name: &str) -> Result<&Arc<Endpoint>, ApiError> {
        self.binding(name).map(Binding::endpoint)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    /// Bound method names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(String::as_str)
    }

    pub fn bindings(&self) -> impl Iterator<Item = &Binding> {
        self.bindings.values()
    }

    pub(crate) fn expect_base(&self, requested: BaseKind) -> Result<(), ApiError> {
        if self.base == requested {
            return Ok(());
        }
        Err(ApiError::BaseMismatch {
            api: self.name.clone(),
            declared: self.base,
            requested,
        })
    }
}

/// Collects an API declaration; see the module docs for hook resolution.
pub struct ApiBuilder {
    name: String,
    base: Option<BaseKind>,
    endpoints: Vec<(String, Endpoint)>,
    prepare: Option<Arc<PrepareFn>>,
    finalize: Option<Arc<FinalizeFn>>,
    prepare_for: HashMap<String, Arc<PrepareFn>>,
    call_for: HashMap<String, Arc<CallFn>>,
    finalize_for: HashMap<String, Arc<FinalizeFn>>,
    deferred: Option<ApiError>,
}

impl ApiBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base: None,
            endpoints: Vec::new(),
            prepare: None,
            finalize: None,
            prepare_for: HashMap::new(),
            call_for: HashMap::new(),
            finalize_for: HashMap::new(),
            deferred: None,
        }
    }

    /// Shorthand for `new(name).extends(BaseKind::Blocking)`.
    pub fn blocking(name: impl Into<String>) -> Self {
        Self::new(name).extends(BaseKind::Blocking)
    }

    /// Shorthand for `new(name).extends(BaseKind::Pooled)`.
    pub fn pooled(name: impl Into<String>) -> Self {
        Self::new(name).extends(BaseKind::Pooled)
    }

    pub fn extends(mut self, base: BaseKind) -> Self {
        self.base = Some(base);
        self
    }

    /// Bind `endpoint` under `name`.
    pub fn endpoint(mut self, name: impl Into<String>, endpoint: Endpoint) -> Self {
        self.endpoints.push((name.into(), endpoint));
        self
    }

    /// Bind a verb/template pair. An invalid verb or template is reported by
    /// `build`.
    pub fn route(self, name: impl Into<String>, verb: &str, template: &str) -> Self {
        match Endpoint::parse(verb, template) {
            Ok(endpoint) => self.endpoint(name, endpoint),
            Err(err) => self.defer(err),
        }
    }

    /// Prepare hook for every endpoint without its own.
    pub fn prepare<F>(mut self, hook: F) -> Self
    where
        F: Fn(&ApiClient, &str, CallArgs) -> Result<CallPlan, ApiError> + Send + Sync + 'static,
    {
        self.prepare = Some(Arc::new(hook));
        self
    }

    /// Finalize hook for every endpoint without its own.
    pub fn finalize<F>(mut self, hook: F) -> Self
    where
        F: Fn(&ApiClient, &str, HttpResponse, &CallArgs) -> Result<Reply, ApiError> + Send + Sync + 'static,
    {
        self.finalize = Some(Arc::new(hook));
        self
    }

    pub fn prepare_for<F>(mut self, name: impl Into<String>, hook: F) -> Self
    where
        F: Fn(&ApiClient, &str, CallArgs) -> Result<CallPlan, ApiError> + Send + Sync + 'static,
    {
        self.prepare_for.insert(name.into(), Arc::new(hook));
        self
    }

    /// Replace the user-facing method of one endpoint. The hook receives the
    /// raw call and may run the lifecycle itself through `ApiClient::run` or
    /// the `prepare`/`finalize` hooks.
    pub fn call_for<F>(mut self, name: impl Into<String>, hook: F) -> Self
    where
        F: Fn(&ApiClient, &str, CallArgs) -> Result<Reply, ApiError> + Send + Sync + 'static,
    {
        self.call_for.insert(name.into(), Arc::new(hook));
        self
    }

    pub fn finalize_for<F>(mut self, name: impl Into<String>, hook: F) -> Self
    where
        F: Fn(&ApiClient, &str, HttpResponse, &CallArgs) -> Result<Reply, ApiError> + Send + Sync + 'static,
    {
        self.finalize_for.insert(name.into(), Arc::new(hook));
        self
    }

    fn defer(mut self, err: ApiError) -> Self {
        self.deferred.get_or_insert(err);
        self
    }

    /// Validate the declaration and resolve every binding.
    pub fn build(self) -> Result<Arc<ApiSchema>, ApiError> {
        let ApiBuilder {
            name: api,
            base,
            endpoints,
            prepare,
            finalize,
            mut prepare_for,
            mut call_for,
            mut finalize_for,
            deferred,
        } = self;

        let base = base.ok_or_else(|| ApiError::MissingBase { api: api.clone() })?;
        if let Some(err) = deferred {
            return Err(err);
        }

        let declared: Vec<&str> = endpoints.iter().map(|(name, _)| name.as_str()).collect();
        for (hook, names) in [
            ("prepare", prepare_for.keys().collect::<Vec<_>>()),
            ("call", call_for.keys().collect()),
            ("finalize", finalize_for.keys().collect()),
        ] {
            if let Some(name) = names.into_iter().find(|name| !declared.contains(&name.as_str())) {
                return Err(ApiError::UnboundOverride {
                    api: api.clone(),
                    hook,
                    name: name.clone(),
                });
            }
        }

        let default_prepare: Arc<PrepareFn> = match prepare {
            Some(hook) => hook,
            None => Arc::new(hooks::default_prepare),
        };
        let default_finalize: Arc<FinalizeFn> = match finalize {
            Some(hook) => hook,
            None => Arc::new(hooks::default_finalize),
        };

        let mut bindings = BTreeMap::new();
        for (name, endpoint) in endpoints {
            if bindings.contains_key(&name) {
                return Err(ApiError::DuplicateBinding { api, name });
            }
            let binding = Binding {
                prepare: prepare_for.remove(&name).unwrap_or_else(|| default_prepare.clone()),
                call: call_for.remove(&name),
                finalize: finalize_for.remove(&name).unwrap_or_else(|| default_finalize.clone()),
                endpoint: Arc::new(endpoint),
                name: name.clone(),
            };
            bindings.insert(name, binding);
        }

        debug!(api = %api, %base, bindings = bindings.len(), "built API schema");
        Ok(Arc::new(ApiSchema {
            name: api,
            base,
            bindings,
        }))
    }
}

impl fmt::Debug for ApiBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiBuilder")
            .field("name", &self.name)
            .field("base", &self.base)
            .field("endpoints", &self.endpoints)
            .finish_non_exhaustive()
    }
}
