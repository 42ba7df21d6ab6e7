//! Pooled client: bound methods return a `PendingResult` immediately.
//!
//! # Design
//! Only the dispatch phase changes. Prepare still runs on the caller's
//! thread; dispatch and finalize then run together inside one pool task, so
//! an error raised by finalize (e.g. `ApiError::Remote`) lands on the
//! `PendingResult` instead of escaping on the caller's thread. A `call_for`
//! override runs inside the task as a whole.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tracing::trace;

use crate::args::{CallArgs, Reply};
use crate::client::{ApiClient, ClientBase};
use crate::config::{ClientConfig, PoolConfig};
use crate::error::ApiError;
use crate::pending::{Completion, PendingResult};
use crate::pool::{worker_pool, Executor};
use crate::schema::{ApiSchema, BaseKind};
use crate::transport::{Transport, UreqTransport};

/// Client that runs calls on a worker pool.
///
/// Cloning shares the pool; every bound method of the client submits to it.
#[derive(Clone)]
pub struct AsyncApiClient {
    client: ApiClient,
    executor: Arc<dyn Executor>,
}

impl AsyncApiClient {
    /// Create a pooled client that talks HTTP through `ureq`.
    pub fn new(schema: Arc<ApiSchema>, config: ClientConfig, pool: PoolConfig) -> Result<Self, ApiError> {
        Self::with_transport(schema, config, pool, UreqTransport::new())
    }

    pub fn with_transport(
        schema: Arc<ApiSchema>,
        config: ClientConfig,
        pool: PoolConfig,
        transport: impl Transport + 'static,
    ) -> Result<Self, ApiError> {
        schema.expect_base(BaseKind::Pooled)?;
        let executor: Arc<dyn Executor> = match pool.executor {
            Some(executor) => executor,
            None => Arc::new(worker_pool(pool.workers)?),
        };
        Ok(Self {
            client: ApiClient::assemble(schema, config, Arc::new(transport)),
            executor,
        })
    }

    /// The blocking core the hooks run against.
    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn schema(&self) -> &Arc<ApiSchema> {
        self.client.schema()
    }

    pub fn config(&self) -> &ClientConfig {
        self.client.config()
    }

    /// Submit the method bound as `name`. Never blocks on the network; errors
    /// from any phase are reported through the returned handle.
    pub fn call(&self, name: &str, args: CallArgs) -> PendingResult<Reply> {
        let binding = match self.client.schema().binding(name) {
            Ok(binding) => binding.clone(),
            Err(err) => return PendingResult::ready(Err(err)),
        };
        let (completion, pending) = PendingResult::channel();
        let client = self.client.clone();

        if binding.has_call_override() {
            self.submit(completion, move || client.call_binding(&binding, args));
            return pending;
        }

        let plan = match binding.prepare(&self.client, args) {
            Ok(plan) => plan,
            Err(err) => return PendingResult::ready(Err(err)),
        };
        trace!(method = binding.name(), "submitting call");
        self.submit(completion, move || {
            let response = plan.dispatch(&client)?;
            binding.finalize(&client, response, &plan.args)
        });
        pending
    }

    fn submit<F>(&self, completion: Completion<Reply>, task: F)
    where
        F: FnOnce() -> Result<Reply, ApiError> + Send + 'static,
    {
        self.executor.execute(Box::new(move || {
            let result = panic::catch_unwind(AssertUnwindSafe(task))
                .unwrap_or_else(|payload| Err(ApiError::TaskPanicked(panic_message(payload.as_ref()))));
            completion.complete(result);
        }));
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        return message.to_string();
    }
    if let Some(message) = payload.downcast_ref::<String>() {
        return message.clone();
    }
    "unknown panic".to_string()
}

impl ClientBase for AsyncApiClient {
    const BASE: BaseKind = BaseKind::Pooled;
    type Output = PendingResult<Reply>;

    fn schema(&self) -> &Arc<ApiSchema> {
        self.client.schema()
    }

    fn dispatch(&self, name: &str, args: CallArgs) -> Self::Output {
        self.call(name, args)
    }
}

impl fmt::Debug for AsyncApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncApiClient")
            .field("client", &self.client)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{HttpRequest, HttpResponse};
    use crate::pending::Outcome;
    use crate::pool::Job;
    use crate::schema::ApiBuilder;
    use crate::transport::from_fn;
    use crossbeam_channel::{bounded, Receiver};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn builder() -> ApiBuilder {
        ApiBuilder::pooled("AsyncApi")
            .route("posts", "get", "posts/")
            .route("post", "get", "posts/{id}")
    }

    /// Echo the request path back as a JSON string.
    fn echo(request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let path = request.url.trim_start_matches("http://localhost:3000/");
        Ok(HttpResponse::new(200, json!(path).to_string()))
    }

    fn config() -> ClientConfig {
        ClientConfig::new("http://localhost:3000/").decode_json(true)
    }

    #[test]
    fn results_match_the_blocking_client() {
        let pooled = AsyncApiClient::with_transport(builder().build().unwrap(), config(), PoolConfig::workers(1), from_fn(echo))
            .unwrap();
        let blocking_schema = ApiBuilder::blocking("SyncApi")
            .route("post", "get", "posts/{id}")
            .build()
            .unwrap();
        let blocking = ApiClient::with_transport(blocking_schema, config(), from_fn(echo)).unwrap();

        let pending: Vec<_> = (1..=5).rev().map(|id| pooled.call("post", CallArgs::new().arg("id", id))).collect();
        let mut pooled_results: Vec<Reply> = pending.into_iter().map(|p| p.result().unwrap()).collect();
        pooled_results.reverse();
        let blocking_results: Vec<Reply> = (1..=5)
            .map(|id| blocking.call("post", CallArgs::new().arg("id", id)).unwrap())
            .collect();
        assert_eq!(pooled_results, blocking_results);
        assert_eq!(pooled_results[0], Reply::Json(json!("posts/1")));
    }

    #[test]
    fn submission_does_not_wait_for_the_transport() {
        let (release_tx, release_rx): (_, Receiver<()>) = bounded(0);
        let transport = from_fn(move |_| {
            release_rx.recv().map_err(ApiError::transport)?;
            Ok(HttpResponse::new(200, "[]"))
        });
        let client = AsyncApiClient::with_transport(builder().build().unwrap(), config(), PoolConfig::default(), transport)
            .unwrap();

        let pending = client.call("posts", CallArgs::new());
        assert!(!pending.is_complete());
        let pending = match pending.wait_timeout(Duration::from_millis(20)) {
            Outcome::Incomplete(pending) => pending,
            Outcome::Complete(result) => panic!("finished before release: {result:?}"),
        };
        release_tx.send(()).unwrap();
        assert_eq!(pending.wait().unwrap(), Reply::Json(json!([])));
    }

    #[test]
    fn finalize_errors_land_on_the_handle() {
        let transport = from_fn(|_| Ok(HttpResponse::new(404, "{}")));
        let client = AsyncApiClient::with_transport(
            builder().build().unwrap(),
            config().raise_on_error(true),
            PoolConfig::default(),
            transport,
        )
        .unwrap();
        let err = client.call("posts", CallArgs::new()).result().unwrap_err();
        assert_eq!(err.status(), Some(404));
    }

    #[test]
    fn call_time_errors_are_reported_through_the_handle() {
        let client =
            AsyncApiClient::with_transport(builder().build().unwrap(), config(), PoolConfig::default(), from_fn(echo))
                .unwrap();
        let err = client.call("post", CallArgs::new()).result().unwrap_err();
        assert!(matches!(err, ApiError::MissingParameter { ref field, .. } if field == "id"));

        let unknown = client.call("missing", CallArgs::new());
        assert!(unknown.is_complete());
        assert!(matches!(unknown.wait(), Err(ApiError::UnknownMethod(_))));
    }

    #[test]
    fn injected_executor_takes_priority() {
        struct Inline(AtomicUsize);

        impl Executor for Inline {
            fn execute(&self, job: Job) {
                self.0.fetch_add(1, Ordering::SeqCst);
                job();
            }
        }

        let inline = Arc::new(Inline(AtomicUsize::new(0)));
        let mut pool = PoolConfig::with_executor(inline.clone());
        pool.workers = 8;
        let client = AsyncApiClient::with_transport(builder().build().unwrap(), config(), pool, from_fn(echo)).unwrap();
        let pending = client.call("posts", CallArgs::new());
        assert!(pending.is_complete());
        assert_eq!(inline.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn call_override_runs_inside_the_task() {
        let schema = builder()
            .call_for("posts", |client, name, args| {
                let reply = client.run(name, args)?;
                let count = reply.as_json().and_then(|v| v.as_str()).map(str::len).unwrap_or_default();
                Ok(Reply::Json(json!(count)))
            })
            .build()
            .unwrap();
        let client = AsyncApiClient::with_transport(schema, config(), PoolConfig::default(), from_fn(echo)).unwrap();
        assert_eq!(client.call("posts", CallArgs::new()).result().unwrap(), Reply::Json(json!(6)));
    }

    #[test]
    fn panics_become_errors() {
        let schema = builder()
            .finalize_for("posts", |_, _, _, _| panic!("finalize blew up"))
            .build()
            .unwrap();
        let client = AsyncApiClient::with_transport(schema, config(), PoolConfig::default(), from_fn(echo)).unwrap();
        let err = client.call("posts", CallArgs::new()).result().unwrap_err();
        assert!(matches!(err, ApiError::TaskPanicked(ref m) if m.contains("finalize blew up")));
    }

    #[test]
    fn blocking_schema_is_rejected() {
        let schema = ApiBuilder::blocking("SyncApi").route("posts", "get", "posts/").build().unwrap();
        let err = AsyncApiClient::with_transport(schema, config(), PoolConfig::default(), from_fn(echo)).unwrap_err();
        assert!(matches!(err, ApiError::BaseMismatch { requested: BaseKind::Pooled, .. }));
    }
}
