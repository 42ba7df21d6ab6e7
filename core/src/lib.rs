//! Declarative REST API clients.
//!
//! # Overview
//! An API is declared once as a set of named endpoints (HTTP verb + URL
//! template) plus optional hooks. Every call to a bound method runs the same
//! lifecycle: **prepare** a `CallPlan`, **dispatch** it through a
//! `Transport`, and **finalize** the raw response into a `Reply` or an error.
//!
//! # Design
//! - `ApiBuilder::build` resolves the hooks of every endpoint up front, so a
//!   call is a map lookup followed by three closure invocations.
//! - Endpoint descriptors are immutable and never point back at a client;
//!   the owning client is passed on every call.
//! - `ApiClient` runs the lifecycle on the caller's thread. `AsyncApiClient`
//!   runs dispatch and finalize on a worker pool and hands back a
//!   `PendingResult`.
//! - Status codes are data until finalize looks at them: with
//!   `raise_on_error` off (the default) a 404 is returned like any other
//!   response.
//!
//! ```rust,ignore
//! let schema = ApiBuilder::blocking("Placeholder")
//!     .route("posts", "get", "posts/")
//!     .route("comments", "get", "posts/{id}/comments")
//!     .build()?;
//! let api = ApiClient::new(schema, ClientConfig::new(url).decode_json(true))?;
//! let comments = api.call("comments", CallArgs::new().arg("id", 2))?;
//! ```

pub mod args;
pub mod async_client;
pub mod auth;
pub mod client;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod hooks;
pub mod http;
mod macros;
pub mod pending;
pub mod plan;
pub mod pool;
pub mod schema;
pub mod transport;

pub use args::{CallArgs, Reply};
pub use async_client::AsyncApiClient;
pub use auth::{Auth, AuthStrategy};
pub use client::{ApiClient, BoundMethod, ClientBase};
pub use config::{ClientConfig, PoolConfig, DEFAULT_WORKERS};
pub use endpoint::{Endpoint, RequestParts};
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse, RequestBody};
pub use pending::{Outcome, PendingResult, DEFAULT_ASYNC_TIMEOUT};
pub use plan::CallPlan;
pub use pool::{Executor, Job};
pub use schema::{ApiBuilder, ApiSchema, BaseKind, Binding};
pub use transport::{Transport, UreqTransport};
