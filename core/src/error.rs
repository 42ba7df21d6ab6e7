//! Error types for declared API clients.
//!
//! # Design
//! Construction-time mistakes (`InvalidVerb`, `MissingBase`, and the other
//! declaration checks) are reported by `Endpoint::parse` and
//! `ApiBuilder::build`, before any client exists. Everything else happens at
//! call time and is either returned from the bound method or captured on the
//! `PendingResult` of an async call.

use thiserror::Error;

use crate::args::CallArgs;
use crate::http::HttpResponse;
use crate::schema::BaseKind;

/// Errors produced while declaring or calling an API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The verb is not part of the supported HTTP method allow-list.
    #[error("unsupported HTTP method: {0}")]
    InvalidVerb(String),

    /// Bindings were declared without choosing a client base.
    #[error("API `{api}` does not extend a client base")]
    MissingBase { api: String },

    /// A schema was handed to a client of the other base.
    #[error("API `{api}` was declared on the {declared} base, not {requested}")]
    BaseMismatch {
        api: String,
        declared: BaseKind,
        requested: BaseKind,
    },

    /// The same binding name was declared twice.
    #[error("API `{api}` binds `{name}` more than once")]
    DuplicateBinding { api: String, name: String },

    /// A method-specific hook names an endpoint that was never declared.
    #[error("API `{api}` overrides `{hook}` but no endpoint is bound as `{name}`")]
    UnboundOverride {
        api: String,
        hook: &'static str,
        name: String,
    },

    /// No binding with that name exists on the client.
    #[error("no API method named `{0}`")]
    UnknownMethod(String),

    /// The URL template has unbalanced braces.
    #[error("invalid template `{template}`: {reason}")]
    InvalidTemplate { template: String, reason: &'static str },

    /// A template field was not supplied by the caller.
    #[error("template `{template}` needs a value for `{field}`")]
    MissingParameter { template: String, field: String },

    /// The `headers` argument was not a map of strings.
    #[error("`headers` must be an object of header names to values")]
    InvalidHeaders,

    /// The remote server answered with a 4xx/5xx status while
    /// `raise_on_error` was enabled.
    #[error("error when invoking `{method}` with {args}: HTTP {}", .response.status)]
    Remote {
        method: String,
        args: Box<CallArgs>,
        response: Box<HttpResponse>,
    },

    /// The response body was not valid UTF-8 JSON.
    #[error("failed to decode response of `{method}`: {reason}")]
    Decoding { method: String, reason: String },

    /// A reply could not be converted into the type the caller asked for.
    #[error("reply does not match the requested type: {0}")]
    ReplyType(String),

    /// A request body could not be serialized.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// Failure reported by the transport, passed through untouched.
    #[error(transparent)]
    Transport(Box<dyn std::error::Error + Send + Sync>),

    /// A pending result did not complete in time.
    #[error("result not available after {0:?}")]
    Timeout(std::time::Duration),

    /// The unit of work panicked on its worker.
    #[error("task panicked: {0}")]
    TaskPanicked(String),

    /// The worker dropped the task without producing a result.
    #[error("worker dropped the task before completing it")]
    WorkerLost,

    /// The worker pool could not be created.
    #[error("failed to start worker pool: {0}")]
    Pool(String),
}

impl ApiError {
    /// Wrap any transport-level error.
    pub fn transport<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        ApiError::Transport(Box::new(err))
    }

    /// The raw response attached to a `Remote` error.
    pub fn response(&self) -> Option<&HttpResponse> {
        match self {
            ApiError::Remote { response, .. } => Some(response.as_ref()),
            _ => None,
        }
    }

    /// Status code of the response attached to a `Remote` error.
    pub fn status(&self) -> Option<u16> {
        self.response().map(|r| r.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_error_exposes_response() {
        let err = ApiError::Remote {
            method: "posts".to_string(),
            args: Box::new(CallArgs::new().arg("id", 7)),
            response: Box::new(HttpResponse::new(404, "missing")),
        };
        assert_eq!(err.status(), Some(404));
        let display = err.to_string();
        assert!(display.contains("posts"), "{display}");
        assert!(display.contains("404"), "{display}");
        assert!(display.contains("id"), "{display}");
    }

    #[test]
    fn non_remote_errors_carry_no_response() {
        assert!(ApiError::WorkerLost.response().is_none());
        assert_eq!(ApiError::InvalidVerb("fetch".into()).status(), None);
    }

    #[test]
    fn transport_errors_are_transparent() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = ApiError::transport(io);
        assert_eq!(err.to_string(), "refused");
    }
}
