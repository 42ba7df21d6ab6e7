//! Default prepare and finalize hooks.
//!
//! These run for every endpoint that has neither its own hook nor an API-wide
//! one. Custom hooks can call them to extend rather than replace the default
//! behaviour.

use tracing::{trace, warn};

use crate::args::{CallArgs, Reply};
use crate::client::ApiClient;
use crate::error::ApiError;
use crate::http::HttpResponse;
use crate::plan::CallPlan;

/// Plan a call to the endpoint bound as `name`, keeping the arguments as they
/// are.
pub fn default_prepare(client: &ApiClient, name: &str, args: CallArgs) -> Result<CallPlan, ApiError> {
    let endpoint = client.schema().endpoint(name)?.clone();
    trace!(method = name, "prepared call");
    Ok(CallPlan::new(move |client, args| endpoint.call(client, args), args))
}

/// Turn a raw response into the caller's reply.
///
/// With `raise_on_error`, a 4xx/5xx status fails with `ApiError::Remote`.
/// With `decode_json`, the body is parsed as JSON; otherwise the body bytes
/// are returned untouched.
pub fn default_finalize(
    client: &ApiClient,
    name: &str,
    response: HttpResponse,
    args: &CallArgs,
) -> Result<Reply, ApiError> {
    let config = client.config();
    if config.raise_on_error && response.is_error() {
        warn!(method = name, status = response.status, "remote call failed");
        return Err(ApiError::Remote {
            method: name.to_string(),
            args: Box::new(args.clone()),
            response: Box::new(response),
        });
    }
    if config.decode_json {
        return decode_json(name, &response.body).map(Reply::Json);
    }
    Ok(Reply::Raw(response.body))
}

/// Decode a UTF-8 JSON body.
pub fn decode_json(name: &str, body: &[u8]) -> Result<serde_json::Value, ApiError> {
    let decoding = |reason: String| ApiError::Decoding {
        method: name.to_string(),
        reason,
    };
    let text = std::str::from_utf8(body).map_err(|e| decoding(e.to_string()))?;
    serde_json::from_str(text).map_err(|e| decoding(e.to_string()))
}
