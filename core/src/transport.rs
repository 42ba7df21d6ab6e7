//! The transport that executes requests built by the client.
//!
//! # Design
//! The client never touches the network itself; it hands a fully described
//! `HttpRequest` to a `Transport` and gets an `HttpResponse` back. Status codes
//! are not interpreted here: 4xx/5xx responses are data, and only the
//! finalize phase decides whether they become errors. Transport failures
//! (connect, DNS, TLS) are passed through unchanged as `ApiError::Transport`.

use std::fmt;

use tracing::debug;

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Executes one HTTP round-trip.
pub trait Transport: Send + Sync {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError>;
}

/// A transport backed by a closure. Handy for tests and for adapting other
/// HTTP clients.
pub struct FnTransport<F>(F);

/// Wrap a closure as a `Transport`.
pub fn from_fn<F>(f: F) -> FnTransport<F>
where
    F: Fn(HttpRequest) -> Result<HttpResponse, ApiError> + Send + Sync,
{
    FnTransport(f)
}

impl<F> Transport for FnTransport<F>
where
    F: Fn(HttpRequest) -> Result<HttpResponse, ApiError> + Send + Sync,
{
    fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        (self.0)(request)
    }
}

impl<F> fmt::Debug for FnTransport<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnTransport(..)")
    }
}

/// Blocking transport built on a `ureq` agent.
///
/// The agent is configured with `http_status_as_error(false)` so 4xx/5xx
/// responses are returned as `HttpResponse` values. Response bodies are read
/// in full unless a limit is set with `with_body_limit`.
#[derive(Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
    body_limit: u64,
}

impl fmt::Debug for UreqTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UreqTransport")
            .field("body_limit", &self.body_limit)
            .finish_non_exhaustive()
    }
}

impl UreqTransport {
    pub fn new() -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self::with_agent(agent)
    }

    /// Use a caller-configured agent (timeouts, proxies, TLS). Its status
    /// handling is left as configured.
    pub fn with_agent(agent: ureq::Agent) -> Self {
        Self {
            agent,
            body_limit: u64::MAX,
        }
    }

    /// Fail responses whose body exceeds `bytes`.
    pub fn with_body_limit(mut self, bytes: u64) -> Self {
        self.body_limit = bytes;
        self
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

fn ureq_method(method: HttpMethod) -> ureq::http::Method {
    use ureq::http::Method;
    match method {
        HttpMethod::Head => Method::HEAD,
        HttpMethod::Options => Method::OPTIONS,
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Delete => Method::DELETE,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Trace => Method::TRACE,
        HttpMethod::Connect => Method::CONNECT,
    }
}

impl Transport for UreqTransport {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let url = request.full_url()?;
        let mut headers = request.headers.clone();
        request.auth.apply(&mut headers);

        let mut builder = ureq::http::Request::builder()
            .method(ureq_method(request.method))
            .uri(url.as_str());
        for (name, value) in &headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        debug!(method = %request.method, url = %url, "sending request");
        let result = match &request.body {
            Some(body) => {
                let (bytes, content_type) = body.encode()?;
                if let Some(content_type) = content_type {
                    if request.header("content-type").is_none() {
                        builder = builder.header("content-type", content_type);
                    }
                }
                let http_request = builder.body(bytes).map_err(ApiError::transport)?;
                self.agent.run(http_request)
            }
            None => {
                let http_request = builder.body(()).map_err(ApiError::transport)?;
                self.agent.run(http_request)
            }
        };
        let mut response = result.map_err(ApiError::transport)?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| Some((name.as_str().to_string(), value.to_str().ok()?.to_string())))
            .collect();
        let body = response
            .body_mut()
            .with_config()
            .limit(self.body_limit)
            .read_to_vec()
            .map_err(ApiError::transport)?;
        debug!(status, bytes = body.len(), "received response");

        Ok(HttpResponse { status, headers, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Auth;

    #[test]
    fn closures_act_as_transports() {
        let transport = from_fn(|request| {
            assert_eq!(request.method, HttpMethod::Delete);
            Ok(HttpResponse::new(202, request.url))
        });
        let response = transport
            .send(HttpRequest {
                method: HttpMethod::Delete,
                url: "http://localhost/posts/1".to_string(),
                query: Vec::new(),
                headers: Vec::new(),
                body: None,
                auth: Auth::None,
            })
            .unwrap();
        assert_eq!(response.status, 202);
        assert_eq!(response.text(), "http://localhost/posts/1");
    }

    #[test]
    fn every_verb_maps_to_a_wire_method() {
        for method in HttpMethod::ALL {
            assert_eq!(ureq_method(method).as_str(), method.as_str());
        }
    }
}
