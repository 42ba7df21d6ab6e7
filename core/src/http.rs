//! HTTP transport types described as plain data.
//!
//! # Design
//! The core builds `HttpRequest` values and receives `HttpResponse` values;
//! executing the round-trip is the `Transport`'s job. Keeping these as owned
//! data makes requests easy to record in tests and safe to move across the
//! worker pool.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::auth::Auth;
use crate::error::ApiError;

/// HTTP method for a request. This is the complete allow-list of verbs an
/// `Endpoint` may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpMethod {
    Head,
    Options,
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Trace,
    Connect,
}

impl HttpMethod {
    pub const ALL: [HttpMethod; 9] = [
        HttpMethod::Head,
        HttpMethod::Options,
        HttpMethod::Get,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Delete,
        HttpMethod::Patch,
        HttpMethod::Trace,
        HttpMethod::Connect,
    ];

    /// Upper-case wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Trace => "TRACE",
            HttpMethod::Connect => "CONNECT",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = ApiError;

    /// Case-insensitive lookup; anything outside the allow-list is rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HttpMethod::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ApiError::InvalidVerb(s.to_string()))
    }
}

/// Body attached to an outgoing request.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// Serialized as JSON with `content-type: application/json`.
    Json(serde_json::Value),
    /// Sent as `application/x-www-form-urlencoded`.
    Form(Vec<(String, String)>),
    /// Sent verbatim.
    Raw(Vec<u8>),
}

impl RequestBody {
    /// Encoded bytes plus the content type implied by the variant, if any.
    pub fn encode(&self) -> Result<(Vec<u8>, Option<&'static str>), ApiError> {
        match self {
            RequestBody::Json(value) => {
                let bytes = serde_json::to_vec(value).map_err(|e| ApiError::Serialization(e.to_string()))?;
                Ok((bytes, Some("application/json")))
            }
            RequestBody::Form(pairs) => {
                let encoded = url::form_urlencoded::Serializer::new(String::new())
                    .extend_pairs(pairs)
                    .finish();
                Ok((encoded.into_bytes(), Some("application/x-www-form-urlencoded")))
            }
            RequestBody::Raw(bytes) => Ok((bytes.clone(), None)),
        }
    }
}

/// An HTTP request described as plain data.
///
/// `url` is absolute but carries no query string; `query` pairs are appended
/// by the transport.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<RequestBody>,
    pub auth: Auth,
}

impl HttpRequest {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// The absolute URL including the encoded query string.
    pub fn full_url(&self) -> Result<url::Url, ApiError> {
        let mut url = url::Url::parse(&self.url).map_err(ApiError::transport)?;
        if !self.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&self.query);
        }
        Ok(url)
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// `204 No Content` with an empty body.
    pub fn empty() -> Self {
        Self::new(204, Vec::new())
    }

    /// 4xx and 5xx statuses.
    pub fn is_error(&self) -> bool {
        self.status >= 400
    }

    /// Body as text, replacing invalid UTF-8.
    pub fn text(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}
