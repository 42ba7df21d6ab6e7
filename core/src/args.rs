//! Arguments passed to bound methods and the values they return.
//!
//! # Design
//! Bound methods are dynamic in the same way as their templates: any name may
//! be passed, and the endpoint decides which ones feed the URL template and
//! which ones travel as query parameters or body. Values are
//! `serde_json::Value` so anything JSON-representable can be supplied.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ApiError;

/// Positional and keyword arguments of one call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallArgs {
    pub positional: Vec<Value>,
    pub keyword: BTreeMap<String, Value>,
}

impl CallArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a keyword argument, replacing any previous value under `name`.
    pub fn arg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.keyword.insert(name.into(), value.into());
        self
    }

    /// Append a positional argument.
    pub fn push(mut self, value: impl Into<Value>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// JSON request body, sent under the `payload` keyword.
    pub fn payload(self, value: impl Into<Value>) -> Self {
        self.arg("payload", value)
    }

    /// Raw or form-encoded request body, sent under the `data` keyword.
    pub fn data(self, value: impl Into<Value>) -> Self {
        self.arg("data", value)
    }

    /// Per-call header override.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let headers = self
            .keyword
            .entry("headers".to_string())
            .or_insert_with(|| Value::Object(Default::default()));
        if !headers.is_object() {
            *headers = Value::Object(Default::default());
        }
        if let Value::Object(map) = headers {
            map.insert(name.into(), Value::String(value.into()));
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.keyword.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.keyword.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for CallArgs {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            positional: Vec::new(),
            keyword: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

impl fmt::Display for CallArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        let mut first = true;
        for value in &self.positional {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{value}")?;
            first = false;
        }
        for (name, value) in &self.keyword {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{name}={value}")?;
            first = false;
        }
        write!(f, ")")
    }
}

/// What a bound method hands back once its response has been finalized.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Decoded JSON body (`decode_json` enabled).
    Json(Value),
    /// Undecoded response body.
    Raw(Vec<u8>),
}

impl Reply {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Reply::Json(value) => Some(value),
            Reply::Raw(_) => None,
        }
    }

    pub fn into_json(self) -> Option<Value> {
        match self {
            Reply::Json(value) => Some(value),
            Reply::Raw(_) => None,
        }
    }

    /// Raw bytes of an undecoded body.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Reply::Raw(bytes) => Some(bytes),
            Reply::Json(_) => None,
        }
    }

    /// Deserialize the reply into a typed value. Raw bodies are parsed as
    /// JSON first.
    pub fn json<T: DeserializeOwned>(self) -> Result<T, ApiError> {
        let decoded = match self {
            Reply::Json(value) => serde_json::from_value(value),
            Reply::Raw(bytes) => serde_json::from_slice(&bytes),
        };
        decoded.map_err(|e| ApiError::ReplyType(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builder_collects_keywords_and_positionals() {
        assert!(CallArgs::new().is_empty());
        let args = CallArgs::new().arg("id", 2).push("x").arg("title", "news");
        assert!(!args.is_empty());
        assert!(!CallArgs::new().push(1).is_empty());
        assert_eq!(args.positional, vec![json!("x")]);
        assert_eq!(args.get("id"), Some(&json!(2)));
        assert_eq!(args.get("title"), Some(&json!("news")));
    }

    #[test]
    fn header_accumulates_into_headers_object() {
        let args = CallArgs::new().header("x-a", "1").header("x-b", "2");
        assert_eq!(args.get("headers"), Some(&json!({"x-a": "1", "x-b": "2"})));
    }

    #[test]
    fn collects_from_pairs() {
        let args: CallArgs = [("userId", json!(1)), ("title", json!("x"))].into_iter().collect();
        assert_eq!(args.keyword.len(), 2);
        assert!(args.positional.is_empty());
    }

    #[test]
    fn display_lists_arguments() {
        let args = CallArgs::new().push(5).arg("id", 2);
        assert_eq!(args.to_string(), "(5, id=2)");
        assert_eq!(CallArgs::new().to_string(), "()");
    }

    #[test]
    fn typed_reply_from_raw_body() {
        #[derive(Debug, serde::Deserialize)]
        struct Post {
            id: u64,
        }
        let posts: Vec<Post> = Reply::Raw(br#"[{"id":1}]"#.to_vec()).json().unwrap();
        assert_eq!(posts[0].id, 1);
        let err = Reply::Raw(b"nope".to_vec()).json::<Vec<Post>>().unwrap_err();
        assert!(matches!(err, ApiError::ReplyType(_)), "{err}");
        let err = Reply::Json(json!({"id": "one"})).json::<Post>().unwrap_err();
        assert!(err.to_string().starts_with("reply does not match the requested type"), "{err}");
    }
}
