//! Endpoint descriptors: one HTTP verb plus a relative URL template.
//!
//! Templates use format-style fields. `{name}` is filled from the keyword
//! argument `name`, `{}` takes the next positional argument and `{0}` the
//! positional argument at that index. `{{` and `}}` are literal braces and a
//! format spec or conversion (`{id:>4}`, `{id!r}`) is ignored.
//!
//! Braces never survive into a resolved path: literal and substituted braces
//! are written as `%7B` / `%7D`, so a resolved path parsed as a template has
//! no fields.
//!
//! ```rust,ignore
//! let comments = Endpoint::get("posts/{id}/comments")?;
//! assert_eq!(comments.parameter_names(), ["id"]);
//! ```

use std::collections::BTreeMap;
use std::str::FromStr;

use serde_json::Value;

use crate::args::CallArgs;
use crate::client::ApiClient;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpResponse, RequestBody};

/// Keyword carrying a JSON request body.
pub const PAYLOAD_KEY: &str = "payload";
/// Keyword carrying a raw or form-encoded request body.
pub const DATA_KEY: &str = "data";
/// Keyword carrying per-call header overrides.
pub const HEADERS_KEY: &str = "headers";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Named(String),
    Index(usize),
    Next,
}

/// A remote operation: verb and URL template.
///
/// Descriptors are immutable once built and hold no reference to any client,
/// so one descriptor can serve every client of an API from any thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    method: HttpMethod,
    template: String,
    segments: Vec<Segment>,
    params: Vec<String>,
}

impl Endpoint {
    pub fn new(method: HttpMethod, template: impl Into<String>) -> Result<Self, ApiError> {
        let template = template.into();
        let segments = parse_template(&template)?;
        let params = named_fields(&segments);
        Ok(Self {
            method,
            template,
            segments,
            params,
        })
    }

    /// Build from a verb name, rejecting verbs outside the allow-list.
    pub fn parse(verb: &str, template: impl Into<String>) -> Result<Self, ApiError> {
        Self::new(HttpMethod::from_str(verb)?, template)
    }

    pub fn get(template: impl Into<String>) -> Result<Self, ApiError> {
        Self::new(HttpMethod::Get, template)
    }

    pub fn post(template: impl Into<String>) -> Result<Self, ApiError> {
        Self::new(HttpMethod::Post, template)
    }

    pub fn put(template: impl Into<String>) -> Result<Self, ApiError> {
        Self::new(HttpMethod::Put, template)
    }

    pub fn delete(template: impl Into<String>) -> Result<Self, ApiError> {
        Self::new(HttpMethod::Delete, template)
    }

    pub fn patch(template: impl Into<String>) -> Result<Self, ApiError> {
        Self::new(HttpMethod::Patch, template)
    }

    pub fn head(template: impl Into<String>) -> Result<Self, ApiError> {
        Self::new(HttpMethod::Head, template)
    }

    pub fn options(template: impl Into<String>) -> Result<Self, ApiError> {
        Self::new(HttpMethod::Options, template)
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// Replace the template. Parameter names are re-derived from it.
    pub fn set_template(&mut self, template: impl Into<String>) -> Result<(), ApiError> {
        let template = template.into();
        self.segments = parse_template(&template)?;
        self.params = named_fields(&self.segments);
        self.template = template;
        Ok(())
    }

    /// Named template fields in order of first appearance.
    pub fn parameter_names(&self) -> &[String] {
        &self.params
    }

    /// Substitute the template fields, returning the relative path and the
    /// keyword arguments the template did not consume.
    pub fn resolve(&self, args: &CallArgs) -> Result<(String, BTreeMap<String, Value>), ApiError> {
        let mut path = String::with_capacity(self.template.len());
        let mut next_positional = 0;
        for segment in &self.segments {
            let value = match segment {
                Segment::Literal(text) => {
                    push_path_text(&mut path, text);
                    continue;
                }
                Segment::Named(name) => args.keyword.get(name).ok_or_else(|| self.missing(name))?,
                Segment::Index(index) => args
                    .positional
                    .get(*index)
                    .ok_or_else(|| self.missing(&index.to_string()))?,
                Segment::Next => {
                    let value = args
                        .positional
                        .get(next_positional)
                        .ok_or_else(|| self.missing(&format!("#{next_positional}")))?;
                    next_positional += 1;
                    value
                }
            };
            push_path_text(&mut path, &scalar_text(value));
        }

        let rest = args
            .keyword
            .iter()
            .filter(|(name, _)| !self.params.contains(name))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        Ok((path, rest))
    }

    /// Resolve the template and send the request through `client`.
    pub fn call(&self, client: &ApiClient, args: &CallArgs) -> Result<HttpResponse, ApiError> {
        let (path, rest) = self.resolve(args)?;
        let parts = RequestParts::from_keywords(rest)?;
        client.invoke(self.method, &path, parts)
    }

    fn missing(&self, field: &str) -> ApiError {
        ApiError::MissingParameter {
            template: self.template.clone(),
            field: field.to_string(),
        }
    }
}

/// The pieces of a request that do not come from the URL template.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestParts {
    pub query: Vec<(String, String)>,
    pub body: Option<RequestBody>,
    pub headers: Vec<(String, String)>,
}

impl RequestParts {
    /// Split leftover keyword arguments: `payload` becomes a JSON body, `data`
    /// a raw (string) or form (object) body, `headers` per-call headers, and
    /// everything else a query parameter. Null values are dropped and arrays
    /// repeat their key.
    pub fn from_keywords(keywords: BTreeMap<String, Value>) -> Result<Self, ApiError> {
        let mut parts = RequestParts::default();
        for (name, value) in keywords {
            match (name.as_str(), value) {
                (_, Value::Null) => {}
                (PAYLOAD_KEY, value) => parts.body = Some(RequestBody::Json(value)),
                (DATA_KEY, Value::String(text)) => parts.body = Some(RequestBody::Raw(text.into_bytes())),
                (DATA_KEY, Value::Object(fields)) => {
                    let mut pairs = Vec::new();
                    for (key, value) in &fields {
                        push_pairs(&mut pairs, key, value);
                    }
                    parts.body = Some(RequestBody::Form(pairs));
                }
                (DATA_KEY, other) => parts.body = Some(RequestBody::Raw(other.to_string().into_bytes())),
                (HEADERS_KEY, Value::Object(headers)) => {
                    for (key, value) in headers {
                        match value {
                            Value::Object(_) | Value::Array(_) => return Err(ApiError::InvalidHeaders),
                            Value::Null => {}
                            scalar => parts.headers.push((key, scalar_text(&scalar))),
                        }
                    }
                }
                (HEADERS_KEY, _) => return Err(ApiError::InvalidHeaders),
                (_, value) => push_pairs(&mut parts.query, &name, &value),
            }
        }
        Ok(parts)
    }
}

fn push_pairs(pairs: &mut Vec<(String, String)>, key: &str, value: &Value) {
    match value {
        Value::Null => {}
        Value::Array(items) => {
            for item in items.iter().filter(|item| !item.is_null()) {
                pairs.push((key.to_string(), scalar_text(item)));
            }
        }
        other => pairs.push((key.to_string(), scalar_text(other))),
    }
}

fn push_path_text(path: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '{' => path.push_str("%7B"),
            '}' => path.push_str("%7D"),
            c => path.push(c),
        }
    }
}

/// Strings render without quotes; everything else as JSON text.
fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn named_fields(segments: &[Segment]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for segment in segments {
        if let Segment::Named(name) = segment {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
    }
    names
}

fn parse_template(template: &str) -> Result<Vec<Segment>, ApiError> {
    let invalid = |reason| ApiError::InvalidTemplate {
        template: template.to_string(),
        reason,
    };

    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                literal.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                literal.push('}');
            }
            '}' => return Err(invalid("single '}' encountered")),
            '{' => {
                let mut field = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some('{') => return Err(invalid("unexpected '{' in field name")),
                        Some(c) => field.push(c),
                        None => return Err(invalid("expected '}' before end of template")),
                    }
                }
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                let name = field.split([':', '!']).next().unwrap_or_default().trim();
                segments.push(if name.is_empty() {
                    Segment::Next
                } else if let Ok(index) = name.parse::<usize>() {
                    Segment::Index(index)
                } else {
                    Segment::Named(name.to_string())
                });
            }
            c => literal.push(c),
        }
    }
    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    Ok(segments)
}
