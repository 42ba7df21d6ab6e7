//! Verify endpoint descriptors against the JSON test vectors in `test-vectors/`.
//!
//! Each case names a verb, a URL template and call arguments, then either the
//! request that must come out or the error that must be raised. Every case is
//! checked twice: on the descriptor alone, and through a client whose
//! transport records the request instead of sending it.

use std::sync::{Arc, Mutex};

use restbind_core::transport::from_fn;
use restbind_core::{
    ApiBuilder, ApiClient, ApiError, CallArgs, ClientConfig, Endpoint, HttpRequest, HttpResponse, RequestParts,
};
use serde_json::Value;

const BASE_URL: &str = "http://localhost:3000/";

fn vectors() -> Vec<Value> {
    let raw = include_str!("../../test-vectors/endpoints.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();
    vectors["cases"].as_array().unwrap().clone()
}

fn call_args(case: &Value) -> CallArgs {
    let args = &case["args"];
    let mut call = CallArgs::new();
    for value in args["positional"].as_array().into_iter().flatten() {
        call = call.push(value.clone());
    }
    for (name, value) in args["keyword"].as_object().into_iter().flatten() {
        call = call.arg(name.clone(), value.clone());
    }
    call
}

fn pairs(value: &Value) -> Vec<(String, String)> {
    value
        .as_array()
        .unwrap()
        .iter()
        .map(|pair| {
            let pair = pair.as_array().unwrap();
            (pair[0].as_str().unwrap().to_string(), pair[1].as_str().unwrap().to_string())
        })
        .collect()
}

fn error_kind(err: &ApiError) -> &'static str {
    match err {
        ApiError::InvalidVerb(_) => "InvalidVerb",
        ApiError::InvalidTemplate { .. } => "InvalidTemplate",
        ApiError::MissingParameter { .. } => "MissingParameter",
        ApiError::InvalidHeaders => "InvalidHeaders",
        other => panic!("unexpected error: {other}"),
    }
}

/// Resolve a case on the descriptor alone.
fn resolve(case: &Value) -> Result<(Endpoint, String, RequestParts), ApiError> {
    let endpoint = Endpoint::parse(case["verb"].as_str().unwrap(), case["template"].as_str().unwrap())?;
    let (path, rest) = endpoint.resolve(&call_args(case))?;
    let parts = RequestParts::from_keywords(rest)?;
    Ok((endpoint, path, parts))
}

#[test]
fn endpoint_test_vectors() {
    for case in vectors() {
        let name = case["name"].as_str().unwrap();
        match (resolve(&case), case.get("expected_error")) {
            (Ok((endpoint, path, parts)), None) => {
                let expected = &case["expected"];
                assert_eq!(endpoint.method().as_str(), expected["method"], "{name}: method");
                assert_eq!(path, expected["path"].as_str().unwrap(), "{name}: path");
                assert_eq!(parts.query, pairs(&expected["query"]), "{name}: query");
                let params: Vec<&str> = case["params"].as_array().unwrap().iter().map(|p| p.as_str().unwrap()).collect();
                assert_eq!(endpoint.parameter_names(), params, "{name}: params");
            }
            (Err(err), Some(kind)) => assert_eq!(error_kind(&err), kind, "{name}: error"),
            (Ok(_), Some(kind)) => panic!("{name}: expected {kind}"),
            (Err(err), None) => panic!("{name}: unexpected error {err}"),
        }
    }
}

#[test]
fn endpoint_test_vectors_through_a_client() {
    for case in vectors() {
        let name = case["name"].as_str().unwrap();
        let schema = ApiBuilder::blocking("Vectors")
            .route("under_test", case["verb"].as_str().unwrap(), case["template"].as_str().unwrap())
            .build();

        let sent: Arc<Mutex<Vec<HttpRequest>>> = Arc::default();
        let record = sent.clone();
        let transport = from_fn(move |request| {
            record.lock().unwrap().push(request);
            Ok(HttpResponse::empty())
        });
        let result = schema.and_then(|schema| {
            let client = ApiClient::with_transport(schema, ClientConfig::new(BASE_URL), transport)?;
            client.call("under_test", call_args(&case))
        });

        match (result, case.get("expected_error")) {
            (Ok(_), None) => {
                let expected = &case["expected"];
                let sent = sent.lock().unwrap();
                assert_eq!(sent.len(), 1, "{name}: one request");
                assert_eq!(sent[0].method.as_str(), expected["method"], "{name}: method");
                assert_eq!(sent[0].url, format!("{BASE_URL}{}", expected["path"].as_str().unwrap()), "{name}: url");
                assert_eq!(sent[0].query, pairs(&expected["query"]), "{name}: query");
            }
            (Err(err), Some(kind)) => {
                assert_eq!(error_kind(&err), kind, "{name}: error");
                assert!(sent.lock().unwrap().is_empty(), "{name}: nothing sent");
            }
            (Ok(_), Some(kind)) => panic!("{name}: expected {kind}"),
            (Err(err), None) => panic!("{name}: unexpected error {err}"),
        }
    }
}
