//! Verify build/parse methods against JSON test vectors stored in `test-vectors/`.
//!
//! Each vector file describes inputs, expected requests, simulated responses,
//! and expected parse results or error kinds. Comparing parsed JSON (not raw
//! strings) avoids false negatives from field-ordering differences.

use serde_json::Value;
use users_core::{
    ApiError, HttpMethod, HttpRequest, HttpResponse, User, UserCreate, UserUpdate, UsersClient,
};

const BASE_URL: &str = "http://localhost:8000";

fn client() -> UsersClient {
    UsersClient::new(BASE_URL)
}

fn cases(raw: &str) -> Vec<Value> {
    let vectors: Value = serde_json::from_str(raw).unwrap();
    vectors["cases"].as_array().unwrap().clone()
}

/// Parse the method string from test vectors into `HttpMethod`.
fn parse_method(s: &str) -> HttpMethod {
    match s {
        "GET" => HttpMethod::Get,
        "POST" => HttpMethod::Post,
        "PATCH" => HttpMethod::Patch,
        "DELETE" => HttpMethod::Delete,
        other => panic!("unknown method: {other}"),
    }
}

fn assert_request(name: &str, req: &HttpRequest, expected: &Value) {
    let method = parse_method(expected["method"].as_str().unwrap());
    assert_eq!(req.method, method, "{name}: method");
    let path = format!("{BASE_URL}{}", expected["path"].as_str().unwrap());
    assert_eq!(req.path, path, "{name}: path");

    if let Some(headers) = expected.get("headers") {
        let expected_headers: Vec<(String, String)> = headers
            .as_array()
            .unwrap()
            .iter()
            .map(|h| {
                let arr = h.as_array().unwrap();
                (arr[0].as_str().unwrap().to_string(), arr[1].as_str().unwrap().to_string())
            })
            .collect();
        assert_eq!(req.headers, expected_headers, "{name}: headers");
    }

    match expected.get("body") {
        Some(body) => {
            let req_body: Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
            assert_eq!(&req_body, body, "{name}: body");
        }
        None => assert!(req.body.is_none(), "{name}: body should be None"),
    }
}

fn simulated(case: &Value) -> HttpResponse {
    let sim = &case["simulated_response"];
    HttpResponse::new(
        sim["status"].as_u64().unwrap() as u16,
        sim["body"].as_str().unwrap(),
    )
}

/// Check `result` against `expected_error` when present, else against `expected`.
fn assert_outcome<T, F>(name: &str, case: &Value, result: Result<T, ApiError>, expected: F)
where
    T: std::fmt::Debug,
    F: FnOnce(T),
{
    match case.get("expected_error") {
        Some(kind) => {
            let err = result.unwrap_err();
            let matched = match kind.as_str().unwrap() {
                "NotFound" => matches!(err, ApiError::NotFound { .. }),
                "Conflict" => matches!(err, ApiError::Conflict { .. }),
                "Validation" => matches!(err, ApiError::Validation { .. }),
                "HttpStatus" => matches!(err, ApiError::HttpStatus { .. }),
                "Decode" => matches!(err, ApiError::Decode(_)),
                other => panic!("{name}: unknown expected_error: {other}"),
            };
            assert!(matched, "{name}: expected {kind}, got {err:?}");
        }
        None => expected(result.unwrap()),
    }
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

#[test]
fn create_test_vectors() {
    let c = client();
    for case in cases(include_str!("../../test-vectors/create.json")) {
        let name = case["name"].as_str().unwrap();
        let input: UserCreate = serde_json::from_value(case["input"].clone()).unwrap();

        let req = c.build_create_user(&input).unwrap();
        assert_request(name, &req, &case["expected_request"]);

        let result = c.parse_create_user(simulated(&case));
        assert_outcome(name, &case, result, |user| {
            let expected: User = serde_json::from_value(case["expected_result"].clone()).unwrap();
            assert_eq!(user, expected, "{name}: parsed result");
        });
    }
}

// ---------------------------------------------------------------------------
// List
// ---------------------------------------------------------------------------

#[test]
fn list_test_vectors() {
    let c = client();
    for case in cases(include_str!("../../test-vectors/list.json")) {
        let name = case["name"].as_str().unwrap();

        let req = c.build_list_users();
        assert_request(name, &req, &case["expected_request"]);

        let result = c.parse_list_users(simulated(&case));
        assert_outcome(name, &case, result, |users| {
            let expected: Vec<User> =
                serde_json::from_value(case["expected_result"].clone()).unwrap();
            assert_eq!(users, expected, "{name}: parsed result");
        });
    }
}

// ---------------------------------------------------------------------------
// Get
// ---------------------------------------------------------------------------

#[test]
fn get_test_vectors() {
    let c = client();
    for case in cases(include_str!("../../test-vectors/get.json")) {
        let name = case["name"].as_str().unwrap();
        let id = case["input_id"].as_str().unwrap();

        let req = c.build_get_user(id).unwrap();
        assert_request(name, &req, &case["expected_request"]);

        let result = c.parse_get_user(simulated(&case));
        assert_outcome(name, &case, result, |user| {
            let expected: User = serde_json::from_value(case["expected_result"].clone()).unwrap();
            assert_eq!(user, expected, "{name}: parsed result");
        });
    }
}

// ---------------------------------------------------------------------------
// Update
// ---------------------------------------------------------------------------

#[test]
fn update_test_vectors() {
    let c = client();
    for case in cases(include_str!("../../test-vectors/update.json")) {
        let name = case["name"].as_str().unwrap();
        let id = case["input_id"].as_str().unwrap();
        let input: UserUpdate = serde_json::from_value(case["input"].clone()).unwrap();

        let req = c.build_update_user(id, &input).unwrap();
        assert_request(name, &req, &case["expected_request"]);

        let result = c.parse_update_user(simulated(&case));
        assert_outcome(name, &case, result, |user| {
            let expected: User = serde_json::from_value(case["expected_result"].clone()).unwrap();
            assert_eq!(user, expected, "{name}: parsed result");
        });
    }
}

// ---------------------------------------------------------------------------
// Delete
// ---------------------------------------------------------------------------

#[test]
fn delete_test_vectors() {
    let c = client();
    for case in cases(include_str!("../../test-vectors/delete.json")) {
        let name = case["name"].as_str().unwrap();
        let id = case["input_id"].as_str().unwrap();

        let req = c.build_delete_user(id).unwrap();
        assert_request(name, &req, &case["expected_request"]);

        let result = c.parse_delete_user(simulated(&case));
        assert_outcome(name, &case, result, |()| {});
    }
}
