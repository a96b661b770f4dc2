//! Verify build/parse methods against JSON test vectors stored in `test-vectors/`.
//!
//! Each vector file describes inputs, expected requests, simulated responses,
//! and expected parse results. Comparing parsed JSON (not raw strings) avoids
//! false negatives from field-ordering differences.

use serde_json::Value;
use tradzy_core::{
    ApiError, BearerToken, HttpMethod, HttpRequest, HttpResponse, OrderId, OrderStatus, ProductId,
    ProductWrite, TradzyClient, UserId, UserProfile,
};

const BASE_URL: &str = "/api";

fn client() -> TradzyClient {
    TradzyClient::new(BASE_URL)
}

/// Parse the method string from test vectors into `HttpMethod`.
fn parse_method(s: &str) -> HttpMethod {
    match s {
        "GET" => HttpMethod::Get,
        "POST" => HttpMethod::Post,
        "PUT" => HttpMethod::Put,
        "PATCH" => HttpMethod::Patch,
        "DELETE" => HttpMethod::Delete,
        other => panic!("unknown method: {other}"),
    }
}

fn simulated(case: &Value) -> HttpResponse {
    let sim = &case["simulated_response"];
    HttpResponse {
        status: sim["status"].as_u64().unwrap() as u16,
        headers: Vec::new(),
        body: sim["body"].as_str().unwrap().to_string(),
    }
}

fn assert_request(name: &str, req: &HttpRequest, expected: &Value) {
    assert_eq!(req.method, parse_method(expected["method"].as_str().unwrap()), "{name}: method");
    assert_eq!(req.path, format!("{BASE_URL}{}", expected["path"].as_str().unwrap()), "{name}: path");

    let expected_headers: Vec<(String, String)> = expected["headers"]
        .as_array()
        .unwrap()
        .iter()
        .map(|h| {
            let arr = h.as_array().unwrap();
            (arr[0].as_str().unwrap().to_string(), arr[1].as_str().unwrap().to_string())
        })
        .collect();
    assert_eq!(req.headers, expected_headers, "{name}: headers");

    let req_body: Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
    assert_eq!(req_body, expected["body"], "{name}: body");
}

fn assert_error(name: &str, err: ApiError, expected: &Value) {
    match expected["kind"].as_str().unwrap() {
        "Request" => match err {
            ApiError::Request { status, message } => {
                assert_eq!(u64::from(status), expected["status"].as_u64().unwrap(), "{name}: status");
                assert_eq!(message, expected["message"].as_str().unwrap(), "{name}: message");
            }
            other => panic!("{name}: expected Request, got {other:?}"),
        },
        "Decode" => assert!(matches!(err, ApiError::Decode(_)), "{name}: expected Decode, got {err:?}"),
        other => panic!("{name}: unknown expected_error kind: {other}"),
    }
}

// ---------------------------------------------------------------------------
// Login
// ---------------------------------------------------------------------------

#[test]
fn login_test_vectors() {
    let raw = include_str!("../../test-vectors/login.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    let c = client();
    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let identifier = case["input"]["identifier"].as_str().unwrap();
        let password = case["input"]["password"].as_str().unwrap();

        // Verify build
        let req = c.build_login(identifier, password).unwrap();
        assert_request(name, &req, &case["expected_request"]);

        // Verify parse
        let result = c.parse_login(simulated(case));
        if let Some(expected_error) = case.get("expected_error") {
            assert_error(name, result.unwrap_err(), expected_error);
        } else {
            let login = result.unwrap();
            let token = BearerToken::new(case["expected_token"].as_str().unwrap());
            assert_eq!(login.token, token, "{name}: token");
            let profile: UserProfile = serde_json::from_value(case["expected_profile"].clone()).unwrap();
            assert_eq!(login.profile, profile, "{name}: profile");
        }
    }
}

// ---------------------------------------------------------------------------
// Create product
// ---------------------------------------------------------------------------

#[test]
fn create_product_test_vectors() {
    let raw = include_str!("../../test-vectors/products.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    let c = client();
    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let token = case["token"].as_str().map(BearerToken::new);

        // Verify build
        let req = c.build_create_product(&case["input"], token.as_ref()).unwrap();
        assert_request(name, &req, &case["expected_request"]);

        // Verify parse
        let result = c.parse_create_product(simulated(case));
        if let Some(expected_error) = case.get("expected_error") {
            assert_error(name, result.unwrap_err(), expected_error);
        } else {
            let written = result.unwrap();
            let expected: ProductWrite =
                serde_json::from_value(case["expected_result"].clone()).unwrap();
            assert_eq!(written, expected, "{name}: parsed result");
        }
    }
}

// ---------------------------------------------------------------------------
// Error messages
// ---------------------------------------------------------------------------

#[test]
fn error_message_test_vectors() {
    let raw = include_str!("../../test-vectors/errors.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    let c = client();
    for case in vectors["cases"].as_array().unwrap() {
        let op = case["operation"].as_str().unwrap();
        let status = case["status"].as_u64().unwrap() as u16;
        let response = HttpResponse {
            status,
            headers: Vec::new(),
            body: case["body"].as_str().unwrap().to_string(),
        };

        let err = match op {
            "register" => c.parse_register(response).unwrap_err(),
            "logout" => c.parse_logout(response).unwrap_err(),
            "check_auth" => c.parse_check_auth(response).unwrap_err(),
            "list_products" => c.parse_list_products(response).unwrap_err(),
            "get_product" => c.parse_get_product(response).unwrap_err(),
            "update_product" => c.parse_update_product(response).unwrap_err(),
            "delete_product" => c.parse_delete_product(response).unwrap_err(),
            "list_users" => c.parse_list_users(response).unwrap_err(),
            "get_stats" => c.parse_get_stats(response).unwrap_err(),
            "delete_user" => c.parse_delete_user(response).unwrap_err(),
            "list_wholesalers" => c.parse_list_wholesalers(response).unwrap_err(),
            "list_retailers" => c.parse_list_retailers(response).unwrap_err(),
            "list_orders" => c.parse_list_orders(response).unwrap_err(),
            "update_order_status" => c.parse_update_order_status(response).unwrap_err(),
            other => panic!("unknown operation: {other}"),
        };

        let expected = serde_json::json!({
            "kind": "Request",
            "status": status,
            "message": case["message"],
        });
        assert_error(op, err, &expected);
    }
}

// ---------------------------------------------------------------------------
// Paths
// ---------------------------------------------------------------------------

#[test]
fn bodiless_requests_match_endpoint_table() {
    let c = client();
    let token = BearerToken::new("abc");
    let t = Some(&token);

    let cases = [
        (c.build_logout(t), "POST", "/auth/logout"),
        (c.build_check_auth(t), "GET", "/auth/check-auth"),
        (c.build_list_products(t), "GET", "/products"),
        (c.build_get_product(ProductId(3), t), "GET", "/products/3"),
        (c.build_delete_product(ProductId(42), t), "DELETE", "/products/42"),
        (c.build_list_users(t), "GET", "/admin/users"),
        (c.build_get_stats(t), "GET", "/admin/stats"),
        (c.build_delete_user(UserId(9), t), "DELETE", "/admin/users/9"),
        (c.build_list_wholesalers(t), "GET", "/admin/wholesalers"),
        (c.build_list_retailers(t), "GET", "/admin/retailers"),
        (c.build_list_orders(t), "GET", "/admin/orders"),
    ];

    for (req, method, path) in cases {
        assert_eq!(req.method, parse_method(method), "{path}: method");
        assert_eq!(req.path, format!("{BASE_URL}{path}"));
        assert!(req.body.is_none(), "{path}: body should be None");
        assert_eq!(
            req.headers,
            vec![("authorization".to_string(), "Bearer abc".to_string())],
            "{path}: headers"
        );
    }

    let req = c
        .build_update_order_status(OrderId(5), OrderStatus::Delivered, t)
        .unwrap();
    assert_eq!(req.method, HttpMethod::Patch);
    assert_eq!(req.path, "/api/admin/orders/5");
}
