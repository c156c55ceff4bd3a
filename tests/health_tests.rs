mod common;

use common::{json_body, TestApp, TestAppOptions};

#[tokio::test]
async fn test_health_endpoint_returns_ok() {
    let app = TestApp::new().await;

    let response = app
        .client
        .get(app.url("/api/health"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);

    let body = json_body(response).await;
    assert_eq!(body["status"], "ok");
    assert!(body["timestamp"].is_string());
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_versioned_health_endpoint() {
    let app = TestApp::new().await;

    let response = app
        .client
        .get(app.url("/api/v1/health"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_api_info_lists_resources() {
    let app = TestApp::new().await;

    let response = app
        .client
        .get(app.url("/api/info"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);

    let body = json_body(response).await;
    assert_eq!(body["name"], "NannysLM API");

    let endpoints = body["endpoints"].as_array().unwrap();
    assert!(endpoints.iter().any(|e| e == "/api/v1/services"));
    assert!(endpoints.iter().any(|e| e == "/api/v1/auth"));
}

#[tokio::test]
async fn test_unknown_route_returns_json_404() {
    let app = TestApp::new().await;

    let response = app
        .client
        .get(app.url("/api/v1/does-not-exist"))
        .send()
        .await
        .unwrap();

    // Route layers only wrap matched routes, so no token is needed to get a 404
    assert_eq!(response.status(), 404);

    let response = app
        .client
        .get(app.url("/nothing/here"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 404);

    let body = json_body(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
    assert_eq!(body["error"]["message"], "Route GET /nothing/here not found");
}

#[tokio::test]
async fn test_security_headers_and_request_id() {
    let app = TestApp::new().await;

    let response = app
        .client
        .get(app.url("/api/health"))
        .send()
        .await
        .unwrap();

    let headers = response.headers();
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-frame-options"], "DENY");
    assert!(headers.contains_key("x-request-id"));
}

#[tokio::test]
async fn test_incoming_request_id_is_propagated() {
    let app = TestApp::new().await;

    let response = app
        .client
        .get(app.url("/api/health"))
        .header("x-request-id", "req-12345")
        .send()
        .await
        .unwrap();

    assert_eq!(response.headers()["x-request-id"], "req-12345");
}

#[tokio::test]
async fn test_cors_preflight_allows_frontend_origin() {
    let app = TestApp::new_with_options(TestAppOptions {
        frontend_url: Some("http://localhost:4200".to_string()),
        ..Default::default()
    })
    .await;

    let response = app
        .client
        .request(reqwest::Method::OPTIONS, app.url("/api/v1/services"))
        .header("origin", "http://localhost:4200")
        .header("access-control-request-method", "POST")
        .send()
        .await
        .unwrap();

    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "http://localhost:4200"
    );
    assert_eq!(response.headers()["access-control-allow-credentials"], "true");
}

#[tokio::test]
async fn test_rate_limit_rejects_excess_requests() {
    let app = TestApp::new_with_options(TestAppOptions {
        rate_limit: Some(3),
        ..Default::default()
    })
    .await;

    for _ in 0..3 {
        let response = app
            .client
            .get(app.url("/api/health"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
    }

    let response = app
        .client
        .get(app.url("/api/health"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 429);

    let body = json_body(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "RATE_LIMITED");
}

#[tokio::test]
async fn test_rate_limit_ignores_rotating_forwarded_for() {
    let app = TestApp::new_with_options(TestAppOptions {
        rate_limit: Some(3),
        ..Default::default()
    })
    .await;

    let mut statuses = Vec::new();
    for hop in 0..5 {
        let response = app
            .client
            .get(app.url("/api/health"))
            .header("x-forwarded-for", format!("203.0.113.{hop}"))
            .send()
            .await
            .unwrap();
        statuses.push(response.status().as_u16());
    }

    assert_eq!(statuses, vec![200, 200, 200, 429, 429]);
}
