//! Authentication and role checks, driven through the router in-process.
//!
//! Everything here is decided before the first query, so the lazy pool never
//! connects.

mod common;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use backend::{build_router, database, load_config, models::users::UserType, AppState, Config};
use common::token_for;
use serde_json::Value;
use tower::ServiceExt;

fn test_router() -> (Router, Config) {
    let mut config = load_config().expect("Failed to load config");
    config.rate_limit.enabled = false;
    config.email.enabled = false;

    let pool = database::create_pool(&config.database).expect("Failed to create pool");
    let state = AppState::new(pool, config.clone()).expect("Failed to build state");
    (build_router(state), config)
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn get(path: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(Method::GET).uri(path);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

fn json_request(method: Method, path: &str, token: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(path)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_protected_route_requires_token() {
    let (router, _) = test_router();

    let (status, body) = send(&router, get("/api/v1/services", None)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_garbage_token_is_rejected() {
    let (router, _) = test_router();

    let (status, body) = send(&router, get("/api/v1/notifications", Some("not-a-jwt"))).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "AUTHENTICATION_FAILED");
}

#[tokio::test]
async fn test_admin_routes_reject_other_roles() {
    let (router, config) = test_router();

    for user_type in [UserType::Client, UserType::Nanny] {
        let token = token_for(&config.jwt, user_type);

        for path in [
            "/api/v1/dashboard/stats",
            "/api/v1/dashboard/users",
            "/api/v1/client/all",
            "/api/v1/payments",
            "/api/v1/payments/stats",
        ] {
            let (status, body) = send(&router, get(path, Some(&token))).await;
            assert_eq!(status, StatusCode::FORBIDDEN, "{user_type} on {path}");
            assert_eq!(body["error"]["code"], "FORBIDDEN");
        }
    }
}

#[tokio::test]
async fn test_client_only_routes_reject_nannys_and_admins() {
    let (router, config) = test_router();

    for user_type in [UserType::Nanny, UserType::Admin] {
        let token = token_for(&config.jwt, user_type);
        let (status, _) = send(&router, get("/api/v1/client/stats", Some(&token))).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{user_type}");
    }
}

#[tokio::test]
async fn test_nanny_cannot_book_a_service() {
    let (router, config) = test_router();
    let token = token_for(&config.jwt, UserType::Nanny);

    let body = serde_json::json!({
        "title": "Cuidado por la tarde",
        "service_type": "hourly",
        "start_date": "2030-06-10",
        "start_time": "14:00",
        "end_time": "18:00"
    });
    let (status, _) = send(
        &router,
        json_request(Method::POST, "/api/v1/services", &token, &body.to_string()),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_client_cannot_create_nannys() {
    let (router, config) = test_router();
    let token = token_for(&config.jwt, UserType::Client);

    let body = serde_json::json!({
        "first_name": "Lucía",
        "last_name": "Hernández",
        "email": "lucia@example.com",
        "password": "Secure123",
        "description": "Niñera con experiencia en cuidado de bebés y niños pequeños en casa.",
        "experience_years": 5,
        "hourly_rate": 150.0
    });
    let (status, body) = send(
        &router,
        json_request(Method::POST, "/api/v1/nannys", &token, &body.to_string()),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["message"], "Administrator access required");
}

#[tokio::test]
async fn test_malformed_json_is_a_bad_request() {
    let (router, config) = test_router();
    let token = token_for(&config.jwt, UserType::Client);

    let (status, body) = send(
        &router,
        json_request(Method::POST, "/api/v1/ratings", &token, "{ not json"),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_invalid_path_id_is_a_bad_request() {
    let (router, config) = test_router();
    let token = token_for(&config.jwt, UserType::Admin);

    let (status, body) = send(&router, get("/api/v1/services/not-a-uuid", Some(&token))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}
