//! Registration, activation and login against a real database.
//!
//! Each test returns early when the database is not reachable.

mod common;

use backend::models::users::UserType;
use common::{database::TEST_PASSWORD, json_body, login, register_and_login, TestApp, TestDb};

#[tokio::test]
async fn test_register_then_login_requires_activation() {
    let Some(test_db) = TestDb::try_new("register_activation").await else {
        return;
    };
    let app = TestApp::new().await;
    let email = test_db.generate_test_email();

    let response = app
        .client
        .post(app.url("/api/v1/auth/register"))
        .json(&serde_json::json!({
            "first_name": "Mariana",
            "last_name": "López",
            "email": email,
            "password": TEST_PASSWORD,
            "phone_number": "5512345678"
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 201);
    let body = json_body(response).await;
    assert_eq!(body["data"]["user"]["email"], email.as_str());
    assert_eq!(body["data"]["user"]["user_type"], "client");
    assert_eq!(body["data"]["user"]["is_active"], false);
    assert!(body["data"]["user"].get("password_hash").is_none());

    let response = app
        .client
        .post(app.url("/api/v1/auth/login"))
        .json(&serde_json::json!({ "email": email, "password": TEST_PASSWORD }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 403);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "ACCOUNT_INACTIVE");

    test_db.activate(&email).await;
    let token = login(&app, &email).await;

    let response = app
        .client
        .get(app.url("/api/v1/auth/profile"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body = json_body(response).await;
    assert_eq!(body["data"]["user"]["email"], email.as_str());
    assert_eq!(body["data"]["user"]["is_active"], true);
}

#[tokio::test]
async fn test_register_rejects_duplicate_email() {
    let Some(test_db) = TestDb::try_new("register_duplicate").await else {
        return;
    };
    let app = TestApp::new().await;
    let existing = test_db.create_user(UserType::Client, "Existente").await;

    let response = app
        .client
        .post(app.url("/api/v1/auth/register"))
        .json(&serde_json::json!({
            "first_name": "Otra",
            "last_name": "Persona",
            "email": existing.email,
            "password": TEST_PASSWORD
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert!(body["error"]["fields"]["email"].is_string());
}

#[tokio::test]
async fn test_register_collects_every_field_error() {
    let Some(_test_db) = TestDb::try_new("register_field_errors").await else {
        return;
    };
    let app = TestApp::new().await;

    let response = app
        .client
        .post(app.url("/api/v1/auth/register"))
        .json(&serde_json::json!({
            "first_name": "M",
            "last_name": "López3",
            "email": "not-an-email",
            "password": "short"
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    let body = json_body(response).await;
    let fields = body["error"]["fields"].as_object().unwrap();
    for field in ["first_name", "last_name", "email", "password"] {
        assert!(fields.contains_key(field), "missing error for {field}");
    }
}

#[tokio::test]
async fn test_login_failures_are_unauthorized() {
    let Some(test_db) = TestDb::try_new("login_failures").await else {
        return;
    };
    let app = TestApp::new().await;
    let user = test_db.create_user(UserType::Client, "Carmen").await;

    let response = app
        .client
        .post(app.url("/api/v1/auth/login"))
        .json(&serde_json::json!({ "email": user.email, "password": "Wrong1234" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "AUTHENTICATION_FAILED");
    assert!(body["error"]["fields"]["password"].is_string());
    assert!(body["error"]["fields"].get("email").is_none());

    let response = app
        .client
        .post(app.url("/api/v1/auth/login"))
        .json(&serde_json::json!({
            "email": test_db.generate_test_email(),
            "password": TEST_PASSWORD
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "AUTHENTICATION_FAILED");
    assert!(body["error"]["fields"]["email"].is_string());
}

#[tokio::test]
async fn test_login_cookie_authenticates_and_logout_clears_it() {
    let Some(test_db) = TestDb::try_new("login_cookie").await else {
        return;
    };
    let app = TestApp::new().await;
    let user = test_db.create_user(UserType::Nanny, "Lucía").await;

    let response = app
        .client
        .post(app.url("/api/v1/auth/login"))
        .json(&serde_json::json!({ "email": user.email, "password": TEST_PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let cookie = response.headers()["set-cookie"].to_str().unwrap().to_string();
    assert!(cookie.starts_with("access_token="));
    assert!(cookie.contains("HttpOnly"));

    // No Authorization header: the client's cookie store carries the token
    let response = app
        .client
        .get(app.url("/api/v1/auth/profile"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let response = app
        .client
        .post(app.url("/api/v1/auth/logout"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let response = app
        .client
        .get(app.url("/api/v1/auth/profile"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn test_check_email_availability() {
    let Some(test_db) = TestDb::try_new("check_email").await else {
        return;
    };
    let app = TestApp::new().await;
    let user = test_db.create_user(UserType::Client, "Rosa").await;

    let response = app
        .client
        .get(app.url(&format!("/api/v1/auth/check-email?email={}", user.email)))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body = json_body(response).await;
    assert_eq!(body["data"]["available"], false);

    let response = app
        .client
        .get(app.url(&format!(
            "/api/v1/auth/check-email?email={}",
            test_db.generate_test_email()
        )))
        .send()
        .await
        .unwrap();
    let body = json_body(response).await;
    assert_eq!(body["data"]["available"], true);
}

#[tokio::test]
async fn test_forgot_password_does_not_reveal_accounts() {
    let Some(test_db) = TestDb::try_new("forgot_password").await else {
        return;
    };
    let app = TestApp::new().await;
    let (email, _) = register_and_login(&app, &test_db).await;

    for address in [email, test_db.generate_test_email()] {
        let response = app
            .client
            .post(app.url("/api/v1/auth/forgot-password"))
            .json(&serde_json::json!({ "email": address }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
    }
}
