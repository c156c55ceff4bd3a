//! Shared test helper functions
//!
//! This module provides common utility functions used across multiple test files,
//! reducing code duplication and ensuring consistent test patterns.

use std::time::{SystemTime, UNIX_EPOCH};

use backend::{
    config::JwtConfig,
    models::users::{User, UserType},
    services::{
        jwt::{generate_jwt, TokenPurpose},
        users::access_settings,
    },
};
use uuid::Uuid;

use crate::common::{database::TEST_PASSWORD, TestApp, TestDb};

/// Generates a unique test email using nanosecond timestamp
///
/// # Example
/// ```no_run
/// let email = generate_test_email();
/// // Returns something like "test_1234567890123456789_42@example.com"
/// ```
#[allow(dead_code)]
pub fn generate_test_email() -> String {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let random: u32 = rand::random();
    format!("test_{}_{}@example.com", timestamp, random)
}

/// Signs an access token for a user that does not exist in the database.
///
/// Good enough for anything decided before the first query: authentication,
/// role checks, request validation.
#[allow(dead_code)]
pub fn token_for(jwt: &JwtConfig, user_type: UserType) -> String {
    let now = chrono::Utc::now();
    let user = User {
        id: Uuid::now_v7(),
        email: generate_test_email(),
        password_hash: String::new(),
        first_name: "Token".to_string(),
        last_name: "Holder".to_string(),
        phone_number: None,
        address: None,
        user_type,
        is_verified: true,
        is_active: true,
        profile_image: None,
        last_login: None,
        created_at: now,
        updated_at: now,
    };

    generate_jwt(
        &user,
        TokenPurpose::Access,
        &access_settings(jwt),
        chrono::Duration::hours(1),
    )
    .unwrap()
}

/// Logs in through the API and returns the access token
#[allow(dead_code)]
pub async fn login(app: &TestApp, email: &str) -> String {
    let response = app
        .client
        .post(app.url("/api/v1/auth/login"))
        .json(&serde_json::json!({
            "email": email,
            "password": TEST_PASSWORD
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.unwrap();
    body["data"]["token"].as_str().unwrap().to_string()
}

/// Registers a client through the API, activates it and logs in
///
/// # Returns
/// `(email, access_token)`
#[allow(dead_code)]
pub async fn register_and_login(app: &TestApp, test_db: &TestDb) -> (String, String) {
    let email = test_db.generate_test_email();

    let response = app
        .client
        .post(app.url("/api/v1/auth/register"))
        .json(&serde_json::json!({
            "first_name": "Mariana",
            "last_name": "López",
            "email": email,
            "password": TEST_PASSWORD,
            "user_type": "client"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);

    test_db.activate(&email).await;
    let token = login(app, &email).await;
    (email, token)
}

/// Creates an admin directly in the database and logs in
#[allow(dead_code)]
pub async fn create_admin_token(app: &TestApp, test_db: &TestDb) -> String {
    let admin = test_db.create_user(UserType::Admin, "Admin").await;
    login(app, &admin.email).await
}

/// Reads a JSON body, panicking with the raw text when it is not JSON
#[allow(dead_code)]
pub async fn json_body(response: reqwest::Response) -> serde_json::Value {
    let text = response.text().await.unwrap();
    serde_json::from_str(&text).unwrap_or_else(|_| panic!("Response is not JSON: {text}"))
}
