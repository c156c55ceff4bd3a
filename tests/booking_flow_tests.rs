//! Marketplace flow: admin creates a nanny, a client books, the nanny accepts
//! and completes, the client rates and pays.
//!
//! Each test returns early when the database is not reachable.

mod common;

use chrono::{Days, Local};
use common::{
    create_admin_token, database::TEST_PASSWORD, json_body, login, register_and_login, TestApp,
    TestDb,
};
use serde_json::Value;

struct Nanny {
    id: String,
    token: String,
}

async fn create_nanny(app: &TestApp, test_db: &TestDb, admin_token: &str, hourly_rate: f64) -> Nanny {
    let email = test_db.generate_test_email();

    let response = app
        .post_as("/api/v1/nannys", admin_token)
        .json(&serde_json::json!({
            "first_name": "Lucía",
            "last_name": "Hernández",
            "email": email,
            "password": TEST_PASSWORD,
            "phone_number": "5587654321",
            "description": "Niñera con experiencia en cuidado de bebés y niños pequeños en casa.",
            "experience_years": 6,
            "hourly_rate": hourly_rate
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 201);
    let body = json_body(response).await;
    assert_eq!(body["data"]["nanny"]["status"], "active");
    assert_eq!(body["data"]["nanny"]["is_verified"], true);

    Nanny {
        id: body["data"]["nanny"]["id"].as_str().unwrap().to_string(),
        token: login(app, &email).await,
    }
}

/// Registered client with a completed profile
async fn create_client(app: &TestApp, test_db: &TestDb) -> String {
    let (_, token) = register_and_login(app, test_db).await;

    let response = app
        .post_as("/api/v1/profile/complete-client", &token)
        .json(&serde_json::json!({
            "emergency_contact_name": "Jorge López",
            "emergency_contact_phone": "5511112222",
            "number_of_children": 2
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);

    token
}

async fn book_service(app: &TestApp, client_token: &str) -> Value {
    book_service_at(app, client_token, 30, "14:00", "18:30").await
}

async fn book_service_at(
    app: &TestApp,
    client_token: &str,
    days_ahead: u64,
    start_time: &str,
    end_time: &str,
) -> Value {
    let date = Local::now().date_naive().checked_add_days(Days::new(days_ahead)).unwrap();

    let response = app
        .post_as("/api/v1/services", client_token)
        .json(&serde_json::json!({
            "title": "Cuidado por la tarde",
            "service_type": "hourly",
            "start_date": date,
            "start_time": start_time,
            "end_time": end_time,
            "number_of_children": 2,
            "address": "Av. Reforma 123"
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 201);
    json_body(response).await["data"].clone()
}

#[tokio::test]
async fn test_full_booking_lifecycle() {
    let Some(test_db) = TestDb::try_new("booking_lifecycle").await else {
        return;
    };
    let app = TestApp::new().await;
    let admin_token = create_admin_token(&app, &test_db).await;
    let nanny = create_nanny(&app, &test_db, &admin_token, 150.0).await;
    let client_token = create_client(&app, &test_db).await;

    // Book
    let created = book_service(&app, &client_token).await;
    assert_eq!(created["status"], "pending");
    assert_eq!(created["total_hours"], 4.5);
    let service_id = created["service_id"].as_str().unwrap().to_string();

    // Every available nanny hears about it
    let response = app
        .get_as("/api/v1/notifications?unread=true", &nanny.token)
        .send()
        .await
        .unwrap();
    let body = json_body(response).await;
    let notifications = body["data"]["notifications"].as_array().unwrap();
    assert!(notifications
        .iter()
        .any(|n| n["related_id"] == service_id.as_str() && n["type"] == "service"));

    // Accept
    let response = app
        .post_as(&format!("/api/v1/services/{service_id}/accept"), &nanny.token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body = json_body(response).await;
    assert_eq!(body["data"]["service"]["status"], "confirmed");
    assert_eq!(body["data"]["service"]["nanny_id"], nanny.id.as_str());
    assert_eq!(body["data"]["service"]["total_amount"], 675.0);

    // A second acceptance loses
    let response = app
        .post_as(&format!("/api/v1/services/{service_id}/accept"), &nanny.token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 409);

    // Rating before completion is refused
    let response = app
        .post_as("/api/v1/ratings", &client_token)
        .json(&serde_json::json!({ "service_id": service_id, "rating": 5 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    // Complete, twice
    let response = app
        .post_as(&format!("/api/v1/services/{service_id}/complete"), &nanny.token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body = json_body(response).await;
    assert_eq!(body["data"]["already_completed"], false);
    assert_eq!(body["data"]["service"]["status"], "completed");

    let response = app
        .post_as(&format!("/api/v1/services/{service_id}/complete"), &nanny.token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body = json_body(response).await;
    assert_eq!(body["data"]["already_completed"], true);

    // Rate
    let response = app
        .post_as("/api/v1/ratings", &client_token)
        .json(&serde_json::json!({
            "service_id": service_id,
            "rating": 5,
            "punctuality_rating": 4,
            "would_recommend": true,
            "review": "Excelente trato con los niños"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);

    let response = app
        .post_as("/api/v1/ratings", &client_token)
        .json(&serde_json::json!({ "service_id": service_id, "rating": 3 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    let response = app
        .get_as(&format!("/api/v1/nannys/{}", nanny.id), &client_token)
        .send()
        .await
        .unwrap();
    let body = json_body(response).await;
    assert_eq!(body["data"]["nanny"]["rating_average"], 5.0);
    assert_eq!(body["data"]["nanny"]["total_ratings"], 1);
    assert_eq!(body["data"]["nanny"]["services_completed"], 1);

    // Pay and settle
    let response = app
        .post_as("/api/v1/payments", &client_token)
        .json(&serde_json::json!({
            "service_id": service_id,
            "amount": 675.0,
            "platform_fee": 67.5
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);
    let payment_id = json_body(response).await["data"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let response = app
        .patch_as(&format!("/api/v1/payments/{payment_id}/status"), &admin_token)
        .json(&serde_json::json!({ "paymentStatus": "completed" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body = json_body(response).await;
    assert_eq!(body["data"]["payment"]["paymentStatus"], "completed");

    let response = app
        .get_as("/api/v1/client/stats", &client_token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body = json_body(response).await;
    assert_eq!(body["data"]["stats"]["completed_services"], 1);
    assert_eq!(body["data"]["stats"]["unique_nannys"], 1);
}

#[tokio::test]
async fn test_services_are_scoped_to_their_client() {
    let Some(test_db) = TestDb::try_new("booking_scope").await else {
        return;
    };
    let app = TestApp::new().await;
    let owner_token = create_client(&app, &test_db).await;
    let other_token = create_client(&app, &test_db).await;

    let created = book_service(&app, &owner_token).await;
    let service_id = created["service_id"].as_str().unwrap();

    let response = app
        .get_as(&format!("/api/v1/services/{service_id}"), &other_token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);

    let response = app
        .get_as("/api/v1/services", &other_token)
        .send()
        .await
        .unwrap();
    let body = json_body(response).await;
    assert_eq!(body["data"]["count"], 0);

    let response = app
        .delete_as(&format!("/api/v1/services/{service_id}"), &other_token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);

    // The owner cancels; cancelling again is refused
    let response = app
        .delete_as(&format!("/api/v1/services/{service_id}"), &owner_token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let response = app
        .delete_as(&format!("/api/v1/services/{service_id}"), &owner_token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn test_booking_requires_client_profile() {
    let Some(test_db) = TestDb::try_new("booking_needs_profile").await else {
        return;
    };
    let app = TestApp::new().await;
    let (_, token) = register_and_login(&app, &test_db).await;

    let date = Local::now().date_naive().checked_add_days(Days::new(7)).unwrap();
    let response = app
        .post_as("/api/v1/services", &token)
        .json(&serde_json::json!({
            "title": "Noche de cine",
            "service_type": "overnight",
            "start_date": date,
            "start_time": "22:00",
            "end_time": "06:00"
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    let body = json_body(response).await;
    assert_eq!(body["error"]["message"], "Complete your client profile before booking");
}

#[tokio::test]
async fn test_duplicate_nanny_email_conflicts() {
    let Some(test_db) = TestDb::try_new("nanny_duplicate").await else {
        return;
    };
    let app = TestApp::new().await;
    let admin_token = create_admin_token(&app, &test_db).await;
    let (email, _) = register_and_login(&app, &test_db).await;

    let response = app
        .post_as("/api/v1/nannys", &admin_token)
        .json(&serde_json::json!({
            "first_name": "Ana",
            "last_name": "Ruiz",
            "email": email,
            "password": TEST_PASSWORD,
            "description": "Educadora infantil con amplia experiencia en estimulación temprana.",
            "experience_years": 3,
            "hourly_rate": 120.0
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 409);
}

#[tokio::test]
async fn test_overnight_services_conflict_across_midnight() {
    let Some(test_db) = TestDb::try_new("booking_overnight_conflict").await else {
        return;
    };
    let app = TestApp::new().await;
    let admin_token = create_admin_token(&app, &test_db).await;
    let nanny = create_nanny(&app, &test_db, &admin_token, 150.0).await;
    let client_token = create_client(&app, &test_db).await;

    let first = book_service_at(&app, &client_token, 45, "22:00", "02:00").await;
    assert_eq!(first["total_hours"], 4.0);
    let second = book_service_at(&app, &client_token, 45, "23:00", "01:00").await;

    let response = app
        .post_as(
            &format!("/api/v1/services/{}/accept", first["service_id"].as_str().unwrap()),
            &nanny.token,
        )
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let response = app
        .post_as(
            &format!("/api/v1/services/{}/accept", second["service_id"].as_str().unwrap()),
            &nanny.token,
        )
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 409);
}
