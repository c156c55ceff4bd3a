//! User lookup handlers. All routes require authentication.

use axum::extract::{Path, Query, State};
use axum_extra::extract::WithRejection;
use serde::Deserialize;
use uuid::Uuid;

use super::{acquire_db_connection, log_handler_error};
use crate::{
    error::{Error, Result},
    response::ApiResponse,
    services::users,
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

/// GET /api/v1/users/:id
pub async fn get_user(
    State(state): State<AppState>,
    WithRejection(Path(user_id), _): WithRejection<Path<Uuid>, Error>,
) -> Result<ApiResponse> {
    let mut conn = acquire_db_connection(&state, "get_user").await?;

    let user = users::get_user(&mut conn, user_id)
        .await
        .inspect_err(|e| log_handler_error("get_user", e))?;

    Ok(ApiResponse::ok(serde_json::json!({ "user": user })))
}

/// GET /api/v1/users/:id/phone
///
/// Lets a nanny call the client of a confirmed service and vice versa.
pub async fn get_user_phone(
    State(state): State<AppState>,
    WithRejection(Path(user_id), _): WithRejection<Path<Uuid>, Error>,
) -> Result<ApiResponse> {
    let mut conn = acquire_db_connection(&state, "get_user_phone").await?;

    let user = users::get_user(&mut conn, user_id)
        .await
        .inspect_err(|e| log_handler_error("get_user_phone", e))?;

    Ok(ApiResponse::ok(serde_json::json!({
        "id": user.id,
        "phone_number": user.phone_number,
    })))
}

/// GET /api/v1/users/email/:email
pub async fn get_user_by_email(
    State(state): State<AppState>,
    WithRejection(Path(email), _): WithRejection<Path<String>, Error>,
) -> Result<ApiResponse> {
    let mut conn = acquire_db_connection(&state, "get_user_by_email").await?;

    let user = users::get_user_by_email(&mut conn, &email)
        .await
        .inspect_err(|e| log_handler_error("get_user_by_email", e))?;

    Ok(ApiResponse::ok(serde_json::json!({ "user": user })))
}

/// GET /api/v1/users/search?q=
///
/// # HTTP Status Codes
/// - `200 OK`: Up to 10 matches
/// - `400 BAD_REQUEST`: Search term shorter than 2 characters
pub async fn search_users(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<SearchQuery>, Error>,
) -> Result<ApiResponse> {
    let mut conn = acquire_db_connection(&state, "search_users").await?;

    let users = users::search_users(&mut conn, query.q.as_deref())
        .await
        .inspect_err(|e| log_handler_error("search_users", e))?;

    Ok(ApiResponse::ok(serde_json::json!({
        "count": users.len(),
        "users": users,
    })))
}
