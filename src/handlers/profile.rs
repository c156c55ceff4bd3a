//! Profile completion and self-service profile handlers

use axum::{
    extract::{Extension, Multipart, Query, State},
    Json,
};
use axum_extra::extract::WithRejection;
use serde::Deserialize;
use uuid::Uuid;

use super::{acquire_db_connection, log_handler_error, MultipartForm};
use crate::{
    error::{Error, Result},
    middleware::auth::AuthenticatedUser,
    models::{
        clients::CompleteClientProfile,
        nannys::CompleteNannyProfile,
        users::{ChangePasswordRequest, UserType},
    },
    response::ApiResponse,
    services::{
        profile::{self, ProfileUpdateForm},
        users,
    },
    state::AppState,
};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileDataQuery {
    pub user_id: Option<Uuid>,
}

/// GET /api/v1/profile/status
///
/// Tells the frontend whether to send the user through profile completion.
pub async fn profile_status(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
) -> Result<ApiResponse> {
    let mut conn = acquire_db_connection(&state, "profile_status").await?;

    let status = profile::profile_status(&mut conn, auth_user.id)
        .await
        .inspect_err(|e| log_handler_error("profile_status", e))?;

    Ok(ApiResponse::ok(serde_json::json!(status)))
}

/// POST /api/v1/profile/complete-client
///
/// # HTTP Status Codes
/// - `201 CREATED`: Client profile created, verification pending
/// - `400 BAD_REQUEST`: Validation error or profile already completed
/// - `403 FORBIDDEN`: Caller is not a client
pub async fn complete_client_profile(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    WithRejection(Json(request), _): WithRejection<Json<CompleteClientProfile>, Error>,
) -> Result<ApiResponse> {
    auth_user.require_user_type(UserType::Client)?;
    let mut conn = acquire_db_connection(&state, "complete_client_profile").await?;

    let client = profile::complete_client_profile(&mut conn, auth_user.id, request)
        .await
        .inspect_err(|e| log_handler_error("complete_client_profile", e))?;

    Ok(ApiResponse::created(serde_json::json!({ "client": client })).with_message("Profile completed"))
}

/// POST /api/v1/profile/complete-nanny
///
/// # Request Body
/// - `description`: 50-2000 characters
/// - `experience_years`: 0-50
/// - `hourly_rate`: 0-9999.99
pub async fn complete_nanny_profile(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    WithRejection(Json(request), _): WithRejection<Json<CompleteNannyProfile>, Error>,
) -> Result<ApiResponse> {
    auth_user.require_user_type(UserType::Nanny)?;
    let mut conn = acquire_db_connection(&state, "complete_nanny_profile").await?;

    let nanny = profile::complete_nanny_profile(&mut conn, auth_user.id, request)
        .await
        .inspect_err(|e| log_handler_error("complete_nanny_profile", e))?;

    Ok(ApiResponse::created(serde_json::json!({ "nanny": nanny })).with_message("Profile completed"))
}

/// GET /api/v1/profile/data?userId=
///
/// Another user's data is admin-only.
pub async fn profile_data(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    WithRejection(Query(query), _): WithRejection<Query<ProfileDataQuery>, Error>,
) -> Result<ApiResponse> {
    let user_id = query.user_id.unwrap_or(auth_user.id);
    auth_user.require_owner(user_id)?;

    let mut conn = acquire_db_connection(&state, "profile_data").await?;
    let data = profile::profile_data(&mut conn, user_id)
        .await
        .inspect_err(|e| log_handler_error("profile_data", e))?;

    Ok(ApiResponse::ok(serde_json::json!(data)))
}

/// PUT /api/v1/profile/update
///
/// `multipart/form-data` with optional `first_name`, `last_name`,
/// `phone_number`, `address` and an optional `profile_image` file.
///
/// # HTTP Status Codes
/// - `200 OK`: Returns the updated user
/// - `400 BAD_REQUEST`: Validation error or nothing to update
/// - `413 PAYLOAD_TOO_LARGE`: Image too large
/// - `502 BAD_GATEWAY`: Storage upload failed
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    WithRejection(multipart, _): WithRejection<Multipart, Error>,
) -> Result<ApiResponse> {
    let mut form = MultipartForm::read(multipart).await?;
    let update = ProfileUpdateForm {
        first_name: form.text("first_name"),
        last_name: form.text("last_name"),
        phone_number: form.text("phone_number"),
        address: form.text("address"),
        profile_image: form.file("profile_image"),
    };

    let mut conn = acquire_db_connection(&state, "update_profile").await?;
    let user = profile::update_profile(&mut conn, auth_user.id, update, state.storage.as_ref())
        .await
        .inspect_err(|e| log_handler_error("update_profile", e))?;

    Ok(ApiResponse::ok(serde_json::json!({ "user": user })).with_message("Profile updated"))
}

/// PUT /api/v1/profile/change-password
///
/// # HTTP Status Codes
/// - `200 OK`: Password changed
/// - `400 BAD_REQUEST`: New password shorter than 6 characters
/// - `401 UNAUTHORIZED`: Current password is wrong
pub async fn change_password(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    WithRejection(Json(request), _): WithRejection<Json<ChangePasswordRequest>, Error>,
) -> Result<ApiResponse> {
    let mut conn = acquire_db_connection(&state, "change_password").await?;

    users::change_password(&mut conn, auth_user.id, request)
        .await
        .inspect_err(|e| log_handler_error("change_password", e))?;

    Ok(ApiResponse::message("Password changed"))
}
