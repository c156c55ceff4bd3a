//! Client account handlers
//!
//! Thin layer over `services::clients`: role checks happen here, everything
//! else (validation, uploads, notifications) is in the service.

use axum::{
    extract::{Extension, Multipart, Path, Query, State},
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
        clients::{UpdateClientProfile, VerifyClientRequest},
        services::ServiceStatus,
        users::UserType,
    },
    response::ApiResponse,
    services::clients::{self, ClientDataForm},
    state::AppState,
};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientInfoQuery {
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ClientServicesQuery {
    pub status: Option<ServiceStatus>,
    pub limit: Option<i64>,
}

// ============================================================================
// CLIENT DATA
// ============================================================================

/// GET /api/v1/client/data
///
/// Returns the caller's client row joined with user fields, or `null` when the
/// client profile has not been created yet.
pub async fn get_client_data(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
) -> Result<ApiResponse> {
    auth_user.require_user_type(UserType::Client)?;
    let mut conn = acquire_db_connection(&state, "get_client_data").await?;

    let client = clients::get_client_data(&mut conn, auth_user.id)
        .await
        .inspect_err(|e| log_handler_error("get_client_data", e))?;

    Ok(ApiResponse::ok(serde_json::json!({ "client": client })))
}

/// POST /api/v1/client/data
///
/// Creates or updates the caller's client data from a `multipart/form-data` body.
///
/// # Form Fields
/// - `emergency_contact_name`, `emergency_contact_phone`
/// - `number_of_children`: 0-20
/// - `special_requirements`: up to 500 characters
/// - `identification_document`: optional JPEG/PNG/GIF/PDF file, up to 10 MB
///
/// # HTTP Status Codes
/// - `201 CREATED`: Client data created
/// - `200 OK`: Client data updated
/// - `400 BAD_REQUEST`: Validation error
/// - `413 PAYLOAD_TOO_LARGE`: Document too large
/// - `502 BAD_GATEWAY`: Storage upload failed
pub async fn save_client_data(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    WithRejection(multipart, _): WithRejection<Multipart, Error>,
) -> Result<ApiResponse> {
    auth_user.require_user_type(UserType::Client)?;

    let mut form = MultipartForm::read(multipart).await?;
    let client_form = ClientDataForm {
        emergency_contact_name: form.text("emergency_contact_name"),
        emergency_contact_phone: form.text("emergency_contact_phone"),
        number_of_children: form.text("number_of_children"),
        special_requirements: form.text("special_requirements"),
        identification_document: form.file("identification_document"),
    };

    let mut conn = acquire_db_connection(&state, "save_client_data").await?;
    let outcome = clients::upsert_client_data(&mut conn, auth_user.id, client_form, state.storage.as_ref())
        .await
        .inspect_err(|e| log_handler_error("save_client_data", e))?;

    let body = serde_json::json!({ "client": outcome.client });
    Ok(if outcome.created {
        ApiResponse::created(body).with_message("Client data saved")
    } else {
        ApiResponse::ok(body).with_message("Client data updated")
    })
}

// ============================================================================
// ADMIN
// ============================================================================

/// GET /api/v1/client/all
pub async fn list_clients(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
) -> Result<ApiResponse> {
    auth_user.require_admin()?;
    let mut conn = acquire_db_connection(&state, "list_clients").await?;

    let clients = clients::list_clients(&mut conn)
        .await
        .inspect_err(|e| log_handler_error("list_clients", e))?;

    Ok(ApiResponse::ok(serde_json::json!({
        "count": clients.len(),
        "clients": clients,
    })))
}

/// PUT /api/v1/client/:clientId/verify
///
/// Approves or rejects the client's identification. The client gets an
/// in-app notification and an email either way.
///
/// # Request Body
/// - `status`: `verified` or `rejected`
/// - `reason`: optional, shown to the client on rejection
pub async fn verify_client(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    WithRejection(Path(client_id), _): WithRejection<Path<Uuid>, Error>,
    WithRejection(Json(request), _): WithRejection<Json<VerifyClientRequest>, Error>,
) -> Result<ApiResponse> {
    auth_user.require_admin()?;
    let mut conn = acquire_db_connection(&state, "verify_client").await?;

    let client = clients::verify_client(&mut conn, client_id, request, state.mailer.as_ref())
        .await
        .inspect_err(|e| log_handler_error("verify_client", e))?;

    tracing::info!(
        operation = "verify_client",
        client_id = %client_id,
        admin_id = %auth_user.id,
        status = %client.verification_status,
        "Client verification updated",
    );

    Ok(ApiResponse::ok(serde_json::json!({ "client": client })).with_message("Verification updated"))
}

// ============================================================================
// CALLER'S OWN ACCOUNT
// ============================================================================

/// PUT /api/v1/client/profile
pub async fn update_client_profile(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    WithRejection(Json(request), _): WithRejection<Json<UpdateClientProfile>, Error>,
) -> Result<ApiResponse> {
    auth_user.require_user_type(UserType::Client)?;
    let mut conn = acquire_db_connection(&state, "update_client_profile").await?;

    let client = clients::update_client_profile(&mut conn, auth_user.id, request)
        .await
        .inspect_err(|e| log_handler_error("update_client_profile", e))?;

    Ok(ApiResponse::ok(serde_json::json!({ "client": client })).with_message("Profile updated"))
}

/// GET /api/v1/client/info?userId=
///
/// `userId` defaults to the caller. Only admins may look at another client.
pub async fn get_client_info(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    WithRejection(Query(query), _): WithRejection<Query<ClientInfoQuery>, Error>,
) -> Result<ApiResponse> {
    let user_id = query.user_id.unwrap_or(auth_user.id);
    auth_user.require_owner(user_id)?;

    let mut conn = acquire_db_connection(&state, "get_client_info").await?;
    let client = clients::get_client_info(&mut conn, user_id)
        .await
        .inspect_err(|e| log_handler_error("get_client_info", e))?;

    Ok(ApiResponse::ok(serde_json::json!({ "client": client })))
}

/// GET /api/v1/client/services?status=&limit=
pub async fn list_my_services(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    WithRejection(Query(query), _): WithRejection<Query<ClientServicesQuery>, Error>,
) -> Result<ApiResponse> {
    auth_user.require_user_type(UserType::Client)?;
    let mut conn = acquire_db_connection(&state, "list_my_services").await?;

    let services = clients::list_my_services(&mut conn, auth_user.id, query.status, query.limit)
        .await
        .inspect_err(|e| log_handler_error("list_my_services", e))?;

    Ok(ApiResponse::ok(serde_json::json!({
        "count": services.len(),
        "services": services,
    })))
}

/// GET /api/v1/client/payments
pub async fn list_my_payments(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
) -> Result<ApiResponse> {
    auth_user.require_user_type(UserType::Client)?;
    let mut conn = acquire_db_connection(&state, "list_my_payments").await?;

    let payments = clients::list_my_payments(&mut conn, auth_user.id)
        .await
        .inspect_err(|e| log_handler_error("list_my_payments", e))?;

    Ok(ApiResponse::ok(serde_json::json!({
        "count": payments.len(),
        "payments": payments,
    })))
}

/// GET /api/v1/client/stats
pub async fn get_my_stats(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
) -> Result<ApiResponse> {
    auth_user.require_user_type(UserType::Client)?;
    let mut conn = acquire_db_connection(&state, "get_my_stats").await?;

    let stats = clients::my_stats(&mut conn, auth_user.id)
        .await
        .inspect_err(|e| log_handler_error("get_my_stats", e))?;

    Ok(ApiResponse::ok(serde_json::json!({ "stats": stats })))
}
