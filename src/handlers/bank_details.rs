//! Receiving bank accounts shown to clients at checkout.
//! Reads need any authenticated user, writes need an admin.

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use axum_extra::extract::WithRejection;
use uuid::Uuid;

use super::{acquire_db_connection, log_handler_error};
use crate::{
    error::{Error, Result},
    middleware::auth::AuthenticatedUser,
    models::bank_details::BankDetailRequest,
    response::ApiResponse,
    services::bank_details,
    state::AppState,
};

/// GET /api/v1/bank-details
pub async fn list_bank_details(State(state): State<AppState>) -> Result<ApiResponse> {
    let mut conn = acquire_db_connection(&state, "list_bank_details").await?;

    let details = bank_details::list(&mut conn)
        .await
        .inspect_err(|e| log_handler_error("list_bank_details", e))?;

    Ok(ApiResponse::ok(serde_json::json!(details)))
}

/// GET /api/v1/bank-details/:id
pub async fn get_bank_detail(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, Error>,
) -> Result<ApiResponse> {
    let mut conn = acquire_db_connection(&state, "get_bank_detail").await?;

    let detail = bank_details::get(&mut conn, id)
        .await
        .inspect_err(|e| log_handler_error("get_bank_detail", e))?;

    Ok(ApiResponse::ok(serde_json::json!(detail)))
}

/// POST /api/v1/bank-details
///
/// # Request Body (camelCase)
/// - `accountHolderName`, `bankName`, `accountNumber`: required
/// - `clabe`: optional, 18 digits
/// - `accountType`: `checking` (default) or `savings`
/// - `isPrimary`: demotes the current primary account
pub async fn create_bank_detail(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    WithRejection(Json(request), _): WithRejection<Json<BankDetailRequest>, Error>,
) -> Result<ApiResponse> {
    auth_user.require_admin()?;
    let mut conn = acquire_db_connection(&state, "create_bank_detail").await?;

    let detail = bank_details::create(&mut conn, request)
        .await
        .inspect_err(|e| log_handler_error("create_bank_detail", e))?;

    Ok(ApiResponse::created(serde_json::json!(detail))
        .with_message("Bank detail created"))
}

/// PUT /api/v1/bank-details/:id
pub async fn update_bank_detail(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, Error>,
    WithRejection(Json(request), _): WithRejection<Json<BankDetailRequest>, Error>,
) -> Result<ApiResponse> {
    auth_user.require_admin()?;
    let mut conn = acquire_db_connection(&state, "update_bank_detail").await?;

    let detail = bank_details::update(&mut conn, id, request)
        .await
        .inspect_err(|e| log_handler_error("update_bank_detail", e))?;

    Ok(ApiResponse::ok(serde_json::json!(detail))
        .with_message("Bank detail updated"))
}

/// DELETE /api/v1/bank-details/:id
pub async fn delete_bank_detail(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, Error>,
) -> Result<ApiResponse> {
    auth_user.require_admin()?;
    let mut conn = acquire_db_connection(&state, "delete_bank_detail").await?;

    bank_details::delete(&mut conn, id)
        .await
        .inspect_err(|e| log_handler_error("delete_bank_detail", e))?;

    Ok(ApiResponse::message("Bank detail deleted"))
}

/// PATCH /api/v1/bank-details/:id/toggle-status
pub async fn toggle_bank_detail_status(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, Error>,
) -> Result<ApiResponse> {
    auth_user.require_admin()?;
    let mut conn = acquire_db_connection(&state, "toggle_bank_detail_status").await?;

    let detail = bank_details::toggle_status(&mut conn, id)
        .await
        .inspect_err(|e| log_handler_error("toggle_bank_detail_status", e))?;

    Ok(ApiResponse::ok(serde_json::json!(detail)))
}
