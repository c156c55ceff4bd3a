//! Payment handlers. Listing, stats and status changes are admin-only.

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::extract::WithRejection;
use uuid::Uuid;

use super::{acquire_db_connection, log_handler_error};
use crate::{
    error::{Error, Result},
    middleware::auth::AuthenticatedUser,
    models::payments::{CreatePaymentRequest, PaymentFilters, UpdatePaymentStatusRequest},
    response::ApiResponse,
    services::payments,
    state::AppState,
};

/// GET /api/v1/payments?status=
pub async fn list_payments(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    WithRejection(Query(filters), _): WithRejection<Query<PaymentFilters>, Error>,
) -> Result<ApiResponse> {
    auth_user.require_admin()?;
    let mut conn = acquire_db_connection(&state, "list_payments").await?;

    let payments = payments::list_payments(&mut conn, filters.status)
        .await
        .inspect_err(|e| log_handler_error("list_payments", e))?;

    Ok(ApiResponse::ok(serde_json::json!({
        "count": payments.len(),
        "payments": payments,
    })))
}

/// GET /api/v1/payments/stats
///
/// Revenue and fees only count completed payments.
pub async fn payment_stats(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
) -> Result<ApiResponse> {
    auth_user.require_admin()?;
    let mut conn = acquire_db_connection(&state, "payment_stats").await?;

    let stats = payments::stats(&mut conn)
        .await
        .inspect_err(|e| log_handler_error("payment_stats", e))?;

    Ok(ApiResponse::ok(serde_json::json!(stats)))
}

/// GET /api/v1/payments/:id
///
/// Admins, or the client and nanny the payment belongs to.
pub async fn get_payment(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    WithRejection(Path(payment_id), _): WithRejection<Path<Uuid>, Error>,
) -> Result<ApiResponse> {
    let mut conn = acquire_db_connection(&state, "get_payment").await?;

    let payment = payments::get_payment(&mut conn, &auth_user, payment_id)
        .await
        .inspect_err(|e| log_handler_error("get_payment", e))?;

    Ok(ApiResponse::ok(serde_json::json!({ "payment": payment })))
}

/// POST /api/v1/payments
///
/// # Request Body
/// - `service_id`: service being paid; it must have an assigned nanny
/// - `amount`: greater than zero
/// - `platform_fee`: optional, between zero and `amount`
/// - `receipt_url`: optional
///
/// # HTTP Status Codes
/// - `201 CREATED`: Payment registered as pending
/// - `400 BAD_REQUEST`: Validation error or service without nanny
/// - `403 FORBIDDEN`: Not the owning client
/// - `404 NOT_FOUND`: Service not found
pub async fn create_payment(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    WithRejection(Json(request), _): WithRejection<Json<CreatePaymentRequest>, Error>,
) -> Result<ApiResponse> {
    let mut conn = acquire_db_connection(&state, "create_payment").await?;

    let payment = payments::create_payment(&mut conn, &auth_user, request)
        .await
        .inspect_err(|e| log_handler_error("create_payment", e))?;

    Ok(ApiResponse::created(serde_json::json!({ "id": payment.id })).with_message("Payment registered"))
}

/// PATCH /api/v1/payments/:id/status
pub async fn update_payment_status(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    WithRejection(Path(payment_id), _): WithRejection<Path<Uuid>, Error>,
    WithRejection(Json(request), _): WithRejection<Json<UpdatePaymentStatusRequest>, Error>,
) -> Result<ApiResponse> {
    auth_user.require_admin()?;
    let mut conn = acquire_db_connection(&state, "update_payment_status").await?;

    let payment = payments::update_status(&mut conn, payment_id, request)
        .await
        .inspect_err(|e| log_handler_error("update_payment_status", e))?;

    Ok(ApiResponse::ok(serde_json::json!({ "payment": payment })).with_message("Payment status updated"))
}
