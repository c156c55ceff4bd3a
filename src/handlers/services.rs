//! Service booking handlers
//!
//! A service moves `pending -> confirmed -> in_progress -> completed`, or to
//! `cancelled` from any state but completed. Ownership and visibility rules are
//! enforced in `services::bookings`; handlers only extract and respond.

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
    models::{
        services::{AcceptServiceRequest, AvailabilityQuery, CreateServiceRequest, ServiceFilters, UpdateServiceRequest},
        users::UserType,
    },
    response::ApiResponse,
    services::bookings,
    state::AppState,
};

// ============================================================================
// LIST / GET
// ============================================================================

/// GET /api/v1/services?clientId=&nannyId=&status=&limit=
///
/// Newest first. Non-admins only ever see their own services; nannys also see
/// pending services nobody has taken yet.
pub async fn list_services(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    WithRejection(Query(filters), _): WithRejection<Query<ServiceFilters>, Error>,
) -> Result<ApiResponse> {
    let mut conn = acquire_db_connection(&state, "list_services").await?;

    let services = bookings::list_services(&mut conn, &auth_user, filters)
        .await
        .inspect_err(|e| log_handler_error("list_services", e))?;

    Ok(ApiResponse::ok(serde_json::json!({
        "count": services.len(),
        "services": services,
    })))
}

/// GET /api/v1/services/:id
pub async fn get_service(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    WithRejection(Path(service_id), _): WithRejection<Path<Uuid>, Error>,
) -> Result<ApiResponse> {
    let mut conn = acquire_db_connection(&state, "get_service").await?;

    let service = bookings::get_service(&mut conn, &auth_user, service_id)
        .await
        .inspect_err(|e| log_handler_error("get_service", e))?;

    Ok(ApiResponse::ok(serde_json::json!({ "service": service })))
}

/// GET /api/v1/services/availability?startDate=&endDate=&startTime=&endTime=
///
/// Nannys that are active, available and free for the whole requested window,
/// best rated first.
pub async fn find_available_nannys(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<AvailabilityQuery>, Error>,
) -> Result<ApiResponse> {
    let mut conn = acquire_db_connection(&state, "find_available_nannys").await?;

    let nannys = bookings::find_available_nannys(&mut conn, query)
        .await
        .inspect_err(|e| log_handler_error("find_available_nannys", e))?;

    Ok(ApiResponse::ok(serde_json::json!({
        "count": nannys.len(),
        "nannys": nannys,
    })))
}

// ============================================================================
// CREATE / UPDATE / CANCEL
// ============================================================================

/// POST /api/v1/services
///
/// Books a pending service. Clients book for themselves; admins must pass
/// `client_id`. Every available nanny is notified.
///
/// # Returns
/// - `service_id`, `status` (`pending`) and the computed `total_hours`
///
/// # HTTP Status Codes
/// - `201 CREATED`: Service booked
/// - `400 BAD_REQUEST`: Validation error
/// - `403 FORBIDDEN`: Caller is a nanny
pub async fn create_service(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    WithRejection(Json(request), _): WithRejection<Json<CreateServiceRequest>, Error>,
) -> Result<ApiResponse> {
    auth_user.require_role(&[UserType::Client])?;
    let mut conn = acquire_db_connection(&state, "create_service").await?;

    let service = bookings::create_service(&mut conn, &auth_user, request, &state.config, state.mailer.as_ref())
        .await
        .inspect_err(|e| log_handler_error("create_service", e))?;

    Ok(ApiResponse::created(serde_json::json!({
        "service_id": service.id,
        "status": service.status,
        "total_hours": service.total_hours,
    }))
    .with_message("Service created"))
}

/// PUT /api/v1/services/:id
///
/// Owner client or admin. Unknown fields are ignored; schedule changes
/// recompute `total_hours`.
pub async fn update_service(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    WithRejection(Path(service_id), _): WithRejection<Path<Uuid>, Error>,
    WithRejection(Json(request), _): WithRejection<Json<UpdateServiceRequest>, Error>,
) -> Result<ApiResponse> {
    let mut conn = acquire_db_connection(&state, "update_service").await?;

    let service = bookings::update_service(&mut conn, &auth_user, service_id, request)
        .await
        .inspect_err(|e| log_handler_error("update_service", e))?;

    Ok(ApiResponse::ok(serde_json::json!({ "service": service })).with_message("Service updated"))
}

/// DELETE /api/v1/services/:id
///
/// Soft cancel. The row stays with status `cancelled`.
///
/// # HTTP Status Codes
/// - `200 OK`: Service cancelled
/// - `400 BAD_REQUEST`: Already cancelled
/// - `403 FORBIDDEN`: Not the owner
/// - `404 NOT_FOUND`: Service not found
pub async fn cancel_service(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    WithRejection(Path(service_id), _): WithRejection<Path<Uuid>, Error>,
) -> Result<ApiResponse> {
    let mut conn = acquire_db_connection(&state, "cancel_service").await?;

    bookings::cancel_service(&mut conn, &auth_user, service_id)
        .await
        .inspect_err(|e| log_handler_error("cancel_service", e))?;

    Ok(ApiResponse::message("Service cancelled"))
}

// ============================================================================
// NANNY WORKFLOW
// ============================================================================

/// POST /api/v1/services/:id/accept
///
/// A nanny accepts as themselves; an admin assigns `nanny_id`.
///
/// # HTTP Status Codes
/// - `200 OK`: Service confirmed and priced
/// - `404 NOT_FOUND`: Service or nanny not found
/// - `409 CONFLICT`: No longer pending, or the nanny has an overlapping service
pub async fn accept_service(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    WithRejection(Path(service_id), _): WithRejection<Path<Uuid>, Error>,
    request: Option<Json<AcceptServiceRequest>>,
) -> Result<ApiResponse> {
    auth_user.require_role(&[UserType::Nanny])?;
    let request = request.map(|Json(r)| r).unwrap_or_default();

    let mut conn = acquire_db_connection(&state, "accept_service").await?;
    let service = bookings::accept_service(&mut conn, &auth_user, service_id, request)
        .await
        .inspect_err(|e| log_handler_error("accept_service", e))?;

    Ok(ApiResponse::ok(serde_json::json!({ "service": service })).with_message("Service accepted"))
}

/// POST /api/v1/services/:id/complete
///
/// Assigned nanny or admin. Completing twice is not an error: the second call
/// answers `already_completed: true`.
pub async fn complete_service(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    WithRejection(Path(service_id), _): WithRejection<Path<Uuid>, Error>,
) -> Result<ApiResponse> {
    let mut conn = acquire_db_connection(&state, "complete_service").await?;

    let outcome = bookings::complete_service(&mut conn, &auth_user, service_id)
        .await
        .inspect_err(|e| log_handler_error("complete_service", e))?;

    let message = if outcome.already_completed {
        "Service was already completed"
    } else {
        "Service completed"
    };
    Ok(ApiResponse::ok(serde_json::json!({
        "service": outcome.service,
        "already_completed": outcome.already_completed,
    }))
    .with_message(message))
}
