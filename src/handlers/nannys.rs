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
    models::nannys::{CreateNannyRequest, UpdateAvailabilityRequest, UpdateNannyStatusRequest},
    response::ApiResponse,
    services::nannys,
    state::AppState,
};

/// POST /api/v1/nannys
///
/// Admin-only. Creates a ready-to-work nanny account (verified and active) with
/// its professional profile and availability, then emails the credentials.
///
/// # HTTP Status Codes
/// - `201 CREATED`: Nanny created
/// - `400 BAD_REQUEST`: Validation error
/// - `403 FORBIDDEN`: Caller is not an admin
/// - `409 CONFLICT`: Email already registered
pub async fn create_nanny(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    WithRejection(Json(request), _): WithRejection<Json<CreateNannyRequest>, Error>,
) -> Result<ApiResponse> {
    auth_user.require_admin()?;
    let mut conn = acquire_db_connection(&state, "create_nanny").await?;

    let nanny = nannys::create_nanny(&mut conn, request, &state.config, state.mailer.as_ref())
        .await
        .inspect_err(|e| log_handler_error("create_nanny", e))?;

    Ok(ApiResponse::created(serde_json::json!({ "nanny": nanny })).with_message("Nanny created"))
}

/// GET /api/v1/nannys
pub async fn list_nannys(State(state): State<AppState>) -> Result<ApiResponse> {
    let mut conn = acquire_db_connection(&state, "list_nannys").await?;

    let nannys = nannys::list_nannys(&mut conn)
        .await
        .inspect_err(|e| log_handler_error("list_nannys", e))?;

    Ok(ApiResponse::ok(serde_json::json!({
        "count": nannys.len(),
        "nannys": nannys,
    })))
}

/// GET /api/v1/nannys/:id
pub async fn get_nanny(
    State(state): State<AppState>,
    WithRejection(Path(nanny_id), _): WithRejection<Path<Uuid>, Error>,
) -> Result<ApiResponse> {
    let mut conn = acquire_db_connection(&state, "get_nanny").await?;

    let nanny = nannys::get_nanny(&mut conn, nanny_id)
        .await
        .inspect_err(|e| log_handler_error("get_nanny", e))?;

    Ok(ApiResponse::ok(serde_json::json!({ "nanny": nanny })))
}

/// GET /api/v1/nannys/user/:userId
pub async fn get_nanny_by_user(
    State(state): State<AppState>,
    WithRejection(Path(user_id), _): WithRejection<Path<Uuid>, Error>,
) -> Result<ApiResponse> {
    let mut conn = acquire_db_connection(&state, "get_nanny_by_user").await?;

    let nanny = nannys::get_nanny_by_user(&mut conn, user_id)
        .await
        .inspect_err(|e| log_handler_error("get_nanny_by_user", e))?;

    Ok(ApiResponse::ok(serde_json::json!({ "nanny": nanny })))
}

/// PATCH /api/v1/nannys/:id/status
///
/// Admin-only. `status` is one of `active`, `inactive`, `suspended`.
pub async fn update_nanny_status(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    WithRejection(Path(nanny_id), _): WithRejection<Path<Uuid>, Error>,
    WithRejection(Json(request), _): WithRejection<Json<UpdateNannyStatusRequest>, Error>,
) -> Result<ApiResponse> {
    auth_user.require_admin()?;
    let mut conn = acquire_db_connection(&state, "update_nanny_status").await?;

    let nanny = nannys::update_status(&mut conn, nanny_id, request.status)
        .await
        .inspect_err(|e| log_handler_error("update_nanny_status", e))?;

    Ok(ApiResponse::ok(serde_json::json!({ "nanny": nanny })).with_message("Nanny status updated"))
}

/// PATCH /api/v1/nannys/:id/availability
///
/// The owning nanny or an admin.
pub async fn update_availability(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    WithRejection(Path(nanny_id), _): WithRejection<Path<Uuid>, Error>,
    WithRejection(Json(request), _): WithRejection<Json<UpdateAvailabilityRequest>, Error>,
) -> Result<ApiResponse> {
    let mut conn = acquire_db_connection(&state, "update_availability").await?;

    let nanny = nannys::require_nanny(&mut conn, nanny_id)
        .await
        .inspect_err(|e| log_handler_error("update_availability", e))?;
    auth_user.require_owner(nanny.user_id)?;

    let availability = nannys::update_availability(&mut conn, nanny_id, request)
        .await
        .inspect_err(|e| log_handler_error("update_availability", e))?;

    Ok(ApiResponse::ok(serde_json::json!({ "availability": availability }))
        .with_message("Availability updated"))
}
