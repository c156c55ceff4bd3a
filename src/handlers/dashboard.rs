//! Admin dashboard handlers
//!
//! Every route here is admin-only. The reads go straight to the pool through
//! `services::dashboard`, which retries transient database failures.

use axum::extract::{Extension, Query, State};
use axum_extra::extract::WithRejection;

use super::log_handler_error;
use crate::{
    error::{Error, Result},
    middleware::auth::AuthenticatedUser,
    models::users::UserFilters,
    response::ApiResponse,
    services::dashboard,
    state::AppState,
};

/// GET /api/v1/dashboard/stats
///
/// Counts of nannys, clients, admins and services by status.
pub async fn get_stats(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
) -> Result<ApiResponse> {
    auth_user.require_admin()?;

    let stats = dashboard::stats(&state.pool)
        .await
        .inspect_err(|e| log_handler_error("dashboard_stats", e))?;

    Ok(ApiResponse::ok(serde_json::json!(stats)))
}

/// GET /api/v1/dashboard/users?user_type=&is_active=&is_verified=&page=&limit=
pub async fn list_users(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    WithRejection(Query(filters), _): WithRejection<Query<UserFilters>, Error>,
) -> Result<ApiResponse> {
    auth_user.require_admin()?;

    let page = dashboard::list_users(&state.pool, filters)
        .await
        .inspect_err(|e| log_handler_error("dashboard_users", e))?;

    Ok(ApiResponse::ok(serde_json::json!(page)))
}

/// GET /api/v1/dashboard/nannys
pub async fn list_nannys(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
) -> Result<ApiResponse> {
    auth_user.require_admin()?;

    let nannys = dashboard::list_nannys(&state.pool)
        .await
        .inspect_err(|e| log_handler_error("dashboard_nannys", e))?;

    Ok(ApiResponse::ok(serde_json::json!({
        "count": nannys.len(),
        "nannys": nannys,
    })))
}

/// GET /api/v1/dashboard/clients
pub async fn list_clients(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
) -> Result<ApiResponse> {
    auth_user.require_admin()?;

    let clients = dashboard::list_clients(&state.pool)
        .await
        .inspect_err(|e| log_handler_error("dashboard_clients", e))?;

    Ok(ApiResponse::ok(serde_json::json!({
        "count": clients.len(),
        "clients": clients,
    })))
}
