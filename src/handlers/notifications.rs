//! In-app notifications of the authenticated user

use axum::extract::{Extension, Path, Query, State};
use axum_extra::extract::WithRejection;
use uuid::Uuid;

use super::{acquire_db_connection, log_handler_error};
use crate::{
    error::{Error, Result},
    middleware::auth::AuthenticatedUser,
    models::notifications::NotificationFilters,
    response::ApiResponse,
    services::notifications,
    state::AppState,
};

/// GET /api/v1/notifications?unread=
///
/// Newest first, with `count` and `unread_count`.
pub async fn list_notifications(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    WithRejection(Query(filters), _): WithRejection<Query<NotificationFilters>, Error>,
) -> Result<ApiResponse> {
    let mut conn = acquire_db_connection(&state, "list_notifications").await?;

    let list = notifications::list_notifications(&mut conn, auth_user.id, filters.unread.unwrap_or(false))
        .await
        .inspect_err(|e| log_handler_error("list_notifications", e))?;

    Ok(ApiResponse::ok(serde_json::json!(list)))
}

/// PUT /api/v1/notifications/:id/read
///
/// Another user's notification is reported as missing.
pub async fn mark_as_read(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    WithRejection(Path(notification_id), _): WithRejection<Path<Uuid>, Error>,
) -> Result<ApiResponse> {
    let mut conn = acquire_db_connection(&state, "mark_as_read").await?;

    let notification = notifications::mark_as_read(&mut conn, notification_id, auth_user.id)
        .await
        .inspect_err(|e| log_handler_error("mark_as_read", e))?;

    Ok(ApiResponse::ok(serde_json::json!({ "notification": notification })))
}

/// PUT /api/v1/notifications/mark-all-read
pub async fn mark_all_as_read(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
) -> Result<ApiResponse> {
    let mut conn = acquire_db_connection(&state, "mark_all_as_read").await?;

    let affected = notifications::mark_all_as_read(&mut conn, auth_user.id)
        .await
        .inspect_err(|e| log_handler_error("mark_all_as_read", e))?;

    Ok(ApiResponse::ok(serde_json::json!({ "affected": affected }))
        .with_message("All notifications marked as read"))
}

/// DELETE /api/v1/notifications/:id
pub async fn delete_notification(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    WithRejection(Path(notification_id), _): WithRejection<Path<Uuid>, Error>,
) -> Result<ApiResponse> {
    let mut conn = acquire_db_connection(&state, "delete_notification").await?;

    notifications::delete_notification(&mut conn, notification_id, auth_user.id)
        .await
        .inspect_err(|e| log_handler_error("delete_notification", e))?;

    Ok(ApiResponse::message("Notification deleted"))
}
