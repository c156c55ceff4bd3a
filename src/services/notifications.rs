use serde::Serialize;
use uuid::Uuid;

use crate::DbConn;
use crate::error::{Error, Result};
use crate::models::notifications::{NewNotification, Notification};
use crate::queries::notifications;

/// Caller's notifications with counters.
#[derive(Debug, Clone, Serialize)]
pub struct NotificationList {
    pub notifications: Vec<Notification>,
    pub count: usize,
    pub unread_count: i64,
}

/// Stores a notification for a user. Used by every module that informs users of events.
pub async fn notify(conn: &mut DbConn, notification: NewNotification) -> Result<Notification> {
    let created = notifications::create_notification(conn, notification).await?;
    tracing::debug!(
        notification_id = %created.id,
        user_id = %created.user_id,
        notification_type = %created.notification_type,
        "Notification created"
    );
    Ok(created)
}

/// Like [`notify`] but only logs failures, for side effects that must not
/// fail the surrounding request.
pub async fn notify_best_effort(conn: &mut DbConn, notification: NewNotification) {
    let user_id = notification.user_id;
    if let Err(e) = notify(conn, notification).await {
        tracing::warn!(user_id = %user_id, error = %e, "Failed to create notification");
    }
}

pub async fn list_notifications(conn: &mut DbConn, user_id: Uuid, unread_only: bool) -> Result<NotificationList> {
    let items = notifications::list_for_user(&mut *conn, user_id, unread_only).await?;
    let unread_count = notifications::count_unread(&mut *conn, user_id).await?;

    Ok(NotificationList {
        count: items.len(),
        notifications: items,
        unread_count,
    })
}

/// Marks one of the caller's notifications as read. Someone else's is reported as missing.
pub async fn mark_as_read(conn: &mut DbConn, id: Uuid, user_id: Uuid) -> Result<Notification> {
    notifications::mark_read(conn, id, user_id)
        .await?
        .ok_or_else(|| Error::NotFound("Notification not found".to_string()))
}

pub async fn mark_all_as_read(conn: &mut DbConn, user_id: Uuid) -> Result<u64> {
    let affected = notifications::mark_all_read(conn, user_id).await?;
    tracing::debug!(user_id = %user_id, affected, "Notifications marked as read");
    Ok(affected)
}

pub async fn delete_notification(conn: &mut DbConn, id: Uuid, user_id: Uuid) -> Result<()> {
    if !notifications::delete_notification(conn, id, user_id).await? {
        return Err(Error::NotFound("Notification not found".to_string()));
    }
    Ok(())
}
