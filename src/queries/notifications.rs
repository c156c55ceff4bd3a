use crate::{
    error::{Error, Result},
    models::notifications::{NewNotification, Notification},
};
use uuid::Uuid;

use crate::DbConn;

const NOTIFICATION_COLUMNS: &str = "id, user_id, title, message, type, is_read, action_url, \
     related_id, related_type, created_at, read_at";

pub async fn create_notification(conn: &mut DbConn, new: NewNotification) -> Result<Notification> {
    sqlx::query_as::<_, Notification>(&format!(
        r#"
        INSERT INTO notifications (user_id, title, message, type, action_url, related_id, related_type)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING {NOTIFICATION_COLUMNS}
        "#
    ))
    .bind(new.user_id)
    .bind(new.title)
    .bind(new.message)
    .bind(new.notification_type)
    .bind(new.action_url)
    .bind(new.related_id)
    .bind(new.related_type)
    .fetch_one(conn)
    .await
    .map_err(Error::Sqlx)
}

pub async fn list_for_user(conn: &mut DbConn, user_id: Uuid, unread_only: bool) -> Result<Vec<Notification>> {
    sqlx::query_as::<_, Notification>(&format!(
        r#"
        SELECT {NOTIFICATION_COLUMNS}
        FROM notifications
        WHERE user_id = $1 AND (NOT $2 OR is_read = FALSE)
        ORDER BY created_at DESC
        "#
    ))
    .bind(user_id)
    .bind(unread_only)
    .fetch_all(conn)
    .await
    .map_err(Error::Sqlx)
}

pub async fn count_unread(conn: &mut DbConn, user_id: Uuid) -> Result<i64> {
    sqlx::query_scalar("SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND is_read = FALSE")
        .bind(user_id)
        .fetch_one(conn)
        .await
        .map_err(Error::Sqlx)
}

/// Marks one of the user's notifications read. `None` when it is missing or
/// belongs to someone else.
pub async fn mark_read(conn: &mut DbConn, id: Uuid, user_id: Uuid) -> Result<Option<Notification>> {
    sqlx::query_as::<_, Notification>(&format!(
        r#"
        UPDATE notifications
        SET is_read = TRUE, read_at = COALESCE(read_at, now())
        WHERE id = $1 AND user_id = $2
        RETURNING {NOTIFICATION_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(user_id)
    .fetch_optional(conn)
    .await
    .map_err(Error::Sqlx)
}

pub async fn mark_all_read(conn: &mut DbConn, user_id: Uuid) -> Result<u64> {
    let rows_affected = sqlx::query(
        "UPDATE notifications SET is_read = TRUE, read_at = now() WHERE user_id = $1 AND is_read = FALSE",
    )
    .bind(user_id)
    .execute(conn)
    .await
    .map_err(Error::Sqlx)?
    .rows_affected();

    Ok(rows_affected)
}

pub async fn delete_notification(conn: &mut DbConn, id: Uuid, user_id: Uuid) -> Result<bool> {
    let rows_affected = sqlx::query("DELETE FROM notifications WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(conn)
        .await
        .map_err(Error::Sqlx)?
        .rows_affected();

    Ok(rows_affected > 0)
}

/// Whether a reminder with this title was already sent to the user for the service.
pub async fn reminder_exists(
    conn: &mut DbConn,
    user_id: Uuid,
    service_id: Uuid,
    title: &str,
) -> Result<bool> {
    let exists: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM notifications
            WHERE user_id = $1 AND related_id = $2 AND type = 'service_reminder' AND title = $3
        )
        "#,
    )
    .bind(user_id)
    .bind(service_id)
    .bind(title)
    .fetch_one(conn)
    .await
    .map_err(Error::Sqlx)?;

    Ok(exists)
}
