use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, sqlx::Type,
)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NotificationType {
    Info,
    Success,
    Warning,
    Error,
    Service,
    ServiceReminder,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub message: String,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub is_read: bool,
    pub action_url: Option<String>,
    pub related_id: Option<Uuid>,
    pub related_type: Option<String>,
    pub created_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: Uuid,
    pub title: String,
    pub message: String,
    pub notification_type: NotificationType,
    pub action_url: Option<String>,
    pub related_id: Option<Uuid>,
    pub related_type: Option<String>,
}

impl NewNotification {
    pub fn new(
        user_id: Uuid,
        notification_type: NotificationType,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            title: title.into(),
            message: message.into(),
            notification_type,
            action_url: None,
            related_id: None,
            related_type: None,
        }
    }

    /// Links the notification to a domain row, e.g. `("service", service_id)`.
    pub fn related_to(mut self, related_type: &str, related_id: Uuid) -> Self {
        self.related_type = Some(related_type.to_string());
        self.related_id = Some(related_id);
        self
    }

    pub fn with_action(mut self, action_url: impl Into<String>) -> Self {
        self.action_url = Some(action_url.into());
        self
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotificationFilters {
    pub unread: Option<bool>,
}
