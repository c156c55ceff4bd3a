//! Booked babysitting engagements.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, sqlx::Type,
)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ServiceStatus {
    Pending,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, sqlx::Type,
)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ServiceType {
    Hourly,
    Daily,
    Overnight,
    Event,
    Emergency,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Service {
    pub id: Uuid,
    pub client_id: Uuid,
    pub nanny_id: Option<Uuid>,
    pub title: String,
    pub service_type: ServiceType,
    pub description: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub total_hours: f64,
    pub total_amount: f64,
    pub number_of_children: i32,
    pub special_instructions: Option<String>,
    pub address: Option<String>,
    pub status: ServiceStatus,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Service joined with client and nanny display names.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ServiceWithNames {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub service: Service,
    pub client_user_id: Uuid,
    pub client_first_name: String,
    pub client_last_name: String,
    pub nanny_user_id: Option<Uuid>,
    pub nanny_first_name: Option<String>,
    pub nanny_last_name: Option<String>,
    pub has_rating: bool,
}

#[derive(Debug, Clone)]
pub struct NewService {
    pub client_id: Uuid,
    pub title: String,
    pub service_type: ServiceType,
    pub description: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub total_hours: f64,
    pub number_of_children: i32,
    pub special_instructions: Option<String>,
    pub address: Option<String>,
}

/// JSON body for `POST /services`. Times accept `HH:MM` or `HH:MM:SS`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateServiceRequest {
    pub client_id: Option<Uuid>,
    pub title: String,
    pub service_type: String,
    pub description: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub start_time: String,
    pub end_time: String,
    pub number_of_children: Option<i32>,
    pub special_instructions: Option<String>,
    pub address: Option<String>,
}

/// JSON body for `PUT /services/:id`. Only these fields are updatable.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateServiceRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub status: Option<ServiceStatus>,
    pub special_instructions: Option<String>,
}

impl UpdateServiceRequest {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.start_date.is_none()
            && self.end_date.is_none()
            && self.start_time.is_none()
            && self.end_time.is_none()
            && self.status.is_none()
            && self.special_instructions.is_none()
    }

    pub fn touches_schedule(&self) -> bool {
        self.start_date.is_some()
            || self.end_date.is_some()
            || self.start_time.is_some()
            || self.end_time.is_some()
    }
}

/// Fully-resolved update written by the query layer.
#[derive(Debug, Clone)]
pub struct ServiceChanges {
    pub title: String,
    pub description: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub total_hours: f64,
    pub status: ServiceStatus,
    pub special_instructions: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceFilters {
    pub client_id: Option<Uuid>,
    pub nanny_id: Option<Uuid>,
    pub status: Option<ServiceStatus>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AcceptServiceRequest {
    pub nanny_id: Option<Uuid>,
}

/// Confirmed service due soon, used by the reminder worker.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UpcomingService {
    pub id: Uuid,
    pub title: String,
    pub start_date: NaiveDate,
    pub start_time: NaiveTime,
    pub address: Option<String>,
    pub nanny_user_id: Uuid,
    pub nanny_email: String,
    pub nanny_first_name: String,
}
