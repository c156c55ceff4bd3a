use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, sqlx::Type,
)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum NannyStatus {
    Active,
    Inactive,
    Suspended,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Nanny {
    pub id: Uuid,
    pub user_id: Uuid,
    pub description: Option<String>,
    pub experience_years: i32,
    pub hourly_rate: f64,
    pub rating_average: f64,
    pub total_ratings: i32,
    pub services_completed: i32,
    pub status: NannyStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct NannyAvailability {
    pub nanny_id: Uuid,
    pub is_available: bool,
    pub reason: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Nanny joined with user contact fields and availability.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct NannyWithUser {
    pub id: Uuid,
    pub user_id: Uuid,
    pub description: Option<String>,
    pub experience_years: i32,
    pub hourly_rate: f64,
    pub rating_average: f64,
    pub total_ratings: i32,
    pub services_completed: i32,
    pub status: NannyStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub profile_image: Option<String>,
    pub is_verified: bool,
    pub is_active: bool,
    pub is_available: bool,
}

#[derive(Debug, Clone)]
pub struct NewNanny {
    pub user_id: Uuid,
    pub description: String,
    pub experience_years: i32,
    pub hourly_rate: f64,
}

/// Admin request creating a nanny account together with its profile.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateNannyRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub description: String,
    pub experience_years: i32,
    pub hourly_rate: f64,
}

/// JSON body for `POST /profile/complete-nanny`.
#[derive(Debug, Clone, Deserialize)]
pub struct CompleteNannyProfile {
    pub description: String,
    pub experience_years: i32,
    pub hourly_rate: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateNannyStatusRequest {
    pub status: NannyStatus,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateAvailabilityRequest {
    pub is_available: bool,
    pub reason: Option<String>,
}

/// Nanny free for a requested time slot.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AvailableNanny {
    pub nanny_id: Uuid,
    pub user_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub profile_image: Option<String>,
    pub description: Option<String>,
    pub experience_years: i32,
    pub hourly_rate: f64,
    pub rating_average: f64,
    pub total_ratings: i32,
}
