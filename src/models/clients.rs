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
pub enum VerificationStatus {
    Pending,
    Verified,
    Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Client {
    pub id: Uuid,
    pub user_id: Uuid,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
    pub number_of_children: i32,
    pub special_requirements: Option<String>,
    pub identification_document: Option<String>,
    pub verification_status: VerificationStatus,
    pub verification_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Client row joined with the owning user's contact fields.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ClientWithUser {
    pub id: Uuid,
    pub user_id: Uuid,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
    pub number_of_children: i32,
    pub special_requirements: Option<String>,
    pub identification_document: Option<String>,
    pub verification_status: VerificationStatus,
    pub verification_date: Option<DateTime<Utc>>,
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
}

/// Values written by the client-data upsert and profile completion.
#[derive(Debug, Clone, Default)]
pub struct ClientData {
    pub emergency_contact_name: String,
    pub emergency_contact_phone: String,
    pub number_of_children: i32,
    pub special_requirements: Option<String>,
    /// New document URL; `None` keeps the stored document
    pub identification_document: Option<String>,
}

/// JSON body for `POST /profile/complete-client`.
#[derive(Debug, Clone, Deserialize)]
pub struct CompleteClientProfile {
    pub emergency_contact_name: String,
    pub emergency_contact_phone: String,
    pub number_of_children: Option<i32>,
    pub special_requirements: Option<String>,
}

/// JSON body for `PUT /client/profile`. User and client fields in one request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateClientProfile {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
    pub number_of_children: Option<i32>,
    pub special_requirements: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VerifyClientRequest {
    pub status: VerificationStatus,
    pub reason: Option<String>,
}

/// Client dashboard counters.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ClientStats {
    pub total_services: i64,
    pub completed_services: i64,
    pub pending_services: i64,
    pub total_spent: f64,
    pub currency: String,
    pub unique_nannys: i64,
}

/// Admin dashboard view of a client.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ClientSummary {
    pub id: Uuid,
    pub user_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub is_verified: bool,
    pub is_active: bool,
    pub verification_status: VerificationStatus,
    pub number_of_children: i32,
    pub total_services: i64,
    pub completed_services: i64,
    pub created_at: DateTime<Utc>,
}
