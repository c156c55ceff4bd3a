use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Rating {
    pub id: Uuid,
    pub service_id: Uuid,
    pub client_id: Uuid,
    pub nanny_id: Uuid,
    pub rating: i16,
    pub punctuality_rating: i16,
    pub communication_rating: i16,
    pub care_quality_rating: i16,
    pub would_recommend: bool,
    pub review: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Rating with the reviewer's name and the rated service title.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RatingWithDetails {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub rating: Rating,
    pub client_first_name: String,
    pub client_last_name: String,
    pub service_title: String,
}

#[derive(Debug, Clone)]
pub struct NewRating {
    pub service_id: Uuid,
    pub client_id: Uuid,
    pub nanny_id: Uuid,
    pub rating: i16,
    pub punctuality_rating: i16,
    pub communication_rating: i16,
    pub care_quality_rating: i16,
    pub would_recommend: bool,
    pub review: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateRatingRequest {
    pub service_id: Uuid,
    pub rating: i16,
    pub punctuality_rating: Option<i16>,
    pub communication_rating: Option<i16>,
    pub care_quality_rating: Option<i16>,
    pub would_recommend: Option<bool>,
    pub review: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingFilters {
    pub nanny_id: Option<Uuid>,
}

/// Aggregated scores for one nanny, averages rounded to one decimal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatingSummary {
    pub average: f64,
    pub punctuality: f64,
    pub communication: f64,
    pub care_quality: f64,
    pub total: i64,
    pub recommend_percentage: f64,
}

/// Raw aggregate row before rounding.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RatingAggregate {
    pub average: Option<f64>,
    pub punctuality: Option<f64>,
    pub communication: Option<f64>,
    pub care_quality: Option<f64>,
    pub total: i64,
    pub recommended: i64,
}
