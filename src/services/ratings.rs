use sqlx::Connection;
use uuid::Uuid;

use crate::DbConn;
use crate::error::{Error, Result};
use crate::models::ratings::{
    CreateRatingRequest, NewRating, Rating, RatingAggregate, RatingSummary, RatingWithDetails,
};
use crate::models::services::ServiceStatus;
use crate::queries::{clients, ratings, services};
use crate::validation::{FieldErrors, validate_max_length, validate_range};

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Fills defaulted sub-ratings and validates every score.
pub fn build_rating(client_id: Uuid, nanny_id: Uuid, request: CreateRatingRequest) -> Result<NewRating> {
    let mut errors = FieldErrors::default();
    errors.check(validate_range("rating", request.rating, 1, 5));

    let punctuality = request.punctuality_rating.unwrap_or(request.rating);
    let communication = request.communication_rating.unwrap_or(request.rating);
    let care_quality = request.care_quality_rating.unwrap_or(request.rating);
    errors.check(validate_range("punctuality_rating", punctuality, 1, 5));
    errors.check(validate_range("communication_rating", communication, 1, 5));
    errors.check(validate_range("care_quality_rating", care_quality, 1, 5));
    if let Some(review) = &request.review {
        errors.check(validate_max_length("review", review, 1000));
    }
    errors.finish()?;

    Ok(NewRating {
        service_id: request.service_id,
        client_id,
        nanny_id,
        rating: request.rating,
        punctuality_rating: punctuality,
        communication_rating: communication,
        care_quality_rating: care_quality,
        would_recommend: request.would_recommend.unwrap_or(request.rating >= 4),
        review: request
            .review
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty()),
    })
}

/// Rates a completed service and refreshes the nanny's aggregate in the same transaction.
pub async fn create_rating(conn: &mut DbConn, user_id: Uuid, request: CreateRatingRequest) -> Result<Rating> {
    // Score validation first, so bad input is rejected before any lookup
    build_rating(Uuid::nil(), Uuid::nil(), request.clone())?;

    let mut tx = conn.begin().await.map_err(Error::Sqlx)?;

    let service = services::get_service_by_id(&mut tx, request.service_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Service with ID {} not found", request.service_id)))?;

    let client = clients::get_client_by_user_id(&mut tx, user_id).await?;
    if client.as_ref().map(|c| c.id) != Some(service.client_id) {
        return Err(Error::Forbidden("You can only rate your own services".to_string()));
    }
    if service.status != ServiceStatus::Completed {
        return Err(Error::BadRequest("Only completed services can be rated".to_string()));
    }
    let Some(nanny_id) = service.nanny_id else {
        return Err(Error::BadRequest("Service has no assigned nanny".to_string()));
    };
    if ratings::get_rating_by_service(&mut tx, service.id).await?.is_some() {
        return Err(Error::BadRequest("This service has already been rated".to_string()));
    }

    let new_rating = build_rating(service.client_id, nanny_id, request)?;
    let rating = ratings::create_rating(&mut tx, new_rating).await?;
    ratings::recalculate_nanny_rating(&mut tx, nanny_id).await?;

    tx.commit().await.map_err(Error::Sqlx)?;

    tracing::info!(
        rating_id = %rating.id,
        service_id = %rating.service_id,
        nanny_id = %nanny_id,
        score = rating.rating,
        "Service rated"
    );
    Ok(rating)
}

pub async fn list_for_nanny(conn: &mut DbConn, nanny_id: Option<Uuid>) -> Result<Vec<RatingWithDetails>> {
    let nanny_id = nanny_id.ok_or_else(|| Error::BadRequest("nannyId is required".to_string()))?;
    ratings::list_ratings_for_nanny(conn, nanny_id).await
}

pub async fn get_for_service(conn: &mut DbConn, service_id: Uuid) -> Result<Rating> {
    ratings::get_rating_by_service(conn, service_id)
        .await?
        .ok_or_else(|| Error::NotFound("Rating not found for this service".to_string()))
}

pub fn summarize(aggregate: RatingAggregate) -> RatingSummary {
    let recommend_percentage = if aggregate.total > 0 {
        round1(aggregate.recommended as f64 * 100.0 / aggregate.total as f64)
    } else {
        0.0
    };

    RatingSummary {
        average: round1(aggregate.average.unwrap_or(0.0)),
        punctuality: round1(aggregate.punctuality.unwrap_or(0.0)),
        communication: round1(aggregate.communication.unwrap_or(0.0)),
        care_quality: round1(aggregate.care_quality.unwrap_or(0.0)),
        total: aggregate.total,
        recommend_percentage,
    }
}

pub async fn summary_for_nanny(conn: &mut DbConn, nanny_id: Uuid) -> Result<RatingSummary> {
    Ok(summarize(ratings::aggregate_for_nanny(conn, nanny_id).await?))
}

pub async fn recalculate_all(conn: &mut DbConn) -> Result<u64> {
    let updated = ratings::recalculate_all(conn).await?;
    tracing::info!(updated, "Nanny ratings recalculated");
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(rating: i16) -> CreateRatingRequest {
        CreateRatingRequest {
            service_id: Uuid::now_v7(),
            rating,
            punctuality_rating: None,
            communication_rating: None,
            care_quality_rating: None,
            would_recommend: None,
            review: Some("  Excelente  ".to_string()),
        }
    }

    #[test]
    fn test_sub_ratings_default_to_overall() {
        let rating = build_rating(Uuid::now_v7(), Uuid::now_v7(), request(4)).unwrap();
        assert_eq!(rating.punctuality_rating, 4);
        assert_eq!(rating.communication_rating, 4);
        assert_eq!(rating.care_quality_rating, 4);
        assert!(rating.would_recommend);
        assert_eq!(rating.review.as_deref(), Some("Excelente"));
    }

    #[test]
    fn test_low_rating_is_not_recommended_by_default() {
        let rating = build_rating(Uuid::now_v7(), Uuid::now_v7(), request(3)).unwrap();
        assert!(!rating.would_recommend);
    }

    #[test]
    fn test_out_of_range_scores_are_rejected() {
        assert!(build_rating(Uuid::nil(), Uuid::nil(), request(0)).is_err());
        assert!(build_rating(Uuid::nil(), Uuid::nil(), request(6)).is_err());

        let mut r = request(5);
        r.care_quality_rating = Some(9);
        assert!(build_rating(Uuid::nil(), Uuid::nil(), r).is_err());
    }

    #[test]
    fn test_summary_rounds_to_one_decimal() {
        let summary = summarize(RatingAggregate {
            average: Some(4.666),
            punctuality: Some(4.25),
            communication: Some(5.0),
            care_quality: None,
            total: 3,
            recommended: 2,
        });
        assert_eq!(summary.average, 4.7);
        assert_eq!(summary.punctuality, 4.3);
        assert_eq!(summary.care_quality, 0.0);
        assert_eq!(summary.recommend_percentage, 66.7);
    }

    #[test]
    fn test_summary_without_ratings() {
        let summary = summarize(RatingAggregate {
            average: None,
            punctuality: None,
            communication: None,
            care_quality: None,
            total: 0,
            recommended: 0,
        });
        assert_eq!(summary.total, 0);
        assert_eq!(summary.recommend_percentage, 0.0);
    }
}
