use crate::{
    error::{Error, Result},
    models::ratings::{NewRating, Rating, RatingAggregate, RatingWithDetails},
};
use uuid::Uuid;

use crate::DbConn;

const RATING_COLUMNS: &str = "id, service_id, client_id, nanny_id, rating, punctuality_rating, \
     communication_rating, care_quality_rating, would_recommend, review, created_at";

pub async fn create_rating(conn: &mut DbConn, new_rating: NewRating) -> Result<Rating> {
    sqlx::query_as::<_, Rating>(&format!(
        r#"
        INSERT INTO ratings (service_id, client_id, nanny_id, rating, punctuality_rating,
                             communication_rating, care_quality_rating, would_recommend, review)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING {RATING_COLUMNS}
        "#
    ))
    .bind(new_rating.service_id)
    .bind(new_rating.client_id)
    .bind(new_rating.nanny_id)
    .bind(new_rating.rating)
    .bind(new_rating.punctuality_rating)
    .bind(new_rating.communication_rating)
    .bind(new_rating.care_quality_rating)
    .bind(new_rating.would_recommend)
    .bind(new_rating.review)
    .fetch_one(conn)
    .await
    .map_err(|e| {
        let error_msg = e.to_string().to_lowercase();
        if error_msg.contains("duplicate key") || error_msg.contains("ratings_service_id_key") {
            Error::BadRequest("This service has already been rated".to_string())
        } else {
            Error::Sqlx(e)
        }
    })
}

pub async fn get_rating_by_service(conn: &mut DbConn, service_id: Uuid) -> Result<Option<Rating>> {
    sqlx::query_as::<_, Rating>(&format!(
        "SELECT {RATING_COLUMNS} FROM ratings WHERE service_id = $1"
    ))
    .bind(service_id)
    .fetch_optional(conn)
    .await
    .map_err(Error::Sqlx)
}

/// Ratings of a nanny with reviewer name and service title, newest first.
pub async fn list_ratings_for_nanny(conn: &mut DbConn, nanny_id: Uuid) -> Result<Vec<RatingWithDetails>> {
    sqlx::query_as::<_, RatingWithDetails>(
        r#"
        SELECT r.id, r.service_id, r.client_id, r.nanny_id, r.rating, r.punctuality_rating,
               r.communication_rating, r.care_quality_rating, r.would_recommend, r.review,
               r.created_at,
               u.first_name AS client_first_name, u.last_name AS client_last_name,
               s.title AS service_title
        FROM ratings r
        JOIN clients c ON c.id = r.client_id
        JOIN users u ON u.id = c.user_id
        JOIN services s ON s.id = r.service_id
        WHERE r.nanny_id = $1
        ORDER BY r.created_at DESC
        "#,
    )
    .bind(nanny_id)
    .fetch_all(conn)
    .await
    .map_err(Error::Sqlx)
}

pub async fn aggregate_for_nanny(conn: &mut DbConn, nanny_id: Uuid) -> Result<RatingAggregate> {
    sqlx::query_as::<_, RatingAggregate>(
        r#"
        SELECT AVG(rating)::float8 AS average,
               AVG(punctuality_rating)::float8 AS punctuality,
               AVG(communication_rating)::float8 AS communication,
               AVG(care_quality_rating)::float8 AS care_quality,
               COUNT(*) AS total,
               COUNT(*) FILTER (WHERE would_recommend) AS recommended
        FROM ratings
        WHERE nanny_id = $1
        "#,
    )
    .bind(nanny_id)
    .fetch_one(conn)
    .await
    .map_err(Error::Sqlx)
}

/// Writes `AVG(rating)` (2 decimals) and `COUNT(*)` back to the nanny row.
pub async fn recalculate_nanny_rating(conn: &mut DbConn, nanny_id: Uuid) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE nannys n
        SET rating_average = agg.average, total_ratings = agg.total, updated_at = now()
        FROM (
            SELECT COALESCE(ROUND(AVG(rating)::numeric, 2), 0)::float8 AS average,
                   COUNT(*)::int AS total
            FROM ratings
            WHERE nanny_id = $1
        ) AS agg
        WHERE n.id = $1
        "#,
    )
    .bind(nanny_id)
    .execute(conn)
    .await
    .map_err(Error::Sqlx)?;

    Ok(())
}

/// Recomputes every nanny's aggregate. Returns the number of nannys updated.
pub async fn recalculate_all(conn: &mut DbConn) -> Result<u64> {
    let rows_affected = sqlx::query(
        r#"
        UPDATE nannys n
        SET rating_average = COALESCE(agg.average, 0),
            total_ratings = COALESCE(agg.total, 0),
            updated_at = now()
        FROM nannys n2
        LEFT JOIN (
            SELECT nanny_id,
                   ROUND(AVG(rating)::numeric, 2)::float8 AS average,
                   COUNT(*)::int AS total
            FROM ratings
            GROUP BY nanny_id
        ) AS agg ON agg.nanny_id = n2.id
        WHERE n.id = n2.id
        "#,
    )
    .execute(conn)
    .await
    .map_err(Error::Sqlx)?
    .rows_affected();

    Ok(rows_affected)
}
