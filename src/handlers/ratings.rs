use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::extract::WithRejection;
use uuid::Uuid;

use super::{acquire_db_connection, log_handler_error};
use crate::{
    error::{Error, Result},
    middleware::auth::AuthenticatedUser,
    models::{
        ratings::{CreateRatingRequest, RatingFilters},
        users::UserType,
    },
    response::ApiResponse,
    services::ratings,
    state::AppState,
};

/// POST /api/v1/ratings
///
/// Rates a completed service of the caller. The nanny's average and rating
/// count are refreshed in the same transaction.
///
/// # HTTP Status Codes
/// - `201 CREATED`: Rating stored
/// - `400 BAD_REQUEST`: Invalid score, service not completed, or already rated
/// - `403 FORBIDDEN`: Not the caller's service
/// - `404 NOT_FOUND`: Service not found
pub async fn create_rating(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    WithRejection(Json(request), _): WithRejection<Json<CreateRatingRequest>, Error>,
) -> Result<ApiResponse> {
    auth_user.require_user_type(UserType::Client)?;
    let mut conn = acquire_db_connection(&state, "create_rating").await?;

    let rating = ratings::create_rating(&mut conn, auth_user.id, request)
        .await
        .inspect_err(|e| log_handler_error("create_rating", e))?;

    Ok(ApiResponse::created(serde_json::json!({ "rating": rating })).with_message("Thank you for your rating"))
}

/// GET /api/v1/ratings?nannyId=
pub async fn list_ratings(
    State(state): State<AppState>,
    WithRejection(Query(filters), _): WithRejection<Query<RatingFilters>, Error>,
) -> Result<ApiResponse> {
    let mut conn = acquire_db_connection(&state, "list_ratings").await?;

    let ratings = ratings::list_for_nanny(&mut conn, filters.nanny_id)
        .await
        .inspect_err(|e| log_handler_error("list_ratings", e))?;

    Ok(ApiResponse::ok(serde_json::json!({
        "count": ratings.len(),
        "ratings": ratings,
    })))
}

/// GET /api/v1/ratings/service/:serviceId
pub async fn get_service_rating(
    State(state): State<AppState>,
    WithRejection(Path(service_id), _): WithRejection<Path<Uuid>, Error>,
) -> Result<ApiResponse> {
    let mut conn = acquire_db_connection(&state, "get_service_rating").await?;

    let rating = ratings::get_for_service(&mut conn, service_id)
        .await
        .inspect_err(|e| log_handler_error("get_service_rating", e))?;

    Ok(ApiResponse::ok(serde_json::json!({ "rating": rating })))
}

/// GET /api/v1/ratings/nanny/:nannyId/average
///
/// Averages are rounded to one decimal.
pub async fn get_nanny_average(
    State(state): State<AppState>,
    WithRejection(Path(nanny_id), _): WithRejection<Path<Uuid>, Error>,
) -> Result<ApiResponse> {
    let mut conn = acquire_db_connection(&state, "get_nanny_average").await?;

    let summary = ratings::summary_for_nanny(&mut conn, nanny_id)
        .await
        .inspect_err(|e| log_handler_error("get_nanny_average", e))?;

    Ok(ApiResponse::ok(serde_json::json!(summary)))
}

/// POST /api/v1/ratings/recalculate/all
///
/// Admin maintenance endpoint.
pub async fn recalculate_all(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
) -> Result<ApiResponse> {
    auth_user.require_admin()?;
    let mut conn = acquire_db_connection(&state, "recalculate_all").await?;

    let updated = ratings::recalculate_all(&mut conn)
        .await
        .inspect_err(|e| log_handler_error("recalculate_all", e))?;

    Ok(ApiResponse::ok(serde_json::json!({ "updated": updated })).with_message("Ratings recalculated"))
}
