use axum::extract::{Extension, State};

use crate::{middleware::auth::AuthenticatedUser, response::ApiResponse, state::AppState};

/// GET /api/v1/ai/nanny-tips
///
/// Three short tips for nannys. Never fails: when the model is not configured
/// or its answer cannot be parsed, the built-in tips are served instead.
pub async fn nanny_tips(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
) -> ApiResponse {
    tracing::debug!(user_id = %auth_user.id, "Nanny tips requested");
    let tips = state.tips.nanny_tips().await;
    ApiResponse::ok(serde_json::json!(tips))
}
