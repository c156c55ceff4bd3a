//! Health check handlers
//!
//! Public endpoints for load balancers and uptime monitoring. They never touch
//! the database, so they stay green while the pool is still connecting.

use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Public health check response
#[derive(Debug, Serialize)]
pub struct HealthCheckResponse {
    /// Status indicator (always "ok")
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

/// Service description returned by `/api/info`
#[derive(Debug, Serialize)]
pub struct ApiInfoResponse {
    pub name: String,
    pub version: String,
    pub endpoints: Vec<String>,
}

/// Resource base paths mounted under `/api/v1`
pub const RESOURCE_PATHS: &[&str] = &[
    "/api/v1/auth",
    "/api/v1/users",
    "/api/v1/client",
    "/api/v1/nannys",
    "/api/v1/profile",
    "/api/v1/services",
    "/api/v1/ratings",
    "/api/v1/payments",
    "/api/v1/bank-details",
    "/api/v1/notifications",
    "/api/v1/dashboard",
    "/api/v1/ai",
];

/// GET /api/health
///
/// Also mounted at `/api/v1/health`. No authentication.
///
/// # Example
/// ```bash
/// curl http://localhost:8000/api/health
/// # Returns: {"status":"ok","timestamp":"...","version":"0.1.0"}
/// ```
pub async fn health_check() -> Json<HealthCheckResponse> {
    tracing::debug!("Health check requested");
    Json(HealthCheckResponse {
        status: "ok".to_string(),
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /api/info
pub async fn api_info() -> Json<ApiInfoResponse> {
    Json(ApiInfoResponse {
        name: "NannysLM API".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        endpoints: RESOURCE_PATHS.iter().map(|p| p.to_string()).collect(),
    })
}
