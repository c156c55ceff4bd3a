pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod queries;
pub mod response;
pub mod services;
pub mod state;
pub mod validation;
pub mod workers;

pub use config::Config;
pub use database::{DbConn, DbPool};
pub use error::{Error, Result};
pub use state::AppState;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method, Uri},
    middleware::from_fn_with_state,
    routing::{get, patch, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};

use crate::handlers::{
    ai, auth, bank_details, clients, dashboard, health, nannys, notifications, payments, profile,
    ratings, services as service_handlers, users,
};
use crate::middleware::{jwt_auth_middleware, rate_limit_middleware};

/// Load configuration from environment variables
pub fn load_config() -> std::result::Result<Config, Box<dyn std::error::Error>> {
    Ok(Config::load()?)
}

/// Builds the complete HTTP application.
///
/// Layout:
/// - `/api/health`, `/api/info`: public
/// - `/api/v1/...`: resource routes; everything except registration, login,
///   activation, password recovery and email checks goes through
///   [`jwt_auth_middleware`]
///
/// Every `/api` request is counted by the per-IP rate limiter. Unknown routes
/// answer with the standard 404 envelope.
pub fn build_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/activate", get(auth::activate))
        .route("/auth/forgot-password", post(auth::forgot_password))
        .route("/auth/reset-password", post(auth::reset_password))
        .route("/auth/check-email", get(auth::check_email));

    let protected_routes = Router::new()
        // Auth
        .route("/auth/profile", get(auth::get_profile).put(auth::update_profile))
        .route("/auth/logout", post(auth::logout))
        // Users
        .route("/users/search", get(users::search_users))
        .route("/users/email/{email}", get(users::get_user_by_email))
        .route("/users/{id}", get(users::get_user))
        .route("/users/{id}/phone", get(users::get_user_phone))
        // Clients
        .route("/client/data", get(clients::get_client_data).post(clients::save_client_data))
        .route("/client/all", get(clients::list_clients))
        .route("/client/{client_id}/verify", put(clients::verify_client))
        .route("/client/profile", put(clients::update_client_profile))
        .route("/client/info", get(clients::get_client_info))
        .route("/client/services", get(clients::list_my_services))
        .route("/client/payments", get(clients::list_my_payments))
        .route("/client/stats", get(clients::get_my_stats))
        // Nannys
        .route("/nannys", get(nannys::list_nannys).post(nannys::create_nanny))
        .route("/nannys/user/{user_id}", get(nannys::get_nanny_by_user))
        .route("/nannys/{id}", get(nannys::get_nanny))
        .route("/nannys/{id}/status", patch(nannys::update_nanny_status))
        .route("/nannys/{id}/availability", patch(nannys::update_availability))
        // Profile
        .route("/profile/status", get(profile::profile_status))
        .route("/profile/complete-client", post(profile::complete_client_profile))
        .route("/profile/complete-nanny", post(profile::complete_nanny_profile))
        .route("/profile/data", get(profile::profile_data))
        .route("/profile/update", put(profile::update_profile))
        .route("/profile/change-password", put(profile::change_password))
        // Services
        .route(
            "/services",
            get(service_handlers::list_services).post(service_handlers::create_service),
        )
        .route("/services/availability", get(service_handlers::find_available_nannys))
        .route(
            "/services/{id}",
            get(service_handlers::get_service)
                .put(service_handlers::update_service)
                .delete(service_handlers::cancel_service),
        )
        .route("/services/{id}/accept", post(service_handlers::accept_service))
        .route("/services/{id}/complete", post(service_handlers::complete_service))
        // Ratings
        .route("/ratings", get(ratings::list_ratings).post(ratings::create_rating))
        .route("/ratings/service/{service_id}", get(ratings::get_service_rating))
        .route("/ratings/nanny/{nanny_id}/average", get(ratings::get_nanny_average))
        .route("/ratings/recalculate/all", post(ratings::recalculate_all))
        // Payments
        .route("/payments", get(payments::list_payments).post(payments::create_payment))
        .route("/payments/stats", get(payments::payment_stats))
        .route("/payments/{id}", get(payments::get_payment))
        .route("/payments/{id}/status", patch(payments::update_payment_status))
        // Bank details
        .route(
            "/bank-details",
            get(bank_details::list_bank_details).post(bank_details::create_bank_detail),
        )
        .route(
            "/bank-details/{id}",
            get(bank_details::get_bank_detail)
                .put(bank_details::update_bank_detail)
                .delete(bank_details::delete_bank_detail),
        )
        .route(
            "/bank-details/{id}/toggle-status",
            patch(bank_details::toggle_bank_detail_status),
        )
        // Notifications
        .route("/notifications", get(notifications::list_notifications))
        .route("/notifications/mark-all-read", put(notifications::mark_all_as_read))
        .route("/notifications/{id}", axum::routing::delete(notifications::delete_notification))
        .route("/notifications/{id}/read", put(notifications::mark_as_read))
        // Dashboard
        .route("/dashboard/stats", get(dashboard::get_stats))
        .route("/dashboard/users", get(dashboard::list_users))
        .route("/dashboard/nannys", get(dashboard::list_nannys))
        .route("/dashboard/clients", get(dashboard::list_clients))
        // AI
        .route("/ai/nanny-tips", get(ai::nanny_tips))
        .route_layer(from_fn_with_state(state.clone(), jwt_auth_middleware));

    let api_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/info", get(health::api_info))
        .nest("/v1", public_routes.merge(protected_routes))
        .layer(from_fn_with_state(state.clone(), rate_limit_middleware));

    Router::new()
        .nest("/api", api_routes)
        .fallback(route_not_found)
        // Outermost first: the request id exists before tracing starts
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(cors_layer(&state.config))
                .layer(CompressionLayer::new())
                .layer(SetResponseHeaderLayer::overriding(
                    header::X_FRAME_OPTIONS,
                    HeaderValue::from_static("DENY"),
                ))
                .layer(SetResponseHeaderLayer::overriding(
                    header::X_CONTENT_TYPE_OPTIONS,
                    HeaderValue::from_static("nosniff"),
                ))
                .layer(DefaultBodyLimit::max(state.config.server.body_limit())),
        )
        .with_state(state)
}

/// CORS allow-list built from `server.cors_origins` plus the frontend URL.
fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins()
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
        .allow_credentials(true)
}

async fn route_not_found(method: Method, uri: Uri) -> Error {
    Error::NotFound(format!("Route {} {} not found", method, uri.path()))
}
