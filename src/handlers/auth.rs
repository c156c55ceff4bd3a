use axum::{
    extract::{Extension, Query, State},
    http::{header::SET_COOKIE, HeaderValue},
    response::{IntoResponse, Json, Redirect, Response},
};
use axum_extra::extract::WithRejection;
use serde::Deserialize;

use super::{acquire_db_connection, log_handler_error};
use crate::{
    error::{Error, Result},
    middleware::auth::AuthenticatedUser,
    models::users::{ForgotPasswordRequest, LoginUser, RegisterUser, ResetPasswordRequest, UpdateUserProfile},
    response::ApiResponse,
    services::{
        cookies::{build_access_token_cookie, build_clear_token_cookie, CookieConfig},
        users,
    },
    state::AppState,
};

/// Envelope response that also sets a cookie
pub struct CookieResponse {
    body: ApiResponse,
    cookie: String,
}

impl IntoResponse for CookieResponse {
    fn into_response(self) -> Response {
        let mut response = self.body.into_response();
        if let Ok(cookie) = HeaderValue::from_str(&self.cookie) {
            response.headers_mut().append(SET_COOKIE, cookie);
        }
        response
    }
}

#[derive(Debug, Deserialize)]
pub struct ActivationQuery {
    pub token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CheckEmailQuery {
    pub email: Option<String>,
}

/// POST /api/v1/auth/register
///
/// Registers an inactive client or nanny account and emails the activation link.
///
/// # Request Body
/// - `first_name`, `last_name`: 2-100 letters and spaces
/// - `email`: must be unique
/// - `password`: 6-100 characters with lowercase, uppercase and a digit
/// - `phone_number`, `address`: optional
/// - `user_type`: `client` (default) or `nanny`
///
/// # HTTP Status Codes
/// - `201 CREATED`: User registered
/// - `400 BAD_REQUEST`: Validation error or email already registered
pub async fn register(
    State(state): State<AppState>,
    WithRejection(Json(request), _): WithRejection<Json<RegisterUser>, Error>,
) -> Result<ApiResponse> {
    let mut conn = acquire_db_connection(&state, "register").await?;

    let user = users::register_user(&mut conn, request, &state.config, state.mailer.as_ref())
        .await
        .inspect_err(|e| log_handler_error("register", e))?;

    Ok(ApiResponse::created(serde_json::json!({ "user": user }))
        .with_message("User registered. Check your email to activate the account"))
}

/// POST /api/v1/auth/login
///
/// Authenticates with email and password.
///
/// # Returns
/// - `user`: the public user
/// - `token`: JWT access token
/// - `expires_in`: token lifetime in seconds
///
/// Also sets the `access_token` HttpOnly cookie for browser clients.
///
/// # HTTP Status Codes
/// - `200 OK`: Authentication successful
/// - `401 UNAUTHORIZED`: Unknown email or wrong password
/// - `403 FORBIDDEN`: Account not activated yet
pub async fn login(
    State(state): State<AppState>,
    WithRejection(Json(request), _): WithRejection<Json<LoginUser>, Error>,
) -> Result<CookieResponse> {
    let mut conn = acquire_db_connection(&state, "login").await?;

    let login = users::login_user(&mut conn, request, &state.config.jwt)
        .await
        .inspect_err(|e| log_handler_error("login", e))?;

    let cookie_config = CookieConfig::for_backend_url(&state.config.server.backend_url);
    let cookie = build_access_token_cookie(&login.token, login.expires_in, &cookie_config);

    Ok(CookieResponse {
        body: ApiResponse::ok(serde_json::json!({
            "user": login.user,
            "token": login.token,
            "expires_in": login.expires_in,
        }))
        .with_message("Login successful"),
        cookie,
    })
}

/// GET /api/v1/auth/activate?token=
///
/// Activates the account from the emailed link and sends the browser to the
/// frontend login page. Without a frontend URL the envelope is returned instead.
///
/// # HTTP Status Codes
/// - `303 SEE_OTHER`: Activated, redirecting
/// - `400 BAD_REQUEST`: Missing token
/// - `401 UNAUTHORIZED`: Invalid or expired token
pub async fn activate(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<ActivationQuery>, Error>,
) -> Result<Response> {
    let mut conn = acquire_db_connection(&state, "activate").await?;

    let token = query.token.unwrap_or_default();
    let user = users::activate_account(&mut conn, &token, &state.config.jwt)
        .await
        .inspect_err(|e| log_handler_error("activate", e))?;

    let frontend_url = state.config.server.frontend_url.trim_end_matches('/');
    if frontend_url.is_empty() {
        return Ok(ApiResponse::ok(serde_json::json!({ "user": user }))
            .with_message("Account activated")
            .into_response());
    }

    Ok(Redirect::to(&format!("{}/login?activated=1", frontend_url)).into_response())
}

/// POST /api/v1/auth/forgot-password
///
/// Always answers with the same message so callers cannot probe which emails exist.
pub async fn forgot_password(
    State(state): State<AppState>,
    WithRejection(Json(request), _): WithRejection<Json<ForgotPasswordRequest>, Error>,
) -> Result<ApiResponse> {
    let mut conn = acquire_db_connection(&state, "forgot_password").await?;

    users::forgot_password(&mut conn, &request.email, &state.config, state.mailer.as_ref())
        .await
        .inspect_err(|e| log_handler_error("forgot_password", e))?;

    Ok(ApiResponse::message(
        "If the email is registered, a password reset link has been sent",
    ))
}

/// POST /api/v1/auth/reset-password
pub async fn reset_password(
    State(state): State<AppState>,
    WithRejection(Json(request), _): WithRejection<Json<ResetPasswordRequest>, Error>,
) -> Result<ApiResponse> {
    let mut conn = acquire_db_connection(&state, "reset_password").await?;

    users::reset_password(&mut conn, request, &state.config.jwt)
        .await
        .inspect_err(|e| log_handler_error("reset_password", e))?;

    Ok(ApiResponse::message("Password has been reset"))
}

/// GET /api/v1/auth/profile
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
) -> Result<ApiResponse> {
    let mut conn = acquire_db_connection(&state, "get_profile").await?;

    let user = users::get_user(&mut conn, auth_user.id)
        .await
        .inspect_err(|e| log_handler_error("get_profile", e))?;

    Ok(ApiResponse::ok(serde_json::json!({ "user": user })))
}

/// PUT /api/v1/auth/profile
///
/// Updates name, phone and address. Any other field in the body is ignored.
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    WithRejection(Json(request), _): WithRejection<Json<UpdateUserProfile>, Error>,
) -> Result<ApiResponse> {
    let mut conn = acquire_db_connection(&state, "update_profile").await?;

    let user = users::update_profile(&mut conn, auth_user.id, request)
        .await
        .inspect_err(|e| log_handler_error("update_profile", e))?;

    Ok(ApiResponse::ok(serde_json::json!({ "user": user })).with_message("Profile updated"))
}

/// GET /api/v1/auth/check-email?email=
pub async fn check_email(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<CheckEmailQuery>, Error>,
) -> Result<ApiResponse> {
    let mut conn = acquire_db_connection(&state, "check_email").await?;

    let available = users::email_available(&mut conn, query.email.as_deref())
        .await
        .inspect_err(|e| log_handler_error("check_email", e))?;

    Ok(ApiResponse::ok(serde_json::json!({
        "email": query.email,
        "available": available,
    })))
}

/// POST /api/v1/auth/logout
///
/// Tokens are stateless; logging out only clears the browser cookie.
pub async fn logout(Extension(auth_user): Extension<AuthenticatedUser>) -> CookieResponse {
    tracing::info!(user_id = %auth_user.id, "User logged out");
    CookieResponse {
        body: ApiResponse::message("Logged out"),
        cookie: build_clear_token_cookie(),
    }
}
