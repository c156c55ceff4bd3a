//! JWT authentication middleware
//!
//! Validates the access token and exposes the caller to handlers as an
//! [`AuthenticatedUser`] request extension. Role checks live here too so every
//! handler enforces them the same way.

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    error::{Error, Result},
    models::users::UserType,
    services::{
        cookies::ACCESS_TOKEN_COOKIE,
        jwt::{authenticate_access_token, user_id_from_claims, Claims},
        users::access_settings,
    },
    state::AppState,
};

/// Authenticated user extracted from the JWT token
///
/// This struct is added to request extensions by the JWT middleware.
#[derive(Debug, Clone, Serialize)]
pub struct AuthenticatedUser {
    /// User's unique identifier
    pub id: Uuid,
    pub email: String,
    pub user_type: UserType,
    pub first_name: String,
    pub last_name: String,
    pub is_verified: bool,
}

impl TryFrom<Claims> for AuthenticatedUser {
    type Error = Error;

    fn try_from(claims: Claims) -> Result<Self> {
        Ok(Self {
            id: user_id_from_claims(&claims)?,
            email: claims.email,
            user_type: claims.user_type,
            first_name: claims.first_name,
            last_name: claims.last_name,
            is_verified: claims.is_verified,
        })
    }
}

impl AuthenticatedUser {
    pub fn is_admin(&self) -> bool {
        self.user_type == UserType::Admin
    }

    pub fn require_admin(&self) -> Result<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(Error::Forbidden("Administrator access required".to_string()))
        }
    }

    /// Passes when the caller has one of `roles`. Admins always pass.
    pub fn require_role(&self, roles: &[UserType]) -> Result<()> {
        if self.is_admin() || roles.contains(&self.user_type) {
            Ok(())
        } else {
            Err(Error::Forbidden(format!(
                "This action is not available to {} accounts",
                self.user_type
            )))
        }
    }

    /// Strict role check for actions that only make sense for one account type.
    pub fn require_user_type(&self, user_type: UserType) -> Result<()> {
        if self.user_type == user_type {
            Ok(())
        } else {
            Err(Error::Forbidden(format!("Only {} accounts can perform this action", user_type)))
        }
    }

    /// Passes for the owner of a resource and for admins.
    pub fn require_owner(&self, owner_user_id: Uuid) -> Result<()> {
        if self.is_admin() || self.id == owner_user_id {
            Ok(())
        } else {
            Err(Error::Forbidden("You do not have access to this resource".to_string()))
        }
    }
}

/// JWT authentication middleware
///
/// # Token Sources
/// - **Authorization header** (API/Mobile clients): `Bearer <token>`
/// - **Cookie** (Browser clients): `access_token=<token>`
///
/// # Behavior
/// 1. Extracts the token from header or cookie (header takes priority)
/// 2. Validates signature, expiry, issuer, audience and purpose
/// 3. Adds `AuthenticatedUser` to request extensions
/// 4. Returns 401 if the token is invalid, expired, or missing
///
/// # Usage
/// ```ignore
/// Router::new()
///     .route("/protected", get(protected_handler))
///     .route_layer(middleware::from_fn_with_state(
///         state.clone(),
///         jwt_auth_middleware,
///     ))
/// ```
pub async fn jwt_auth_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    let auth_header = headers.get("authorization").and_then(|h| h.to_str().ok());

    let cookie_header = headers.get("cookie").and_then(|h| h.to_str().ok());
    let access_token = cookie_header.and_then(|h| extract_cookie_value(h, ACCESS_TOKEN_COOKIE));

    let claims = authenticate_access_token(
        auth_header,
        access_token.as_deref(),
        &access_settings(&state.config.jwt),
    )?;
    let authenticated_user = AuthenticatedUser::try_from(claims)?;

    request.extensions_mut().insert(authenticated_user);
    Ok(next.run(request).await)
}

/// Extract specific cookie value from Cookie header
///
/// # Returns
/// * `Some(token)` - Cookie value if found
/// * `None` - Cookie not found
fn extract_cookie_value(cookie_str: &str, cookie_name: &str) -> Option<String> {
    cookie_str
        .split(';')
        .map(|s| s.trim())
        .find_map(|cookie| {
            cookie
                .split_once('=')
                .filter(|(name, _)| *name == cookie_name)
                .map(|(_, value)| value.to_string())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(user_type: UserType) -> AuthenticatedUser {
        AuthenticatedUser {
            id: Uuid::now_v7(),
            email: "someone@example.com".to_string(),
            user_type,
            first_name: "Some".to_string(),
            last_name: "One".to_string(),
            is_verified: true,
        }
    }

    #[test]
    fn test_extract_cookie_value() {
        let cookie_str = "access_token=abc123; theme=dark";
        assert_eq!(
            extract_cookie_value(cookie_str, "access_token"),
            Some("abc123".to_string())
        );
        assert_eq!(extract_cookie_value(cookie_str, "theme"), Some("dark".to_string()));
        assert_eq!(extract_cookie_value(cookie_str, "nonexistent"), None);
    }

    #[test]
    fn test_extract_cookie_value_ignores_prefix_matches() {
        let cookie_str = "access_token_old=stale; access_token=fresh";
        assert_eq!(
            extract_cookie_value(cookie_str, "access_token"),
            Some("fresh".to_string())
        );
    }

    #[test]
    fn test_extract_cookie_value_keeps_padding() {
        let cookie_str = "access_token=eyJ.abc==; other=value";
        assert_eq!(
            extract_cookie_value(cookie_str, "access_token"),
            Some("eyJ.abc==".to_string())
        );
    }

    #[test]
    fn test_extract_cookie_value_empty() {
        let cookie_str = "access_token=; other=value";
        assert_eq!(
            extract_cookie_value(cookie_str, "access_token"),
            Some("".to_string())
        );
    }

    #[test]
    fn test_role_checks() {
        let admin = user(UserType::Admin);
        let client = user(UserType::Client);
        let nanny = user(UserType::Nanny);

        assert!(admin.require_admin().is_ok());
        assert!(client.require_admin().is_err());

        assert!(admin.require_role(&[UserType::Nanny]).is_ok());
        assert!(nanny.require_role(&[UserType::Nanny]).is_ok());
        assert!(client.require_role(&[UserType::Nanny]).is_err());

        assert!(client.require_owner(client.id).is_ok());
        assert!(client.require_owner(nanny.id).is_err());
        assert!(admin.require_owner(nanny.id).is_ok());

        assert!(client.require_user_type(UserType::Client).is_ok());
        assert!(admin.require_user_type(UserType::Client).is_err());
    }
}
