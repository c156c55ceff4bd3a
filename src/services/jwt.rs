use crate::error::{Error, Result};
use crate::models::users::{User, UserType};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use uuid::Uuid;

/// What a token may be used for. Tokens of one purpose are rejected everywhere else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TokenPurpose {
    Access,
    Activation,
    PasswordReset,
}

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - user_id as string
    pub sub: String,
    pub email: String,
    pub user_type: UserType,
    pub first_name: String,
    pub last_name: String,
    pub is_verified: bool,
    pub purpose: TokenPurpose,
    /// Expiration time as Unix timestamp
    pub exp: i64,
    /// Issued at time as Unix timestamp
    pub iat: i64,
    pub iss: String,
    pub aud: String,
}

/// Signing parameters shared by every token kind.
#[derive(Debug, Clone)]
pub struct TokenSettings<'a> {
    pub secret: &'a str,
    pub issuer: &'a str,
    pub audience: &'a str,
}

/// Generates a signed token for a user
///
/// # Arguments
/// * `user` - The user the token is issued to
/// * `purpose` - Access, activation or password reset
/// * `settings` - Secret, issuer and audience
/// * `ttl` - Token lifetime
///
/// # Example
/// ```rust,no_run
/// # fn demo(user: &backend::models::users::User) -> backend::error::Result<()> {
/// use backend::services::jwt::{generate_jwt, TokenPurpose, TokenSettings};
///
/// let settings = TokenSettings { secret: "my-secret", issuer: "NannysLM", audience: "NannysLM-Users" };
/// let token = generate_jwt(user, TokenPurpose::Access, &settings, chrono::Duration::days(7))?;
/// # Ok(())
/// # }
/// ```
pub fn generate_jwt(
    user: &User,
    purpose: TokenPurpose,
    settings: &TokenSettings<'_>,
    ttl: Duration,
) -> Result<String> {
    let now = Utc::now();
    let expiration = now + ttl;

    let claims = Claims {
        sub: user.id.to_string(),
        email: user.email.clone(),
        user_type: user.user_type,
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        is_verified: user.is_verified,
        purpose,
        exp: expiration.timestamp(),
        iat: now.timestamp(),
        iss: settings.issuer.to_string(),
        aud: settings.audience.to_string(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(settings.secret.as_ref()),
    )
    .map_err(|e| Error::Internal(format!("Failed to generate JWT: {}", e)))
}

/// Verifies a token's signature, expiry, issuer, audience and purpose.
///
/// # Errors
/// Returns `Error::Authentication` for access tokens and `Error::InvalidToken`
/// for activation and reset tokens.
pub fn verify_jwt(token: &str, purpose: TokenPurpose, settings: &TokenSettings<'_>) -> Result<Claims> {
    let reject = |message: String| match purpose {
        TokenPurpose::Access => Error::Authentication(message),
        _ => Error::InvalidToken(message),
    };

    let mut validation = Validation::default();
    validation.set_issuer(&[settings.issuer]);
    validation.set_audience(&[settings.audience]);

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(settings.secret.as_ref()),
        &validation,
    )
    .map_err(|e| {
        // Check error kind to provide better error messages
        let error_msg = e.to_string().to_lowercase();
        if error_msg.contains("expired") {
            reject("Token has expired".to_string())
        } else if error_msg.contains("signature") {
            reject("Invalid token signature".to_string())
        } else {
            reject(format!("Invalid token: {}", e))
        }
    })?;

    if token_data.claims.purpose != purpose {
        return Err(reject("Token cannot be used for this operation".to_string()));
    }

    Ok(token_data.claims)
}

/// Extracts user_id from valid claims
pub fn user_id_from_claims(claims: &Claims) -> Result<Uuid> {
    Uuid::parse_str(&claims.sub)
        .map_err(|_| Error::Authentication("Invalid user_id in token".to_string()))
}

/// Validates an access token from the Authorization header or the `access_token` cookie.
///
/// The header takes priority over the cookie.
pub fn authenticate_access_token(
    auth_header: Option<&str>,
    cookie_token: Option<&str>,
    settings: &TokenSettings<'_>,
) -> Result<Claims> {
    let token = match (auth_header, cookie_token) {
        (Some(header), _) => extract_token_from_header(Some(header))?,
        (None, Some(cookie)) if !cookie.is_empty() => cookie.to_string(),
        _ => return Err(Error::Authentication("Access denied. No token provided".to_string())),
    };

    verify_jwt(&token, TokenPurpose::Access, settings)
}

/// Extracts the Bearer token from the Authorization header
///
/// # Arguments
/// * `auth_header` - The Authorization header value (optional)
///
/// # Returns
/// The extracted token string
fn extract_token_from_header(auth_header: Option<&str>) -> Result<String> {
    match auth_header {
        Some(header) if header.starts_with("Bearer ") => {
            let token = header[7..].trim().to_string();
            if token.is_empty() {
                return Err(Error::Authentication("Empty token".to_string()));
            }
            Ok(token)
        }
        Some(_) => Err(Error::Authentication(
            "Invalid Authorization header format. Expected: 'Bearer <token>'".to_string()
        )),
        None => Err(Error::Authentication("Missing Authorization header".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SETTINGS: TokenSettings<'static> = TokenSettings {
        secret: "test-secret-key-for-testing",
        issuer: "NannysLM",
        audience: "NannysLM-Users",
    };

    fn test_user() -> User {
        User {
            id: Uuid::now_v7(),
            email: "ana@example.com".to_string(),
            password_hash: String::new(),
            first_name: "Ana".to_string(),
            last_name: "López".to_string(),
            phone_number: None,
            address: None,
            user_type: UserType::Client,
            is_verified: false,
            is_active: true,
            profile_image: None,
            last_login: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_generate_and_verify_access_token() {
        let user = test_user();
        let token = generate_jwt(&user, TokenPurpose::Access, &SETTINGS, Duration::days(7)).unwrap();
        assert!(token.contains('.'));

        let claims = verify_jwt(&token, TokenPurpose::Access, &SETTINGS).unwrap();
        assert_eq!(claims.sub, user.id.to_string());
        assert_eq!(claims.user_type, UserType::Client);
        assert_eq!(claims.iss, "NannysLM");
        assert_eq!(claims.aud, "NannysLM-Users");
        assert_eq!(user_id_from_claims(&claims).unwrap(), user.id);
    }

    #[test]
    fn test_verify_jwt_invalid_signature() {
        let token = generate_jwt(&test_user(), TokenPurpose::Access, &SETTINGS, Duration::hours(1)).unwrap();
        let wrong = TokenSettings { secret: "wrong-secret", ..SETTINGS };
        assert!(verify_jwt(&token, TokenPurpose::Access, &wrong).is_err());
    }

    #[test]
    fn test_verify_jwt_wrong_audience() {
        let token = generate_jwt(&test_user(), TokenPurpose::Access, &SETTINGS, Duration::hours(1)).unwrap();
        let other = TokenSettings { audience: "Someone-Else", ..SETTINGS };
        assert!(verify_jwt(&token, TokenPurpose::Access, &other).is_err());
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let token = generate_jwt(&test_user(), TokenPurpose::Access, &SETTINGS, Duration::hours(-2)).unwrap();
        assert!(matches!(
            verify_jwt(&token, TokenPurpose::Access, &SETTINGS),
            Err(Error::Authentication(_))
        ));
    }

    #[test]
    fn test_purpose_separation() {
        let token = generate_jwt(&test_user(), TokenPurpose::Activation, &SETTINGS, Duration::hours(24)).unwrap();

        assert!(matches!(
            verify_jwt(&token, TokenPurpose::Access, &SETTINGS),
            Err(Error::Authentication(_))
        ));
        assert!(matches!(
            verify_jwt(&token, TokenPurpose::PasswordReset, &SETTINGS),
            Err(Error::InvalidToken(_))
        ));
        assert!(verify_jwt(&token, TokenPurpose::Activation, &SETTINGS).is_ok());
    }

    #[test]
    fn test_authenticate_prefers_header_over_cookie() {
        let token = generate_jwt(&test_user(), TokenPurpose::Access, &SETTINGS, Duration::hours(1)).unwrap();
        let header = format!("Bearer {}", token);

        assert!(authenticate_access_token(Some(&header), Some("garbage"), &SETTINGS).is_ok());
        assert!(authenticate_access_token(None, Some(&token), &SETTINGS).is_ok());
        assert!(authenticate_access_token(None, None, &SETTINGS).is_err());
        assert!(authenticate_access_token(Some("Bearer garbage"), Some(&token), &SETTINGS).is_err());
    }

    #[test]
    fn test_extract_token_from_header_valid() {
        let extracted = extract_token_from_header(Some("Bearer my-jwt-token")).unwrap();
        assert_eq!(extracted, "my-jwt-token");
    }

    #[test]
    fn test_extract_token_from_header_invalid_format() {
        assert!(extract_token_from_header(Some("InvalidFormat")).is_err());
        assert!(extract_token_from_header(Some("Bearer ")).is_err());
        assert!(extract_token_from_header(None).is_err());
    }
}
