use crate::DbConn;
use crate::{
    config::{Config, JwtConfig},
    error::{Error, Result, ValidationErrors},
    models::users::{
        ChangePasswordRequest, LoginResult, LoginUser, NewUser, RegisterUser,
        ResetPasswordRequest, UpdateUserProfile, User, UserType,
    },
    queries::users,
    services::email::{self, EmailSender},
    services::jwt::{self, TokenPurpose, TokenSettings},
    validation::{
        FieldErrors, validate_email, validate_length_between, validate_max_length,
        validate_mexican_phone, validate_password, validate_person_name, validate_reset_password,
    },
};
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use secrecy::ExposeSecret;
use uuid::Uuid;

/// Access token settings.
pub fn access_settings(jwt: &JwtConfig) -> TokenSettings<'_> {
    TokenSettings {
        secret: jwt.secret.expose_secret(),
        issuer: &jwt.issuer,
        audience: &jwt.audience,
    }
}

fn activation_settings(jwt: &JwtConfig) -> TokenSettings<'_> {
    TokenSettings {
        secret: jwt.activation_secret().expose_secret(),
        issuer: &jwt.issuer,
        audience: &jwt.audience,
    }
}

fn password_reset_settings(jwt: &JwtConfig) -> TokenSettings<'_> {
    TokenSettings {
        secret: jwt.password_reset_secret().expose_secret(),
        issuer: &jwt.issuer,
        audience: &jwt.audience,
    }
}

/// Hashes a password with Argon2 and a random salt.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| Error::Internal(format!("Failed to hash password: {}", e)))
}

/// Verifies a password against a password hash
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| Error::Internal(format!("Invalid password hash: {}", e)))?;

    let argon2 = Argon2::default();

    match argon2.verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(Error::Internal(format!(
            "Password verification failed: {}",
            e
        ))),
    }
}

/// Shared rules for optional contact fields.
fn check_contact_fields(errors: &mut FieldErrors, phone_number: Option<&str>, address: Option<&str>) {
    if let Some(phone) = phone_number.filter(|p| !p.trim().is_empty()) {
        errors.check(validate_mexican_phone("phone_number", phone));
    }
    if let Some(address) = address {
        errors.check(validate_max_length("address", address, 500));
    }
}

fn parse_registration_type(user_type: Option<&str>) -> Result<UserType> {
    match user_type.map(|t| t.trim().to_lowercase()).as_deref() {
        None | Some("") | Some("client") => Ok(UserType::Client),
        Some("nanny") => Ok(UserType::Nanny),
        Some(_) => Err(Error::Validation(ValidationErrors::field(
            "user_type",
            "User type must be client or nanny",
        ))),
    }
}

/// Validates a registration request, collecting every field error.
pub fn validate_registration(request: &RegisterUser) -> Result<UserType> {
    let mut errors = FieldErrors::default();
    errors.check(validate_person_name("first_name", &request.first_name));
    errors.check(validate_person_name("last_name", &request.last_name));
    errors.check(validate_email("email", &request.email));
    errors.check(validate_password("password", &request.password));
    check_contact_fields(&mut errors, request.phone_number.as_deref(), request.address.as_deref());

    let user_type = match parse_registration_type(request.user_type.as_deref()) {
        Ok(user_type) => user_type,
        Err(e) => {
            errors.check(Err(e));
            UserType::Client
        }
    };

    errors.finish()?;
    Ok(user_type)
}

/// Registers an inactive, unverified account and emails the activation link.
pub async fn register_user(
    conn: &mut DbConn,
    request: RegisterUser,
    config: &Config,
    mailer: &dyn EmailSender,
) -> Result<User> {
    let user_type = validate_registration(&request)?;

    if users::email_exists(conn, &request.email).await? {
        return Err(Error::Validation(ValidationErrors::field(
            "email",
            "Email is already registered",
        )));
    }

    let password_hash = hash_password(&request.password)?;

    let new_user = NewUser {
        email: request.email,
        password_hash,
        first_name: request.first_name,
        last_name: request.last_name,
        phone_number: request.phone_number.filter(|p| !p.trim().is_empty()),
        address: request.address.filter(|a| !a.trim().is_empty()),
        user_type,
        is_verified: false,
        is_active: false,
    };

    let user = users::create_user(conn, new_user).await?;
    tracing::info!(user_id = %user.id, user_type = %user.user_type, "User registered");

    let token = jwt::generate_jwt(
        &user,
        TokenPurpose::Activation,
        &activation_settings(&config.jwt),
        chrono::Duration::hours(config.jwt.activation_expiration_hours),
    )?;
    let link = format!(
        "{}/api/v1/auth/activate?token={}",
        config.server.backend_url.trim_end_matches('/'),
        token
    );
    email::send_best_effort(mailer, email::activation_email(&user.email, &user.first_name, &link)).await;

    Ok(user)
}

/// Authenticates with email and password and issues an access token.
pub async fn login_user(conn: &mut DbConn, request: LoginUser, jwt_config: &JwtConfig) -> Result<LoginResult> {
    if request.email.trim().is_empty() || request.password.is_empty() {
        return Err(Error::Validation(ValidationErrors::field(
            "email",
            "Email and password are required",
        )));
    }

    let user = users::get_user_by_email(conn, &request.email)
        .await?
        .ok_or_else(|| {
            Error::InvalidCredentials(ValidationErrors::field("email", "Email is not registered"))
        })?;

    if !user.is_active {
        return Err(Error::AccountInactive(
            "Account is not active. Check your email for the activation link".to_string(),
        ));
    }

    if !verify_password(&request.password, &user.password_hash)? {
        tracing::warn!(user_id = %user.id, "Login failed: wrong password");
        return Err(Error::InvalidCredentials(ValidationErrors::field(
            "password",
            "Incorrect password",
        )));
    }

    users::touch_last_login(conn, user.id).await?;

    let ttl = chrono::Duration::hours(jwt_config.expiration_hours);
    let token = jwt::generate_jwt(&user, TokenPurpose::Access, &access_settings(jwt_config), ttl)?;

    tracing::info!(user_id = %user.id, "User logged in");

    Ok(LoginResult {
        user,
        token,
        expires_in: ttl.num_seconds(),
    })
}

/// Activates the account named by an activation token.
pub async fn activate_account(conn: &mut DbConn, token: &str, jwt_config: &JwtConfig) -> Result<User> {
    if token.trim().is_empty() {
        return Err(Error::BadRequest("Activation token is required".to_string()));
    }

    let claims = jwt::verify_jwt(token, TokenPurpose::Activation, &activation_settings(jwt_config))?;
    let user_id = Uuid::parse_str(&claims.sub)
        .map_err(|_| Error::InvalidToken("Invalid user id in token".to_string()))?;

    let user = users::activate_user(conn, user_id)
        .await
        .map_err(|e| match e {
            Error::NotFound(_) => Error::InvalidToken("Account no longer exists".to_string()),
            other => other,
        })?;

    tracing::info!(user_id = %user.id, "Account activated");
    Ok(user)
}

/// Emails a reset link when the address belongs to a user. Silent otherwise.
pub async fn forgot_password(
    conn: &mut DbConn,
    email_address: &str,
    config: &Config,
    mailer: &dyn EmailSender,
) -> Result<()> {
    validate_email("email", email_address)?;

    let Some(user) = users::get_user_by_email(conn, email_address).await? else {
        tracing::info!("Password reset requested for unknown email");
        return Ok(());
    };

    let token = jwt::generate_jwt(
        &user,
        TokenPurpose::PasswordReset,
        &password_reset_settings(&config.jwt),
        chrono::Duration::minutes(config.jwt.password_reset_expiration_minutes),
    )?;
    let link = format!(
        "{}/reset-password?token={}",
        config.server.frontend_url.trim_end_matches('/'),
        token
    );
    email::send_best_effort(mailer, email::password_reset_email(&user.email, &user.first_name, &link)).await;

    tracing::info!(user_id = %user.id, "Password reset email issued");
    Ok(())
}

pub async fn reset_password(conn: &mut DbConn, request: ResetPasswordRequest, jwt_config: &JwtConfig) -> Result<()> {
    validate_reset_password("password", &request.password)?;

    let claims = jwt::verify_jwt(
        &request.token,
        TokenPurpose::PasswordReset,
        &password_reset_settings(jwt_config),
    )?;
    let user_id = Uuid::parse_str(&claims.sub)
        .map_err(|_| Error::InvalidToken("Invalid user id in token".to_string()))?;

    let password_hash = hash_password(&request.password)?;
    users::update_user_password(conn, user_id, &password_hash)
        .await
        .map_err(|e| match e {
            Error::NotFound(_) => Error::InvalidToken("Account no longer exists".to_string()),
            other => other,
        })?;

    tracing::info!(user_id = %user_id, "Password reset");
    Ok(())
}

pub async fn change_password(conn: &mut DbConn, user_id: Uuid, request: ChangePasswordRequest) -> Result<()> {
    validate_length_between("new_password", &request.new_password, 6, 100)?;

    let user = users::get_user_by_id(conn, user_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("User with ID {} not found", user_id)))?;

    if !verify_password(&request.current_password, &user.password_hash)? {
        return Err(Error::Authentication("Current password is incorrect".to_string()));
    }

    let password_hash = hash_password(&request.new_password)?;
    users::update_user_password(conn, user_id, &password_hash).await?;

    tracing::info!(user_id = %user_id, "Password changed");
    Ok(())
}

/// Validates the editable profile fields that are present.
pub fn validate_profile_update(update: &UpdateUserProfile) -> Result<()> {
    let mut errors = FieldErrors::default();
    if let Some(first_name) = &update.first_name {
        errors.check(validate_person_name("first_name", first_name));
    }
    if let Some(last_name) = &update.last_name {
        errors.check(validate_person_name("last_name", last_name));
    }
    check_contact_fields(&mut errors, update.phone_number.as_deref(), update.address.as_deref());
    errors.finish()
}

/// Updates name, phone and address. Everything else about the user is immutable here.
pub async fn update_profile(conn: &mut DbConn, user_id: Uuid, update: UpdateUserProfile) -> Result<User> {
    if update.is_empty() {
        return Err(Error::BadRequest("No fields to update".to_string()));
    }
    validate_profile_update(&update)?;

    users::update_user_profile(conn, user_id, &update).await
}

pub async fn get_user(conn: &mut DbConn, user_id: Uuid) -> Result<User> {
    users::get_user_by_id(conn, user_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("User with ID {} not found", user_id)))
}

pub async fn get_user_by_email(conn: &mut DbConn, email_address: &str) -> Result<User> {
    users::get_user_by_email(conn, email_address)
        .await?
        .ok_or_else(|| Error::NotFound("User not found".to_string()))
}

/// Whether an address is still free for registration. Malformed addresses are rejected.
pub async fn email_available(conn: &mut DbConn, email_address: Option<&str>) -> Result<bool> {
    let email_address = email_address.unwrap_or_default();
    validate_email("email", email_address)?;
    Ok(!users::email_exists(conn, email_address).await?)
}

pub const MIN_SEARCH_LEN: usize = 2;
pub const SEARCH_LIMIT: i64 = 10;

/// Case-insensitive match on first name, last name or email.
pub async fn search_users(conn: &mut DbConn, term: Option<&str>) -> Result<Vec<User>> {
    let term = term.map(str::trim).unwrap_or_default();
    if term.chars().count() < MIN_SEARCH_LEN {
        return Err(Error::BadRequest(format!(
            "Search term must be at least {} characters",
            MIN_SEARCH_LEN
        )));
    }
    users::search_users(conn, term, SEARCH_LIMIT).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration() -> RegisterUser {
        RegisterUser {
            first_name: "Ana".to_string(),
            last_name: "López".to_string(),
            email: "ana@example.com".to_string(),
            password: "Secret123".to_string(),
            phone_number: Some("55 1234 5678".to_string()),
            address: None,
            user_type: None,
        }
    }

    #[test]
    fn test_hash_and_verify_password() {
        let hash = hash_password("Secret123").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("Secret123", &hash).unwrap());
        assert!(!verify_password("Secret124", &hash).unwrap());
    }

    #[test]
    fn test_registration_defaults_to_client() {
        assert_eq!(validate_registration(&registration()).unwrap(), UserType::Client);
    }

    #[test]
    fn test_registration_accepts_nanny() {
        let request = RegisterUser {
            user_type: Some("nanny".to_string()),
            ..registration()
        };
        assert_eq!(validate_registration(&request).unwrap(), UserType::Nanny);
    }

    #[test]
    fn test_registration_rejects_admin_self_signup() {
        let request = RegisterUser {
            user_type: Some("admin".to_string()),
            ..registration()
        };
        assert!(matches!(validate_registration(&request), Err(Error::Validation(_))));
    }

    #[test]
    fn test_registration_collects_all_field_errors() {
        let request = RegisterUser {
            first_name: "A".to_string(),
            email: "nope".to_string(),
            password: "short".to_string(),
            ..registration()
        };
        match validate_registration(&request) {
            Err(Error::Validation(ValidationErrors::Multiple { fields })) => {
                assert!(fields.contains_key("first_name"));
                assert!(fields.contains_key("email"));
                assert!(fields.contains_key("password"));
            }
            other => panic!("expected multiple field errors, got {:?}", other),
        }
    }

    #[test]
    fn test_profile_update_validates_present_fields_only() {
        let update = UpdateUserProfile {
            address: Some("Calle 1".to_string()),
            ..Default::default()
        };
        assert!(validate_profile_update(&update).is_ok());

        let update = UpdateUserProfile {
            phone_number: Some("123".to_string()),
            ..Default::default()
        };
        assert!(validate_profile_update(&update).is_err());
    }
}
