use sqlx::Connection;
use uuid::Uuid;

use crate::DbConn;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::models::nannys::{
    CreateNannyRequest, Nanny, NannyAvailability, NannyStatus, NannyWithUser, NewNanny,
    UpdateAvailabilityRequest,
};
use crate::models::users::{NewUser, UserType};
use crate::queries::{nannys, users};
use crate::services::email::{self, EmailSender};
use crate::services::users::hash_password;
use crate::validation::{
    FieldErrors, validate_email, validate_length_between, validate_max_length,
    validate_mexican_phone, validate_password, validate_person_name, validate_range,
};

fn nanny_not_found() -> Error {
    Error::NotFound("Nanny not found".to_string())
}

/// Professional profile fields, shared with profile completion.
pub fn check_professional_fields(
    errors: &mut FieldErrors,
    description: &str,
    experience_years: i32,
    hourly_rate: f64,
) {
    errors.check(validate_length_between("description", description, 50, 2000));
    errors.check(validate_range("experience_years", experience_years, 0, 50));
    if !hourly_rate.is_finite() {
        errors.add("hourly_rate", "Hourly rate must be a number");
    } else {
        errors.check(validate_range("hourly_rate", hourly_rate, 0.0, 9999.99));
    }
}

pub fn validate_create_nanny(request: &CreateNannyRequest) -> Result<()> {
    let mut errors = FieldErrors::default();
    errors.check(validate_person_name("first_name", &request.first_name));
    errors.check(validate_person_name("last_name", &request.last_name));
    errors.check(validate_email("email", &request.email));
    errors.check(validate_password("password", &request.password));
    if let Some(phone) = request.phone_number.as_deref().filter(|p| !p.trim().is_empty()) {
        errors.check(validate_mexican_phone("phone_number", phone));
    }
    if let Some(address) = &request.address {
        errors.check(validate_max_length("address", address, 500));
    }
    check_professional_fields(
        &mut errors,
        &request.description,
        request.experience_years,
        request.hourly_rate,
    );
    errors.finish()
}

/// Creates a verified, active nanny account with its profile and availability,
/// then emails the credentials.
pub async fn create_nanny(
    conn: &mut DbConn,
    request: CreateNannyRequest,
    config: &Config,
    mailer: &dyn EmailSender,
) -> Result<NannyWithUser> {
    validate_create_nanny(&request)?;

    let password_hash = hash_password(&request.password)?;

    let mut tx = conn.begin().await.map_err(Error::Sqlx)?;

    if users::email_exists(&mut tx, &request.email).await? {
        return Err(Error::Conflict("Email is already registered".to_string()));
    }

    let user = users::create_user(
        &mut tx,
        NewUser {
            email: request.email.clone(),
            password_hash,
            first_name: request.first_name.trim().to_string(),
            last_name: request.last_name.trim().to_string(),
            phone_number: request.phone_number.filter(|p| !p.trim().is_empty()),
            address: request.address.filter(|a| !a.trim().is_empty()),
            user_type: UserType::Nanny,
            is_verified: true,
            is_active: true,
        },
    )
    .await
    .map_err(|e| match e {
        // Lost a race with a concurrent signup
        Error::Validation(_) => Error::Conflict("Email is already registered".to_string()),
        other => other,
    })?;

    let nanny = nannys::create_nanny(
        &mut tx,
        NewNanny {
            user_id: user.id,
            description: request.description,
            experience_years: request.experience_years,
            hourly_rate: request.hourly_rate,
        },
    )
    .await?;
    nannys::create_availability(&mut tx, nanny.id).await?;

    let created = nannys::get_nanny_with_user(&mut tx, nanny.id)
        .await?
        .ok_or_else(nanny_not_found)?;

    tx.commit().await.map_err(Error::Sqlx)?;

    tracing::info!(nanny_id = %nanny.id, user_id = %user.id, "Nanny created");

    let login_link = format!("{}/login", config.server.frontend_url.trim_end_matches('/'));
    email::send_best_effort(
        mailer,
        email::nanny_credentials_email(&user.email, &user.first_name, &request.password, &login_link),
    )
    .await;

    Ok(created)
}

pub async fn list_nannys(conn: &mut DbConn) -> Result<Vec<NannyWithUser>> {
    nannys::list_nannys_with_user(conn).await
}

pub async fn get_nanny(conn: &mut DbConn, id: Uuid) -> Result<NannyWithUser> {
    nannys::get_nanny_with_user(conn, id)
        .await?
        .ok_or_else(nanny_not_found)
}

pub async fn get_nanny_by_user(conn: &mut DbConn, user_id: Uuid) -> Result<NannyWithUser> {
    nannys::get_nanny_with_user_by_user_id(conn, user_id)
        .await?
        .ok_or_else(nanny_not_found)
}

pub async fn update_status(conn: &mut DbConn, id: Uuid, status: NannyStatus) -> Result<Nanny> {
    let nanny = nannys::update_nanny_status(conn, id, status).await?;
    tracing::info!(nanny_id = %id, status = %status, "Nanny status updated");
    Ok(nanny)
}

/// Loads a nanny so the caller can check ownership before changing availability.
pub async fn require_nanny(conn: &mut DbConn, id: Uuid) -> Result<Nanny> {
    nannys::get_nanny_by_id(conn, id).await?.ok_or_else(nanny_not_found)
}

pub async fn update_availability(
    conn: &mut DbConn,
    id: Uuid,
    request: UpdateAvailabilityRequest,
) -> Result<NannyAvailability> {
    if let Some(reason) = &request.reason {
        validate_max_length("reason", reason, 255)?;
    }
    let reason = request
        .reason
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty());

    let availability = nannys::set_availability(conn, id, request.is_available, reason).await?;
    tracing::info!(nanny_id = %id, is_available = request.is_available, "Nanny availability updated");
    Ok(availability)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CreateNannyRequest {
        CreateNannyRequest {
            first_name: "Lucía".to_string(),
            last_name: "Hernández".to_string(),
            email: "lucia@example.com".to_string(),
            password: "Secreta123".to_string(),
            phone_number: Some("+52 55 1234 5678".to_string()),
            address: None,
            description: "Niñera con experiencia en cuidado de bebés y niños en edad preescolar.".to_string(),
            experience_years: 5,
            hourly_rate: 150.0,
        }
    }

    #[test]
    fn test_valid_nanny_request() {
        assert!(validate_create_nanny(&request()).is_ok());
    }

    #[test]
    fn test_short_description_is_rejected() {
        let mut r = request();
        r.description = "Muy corta".to_string();
        assert!(validate_create_nanny(&r).is_err());
    }

    #[test]
    fn test_rate_and_experience_bounds() {
        let mut r = request();
        r.hourly_rate = 10_000.0;
        assert!(validate_create_nanny(&r).is_err());

        let mut r = request();
        r.experience_years = 51;
        assert!(validate_create_nanny(&r).is_err());

        let mut r = request();
        r.hourly_rate = f64::NAN;
        assert!(validate_create_nanny(&r).is_err());
    }
}
