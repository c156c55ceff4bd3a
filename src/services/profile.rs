//! Role-specific profile completion and self-service profile updates.

use serde::Serialize;
use sqlx::Connection;
use uuid::Uuid;

use crate::DbConn;
use crate::error::{Error, Result};
use crate::models::clients::{ClientData, ClientWithUser, CompleteClientProfile};
use crate::models::nannys::{CompleteNannyProfile, NannyWithUser, NewNanny};
use crate::models::users::{UpdateUserProfile, User, UserType};
use crate::queries::{clients, nannys, users};
use crate::services::clients::validate_client_data;
use crate::services::nannys::check_professional_fields;
use crate::services::storage::{ImageStorage, UploadOptions, UploadedFile, extract_public_id};
use crate::services::users::{get_user, validate_profile_update};
use crate::validation::FieldErrors;

const PROFILE_FOLDER: &str = "profiles";
const PROFILE_TRANSFORMATION: &str = "c_limit,w_800,h_800";

/// The role row attached to a user, if any.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum RoleProfile {
    Client(ClientWithUser),
    Nanny(NannyWithUser),
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileStatus {
    pub user_type: UserType,
    pub profile_completed: bool,
    pub user_data: User,
    pub specific_profile: Option<RoleProfile>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileData {
    pub user: User,
    pub profile: Option<RoleProfile>,
}

/// Multipart body of `PUT /profile/update`.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdateForm {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub profile_image: Option<UploadedFile>,
}

async fn role_profile(conn: &mut DbConn, user: &User) -> Result<Option<RoleProfile>> {
    let profile = match user.user_type {
        UserType::Admin => None,
        UserType::Client => clients::get_client_with_user_by_user_id(conn, user.id)
            .await?
            .map(RoleProfile::Client),
        UserType::Nanny => nannys::get_nanny_with_user_by_user_id(conn, user.id)
            .await?
            .map(RoleProfile::Nanny),
    };
    Ok(profile)
}

/// Admins are always complete; clients and nannys once their role row exists.
pub async fn profile_status(conn: &mut DbConn, user_id: Uuid) -> Result<ProfileStatus> {
    let user = get_user(&mut *conn, user_id).await?;
    let specific_profile = role_profile(conn, &user).await?;

    Ok(ProfileStatus {
        user_type: user.user_type,
        profile_completed: user.is_admin() || specific_profile.is_some(),
        user_data: user,
        specific_profile,
    })
}

pub async fn profile_data(conn: &mut DbConn, user_id: Uuid) -> Result<ProfileData> {
    let user = get_user(&mut *conn, user_id).await?;
    let profile = role_profile(conn, &user).await?;
    Ok(ProfileData { user, profile })
}

fn already_completed() -> Error {
    Error::BadRequest("Profile is already completed".to_string())
}

pub async fn complete_client_profile(
    conn: &mut DbConn,
    user_id: Uuid,
    request: CompleteClientProfile,
) -> Result<ClientWithUser> {
    let data = ClientData {
        emergency_contact_name: request.emergency_contact_name.trim().to_string(),
        emergency_contact_phone: request.emergency_contact_phone.trim().to_string(),
        number_of_children: request.number_of_children.unwrap_or(0),
        special_requirements: request
            .special_requirements
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
        identification_document: None,
    };
    validate_client_data(&data)?;

    if clients::get_client_by_user_id(&mut *conn, user_id).await?.is_some() {
        return Err(already_completed());
    }

    let client = clients::create_client(&mut *conn, user_id, &data).await?;
    tracing::info!(user_id = %user_id, client_id = %client.id, "Client profile completed");

    clients::get_client_with_user(conn, client.id)
        .await?
        .ok_or_else(|| Error::NotFound("Client profile not found".to_string()))
}

pub async fn complete_nanny_profile(
    conn: &mut DbConn,
    user_id: Uuid,
    request: CompleteNannyProfile,
) -> Result<NannyWithUser> {
    let mut errors = FieldErrors::default();
    check_professional_fields(
        &mut errors,
        &request.description,
        request.experience_years,
        request.hourly_rate,
    );
    errors.finish()?;

    let mut tx = conn.begin().await.map_err(Error::Sqlx)?;

    if nannys::get_nanny_by_user_id(&mut tx, user_id).await?.is_some() {
        return Err(already_completed());
    }

    let nanny = nannys::create_nanny(
        &mut tx,
        NewNanny {
            user_id,
            description: request.description,
            experience_years: request.experience_years,
            hourly_rate: (request.hourly_rate * 100.0).round() / 100.0,
        },
    )
    .await?;
    nannys::create_availability(&mut tx, nanny.id).await?;
    let profile = nannys::get_nanny_with_user(&mut tx, nanny.id)
        .await?
        .ok_or_else(|| Error::NotFound("Nanny not found".to_string()))?;

    tx.commit().await.map_err(Error::Sqlx)?;

    tracing::info!(user_id = %user_id, nanny_id = %nanny.id, "Nanny profile completed");
    Ok(profile)
}

/// Updates contact fields and, when a file is sent, replaces the profile image.
pub async fn update_profile(
    conn: &mut DbConn,
    user_id: Uuid,
    form: ProfileUpdateForm,
    storage: &dyn ImageStorage,
) -> Result<User> {
    let update = UpdateUserProfile {
        first_name: form.first_name,
        last_name: form.last_name,
        phone_number: form.phone_number,
        address: form.address,
    };
    if update.is_empty() && form.profile_image.is_none() {
        return Err(Error::BadRequest("No fields to update".to_string()));
    }

    let mut errors = FieldErrors::default();
    errors.check(validate_profile_update(&update));
    if let Some(image) = &form.profile_image {
        errors.check(image.validate_image("profile_image"));
    }
    errors.finish()?;

    let current = get_user(&mut *conn, user_id).await?;

    let new_image = match form.profile_image {
        Some(image) => {
            let stored = storage
                .upload(
                    image.bytes,
                    UploadOptions {
                        folder: PROFILE_FOLDER.to_string(),
                        public_id: Some(format!("profile_{}", user_id)),
                        content_type: image.content_type,
                        file_name: image.file_name,
                        transformation: Some(PROFILE_TRANSFORMATION.to_string()),
                    },
                )
                .await?;

            let previous = current.profile_image.as_deref().and_then(extract_public_id);
            if let Some(previous) = previous.filter(|p| *p != stored.public_id) {
                if let Err(e) = storage.delete(&previous).await {
                    tracing::warn!(user_id = %user_id, public_id = %previous, error = %e, "Failed to delete previous profile image");
                }
            }
            Some(stored.url)
        }
        None => None,
    };

    let mut tx = conn.begin().await.map_err(Error::Sqlx)?;
    let mut user = current;
    if !update.is_empty() {
        user = users::update_user_profile(&mut tx, user_id, &update).await?;
    }
    if let Some(url) = &new_image {
        user = users::update_profile_image(&mut tx, user_id, url).await?;
    }
    tx.commit().await.map_err(Error::Sqlx)?;

    tracing::info!(user_id = %user_id, image_updated = new_image.is_some(), "Profile updated");
    Ok(user)
}
