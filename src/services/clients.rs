use sqlx::Connection;
use uuid::Uuid;

use crate::DbConn;
use crate::error::{Error, Result};
use crate::models::clients::{
    Client, ClientData, ClientStats, ClientWithUser, UpdateClientProfile, VerificationStatus,
    VerifyClientRequest,
};
use crate::models::notifications::{NewNotification, NotificationType};
use crate::models::payments::ClientPayment;
use crate::models::services::{ServiceStatus, ServiceWithNames};
use crate::models::users::UpdateUserProfile;
use crate::queries::{clients, users};
use crate::services::email::{self, EmailSender};
use crate::services::notifications::notify;
use crate::services::storage::{ImageStorage, UploadOptions, UploadedFile};
use crate::services::users::validate_profile_update;
use crate::validation::{
    FieldErrors, validate_contact_phone, validate_max_length, validate_person_name, validate_range,
};

pub const DEFAULT_SERVICES_LIMIT: i64 = 50;
pub const MAX_SERVICES_LIMIT: i64 = 100;

const DOCUMENT_FOLDER: &str = "identifications";

/// Multipart body of `POST /client/data`, as read from the form fields.
#[derive(Debug, Clone, Default)]
pub struct ClientDataForm {
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
    pub number_of_children: Option<String>,
    pub special_requirements: Option<String>,
    pub identification_document: Option<UploadedFile>,
}

/// Result of the client-data upsert; `created` selects 201 over 200.
#[derive(Debug, Clone)]
pub struct ClientDataOutcome {
    pub client: Client,
    pub created: bool,
}

fn client_not_found() -> Error {
    Error::NotFound("Client profile not found".to_string())
}

/// Rules shared by the client-data upsert and profile completion.
pub fn validate_client_data(data: &ClientData) -> Result<()> {
    let mut errors = FieldErrors::default();
    errors.check(validate_person_name("emergency_contact_name", &data.emergency_contact_name));
    errors.check(validate_contact_phone("emergency_contact_phone", &data.emergency_contact_phone));
    errors.check(validate_range("number_of_children", data.number_of_children, 0, 20));
    if let Some(requirements) = &data.special_requirements {
        errors.check(validate_max_length("special_requirements", requirements, 500));
    }
    errors.finish()
}

/// Turns the raw multipart fields into validated client data (without the document URL).
pub fn parse_client_form(form: &ClientDataForm) -> Result<ClientData> {
    let mut errors = FieldErrors::default();

    let number_of_children = match form.number_of_children.as_deref().map(str::trim) {
        None | Some("") => 0,
        Some(raw) => match raw.parse::<i32>() {
            Ok(n) => n,
            Err(_) => {
                errors.add("number_of_children", "Must be a whole number");
                0
            }
        },
    };

    let data = ClientData {
        emergency_contact_name: form.emergency_contact_name.as_deref().unwrap_or_default().trim().to_string(),
        emergency_contact_phone: form.emergency_contact_phone.as_deref().unwrap_or_default().trim().to_string(),
        number_of_children,
        special_requirements: form
            .special_requirements
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        identification_document: None,
    };

    errors.check(validate_client_data(&data));
    if let Some(document) = &form.identification_document {
        errors.check(document.validate_document("identification_document"));
    }
    errors.finish()?;

    Ok(data)
}

pub async fn get_client_data(conn: &mut DbConn, user_id: Uuid) -> Result<Option<ClientWithUser>> {
    clients::get_client_with_user_by_user_id(conn, user_id).await
}

/// Creates or updates the caller's client data, uploading the identification document if present.
pub async fn upsert_client_data(
    conn: &mut DbConn,
    user_id: Uuid,
    mut form: ClientDataForm,
    storage: &dyn ImageStorage,
) -> Result<ClientDataOutcome> {
    let mut data = parse_client_form(&form)?;

    if let Some(document) = form.identification_document.take() {
        let stored = storage
            .upload(
                document.bytes,
                UploadOptions {
                    folder: DOCUMENT_FOLDER.to_string(),
                    public_id: None,
                    content_type: document.content_type,
                    file_name: document.file_name,
                    transformation: None,
                },
            )
            .await?;
        tracing::info!(user_id = %user_id, public_id = %stored.public_id, "Identification document uploaded");
        data.identification_document = Some(stored.url);
    }

    let existing = clients::get_client_by_user_id(&mut *conn, user_id).await?;
    let outcome = match existing {
        Some(_) => ClientDataOutcome {
            client: clients::update_client(&mut *conn, user_id, &data).await?,
            created: false,
        },
        None => ClientDataOutcome {
            client: clients::create_client(&mut *conn, user_id, &data).await?,
            created: true,
        },
    };

    tracing::info!(
        user_id = %user_id,
        client_id = %outcome.client.id,
        created = outcome.created,
        "Client data saved"
    );
    Ok(outcome)
}

pub async fn list_clients(conn: &mut DbConn) -> Result<Vec<ClientWithUser>> {
    clients::list_clients_with_user(conn).await
}

/// Approves or rejects a client's identification, then notifies and emails them.
pub async fn verify_client(
    conn: &mut DbConn,
    client_id: Uuid,
    request: VerifyClientRequest,
    mailer: &dyn EmailSender,
) -> Result<Client> {
    if request.status == VerificationStatus::Pending {
        return Err(Error::BadRequest("Status must be verified or rejected".to_string()));
    }
    let approved = request.status == VerificationStatus::Verified;
    let reason = request
        .reason
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty());

    let profile = clients::get_client_with_user(&mut *conn, client_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Client with ID {} not found", client_id)))?;

    let mut tx = conn.begin().await.map_err(Error::Sqlx)?;

    let client = clients::set_verification_status(&mut tx, client_id, request.status).await?;
    if approved {
        users::set_verified(&mut tx, client.user_id, true).await?;
    }

    let notification = if approved {
        NewNotification::new(
            client.user_id,
            NotificationType::Success,
            "Cuenta verificada",
            "Tu identificación fue aprobada. Ya puedes solicitar servicios.",
        )
    } else {
        NewNotification::new(
            client.user_id,
            NotificationType::Warning,
            "Verificación rechazada",
            match reason {
                Some(reason) => format!("Tu identificación fue rechazada. Motivo: {}", reason),
                None => "Tu identificación fue rechazada. Sube un documento válido.".to_string(),
            },
        )
    };
    notify(&mut tx, notification.related_to("client", client.id)).await?;

    tx.commit().await.map_err(Error::Sqlx)?;

    tracing::info!(
        client_id = %client_id,
        status = %request.status,
        "Client verification updated"
    );

    email::send_best_effort(
        mailer,
        email::client_verification_email(&profile.email, &profile.first_name, approved, reason),
    )
    .await;

    Ok(client)
}

/// Updates user and client fields of the caller in one transaction.
pub async fn update_client_profile(
    conn: &mut DbConn,
    user_id: Uuid,
    update: UpdateClientProfile,
) -> Result<ClientWithUser> {
    let user_update = UpdateUserProfile {
        first_name: update.first_name,
        last_name: update.last_name,
        phone_number: update.phone_number,
        address: update.address,
    };
    let touches_client = update.emergency_contact_name.is_some()
        || update.emergency_contact_phone.is_some()
        || update.number_of_children.is_some()
        || update.special_requirements.is_some();

    if user_update.is_empty() && !touches_client {
        return Err(Error::BadRequest("No fields to update".to_string()));
    }

    let mut errors = FieldErrors::default();
    errors.check(validate_profile_update(&user_update));
    if let Some(name) = &update.emergency_contact_name {
        errors.check(validate_person_name("emergency_contact_name", name));
    }
    if let Some(phone) = &update.emergency_contact_phone {
        errors.check(validate_contact_phone("emergency_contact_phone", phone));
    }
    if let Some(children) = update.number_of_children {
        errors.check(validate_range("number_of_children", children, 0, 20));
    }
    if let Some(requirements) = &update.special_requirements {
        errors.check(validate_max_length("special_requirements", requirements, 500));
    }
    errors.finish()?;

    let mut tx = conn.begin().await.map_err(Error::Sqlx)?;

    if clients::get_client_by_user_id(&mut tx, user_id).await?.is_none() {
        return Err(client_not_found());
    }
    if !user_update.is_empty() {
        users::update_user_profile(&mut tx, user_id, &user_update).await?;
    }
    if touches_client {
        clients::patch_client(
            &mut tx,
            user_id,
            update.emergency_contact_name.as_deref().map(str::trim),
            update.emergency_contact_phone.as_deref().map(str::trim),
            update.number_of_children,
            update.special_requirements.as_deref().map(str::trim),
        )
        .await?;
    }
    let profile = clients::get_client_with_user_by_user_id(&mut tx, user_id)
        .await?
        .ok_or_else(client_not_found)?;

    tx.commit().await.map_err(Error::Sqlx)?;

    tracing::info!(user_id = %user_id, "Client profile updated");
    Ok(profile)
}

pub async fn get_client_info(conn: &mut DbConn, user_id: Uuid) -> Result<ClientWithUser> {
    clients::get_client_with_user_by_user_id(conn, user_id)
        .await?
        .ok_or_else(client_not_found)
}

async fn require_client(conn: &mut DbConn, user_id: Uuid) -> Result<Client> {
    clients::get_client_by_user_id(conn, user_id)
        .await?
        .ok_or_else(client_not_found)
}

pub fn clamp_services_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_SERVICES_LIMIT).clamp(1, MAX_SERVICES_LIMIT)
}

pub async fn list_my_services(
    conn: &mut DbConn,
    user_id: Uuid,
    status: Option<ServiceStatus>,
    limit: Option<i64>,
) -> Result<Vec<ServiceWithNames>> {
    let client = require_client(&mut *conn, user_id).await?;
    clients::list_client_services(conn, client.id, status, clamp_services_limit(limit)).await
}

pub async fn list_my_payments(conn: &mut DbConn, user_id: Uuid) -> Result<Vec<ClientPayment>> {
    let client = require_client(&mut *conn, user_id).await?;
    clients::list_client_payments(conn, client.id).await
}

pub async fn my_stats(conn: &mut DbConn, user_id: Uuid) -> Result<ClientStats> {
    let client = require_client(&mut *conn, user_id).await?;
    clients::client_stats(conn, client.id).await
}
