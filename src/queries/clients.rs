use crate::{
    error::{Error, Result},
    models::clients::{
        Client, ClientData, ClientStats, ClientSummary, ClientWithUser, VerificationStatus,
    },
    models::payments::ClientPayment,
    models::services::{ServiceStatus, ServiceWithNames},
};
use uuid::Uuid;

use crate::DbConn;

const CLIENT_COLUMNS: &str = "id, user_id, emergency_contact_name, emergency_contact_phone, \
     number_of_children, special_requirements, identification_document, verification_status, \
     verification_date, created_at, updated_at";

const CLIENT_WITH_USER_SELECT: &str = r#"
    SELECT c.id, c.user_id, c.emergency_contact_name, c.emergency_contact_phone,
           c.number_of_children, c.special_requirements, c.identification_document,
           c.verification_status, c.verification_date, c.created_at, c.updated_at,
           u.email, u.first_name, u.last_name, u.phone_number, u.address, u.profile_image,
           u.is_verified, u.is_active
    FROM clients c
    JOIN users u ON u.id = c.user_id
"#;

pub async fn get_client_by_id(conn: &mut DbConn, id: Uuid) -> Result<Option<Client>> {
    sqlx::query_as::<_, Client>(&format!("SELECT {CLIENT_COLUMNS} FROM clients WHERE id = $1"))
        .bind(id)
        .fetch_optional(conn)
        .await
        .map_err(Error::Sqlx)
}

pub async fn get_client_by_user_id(conn: &mut DbConn, user_id: Uuid) -> Result<Option<Client>> {
    sqlx::query_as::<_, Client>(&format!("SELECT {CLIENT_COLUMNS} FROM clients WHERE user_id = $1"))
        .bind(user_id)
        .fetch_optional(conn)
        .await
        .map_err(Error::Sqlx)
}

pub async fn get_client_with_user_by_user_id(
    conn: &mut DbConn,
    user_id: Uuid,
) -> Result<Option<ClientWithUser>> {
    sqlx::query_as::<_, ClientWithUser>(&format!("{CLIENT_WITH_USER_SELECT} WHERE c.user_id = $1"))
        .bind(user_id)
        .fetch_optional(conn)
        .await
        .map_err(Error::Sqlx)
}

pub async fn get_client_with_user(conn: &mut DbConn, id: Uuid) -> Result<Option<ClientWithUser>> {
    sqlx::query_as::<_, ClientWithUser>(&format!("{CLIENT_WITH_USER_SELECT} WHERE c.id = $1"))
        .bind(id)
        .fetch_optional(conn)
        .await
        .map_err(Error::Sqlx)
}

pub async fn list_clients_with_user(conn: &mut DbConn) -> Result<Vec<ClientWithUser>> {
    sqlx::query_as::<_, ClientWithUser>(&format!("{CLIENT_WITH_USER_SELECT} ORDER BY c.created_at DESC"))
        .fetch_all(conn)
        .await
        .map_err(Error::Sqlx)
}

pub async fn create_client(conn: &mut DbConn, user_id: Uuid, data: &ClientData) -> Result<Client> {
    sqlx::query_as::<_, Client>(&format!(
        r#"
        INSERT INTO clients (user_id, emergency_contact_name, emergency_contact_phone,
                             number_of_children, special_requirements, identification_document,
                             verification_status)
        VALUES ($1, $2, $3, $4, $5, $6, 'pending')
        RETURNING {CLIENT_COLUMNS}
        "#
    ))
    .bind(user_id)
    .bind(&data.emergency_contact_name)
    .bind(&data.emergency_contact_phone)
    .bind(data.number_of_children)
    .bind(data.special_requirements.as_deref())
    .bind(data.identification_document.as_deref())
    .fetch_one(conn)
    .await
    .map_err(|e| {
        let error_msg = e.to_string().to_lowercase();
        if error_msg.contains("duplicate key") || error_msg.contains("clients_user_id_key") {
            Error::BadRequest("Client profile already exists".to_string())
        } else {
            Error::Sqlx(e)
        }
    })
}

/// Updates the client data. A new document resets verification to pending.
pub async fn update_client(conn: &mut DbConn, user_id: Uuid, data: &ClientData) -> Result<Client> {
    sqlx::query_as::<_, Client>(&format!(
        r#"
        UPDATE clients
        SET emergency_contact_name = $2,
            emergency_contact_phone = $3,
            number_of_children = $4,
            special_requirements = $5,
            identification_document = COALESCE($6, identification_document),
            verification_status = CASE WHEN $6 IS NULL THEN verification_status ELSE 'pending' END,
            verification_date = CASE WHEN $6 IS NULL THEN verification_date ELSE NULL END,
            updated_at = now()
        WHERE user_id = $1
        RETURNING {CLIENT_COLUMNS}
        "#
    ))
    .bind(user_id)
    .bind(&data.emergency_contact_name)
    .bind(&data.emergency_contact_phone)
    .bind(data.number_of_children)
    .bind(data.special_requirements.as_deref())
    .bind(data.identification_document.as_deref())
    .fetch_optional(conn)
    .await
    .map_err(Error::Sqlx)?
    .ok_or_else(|| Error::NotFound("Client profile not found".to_string()))
}

/// Partial update of client-only fields.
pub async fn patch_client(
    conn: &mut DbConn,
    user_id: Uuid,
    emergency_contact_name: Option<&str>,
    emergency_contact_phone: Option<&str>,
    number_of_children: Option<i32>,
    special_requirements: Option<&str>,
) -> Result<Client> {
    sqlx::query_as::<_, Client>(&format!(
        r#"
        UPDATE clients
        SET emergency_contact_name = COALESCE($2, emergency_contact_name),
            emergency_contact_phone = COALESCE($3, emergency_contact_phone),
            number_of_children = COALESCE($4, number_of_children),
            special_requirements = COALESCE($5, special_requirements),
            updated_at = now()
        WHERE user_id = $1
        RETURNING {CLIENT_COLUMNS}
        "#
    ))
    .bind(user_id)
    .bind(emergency_contact_name)
    .bind(emergency_contact_phone)
    .bind(number_of_children)
    .bind(special_requirements)
    .fetch_optional(conn)
    .await
    .map_err(Error::Sqlx)?
    .ok_or_else(|| Error::NotFound("Client profile not found".to_string()))
}

pub async fn set_verification_status(
    conn: &mut DbConn,
    client_id: Uuid,
    status: VerificationStatus,
) -> Result<Client> {
    sqlx::query_as::<_, Client>(&format!(
        r#"
        UPDATE clients
        SET verification_status = $2, verification_date = now(), updated_at = now()
        WHERE id = $1
        RETURNING {CLIENT_COLUMNS}
        "#
    ))
    .bind(client_id)
    .bind(status)
    .fetch_optional(conn)
    .await
    .map_err(Error::Sqlx)?
    .ok_or_else(|| Error::NotFound(format!("Client with ID {} not found", client_id)))
}

/// Services booked by a client, newest first, with nanny names and rating flag.
pub async fn list_client_services(
    conn: &mut DbConn,
    client_id: Uuid,
    status: Option<ServiceStatus>,
    limit: i64,
) -> Result<Vec<ServiceWithNames>> {
    sqlx::query_as::<_, ServiceWithNames>(&format!(
        r#"
        {}
        WHERE s.client_id = $1 AND ($2::text IS NULL OR s.status = $2)
        ORDER BY s.start_date DESC, s.start_time DESC
        LIMIT $3
        "#,
        crate::queries::services::SERVICE_WITH_NAMES_SELECT
    ))
    .bind(client_id)
    .bind(status.map(|s| s.to_string()))
    .bind(limit)
    .fetch_all(conn)
    .await
    .map_err(Error::Sqlx)
}

pub async fn list_client_payments(conn: &mut DbConn, client_id: Uuid) -> Result<Vec<ClientPayment>> {
    sqlx::query_as::<_, ClientPayment>(
        r#"
        SELECT p.id, p.service_id, p.amount, p.payment_status, p.payment_date, p.receipt_url,
               p.created_at, s.title AS service_title,
               nu.first_name AS nanny_first_name, nu.last_name AS nanny_last_name
        FROM payments p
        JOIN services s ON s.id = p.service_id
        JOIN nannys n ON n.id = p.nanny_id
        JOIN users nu ON nu.id = n.user_id
        WHERE p.client_id = $1
        ORDER BY p.created_at DESC
        "#,
    )
    .bind(client_id)
    .fetch_all(conn)
    .await
    .map_err(Error::Sqlx)
}

pub async fn client_stats(conn: &mut DbConn, client_id: Uuid) -> Result<ClientStats> {
    sqlx::query_as::<_, ClientStats>(
        r#"
        SELECT
            (SELECT COUNT(*) FROM services WHERE client_id = $1) AS total_services,
            (SELECT COUNT(*) FROM services WHERE client_id = $1 AND status = 'completed') AS completed_services,
            (SELECT COUNT(*) FROM services
              WHERE client_id = $1 AND status IN ('pending', 'confirmed')) AS pending_services,
            (SELECT COALESCE(SUM(amount), 0)::float8 FROM payments
              WHERE client_id = $1 AND payment_status = 'completed') AS total_spent,
            'MXN' AS currency,
            (SELECT COUNT(DISTINCT nanny_id) FROM services
              WHERE client_id = $1 AND nanny_id IS NOT NULL) AS unique_nannys
        "#,
    )
    .bind(client_id)
    .fetch_one(conn)
    .await
    .map_err(Error::Sqlx)
}

/// Client summaries for the admin dashboard.
pub async fn list_client_summaries(conn: &mut DbConn) -> Result<Vec<ClientSummary>> {
    sqlx::query_as::<_, ClientSummary>(
        r#"
        SELECT c.id, c.user_id, u.first_name, u.last_name, u.email, u.phone_number, u.address,
               u.is_verified, u.is_active, c.verification_status, c.number_of_children,
               COUNT(s.id) AS total_services,
               COUNT(s.id) FILTER (WHERE s.status = 'completed') AS completed_services,
               c.created_at
        FROM clients c
        JOIN users u ON u.id = c.user_id
        LEFT JOIN services s ON s.client_id = c.id
        GROUP BY c.id, u.id
        ORDER BY c.created_at DESC
        "#,
    )
    .fetch_all(conn)
    .await
    .map_err(Error::Sqlx)
}
