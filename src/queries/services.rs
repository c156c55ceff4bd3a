use crate::{
    error::{Error, Result},
    models::services::{
        NewService, Service, ServiceChanges, ServiceFilters, ServiceWithNames, UpcomingService,
    },
};
use chrono::{NaiveDate, NaiveDateTime};
use uuid::Uuid;

use crate::DbConn;

const SERVICE_COLUMNS: &str = "id, client_id, nanny_id, title, service_type, description, start_date, \
     end_date, start_time, end_time, total_hours, total_amount, number_of_children, \
     special_instructions, address, status, completed_at, created_at, updated_at";

pub(crate) const SERVICE_WITH_NAMES_SELECT: &str = r#"
    SELECT s.id, s.client_id, s.nanny_id, s.title, s.service_type, s.description, s.start_date,
           s.end_date, s.start_time, s.end_time, s.total_hours, s.total_amount,
           s.number_of_children, s.special_instructions, s.address, s.status, s.completed_at,
           s.created_at, s.updated_at,
           cu.id AS client_user_id, cu.first_name AS client_first_name,
           cu.last_name AS client_last_name,
           nu.id AS nanny_user_id, nu.first_name AS nanny_first_name,
           nu.last_name AS nanny_last_name,
           EXISTS (SELECT 1 FROM ratings r WHERE r.service_id = s.id) AS has_rating
    FROM services s
    JOIN clients c ON c.id = s.client_id
    JOIN users cu ON cu.id = c.user_id
    LEFT JOIN nannys n ON n.id = s.nanny_id
    LEFT JOIN users nu ON nu.id = n.user_id
"#;

/// Which services a caller is allowed to list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceScope {
    All,
    Client(Uuid),
    /// Services assigned to the nanny plus pending unassigned ones
    Nanny(Uuid),
}

pub async fn create_service(conn: &mut DbConn, new_service: NewService) -> Result<Service> {
    sqlx::query_as::<_, Service>(&format!(
        r#"
        INSERT INTO services (client_id, title, service_type, description, start_date, end_date,
                              start_time, end_time, total_hours, total_amount, number_of_children,
                              special_instructions, address, status)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 0, $10, $11, $12, 'pending')
        RETURNING {SERVICE_COLUMNS}
        "#
    ))
    .bind(new_service.client_id)
    .bind(new_service.title.trim())
    .bind(new_service.service_type)
    .bind(new_service.description)
    .bind(new_service.start_date)
    .bind(new_service.end_date)
    .bind(new_service.start_time)
    .bind(new_service.end_time)
    .bind(new_service.total_hours)
    .bind(new_service.number_of_children)
    .bind(new_service.special_instructions)
    .bind(new_service.address)
    .fetch_one(conn)
    .await
    .map_err(Error::Sqlx)
}

pub async fn get_service_by_id(conn: &mut DbConn, id: Uuid) -> Result<Option<Service>> {
    sqlx::query_as::<_, Service>(&format!("SELECT {SERVICE_COLUMNS} FROM services WHERE id = $1"))
        .bind(id)
        .fetch_optional(conn)
        .await
        .map_err(Error::Sqlx)
}

/// Locks the row for the rest of the transaction.
pub async fn get_service_for_update(conn: &mut DbConn, id: Uuid) -> Result<Option<Service>> {
    sqlx::query_as::<_, Service>(&format!(
        "SELECT {SERVICE_COLUMNS} FROM services WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(conn)
    .await
    .map_err(Error::Sqlx)
}

pub async fn get_service_with_names(conn: &mut DbConn, id: Uuid) -> Result<Option<ServiceWithNames>> {
    sqlx::query_as::<_, ServiceWithNames>(&format!("{SERVICE_WITH_NAMES_SELECT} WHERE s.id = $1"))
        .bind(id)
        .fetch_optional(conn)
        .await
        .map_err(Error::Sqlx)
}

/// Lists services newest first, restricted to what `scope` may see.
pub async fn list_services(
    conn: &mut DbConn,
    filters: &ServiceFilters,
    scope: ServiceScope,
    limit: i64,
) -> Result<Vec<ServiceWithNames>> {
    let (scope_client, scope_nanny) = match scope {
        ServiceScope::All => (None, None),
        ServiceScope::Client(id) => (Some(id), None),
        ServiceScope::Nanny(id) => (None, Some(id)),
    };

    sqlx::query_as::<_, ServiceWithNames>(&format!(
        r#"
        {SERVICE_WITH_NAMES_SELECT}
        WHERE ($1::uuid IS NULL OR s.client_id = $1)
          AND ($2::uuid IS NULL OR s.nanny_id = $2)
          AND ($3::text IS NULL OR s.status = $3)
          AND ($4::uuid IS NULL OR s.client_id = $4)
          AND ($5::uuid IS NULL OR s.nanny_id = $5 OR (s.nanny_id IS NULL AND s.status = 'pending'))
        ORDER BY s.created_at DESC
        LIMIT $6
        "#
    ))
    .bind(filters.client_id)
    .bind(filters.nanny_id)
    .bind(filters.status.map(|s| s.to_string()))
    .bind(scope_client)
    .bind(scope_nanny)
    .bind(limit)
    .fetch_all(conn)
    .await
    .map_err(Error::Sqlx)
}

pub async fn update_service(conn: &mut DbConn, id: Uuid, changes: &ServiceChanges) -> Result<Service> {
    sqlx::query_as::<_, Service>(&format!(
        r#"
        UPDATE services
        SET title = $2,
            description = $3,
            start_date = $4,
            end_date = $5,
            start_time = $6,
            end_time = $7,
            total_hours = $8,
            status = $9,
            special_instructions = $10,
            updated_at = now()
        WHERE id = $1
        RETURNING {SERVICE_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(changes.title.trim())
    .bind(changes.description.as_deref())
    .bind(changes.start_date)
    .bind(changes.end_date)
    .bind(changes.start_time)
    .bind(changes.end_time)
    .bind(changes.total_hours)
    .bind(changes.status)
    .bind(changes.special_instructions.as_deref())
    .fetch_optional(conn)
    .await
    .map_err(Error::Sqlx)?
    .ok_or_else(|| Error::NotFound(format!("Service with ID {} not found", id)))
}

pub async fn cancel_service(conn: &mut DbConn, id: Uuid) -> Result<()> {
    sqlx::query("UPDATE services SET status = 'cancelled', updated_at = now() WHERE id = $1")
        .bind(id)
        .execute(conn)
        .await
        .map_err(Error::Sqlx)?;

    Ok(())
}

/// Assigns a nanny to a pending service. Returns `None` when the service is
/// no longer pending.
pub async fn accept_service(
    conn: &mut DbConn,
    id: Uuid,
    nanny_id: Uuid,
    total_amount: f64,
) -> Result<Option<Service>> {
    sqlx::query_as::<_, Service>(&format!(
        r#"
        UPDATE services
        SET nanny_id = $2, status = 'confirmed', total_amount = $3, updated_at = now()
        WHERE id = $1 AND status = 'pending'
        RETURNING {SERVICE_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(nanny_id)
    .bind(total_amount)
    .fetch_optional(conn)
    .await
    .map_err(Error::Sqlx)
}

pub async fn complete_service(conn: &mut DbConn, id: Uuid) -> Result<Service> {
    sqlx::query_as::<_, Service>(&format!(
        r#"
        UPDATE services
        SET status = 'completed', completed_at = now(), updated_at = now()
        WHERE id = $1
        RETURNING {SERVICE_COLUMNS}
        "#
    ))
    .bind(id)
    .fetch_optional(conn)
    .await
    .map_err(Error::Sqlx)?
    .ok_or_else(|| Error::NotFound(format!("Service with ID {} not found", id)))
}

/// Whether the nanny already holds a confirmed or in-progress service whose
/// span overlaps `[span_start, span_end)`.
///
/// Stored spans run from `start_date + start_time` to
/// `COALESCE(end_date, start_date) + end_time`, moved one day later when that
/// end falls before the start (a single-day service running past midnight).
pub async fn has_schedule_conflict(
    conn: &mut DbConn,
    nanny_id: Uuid,
    exclude_service_id: Uuid,
    span_start: NaiveDateTime,
    span_end: NaiveDateTime,
) -> Result<bool> {
    let conflict: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM (
                SELECT start_date + start_time AS span_start,
                       COALESCE(end_date, start_date) + end_time
                         + CASE WHEN COALESCE(end_date, start_date) + end_time < start_date + start_time
                                THEN INTERVAL '1 day' ELSE INTERVAL '0' END AS span_end
                FROM services
                WHERE nanny_id = $1
                  AND id <> $2
                  AND status IN ('confirmed', 'in_progress')
            ) booked
            WHERE booked.span_start < $4
              AND booked.span_end > $3
        )
        "#,
    )
    .bind(nanny_id)
    .bind(exclude_service_id)
    .bind(span_start)
    .bind(span_end)
    .fetch_one(conn)
    .await
    .map_err(Error::Sqlx)?;

    Ok(conflict)
}

/// Confirmed services starting on `date` with an assigned nanny.
pub async fn list_upcoming_confirmed(conn: &mut DbConn, date: NaiveDate) -> Result<Vec<UpcomingService>> {
    sqlx::query_as::<_, UpcomingService>(
        r#"
        SELECT s.id, s.title, s.start_date, s.start_time, s.address,
               u.id AS nanny_user_id, u.email AS nanny_email, u.first_name AS nanny_first_name
        FROM services s
        JOIN nannys n ON n.id = s.nanny_id
        JOIN users u ON u.id = n.user_id
        WHERE s.status = 'confirmed' AND s.start_date = $1
        ORDER BY s.start_time
        "#,
    )
    .bind(date)
    .fetch_all(conn)
    .await
    .map_err(Error::Sqlx)
}

