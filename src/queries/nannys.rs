use crate::{
    error::{Error, Result},
    models::nannys::{AvailableNanny, Nanny, NannyAvailability, NannyStatus, NannyWithUser, NewNanny},
};
use chrono::{NaiveDate, NaiveTime};
use uuid::Uuid;

use crate::DbConn;

const NANNY_COLUMNS: &str = "id, user_id, description, experience_years, hourly_rate, rating_average, \
     total_ratings, services_completed, status, created_at, updated_at";

const NANNY_WITH_USER_SELECT: &str = r#"
    SELECT n.id, n.user_id, n.description, n.experience_years, n.hourly_rate, n.rating_average,
           n.total_ratings, n.services_completed, n.status, n.created_at, n.updated_at,
           u.email, u.first_name, u.last_name, u.phone_number, u.address, u.profile_image,
           u.is_verified, u.is_active,
           COALESCE(na.is_available, TRUE) AS is_available
    FROM nannys n
    JOIN users u ON u.id = n.user_id
    LEFT JOIN nanny_availability na ON na.nanny_id = n.id
"#;

pub async fn create_nanny(conn: &mut DbConn, new_nanny: NewNanny) -> Result<Nanny> {
    sqlx::query_as::<_, Nanny>(&format!(
        r#"
        INSERT INTO nannys (user_id, description, experience_years, hourly_rate, status)
        VALUES ($1, $2, $3, $4, 'active')
        RETURNING {NANNY_COLUMNS}
        "#
    ))
    .bind(new_nanny.user_id)
    .bind(new_nanny.description.trim())
    .bind(new_nanny.experience_years)
    .bind(new_nanny.hourly_rate)
    .fetch_one(conn)
    .await
    .map_err(|e| {
        let error_msg = e.to_string().to_lowercase();
        if error_msg.contains("duplicate key") || error_msg.contains("nannys_user_id_key") {
            Error::BadRequest("Nanny profile already exists".to_string())
        } else {
            Error::Sqlx(e)
        }
    })
}

/// Creates the availability row, marked available.
pub async fn create_availability(conn: &mut DbConn, nanny_id: Uuid) -> Result<NannyAvailability> {
    sqlx::query_as::<_, NannyAvailability>(
        r#"
        INSERT INTO nanny_availability (nanny_id, is_available)
        VALUES ($1, TRUE)
        ON CONFLICT (nanny_id) DO UPDATE SET is_available = TRUE, reason = NULL, updated_at = now()
        RETURNING nanny_id, is_available, reason, updated_at
        "#,
    )
    .bind(nanny_id)
    .fetch_one(conn)
    .await
    .map_err(Error::Sqlx)
}

pub async fn set_availability(
    conn: &mut DbConn,
    nanny_id: Uuid,
    is_available: bool,
    reason: Option<&str>,
) -> Result<NannyAvailability> {
    sqlx::query_as::<_, NannyAvailability>(
        r#"
        INSERT INTO nanny_availability (nanny_id, is_available, reason)
        VALUES ($1, $2, $3)
        ON CONFLICT (nanny_id)
        DO UPDATE SET is_available = EXCLUDED.is_available, reason = EXCLUDED.reason, updated_at = now()
        RETURNING nanny_id, is_available, reason, updated_at
        "#,
    )
    .bind(nanny_id)
    .bind(is_available)
    .bind(reason)
    .fetch_one(conn)
    .await
    .map_err(Error::Sqlx)
}

pub async fn get_nanny_by_id(conn: &mut DbConn, id: Uuid) -> Result<Option<Nanny>> {
    sqlx::query_as::<_, Nanny>(&format!("SELECT {NANNY_COLUMNS} FROM nannys WHERE id = $1"))
        .bind(id)
        .fetch_optional(conn)
        .await
        .map_err(Error::Sqlx)
}

pub async fn get_nanny_by_user_id(conn: &mut DbConn, user_id: Uuid) -> Result<Option<Nanny>> {
    sqlx::query_as::<_, Nanny>(&format!("SELECT {NANNY_COLUMNS} FROM nannys WHERE user_id = $1"))
        .bind(user_id)
        .fetch_optional(conn)
        .await
        .map_err(Error::Sqlx)
}

pub async fn get_nanny_with_user(conn: &mut DbConn, id: Uuid) -> Result<Option<NannyWithUser>> {
    sqlx::query_as::<_, NannyWithUser>(&format!("{NANNY_WITH_USER_SELECT} WHERE n.id = $1"))
        .bind(id)
        .fetch_optional(conn)
        .await
        .map_err(Error::Sqlx)
}

pub async fn get_nanny_with_user_by_user_id(
    conn: &mut DbConn,
    user_id: Uuid,
) -> Result<Option<NannyWithUser>> {
    sqlx::query_as::<_, NannyWithUser>(&format!("{NANNY_WITH_USER_SELECT} WHERE n.user_id = $1"))
        .bind(user_id)
        .fetch_optional(conn)
        .await
        .map_err(Error::Sqlx)
}

/// All nannys with user fields, best rated first.
pub async fn list_nannys_with_user(conn: &mut DbConn) -> Result<Vec<NannyWithUser>> {
    sqlx::query_as::<_, NannyWithUser>(&format!(
        "{NANNY_WITH_USER_SELECT} ORDER BY n.rating_average DESC, u.first_name, u.last_name"
    ))
    .fetch_all(conn)
    .await
    .map_err(Error::Sqlx)
}

pub async fn update_nanny_status(conn: &mut DbConn, id: Uuid, status: NannyStatus) -> Result<Nanny> {
    sqlx::query_as::<_, Nanny>(&format!(
        r#"
        UPDATE nannys
        SET status = $2, updated_at = now()
        WHERE id = $1
        RETURNING {NANNY_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(status)
    .fetch_optional(conn)
    .await
    .map_err(Error::Sqlx)?
    .ok_or_else(|| Error::NotFound(format!("Nanny with ID {} not found", id)))
}

pub async fn increment_services_completed(conn: &mut DbConn, id: Uuid) -> Result<()> {
    sqlx::query(
        "UPDATE nannys SET services_completed = services_completed + 1, updated_at = now() WHERE id = $1",
    )
    .bind(id)
    .execute(conn)
    .await
    .map_err(Error::Sqlx)?;

    Ok(())
}

/// User ids and emails of every active, available nanny with an active account.
pub async fn list_notifiable_nannys(conn: &mut DbConn) -> Result<Vec<(Uuid, String, String)>> {
    sqlx::query_as::<_, (Uuid, String, String)>(
        r#"
        SELECT u.id, u.email, u.first_name
        FROM nannys n
        JOIN users u ON u.id = n.user_id
        LEFT JOIN nanny_availability na ON na.nanny_id = n.id
        WHERE n.status = 'active' AND u.is_active = TRUE AND COALESCE(na.is_available, TRUE)
        "#,
    )
    .fetch_all(conn)
    .await
    .map_err(Error::Sqlx)
}

/// Active, available nannys with no confirmed or in-progress service overlapping
/// the date range and daily time window.
pub async fn find_available_nannys(
    conn: &mut DbConn,
    start_date: NaiveDate,
    end_date: NaiveDate,
    start_time: NaiveTime,
    end_time: NaiveTime,
) -> Result<Vec<AvailableNanny>> {
    sqlx::query_as::<_, AvailableNanny>(
        r#"
        SELECT n.id AS nanny_id, n.user_id, u.first_name, u.last_name, u.profile_image,
               n.description, n.experience_years, n.hourly_rate, n.rating_average, n.total_ratings
        FROM nannys n
        JOIN users u ON u.id = n.user_id
        LEFT JOIN nanny_availability na ON na.nanny_id = n.id
        WHERE n.status = 'active'
          AND u.is_active = TRUE
          AND COALESCE(na.is_available, TRUE)
          AND NOT EXISTS (
              SELECT 1 FROM services s
              WHERE s.nanny_id = n.id
                AND s.status IN ('confirmed', 'in_progress')
                AND s.start_date <= $2
                AND COALESCE(s.end_date, s.start_date) >= $1
                AND s.start_time < $4
                AND s.end_time > $3
          )
        ORDER BY n.rating_average DESC, n.hourly_rate ASC
        "#,
    )
    .bind(start_date)
    .bind(end_date)
    .bind(start_time)
    .bind(end_time)
    .fetch_all(conn)
    .await
    .map_err(Error::Sqlx)
}

/// Nannys with user fields for the admin dashboard.
pub async fn list_dashboard_nannys(conn: &mut DbConn) -> Result<Vec<NannyWithUser>> {
    sqlx::query_as::<_, NannyWithUser>(&format!(
        "{NANNY_WITH_USER_SELECT} ORDER BY n.created_at DESC"
    ))
    .fetch_all(conn)
    .await
    .map_err(Error::Sqlx)
}
