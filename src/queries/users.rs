use crate::{
    error::{Error, Result, ValidationErrors},
    models::users::{NewUser, UpdateUserProfile, User, UserFilters},
};
use uuid::Uuid;

use crate::DbConn;

const USER_COLUMNS: &str = "id, email, password_hash, first_name, last_name, phone_number, address, \
     user_type, is_verified, is_active, profile_image, last_login, created_at, updated_at";

/// Maps a unique-violation on `users.email` to a field error.
pub(crate) fn map_email_conflict(e: sqlx::Error) -> Error {
    let error_msg = e.to_string().to_lowercase();
    if error_msg.contains("unique")
        || error_msg.contains("duplicate key")
        || error_msg.contains("users_email_key")
    {
        Error::Validation(ValidationErrors::field("email", "Email is already registered"))
    } else {
        Error::Sqlx(e)
    }
}

/// Creates a new user in the database.
pub async fn create_user(conn: &mut DbConn, new_user: NewUser) -> Result<User> {
    let user = sqlx::query_as::<_, User>(&format!(
        r#"
        INSERT INTO users (email, password_hash, first_name, last_name, phone_number, address,
                           user_type, is_verified, is_active)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(new_user.email.trim().to_lowercase())
    .bind(new_user.password_hash)
    .bind(new_user.first_name.trim())
    .bind(new_user.last_name.trim())
    .bind(new_user.phone_number)
    .bind(new_user.address)
    .bind(new_user.user_type)
    .bind(new_user.is_verified)
    .bind(new_user.is_active)
    .fetch_one(conn)
    .await
    .map_err(map_email_conflict)?;

    Ok(user)
}

/// Gets a single user by their ID. The user may not exist.
pub async fn get_user_by_id(conn: &mut DbConn, id: Uuid) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(conn)
    .await
    .map_err(Error::Sqlx)?;

    Ok(user)
}

/// Gets a single user by their email address (case-insensitive). The user may not exist.
pub async fn get_user_by_email(conn: &mut DbConn, email: &str) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
    ))
    .bind(email.trim().to_lowercase())
    .fetch_optional(conn)
    .await
    .map_err(Error::Sqlx)?;

    Ok(user)
}

pub async fn email_exists(conn: &mut DbConn, email: &str) -> Result<bool> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
        .bind(email.trim().to_lowercase())
        .fetch_one(conn)
        .await
        .map_err(Error::Sqlx)?;

    Ok(exists)
}

/// Case-insensitive substring search over names and email.
pub async fn search_users(conn: &mut DbConn, term: &str, limit: i64) -> Result<Vec<User>> {
    let pattern = format!("%{}%", term.trim());
    let users = sqlx::query_as::<_, User>(&format!(
        r#"
        SELECT {USER_COLUMNS}
        FROM users
        WHERE first_name ILIKE $1 OR last_name ILIKE $1 OR email ILIKE $1
        ORDER BY first_name, last_name
        LIMIT $2
        "#
    ))
    .bind(pattern)
    .bind(limit)
    .fetch_all(conn)
    .await
    .map_err(Error::Sqlx)?;

    Ok(users)
}

/// Lists users matching the filters, newest first, with the total count for pagination.
pub async fn list_users(
    conn: &mut DbConn,
    filters: &UserFilters,
    limit: i64,
    offset: i64,
) -> Result<(Vec<User>, i64)> {
    let filter_clause = r#"
        WHERE ($1::text IS NULL OR user_type = $1)
          AND ($2::boolean IS NULL OR is_active = $2)
          AND ($3::boolean IS NULL OR is_verified = $3)
    "#;
    let user_type = filters.user_type.map(|t| t.to_string());

    let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM users {filter_clause}"))
        .bind(user_type.as_deref())
        .bind(filters.is_active)
        .bind(filters.is_verified)
        .fetch_one(&mut *conn)
        .await
        .map_err(Error::Sqlx)?;

    let users = sqlx::query_as::<_, User>(&format!(
        r#"
        SELECT {USER_COLUMNS}
        FROM users
        {filter_clause}
        ORDER BY created_at DESC
        LIMIT $4 OFFSET $5
        "#
    ))
    .bind(user_type.as_deref())
    .bind(filters.is_active)
    .bind(filters.is_verified)
    .bind(limit)
    .bind(offset)
    .fetch_all(&mut *conn)
    .await
    .map_err(Error::Sqlx)?;

    Ok((users, total))
}

/// Updates profile fields, keeping stored values where the update has `None`.
pub async fn update_user_profile(
    conn: &mut DbConn,
    user_id: Uuid,
    update: &UpdateUserProfile,
) -> Result<User> {
    sqlx::query_as::<_, User>(&format!(
        r#"
        UPDATE users
        SET first_name = COALESCE($1, first_name),
            last_name = COALESCE($2, last_name),
            phone_number = COALESCE($3, phone_number),
            address = COALESCE($4, address),
            updated_at = now()
        WHERE id = $5
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(update.first_name.as_deref().map(str::trim))
    .bind(update.last_name.as_deref().map(str::trim))
    .bind(update.phone_number.as_deref().map(str::trim))
    .bind(update.address.as_deref().map(str::trim))
    .bind(user_id)
    .fetch_optional(conn)
    .await
    .map_err(Error::Sqlx)?
    .ok_or_else(|| Error::NotFound(format!("User with ID {} not found", user_id)))
}

/// Updates a user's password hash.
pub async fn update_user_password(conn: &mut DbConn, user_id: Uuid, password_hash: &str) -> Result<()> {
    let rows_affected = sqlx::query(
        r#"
        UPDATE users
        SET password_hash = $1, updated_at = now()
        WHERE id = $2
        "#,
    )
    .bind(password_hash)
    .bind(user_id)
    .execute(conn)
    .await
    .map_err(Error::Sqlx)?
    .rows_affected();

    if rows_affected == 0 {
        return Err(Error::NotFound(format!("User with ID {} not found", user_id)));
    }

    Ok(())
}

pub async fn update_profile_image(conn: &mut DbConn, user_id: Uuid, url: &str) -> Result<User> {
    sqlx::query_as::<_, User>(&format!(
        r#"
        UPDATE users
        SET profile_image = $1, updated_at = now()
        WHERE id = $2
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(url)
    .bind(user_id)
    .fetch_optional(conn)
    .await
    .map_err(Error::Sqlx)?
    .ok_or_else(|| Error::NotFound(format!("User with ID {} not found", user_id)))
}

pub async fn activate_user(conn: &mut DbConn, user_id: Uuid) -> Result<User> {
    sqlx::query_as::<_, User>(&format!(
        r#"
        UPDATE users
        SET is_active = TRUE, updated_at = now()
        WHERE id = $1
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(user_id)
    .fetch_optional(conn)
    .await
    .map_err(Error::Sqlx)?
    .ok_or_else(|| Error::NotFound(format!("User with ID {} not found", user_id)))
}

pub async fn set_verified(conn: &mut DbConn, user_id: Uuid, is_verified: bool) -> Result<()> {
    sqlx::query("UPDATE users SET is_verified = $1, updated_at = now() WHERE id = $2")
        .bind(is_verified)
        .bind(user_id)
        .execute(conn)
        .await
        .map_err(Error::Sqlx)?;

    Ok(())
}

pub async fn touch_last_login(conn: &mut DbConn, user_id: Uuid) -> Result<()> {
    sqlx::query("UPDATE users SET last_login = now() WHERE id = $1")
        .bind(user_id)
        .execute(conn)
        .await
        .map_err(Error::Sqlx)?;

    Ok(())
}

/// Deletes a user (cascades to role rows). Returns whether a row was removed.
pub async fn delete_user(conn: &mut DbConn, user_id: Uuid) -> Result<bool> {
    let rows_affected = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(user_id)
        .execute(conn)
        .await
        .map_err(Error::Sqlx)?
        .rows_affected();

    Ok(rows_affected > 0)
}
