use crate::{
    error::{Error, Result},
    models::bank_details::{BankDetail, BankDetailValues},
};
use uuid::Uuid;

use crate::DbConn;

const BANK_DETAIL_COLUMNS: &str = "id, account_holder_name, bank_name, account_number, clabe, \
     account_type, is_primary, is_active, created_at, updated_at";

pub async fn list_bank_details(conn: &mut DbConn) -> Result<Vec<BankDetail>> {
    sqlx::query_as::<_, BankDetail>(&format!(
        "SELECT {BANK_DETAIL_COLUMNS} FROM bank_details ORDER BY is_primary DESC, created_at DESC"
    ))
    .fetch_all(conn)
    .await
    .map_err(Error::Sqlx)
}

pub async fn get_bank_detail(conn: &mut DbConn, id: Uuid) -> Result<Option<BankDetail>> {
    sqlx::query_as::<_, BankDetail>(&format!(
        "SELECT {BANK_DETAIL_COLUMNS} FROM bank_details WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(conn)
    .await
    .map_err(Error::Sqlx)
}

/// Clears the primary flag on every account except `keep`.
pub async fn clear_primary(conn: &mut DbConn, keep: Option<Uuid>) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE bank_details
        SET is_primary = FALSE, updated_at = now()
        WHERE is_primary = TRUE AND ($1::uuid IS NULL OR id <> $1)
        "#,
    )
    .bind(keep)
    .execute(conn)
    .await
    .map_err(Error::Sqlx)?;

    Ok(())
}

pub async fn create_bank_detail(conn: &mut DbConn, values: &BankDetailValues) -> Result<BankDetail> {
    sqlx::query_as::<_, BankDetail>(&format!(
        r#"
        INSERT INTO bank_details (account_holder_name, bank_name, account_number, clabe,
                                  account_type, is_primary, is_active)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING {BANK_DETAIL_COLUMNS}
        "#
    ))
    .bind(&values.account_holder_name)
    .bind(&values.bank_name)
    .bind(&values.account_number)
    .bind(values.clabe.as_deref())
    .bind(values.account_type)
    .bind(values.is_primary)
    .bind(values.is_active)
    .fetch_one(conn)
    .await
    .map_err(Error::Sqlx)
}

pub async fn update_bank_detail(
    conn: &mut DbConn,
    id: Uuid,
    values: &BankDetailValues,
) -> Result<BankDetail> {
    sqlx::query_as::<_, BankDetail>(&format!(
        r#"
        UPDATE bank_details
        SET account_holder_name = $2,
            bank_name = $3,
            account_number = $4,
            clabe = $5,
            account_type = $6,
            is_primary = $7,
            is_active = $8,
            updated_at = now()
        WHERE id = $1
        RETURNING {BANK_DETAIL_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(&values.account_holder_name)
    .bind(&values.bank_name)
    .bind(&values.account_number)
    .bind(values.clabe.as_deref())
    .bind(values.account_type)
    .bind(values.is_primary)
    .bind(values.is_active)
    .fetch_optional(conn)
    .await
    .map_err(Error::Sqlx)?
    .ok_or_else(|| Error::NotFound(format!("Bank detail with ID {} not found", id)))
}

pub async fn delete_bank_detail(conn: &mut DbConn, id: Uuid) -> Result<bool> {
    let rows_affected = sqlx::query("DELETE FROM bank_details WHERE id = $1")
        .bind(id)
        .execute(conn)
        .await
        .map_err(Error::Sqlx)?
        .rows_affected();

    Ok(rows_affected > 0)
}

pub async fn toggle_bank_detail(conn: &mut DbConn, id: Uuid) -> Result<BankDetail> {
    sqlx::query_as::<_, BankDetail>(&format!(
        r#"
        UPDATE bank_details
        SET is_active = NOT is_active, updated_at = now()
        WHERE id = $1
        RETURNING {BANK_DETAIL_COLUMNS}
        "#
    ))
    .bind(id)
    .fetch_optional(conn)
    .await
    .map_err(Error::Sqlx)?
    .ok_or_else(|| Error::NotFound(format!("Bank detail with ID {} not found", id)))
}
