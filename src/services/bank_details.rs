use sqlx::Connection;
use uuid::Uuid;

use crate::DbConn;
use crate::error::{Error, Result};
use crate::models::bank_details::{AccountType, BankDetail, BankDetailRequest, BankDetailValues};
use crate::queries::bank_details;
use crate::validation::{FieldErrors, required_trimmed, validate_clabe, validate_max_length};

fn bank_detail_not_found(id: Uuid) -> Error {
    Error::NotFound(format!("Bank detail with ID {} not found", id))
}

fn required(errors: &mut FieldErrors, field: &str, value: &str, max: usize) -> String {
    match required_trimmed(field, value) {
        Ok(trimmed) => {
            errors.check(validate_max_length(field, &trimmed, max));
            trimmed
        }
        Err(e) => {
            errors.check(Err(e));
            String::new()
        }
    }
}

/// Trims and validates a create/update body. Responses use camelCase, so do field names.
pub fn validate_request(request: BankDetailRequest) -> Result<BankDetailValues> {
    let mut errors = FieldErrors::default();

    let account_holder_name = required(&mut errors, "accountHolderName", &request.account_holder_name, 255);
    let bank_name = required(&mut errors, "bankName", &request.bank_name, 100);
    let account_number = required(&mut errors, "accountNumber", &request.account_number, 50);

    let clabe = request
        .clabe
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty());
    if let Some(clabe) = &clabe {
        errors.check(validate_clabe("clabe", clabe));
    }
    errors.finish()?;

    Ok(BankDetailValues {
        account_holder_name,
        bank_name,
        account_number,
        clabe,
        account_type: request.account_type.unwrap_or(AccountType::Checking),
        is_primary: request.is_primary.unwrap_or(false),
        is_active: request.is_active.unwrap_or(true),
    })
}

pub async fn list(conn: &mut DbConn) -> Result<Vec<BankDetail>> {
    bank_details::list_bank_details(conn).await
}

pub async fn get(conn: &mut DbConn, id: Uuid) -> Result<BankDetail> {
    bank_details::get_bank_detail(conn, id)
        .await?
        .ok_or_else(|| bank_detail_not_found(id))
}

/// Creates an account. A new primary demotes the previous one in the same transaction.
pub async fn create(conn: &mut DbConn, request: BankDetailRequest) -> Result<BankDetail> {
    let values = validate_request(request)?;

    let mut tx = conn.begin().await.map_err(Error::Sqlx)?;
    if values.is_primary {
        bank_details::clear_primary(&mut tx, None).await?;
    }
    let created = bank_details::create_bank_detail(&mut tx, &values).await?;
    tx.commit().await.map_err(Error::Sqlx)?;

    tracing::info!(bank_detail_id = %created.id, is_primary = created.is_primary, "Bank detail created");
    Ok(created)
}

pub async fn update(conn: &mut DbConn, id: Uuid, request: BankDetailRequest) -> Result<BankDetail> {
    let values = validate_request(request)?;

    let mut tx = conn.begin().await.map_err(Error::Sqlx)?;
    if bank_details::get_bank_detail(&mut tx, id).await?.is_none() {
        return Err(bank_detail_not_found(id));
    }
    if values.is_primary {
        bank_details::clear_primary(&mut tx, Some(id)).await?;
    }
    let updated = bank_details::update_bank_detail(&mut tx, id, &values).await?;
    tx.commit().await.map_err(Error::Sqlx)?;

    tracing::info!(bank_detail_id = %id, "Bank detail updated");
    Ok(updated)
}

pub async fn delete(conn: &mut DbConn, id: Uuid) -> Result<()> {
    if !bank_details::delete_bank_detail(conn, id).await? {
        return Err(bank_detail_not_found(id));
    }
    tracing::info!(bank_detail_id = %id, "Bank detail deleted");
    Ok(())
}

pub async fn toggle_status(conn: &mut DbConn, id: Uuid) -> Result<BankDetail> {
    let detail = bank_details::toggle_bank_detail(conn, id).await?;
    tracing::info!(bank_detail_id = %id, is_active = detail.is_active, "Bank detail status toggled");
    Ok(detail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationErrors;

    fn request() -> BankDetailRequest {
        BankDetailRequest {
            account_holder_name: "  NannysLM S.A. de C.V. ".to_string(),
            bank_name: "BBVA".to_string(),
            account_number: "0123456789".to_string(),
            clabe: Some("012180001234567891".to_string()),
            account_type: None,
            is_primary: Some(true),
            is_active: None,
        }
    }

    #[test]
    fn test_values_are_trimmed_and_defaulted() {
        let values = validate_request(request()).unwrap();
        assert_eq!(values.account_holder_name, "NannysLM S.A. de C.V.");
        assert_eq!(values.account_type, AccountType::Checking);
        assert!(values.is_primary);
        assert!(values.is_active);
    }

    #[test]
    fn test_blank_clabe_is_dropped() {
        let mut r = request();
        r.clabe = Some("   ".to_string());
        assert!(validate_request(r).unwrap().clabe.is_none());
    }

    #[test]
    fn test_invalid_fields_are_reported() {
        let mut r = request();
        r.bank_name = " ".to_string();
        r.clabe = Some("12345".to_string());

        match validate_request(r) {
            Err(Error::Validation(ValidationErrors::Multiple { fields })) => {
                assert!(fields.contains_key("bankName"));
                assert!(fields.contains_key("clabe"));
                assert!(!fields.contains_key("accountNumber"));
            }
            other => panic!("expected validation error, got {:?}", other.map(|v| v.bank_name)),
        }
    }
}
