use uuid::Uuid;

use crate::DbConn;
use crate::error::{Error, Result};
use crate::middleware::auth::AuthenticatedUser;
use crate::models::payments::{
    CreatePaymentRequest, NewPayment, Payment, PaymentDetails, PaymentStats, PaymentStatus,
    UpdatePaymentStatusRequest,
};
use crate::models::users::UserType;
use crate::queries::{clients, nannys, payments, services};
use crate::validation::{FieldErrors, validate_max_length};

fn payment_not_found(id: Uuid) -> Error {
    Error::NotFound(format!("Payment with ID {} not found", id))
}

/// Amount must be positive and the platform fee within `[0, amount]`.
pub fn validate_amounts(amount: f64, platform_fee: f64) -> Result<()> {
    let mut errors = FieldErrors::default();
    if !amount.is_finite() || amount <= 0.0 {
        errors.add("amount", "Amount must be greater than zero");
    }
    if !platform_fee.is_finite() || platform_fee < 0.0 {
        errors.add("platform_fee", "Platform fee cannot be negative");
    } else if amount.is_finite() && platform_fee > amount {
        errors.add("platform_fee", "Platform fee cannot exceed the amount");
    }
    errors.finish()
}

pub async fn list_payments(conn: &mut DbConn, status: Option<PaymentStatus>) -> Result<Vec<PaymentDetails>> {
    let rows = payments::list_payment_rows(conn, status).await?;
    Ok(rows.into_iter().map(PaymentDetails::from).collect())
}

pub async fn stats(conn: &mut DbConn) -> Result<PaymentStats> {
    payments::payment_stats(conn).await
}

/// Admins see every payment; clients and nannys only the ones they are party to.
pub async fn get_payment(conn: &mut DbConn, caller: &AuthenticatedUser, id: Uuid) -> Result<PaymentDetails> {
    let row = payments::get_payment_row(&mut *conn, id)
        .await?
        .ok_or_else(|| payment_not_found(id))?;

    let is_party = match caller.user_type {
        UserType::Admin => true,
        UserType::Client => row.client_user_id == caller.id,
        UserType::Nanny => row.nanny_user_id == caller.id,
    };
    if !is_party {
        return Err(Error::Forbidden("You do not have access to this payment".to_string()));
    }

    Ok(PaymentDetails::from(row))
}

pub async fn create_payment(
    conn: &mut DbConn,
    caller: &AuthenticatedUser,
    request: CreatePaymentRequest,
) -> Result<Payment> {
    let platform_fee = request.platform_fee.unwrap_or(0.0);
    let mut errors = FieldErrors::default();
    errors.check(validate_amounts(request.amount, platform_fee));
    if let Some(url) = &request.receipt_url {
        errors.check(validate_max_length("receipt_url", url, 500));
    }
    errors.finish()?;

    let service = services::get_service_by_id(&mut *conn, request.service_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Service with ID {} not found", request.service_id)))?;

    if !caller.is_admin() {
        let client = clients::get_client_by_user_id(&mut *conn, caller.id).await?;
        if client.map(|c| c.id) != Some(service.client_id) {
            return Err(Error::Forbidden("You can only pay for your own services".to_string()));
        }
    }

    let nanny_id = service
        .nanny_id
        .ok_or_else(|| Error::BadRequest("Service has no assigned nanny".to_string()))?;
    if nannys::get_nanny_by_id(&mut *conn, nanny_id).await?.is_none() {
        return Err(Error::NotFound("Nanny not found".to_string()));
    }

    let payment = payments::create_payment(
        conn,
        NewPayment {
            service_id: service.id,
            client_id: service.client_id,
            nanny_id,
            amount: request.amount,
            platform_fee,
            receipt_url: request.receipt_url.filter(|u| !u.trim().is_empty()),
        },
    )
    .await?;

    tracing::info!(
        payment_id = %payment.id,
        service_id = %payment.service_id,
        amount = payment.amount,
        "Payment created"
    );
    Ok(payment)
}

pub async fn update_status(conn: &mut DbConn, id: Uuid, request: UpdatePaymentStatusRequest) -> Result<Payment> {
    let transaction_id = request
        .transaction_id
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(transaction_id) = transaction_id {
        validate_max_length("transactionId", transaction_id, 255)?;
    }

    let payment = payments::update_payment_status(conn, id, request.payment_status, transaction_id).await?;
    tracing::info!(payment_id = %id, status = %payment.payment_status, "Payment status updated");
    Ok(payment)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_amounts() {
        assert!(validate_amounts(500.0, 50.0).is_ok());
        assert!(validate_amounts(500.0, 500.0).is_ok());
        assert!(validate_amounts(0.0, 0.0).is_err());
        assert!(validate_amounts(-10.0, 0.0).is_err());
        assert!(validate_amounts(100.0, -1.0).is_err());
        assert!(validate_amounts(100.0, 100.01).is_err());
        assert!(validate_amounts(f64::INFINITY, 0.0).is_err());
    }
}
