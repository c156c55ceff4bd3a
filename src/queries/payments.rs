use crate::{
    error::{Error, Result},
    models::payments::{NewPayment, Payment, PaymentRow, PaymentStats, PaymentStatus},
};
use uuid::Uuid;

use crate::DbConn;

const PAYMENT_COLUMNS: &str = "id, service_id, client_id, nanny_id, amount, payment_status, \
     transaction_id, platform_fee, nanny_amount, payment_date, receipt_url, created_at, updated_at";

const PAYMENT_ROW_SELECT: &str = r#"
    SELECT p.id, p.service_id, p.client_id, p.nanny_id, p.amount, p.payment_status,
           p.transaction_id, p.platform_fee, p.nanny_amount, p.payment_date, p.receipt_url,
           p.created_at, p.updated_at,
           cu.id AS client_user_id, cu.first_name AS client_first_name,
           cu.last_name AS client_last_name, cu.email AS client_email,
           nu.id AS nanny_user_id, nu.first_name AS nanny_first_name,
           nu.last_name AS nanny_last_name,
           s.title AS service_title, s.start_date AS service_start_date,
           s.total_hours AS service_total_hours
    FROM payments p
    JOIN clients c ON c.id = p.client_id
    JOIN users cu ON cu.id = c.user_id
    JOIN nannys n ON n.id = p.nanny_id
    JOIN users nu ON nu.id = n.user_id
    JOIN services s ON s.id = p.service_id
"#;

pub async fn create_payment(conn: &mut DbConn, new_payment: NewPayment) -> Result<Payment> {
    sqlx::query_as::<_, Payment>(&format!(
        r#"
        INSERT INTO payments (service_id, client_id, nanny_id, amount, payment_status,
                              platform_fee, nanny_amount, receipt_url)
        VALUES ($1, $2, $3, $4, 'pending', $5, $6, $7)
        RETURNING {PAYMENT_COLUMNS}
        "#
    ))
    .bind(new_payment.service_id)
    .bind(new_payment.client_id)
    .bind(new_payment.nanny_id)
    .bind(new_payment.amount)
    .bind(new_payment.platform_fee)
    .bind(new_payment.amount - new_payment.platform_fee)
    .bind(new_payment.receipt_url)
    .fetch_one(conn)
    .await
    .map_err(Error::Sqlx)
}

pub async fn get_payment_row(conn: &mut DbConn, id: Uuid) -> Result<Option<PaymentRow>> {
    sqlx::query_as::<_, PaymentRow>(&format!("{PAYMENT_ROW_SELECT} WHERE p.id = $1"))
        .bind(id)
        .fetch_optional(conn)
        .await
        .map_err(Error::Sqlx)
}

pub async fn list_payment_rows(conn: &mut DbConn, status: Option<PaymentStatus>) -> Result<Vec<PaymentRow>> {
    sqlx::query_as::<_, PaymentRow>(&format!(
        r#"
        {PAYMENT_ROW_SELECT}
        WHERE ($1::text IS NULL OR p.payment_status = $1)
        ORDER BY p.created_at DESC
        "#
    ))
    .bind(status.map(|s| s.to_string()))
    .fetch_all(conn)
    .await
    .map_err(Error::Sqlx)
}

/// Sets the status; completing a payment stamps `payment_date`.
pub async fn update_payment_status(
    conn: &mut DbConn,
    id: Uuid,
    status: PaymentStatus,
    transaction_id: Option<&str>,
) -> Result<Payment> {
    sqlx::query_as::<_, Payment>(&format!(
        r#"
        UPDATE payments
        SET payment_status = $2,
            transaction_id = COALESCE($3, transaction_id),
            payment_date = CASE WHEN $2 = 'completed' THEN now() ELSE payment_date END,
            updated_at = now()
        WHERE id = $1
        RETURNING {PAYMENT_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(status)
    .bind(transaction_id)
    .fetch_optional(conn)
    .await
    .map_err(Error::Sqlx)?
    .ok_or_else(|| Error::NotFound(format!("Payment with ID {} not found", id)))
}

pub async fn payment_stats(conn: &mut DbConn) -> Result<PaymentStats> {
    sqlx::query_as::<_, PaymentStats>(
        r#"
        SELECT COUNT(*) AS total_payments,
               COUNT(*) FILTER (WHERE payment_status = 'completed') AS completed_payments,
               COUNT(*) FILTER (WHERE payment_status = 'pending') AS pending_payments,
               COUNT(*) FILTER (WHERE payment_status = 'failed') AS failed_payments,
               COALESCE(SUM(amount) FILTER (WHERE payment_status = 'completed'), 0)::float8 AS total_revenue,
               COALESCE(SUM(platform_fee) FILTER (WHERE payment_status = 'completed'), 0)::float8 AS total_fees
        FROM payments
        "#,
    )
    .fetch_one(conn)
    .await
    .map_err(Error::Sqlx)
}
