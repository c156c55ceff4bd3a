use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, sqlx::Type,
)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: Uuid,
    pub service_id: Uuid,
    pub client_id: Uuid,
    pub nanny_id: Uuid,
    pub amount: f64,
    pub payment_status: PaymentStatus,
    pub transaction_id: Option<String>,
    pub platform_fee: f64,
    pub nanny_amount: f64,
    pub payment_date: Option<DateTime<Utc>>,
    pub receipt_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Flat row for payments joined with client, nanny and service.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PaymentRow {
    #[sqlx(flatten)]
    pub payment: Payment,
    pub client_user_id: Uuid,
    pub client_first_name: String,
    pub client_last_name: String,
    pub client_email: String,
    pub nanny_user_id: Uuid,
    pub nanny_first_name: String,
    pub nanny_last_name: String,
    pub service_title: String,
    pub service_start_date: NaiveDate,
    pub service_total_hours: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentParty {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentService {
    pub id: Uuid,
    pub title: String,
    pub start_date: NaiveDate,
    pub total_hours: f64,
}

/// Payment with nested parties, the shape served by `/payments`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDetails {
    #[serde(flatten)]
    pub payment: Payment,
    pub client: PaymentParty,
    pub client_email: String,
    pub nanny: PaymentParty,
    pub service: PaymentService,
}

impl From<PaymentRow> for PaymentDetails {
    fn from(row: PaymentRow) -> Self {
        Self {
            client: PaymentParty {
                id: row.payment.client_id,
                user_id: row.client_user_id,
                name: format!("{} {}", row.client_first_name, row.client_last_name),
            },
            client_email: row.client_email,
            nanny: PaymentParty {
                id: row.payment.nanny_id,
                user_id: row.nanny_user_id,
                name: format!("{} {}", row.nanny_first_name, row.nanny_last_name),
            },
            service: PaymentService {
                id: row.payment.service_id,
                title: row.service_title,
                start_date: row.service_start_date,
                total_hours: row.service_total_hours,
            },
            payment: row.payment,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewPayment {
    pub service_id: Uuid,
    pub client_id: Uuid,
    pub nanny_id: Uuid,
    pub amount: f64,
    pub platform_fee: f64,
    pub receipt_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePaymentRequest {
    #[serde(alias = "serviceId")]
    pub service_id: Uuid,
    pub amount: f64,
    #[serde(alias = "platformFee")]
    pub platform_fee: Option<f64>,
    #[serde(alias = "receiptUrl")]
    pub receipt_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePaymentStatusRequest {
    pub payment_status: PaymentStatus,
    pub transaction_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentFilters {
    pub status: Option<PaymentStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStats {
    pub total_payments: i64,
    pub completed_payments: i64,
    pub pending_payments: i64,
    pub failed_payments: i64,
    pub total_revenue: f64,
    pub total_fees: f64,
}

/// Payment as listed for the paying client.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ClientPayment {
    pub id: Uuid,
    pub service_id: Uuid,
    pub amount: f64,
    pub payment_status: PaymentStatus,
    pub payment_date: Option<DateTime<Utc>>,
    pub receipt_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub service_title: String,
    pub nanny_first_name: String,
    pub nanny_last_name: String,
}
