use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, sqlx::Type,
)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AccountType {
    Checking,
    Savings,
}

/// A receiving bank account of the platform.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct BankDetail {
    pub id: Uuid,
    pub account_holder_name: String,
    pub bank_name: String,
    pub account_number: String,
    pub clabe: Option<String>,
    pub account_type: AccountType,
    pub is_primary: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request body for create and full update.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankDetailRequest {
    pub account_holder_name: String,
    pub bank_name: String,
    pub account_number: String,
    pub clabe: Option<String>,
    pub account_type: Option<AccountType>,
    pub is_primary: Option<bool>,
    pub is_active: Option<bool>,
}

/// Trimmed and validated values written by the query layer.
#[derive(Debug, Clone)]
pub struct BankDetailValues {
    pub account_holder_name: String,
    pub bank_name: String,
    pub account_number: String,
    pub clabe: Option<String>,
    pub account_type: AccountType,
    pub is_primary: bool,
    pub is_active: bool,
}
