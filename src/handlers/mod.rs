pub mod ai;
pub mod auth;
pub mod bank_details;
pub mod clients;
pub mod dashboard;
pub mod health;
pub mod nannys;
pub mod notifications;
pub mod payments;
pub mod profile;
pub mod ratings;
pub mod services;
pub mod users;

use std::collections::HashMap;

use axum::extract::Multipart;

use crate::{
    database::{self, PooledConn},
    error::{Error, Result},
    services::storage::UploadedFile,
    state::AppState,
};

/// Helper to acquire database connection with consistent error logging
pub(crate) async fn acquire_db_connection(state: &AppState, operation: &'static str) -> Result<PooledConn> {
    database::acquire(&state.pool).await.inspect_err(|e| {
        tracing::error!(
            operation = operation,
            error_code = "DATABASE_ACQUISITION_FAILED",
            error = %e,
            "Failed to acquire database connection",
        );
    })
}

/// Client mistakes are warnings; everything else is an error
pub(crate) fn log_handler_error(operation: &str, e: &Error) {
    match e {
        Error::Validation(_)
        | Error::BadRequest(_)
        | Error::NotFound(_)
        | Error::Forbidden(_)
        | Error::Conflict(_)
        | Error::Authentication(_)
        | Error::InvalidCredentials(_)
        | Error::InvalidToken(_) => {
            tracing::warn!(operation = operation, error = %e, "Handler operation failed");
        }
        _ => {
            tracing::error!(operation = operation, error = %e, "Handler operation failed");
        }
    }
}

/// Text fields and files of a `multipart/form-data` body, keyed by field name.
#[derive(Debug, Default)]
pub(crate) struct MultipartForm {
    pub fields: HashMap<String, String>,
    pub files: HashMap<String, UploadedFile>,
}

impl MultipartForm {
    /// Drains the body. A part carrying a file name is treated as a file.
    pub async fn read(mut multipart: Multipart) -> Result<Self> {
        let mut form = MultipartForm::default();

        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let content_type = field
                        .content_type()
                        .unwrap_or("application/octet-stream")
                        .to_string();
                    let bytes = field.bytes().await?;
                    if file_name.is_empty() && bytes.is_empty() {
                        // Browsers send an empty part for an untouched file input
                        continue;
                    }
                    form.files.insert(
                        name,
                        UploadedFile {
                            file_name,
                            content_type,
                            bytes: bytes.to_vec(),
                        },
                    );
                }
                None => {
                    form.fields.insert(name, field.text().await?);
                }
            }
        }

        Ok(form)
    }

    /// Non-blank text field
    pub fn text(&mut self, name: &str) -> Option<String> {
        self.fields.remove(name).filter(|v| !v.trim().is_empty())
    }

    pub fn file(&mut self, name: &str) -> Option<UploadedFile> {
        self.files.remove(name)
    }
}
