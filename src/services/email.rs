//! Outgoing email.
//!
//! Handlers never fail because of email: callers go through [`send_best_effort`],
//! which logs delivery errors at `warn` and moves on.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::config::EmailConfig;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Serialize)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
    /// Link the message is built around, logged when delivery is disabled
    #[serde(skip)]
    pub action_link: Option<String>,
}

#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, message: EmailMessage) -> Result<()>;
}

/// Posts `{from, to, subject, html}` to a transactional mail API with a bearer key.
pub struct HttpEmailSender {
    client: reqwest::Client,
    api_url: String,
    api_key: SecretString,
    from: String,
}

impl HttpEmailSender {
    pub fn new(config: &EmailConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .user_agent("NannysLM/1.0")
            .build()
            .map_err(|e| Error::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            from: config.from.clone(),
        })
    }
}

#[derive(Serialize)]
struct OutgoingEmail<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

#[async_trait]
impl EmailSender for HttpEmailSender {
    async fn send(&self, message: EmailMessage) -> Result<()> {
        let payload = OutgoingEmail {
            from: &self.from,
            to: [&message.to],
            subject: &message.subject,
            html: &message.html,
        };

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::ExternalService(format!("Email request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::ExternalService(format!(
                "Email API returned {}: {}",
                status, body
            )));
        }

        tracing::info!(to = %message.to, subject = %message.subject, "Email sent");
        Ok(())
    }
}

/// Used when email is disabled: logs the recipient, subject and action link.
#[derive(Debug, Default)]
pub struct LogEmailSender;

#[async_trait]
impl EmailSender for LogEmailSender {
    async fn send(&self, message: EmailMessage) -> Result<()> {
        tracing::info!(
            to = %message.to,
            subject = %message.subject,
            action_link = message.action_link.as_deref().unwrap_or("-"),
            "Email delivery disabled, message not sent"
        );
        Ok(())
    }
}

/// Picks the sender for the configuration.
pub fn build_sender(config: &EmailConfig) -> Result<Arc<dyn EmailSender>> {
    if config.enabled && !config.api_key.expose_secret().is_empty() {
        Ok(Arc::new(HttpEmailSender::new(config)?))
    } else {
        Ok(Arc::new(LogEmailSender))
    }
}

/// Sends and logs failures instead of returning them.
pub async fn send_best_effort(sender: &dyn EmailSender, message: EmailMessage) {
    let to = message.to.clone();
    let subject = message.subject.clone();
    if let Err(e) = sender.send(message).await {
        tracing::warn!(to = %to, subject = %subject, error = %e, "Failed to send email");
    }
}

// ============================================================================
// TEMPLATES
// ============================================================================

fn layout(heading: &str, body: &str) -> String {
    format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
  <h2 style="color: #6b46c1;">{heading}</h2>
  {body}
  <p style="color: #888; font-size: 12px;">NannysLM</p>
</div>"#
    )
}

fn button(link: &str, label: &str) -> String {
    format!(
        r#"<p><a href="{link}" style="background: #6b46c1; color: #fff; padding: 10px 18px; border-radius: 6px; text-decoration: none;">{label}</a></p>"#
    )
}

pub fn activation_email(to: &str, first_name: &str, link: &str) -> EmailMessage {
    EmailMessage {
        to: to.to_string(),
        subject: "Activa tu cuenta de NannysLM".to_string(),
        html: layout(
            &format!("¡Hola {}!", first_name),
            &format!(
                "<p>Gracias por registrarte. Activa tu cuenta con el siguiente enlace (válido por 24 horas):</p>{}",
                button(link, "Activar cuenta")
            ),
        ),
        action_link: Some(link.to_string()),
    }
}

pub fn password_reset_email(to: &str, first_name: &str, link: &str) -> EmailMessage {
    EmailMessage {
        to: to.to_string(),
        subject: "Restablece tu contraseña".to_string(),
        html: layout(
            &format!("Hola {}", first_name),
            &format!(
                "<p>Recibimos una solicitud para restablecer tu contraseña. El enlace expira en 1 hora.</p>{}<p>Si no lo solicitaste, ignora este correo.</p>",
                button(link, "Restablecer contraseña")
            ),
        ),
        action_link: Some(link.to_string()),
    }
}

pub fn nanny_credentials_email(to: &str, first_name: &str, password: &str, login_link: &str) -> EmailMessage {
    EmailMessage {
        to: to.to_string(),
        subject: "Tu cuenta de niñera en NannysLM".to_string(),
        html: layout(
            &format!("Bienvenida, {}", first_name),
            &format!(
                "<p>Se creó tu cuenta de niñera.</p><p>Correo: <b>{}</b><br>Contraseña temporal: <b>{}</b></p><p>Te recomendamos cambiarla al iniciar sesión.</p>{}",
                to,
                password,
                button(login_link, "Iniciar sesión")
            ),
        ),
        action_link: Some(login_link.to_string()),
    }
}

pub fn new_service_email(to: &str, first_name: &str, service_title: &str, when: &str, link: &str) -> EmailMessage {
    EmailMessage {
        to: to.to_string(),
        subject: format!("Nuevo servicio disponible: {}", service_title),
        html: layout(
            &format!("Hola {}", first_name),
            &format!(
                "<p>Hay un nuevo servicio disponible: <b>{}</b> ({}).</p>{}",
                service_title,
                when,
                button(link, "Ver servicio")
            ),
        ),
        action_link: Some(link.to_string()),
    }
}

pub fn client_verification_email(to: &str, first_name: &str, approved: bool, reason: Option<&str>) -> EmailMessage {
    let (subject, body) = if approved {
        (
            "Tu cuenta ha sido verificada".to_string(),
            "<p>Tu identificación fue aprobada. Ya puedes solicitar servicios.</p>".to_string(),
        )
    } else {
        (
            "Tu verificación fue rechazada".to_string(),
            format!(
                "<p>No pudimos verificar tu identificación.</p><p>Motivo: {}</p><p>Puedes subir un nuevo documento desde tu perfil.</p>",
                reason.unwrap_or("no especificado")
            ),
        )
    };

    EmailMessage {
        to: to.to_string(),
        subject,
        html: layout(&format!("Hola {}", first_name), &body),
        action_link: None,
    }
}

pub fn service_reminder_email(to: &str, first_name: &str, service_title: &str, when: &str, address: &str) -> EmailMessage {
    EmailMessage {
        to: to.to_string(),
        subject: format!("Recordatorio: {}", service_title),
        html: layout(
            &format!("Hola {}", first_name),
            &format!(
                "<p>Te recordamos tu servicio <b>{}</b> programado para {}.</p><p>Dirección: {}</p>",
                service_title, when, address
            ),
        ),
        action_link: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activation_email_carries_link() {
        let message = activation_email("ana@example.com", "Ana", "http://localhost:8000/api/v1/auth/activate?token=abc");
        assert_eq!(message.to, "ana@example.com");
        assert!(message.html.contains("token=abc"));
        assert_eq!(
            message.action_link.as_deref(),
            Some("http://localhost:8000/api/v1/auth/activate?token=abc")
        );
    }

    #[test]
    fn test_rejection_email_includes_reason() {
        let message = client_verification_email("ana@example.com", "Ana", false, Some("Documento ilegible"));
        assert!(message.html.contains("Documento ilegible"));
        assert!(message.subject.contains("rechazada"));
    }

    #[tokio::test]
    async fn test_log_sender_never_fails() {
        let sender = LogEmailSender;
        let message = password_reset_email("ana@example.com", "Ana", "http://x/reset?token=t");
        assert!(sender.send(message).await.is_ok());
    }

    #[test]
    fn test_disabled_config_builds_log_sender() {
        let config = EmailConfig::default();
        assert!(build_sender(&config).is_ok());
    }
}
