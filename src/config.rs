use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use std::fmt;

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub email: EmailConfig,
    pub cloudinary: CloudinaryConfig,
    pub ai: AiConfig,
    pub rate_limit: RateLimitConfig,
    pub reminders: ReminderConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Public URL of the single-page frontend (used in emailed links and redirects)
    pub frontend_url: String,
    /// Public URL of this API (used in activation links)
    pub backend_url: String,
    /// Extra allowed CORS origins besides `frontend_url`
    pub cors_origins: Vec<String>,
    /// Largest accepted uploaded file
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub user: String,
    #[serde(skip_serializing, default = "default_database_password")]
    pub password: SecretString,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub max_connections: u32,
    pub acquire_timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JwtConfig {
    #[serde(skip_serializing, default = "default_jwt_secret")]
    pub secret: SecretString,
    pub expiration_hours: i64,
    pub issuer: String,
    pub audience: String,
    #[serde(skip_serializing)]
    pub activation_secret: Option<SecretString>,
    #[serde(skip_serializing)]
    pub password_reset_secret: Option<SecretString>,
    pub activation_expiration_hours: i64,
    pub password_reset_expiration_minutes: i64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmailConfig {
    /// When false, emails are logged instead of sent
    pub enabled: bool,
    pub api_url: String,
    #[serde(skip_serializing, default = "empty_secret")]
    pub api_key: SecretString,
    pub from: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    #[serde(skip_serializing, default = "empty_secret")]
    pub api_secret: SecretString,
    /// Root folder, sub-folders are appended per upload kind
    pub folder: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AiConfig {
    #[serde(skip_serializing, default = "empty_secret")]
    pub openai_api_key: SecretString,
    pub model: String,
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub max_requests: u32,
    pub window_seconds: u64,
    /// Key on the first `x-forwarded-for` hop. Only safe behind a proxy that overwrites it.
    pub trust_forwarded_for: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReminderConfig {
    pub enabled: bool,
    pub interval_seconds: u64,
    pub days_ahead: Vec<i64>,
}

// Secrets are never serialized, so the defaults layer cannot carry them
fn default_database_password() -> SecretString {
    "password".to_string().into()
}

fn default_jwt_secret() -> SecretString {
    "change-me-in-production".to_string().into()
}

fn empty_secret() -> SecretString {
    String::new().into()
}

impl Config {
    /// Load configuration from environment variables, with defaults.
    pub fn load() -> Result<Self, config::ConfigError> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&Self::default())?)
            // Override with environment variables using `NANNYSLM__` prefix and `__` separator
            // e.g., NANNYSLM__DATABASE__USER="my_user"
            .add_source(
                config::Environment::with_prefix("NANNYSLM")
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("server.cors_origins")
                    .with_list_parse_key("reminders.days_ahead")
                    .try_parsing(true),
            );

        // Hosting platforms inject a bare PORT
        if let Ok(port) = std::env::var("PORT") {
            builder = builder.set_override("server.port", port)?;
        }

        builder.build()?.try_deserialize()
    }

    /// Origins accepted by the CORS layer.
    pub fn allowed_origins(&self) -> Vec<String> {
        let mut origins = self.server.cors_origins.clone();
        let frontend = self.server.frontend_url.trim_end_matches('/').to_string();
        if !frontend.is_empty() && !origins.contains(&frontend) {
            origins.push(frontend);
        }
        origins
    }
}

/// Room for the text parts and multipart framing next to the file itself.
const FORM_HEADROOM_BYTES: usize = 1024 * 1024;

impl ServerConfig {
    /// Request body limit: one file at the upload limit plus the rest of the form.
    pub fn body_limit(&self) -> usize {
        self.max_upload_bytes.saturating_add(FORM_HEADROOM_BYTES)
    }
}

impl DatabaseConfig {
    /// Constructs the database connection string.
    pub fn connection_string(&self) -> SecretString {
        SecretString::from(format!(
            "postgres://{}:{}@{}:{}/{}",
            self.user,
            self.password.expose_secret(),
            self.host,
            self.port,
            self.database
        ))
    }
}

impl JwtConfig {
    pub fn activation_secret(&self) -> &SecretString {
        self.activation_secret.as_ref().unwrap_or(&self.secret)
    }

    pub fn password_reset_secret(&self) -> &SecretString {
        self.password_reset_secret.as_ref().unwrap_or(&self.secret)
    }
}

impl CloudinaryConfig {
    pub fn is_configured(&self) -> bool {
        !self.cloud_name.is_empty()
            && !self.api_key.is_empty()
            && !self.api_secret.expose_secret().is_empty()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            frontend_url: "http://localhost:4200".to_string(),
            backend_url: "http://localhost:8000".to_string(),
            cors_origins: vec![
                "http://localhost:4200".to_string(),
                "http://localhost:3000".to_string(),
            ],
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

// Default values for the database configuration
impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            user: "postgres".to_string(),
            password: default_database_password(),
            host: "localhost".to_string(),
            port: 5432,
            database: "nannyslm".to_string(),
            max_connections: 10,
            acquire_timeout_seconds: 5,
        }
    }
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: default_jwt_secret(),
            expiration_hours: 24 * 7,
            issuer: "NannysLM".to_string(),
            audience: "NannysLM-Users".to_string(),
            activation_secret: None,
            password_reset_secret: None,
            activation_expiration_hours: 24,
            password_reset_expiration_minutes: 60,
        }
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_url: "https://api.resend.com/emails".to_string(),
            api_key: empty_secret(),
            from: "NannysLM <no-reply@nannyslm.com>".to_string(),
        }
    }
}

impl Default for CloudinaryConfig {
    fn default() -> Self {
        Self {
            cloud_name: String::new(),
            api_key: String::new(),
            api_secret: empty_secret(),
            folder: "nannys-lm".to_string(),
        }
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            openai_api_key: empty_secret(),
            model: "gpt-4o-mini".to_string(),
            base_url: None,
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests: 100,
            window_seconds: 15 * 60,
            trust_forwarded_for: false,
        }
    }
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_seconds: 24 * 60 * 60,
            days_ahead: vec![3, 1],
        }
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Use serde to serialize to pretty JSON
        // Secrets are skipped via #[serde(skip_serializing)]
        match serde_json::to_string_pretty(&self) {
            Ok(json) => write!(f, "{}", json),
            Err(_) => write!(f, "Error serializing config"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.jwt.expiration_hours, 168);
        assert_eq!(config.rate_limit.max_requests, 100);
        assert_eq!(config.rate_limit.window_seconds, 900);
        assert!(!config.rate_limit.trust_forwarded_for);
        assert_eq!(config.reminders.days_ahead, vec![3, 1]);
        assert!(!config.cloudinary.is_configured());
    }

    #[test]
    fn test_body_limit_leaves_room_beside_a_full_size_file() {
        let config = Config::default();
        assert!(config.server.body_limit() > config.server.max_upload_bytes);
        assert_eq!(config.server.body_limit(), 11 * 1024 * 1024);
    }

    #[test]
    fn test_display_hides_secrets() {
        let mut config = Config::default();
        config.database.password = "super-secret-db".to_string().into();
        config.jwt.secret = "super-secret-jwt".to_string().into();

        let rendered = config.to_string();
        assert!(!rendered.contains("super-secret-db"));
        assert!(!rendered.contains("super-secret-jwt"));
        assert!(rendered.contains("NannysLM-Users"));
    }

    #[test]
    fn test_token_secrets_fall_back_to_main_secret() {
        let mut jwt = JwtConfig::default();
        assert_eq!(jwt.activation_secret().expose_secret(), jwt.secret.expose_secret());

        jwt.password_reset_secret = Some("reset-only".to_string().into());
        assert_eq!(jwt.password_reset_secret().expose_secret(), "reset-only");
    }

    #[test]
    fn test_allowed_origins_include_frontend_once() {
        let mut config = Config::default();
        assert_eq!(
            config
                .allowed_origins()
                .iter()
                .filter(|o| o.as_str() == "http://localhost:4200")
                .count(),
            1
        );

        config.server.frontend_url = "https://app.nannyslm.com/".to_string();
        assert!(config.allowed_origins().contains(&"https://app.nannyslm.com".to_string()));
    }
}
