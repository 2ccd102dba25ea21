//! Environment-driven process configuration.
//!
//! Config is parsed once at startup into [`AppConfig`]. Production deployments
//! fail fast when a required secret is absent; development generates a
//! throwaway shared secret and warns.

use std::env;
use std::time::Duration;

use crate::secret::SecretString;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    fn from_env() -> Self {
        let raw = env::var("NODE_ENV")
            .or_else(|_| env::var("RUST_ENV"))
            .unwrap_or_default();
        match raw.to_lowercase().as_str() {
            "production" | "prod" => Environment::Production,
            _ => Environment::Development,
        }
    }

    pub fn is_production(self) -> bool {
        matches!(self, Environment::Production)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is required in production but was not set")]
    MissingRequired(&'static str),
    #[error("invalid value for {key}: {detail}")]
    InvalidValue { key: &'static str, detail: String },
}

/// Fully resolved process configuration.
pub struct AppConfig {
    pub database_url: String,
    pub shared_secret: SecretString,
    pub jwt_secret: SecretString,
    pub oauth_client_id: Option<String>,
    pub oauth_client_secret: Option<SecretString>,
    pub oauth_client_scopes: Option<String>,
    pub api_prefix: String,
    pub port: u16,
    pub environment: Environment,
    pub request_timeout: Duration,
    pub body_limit_bytes: usize,
    pub log_truncate_bytes: usize,
    /// Informational only; consumed by the (excluded) backup subsystem.
    pub blob_backup_account: Option<String>,
    pub blob_backup_container: Option<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let environment = Environment::from_env();

        let database_url = match env::var("DATABASE_URL") {
            Ok(v) => v,
            Err(_) if environment.is_production() => {
                return Err(ConfigError::MissingRequired("DATABASE_URL"));
            }
            Err(_) => "sqlite://scim-sandbox.db".to_string(),
        };

        let shared_secret = match env::var("SCIM_SHARED_SECRET") {
            Ok(v) => SecretString::new(v),
            Err(_) if environment.is_production() => {
                return Err(ConfigError::MissingRequired("SCIM_SHARED_SECRET"));
            }
            Err(_) => {
                let generated = generate_dev_secret();
                tracing::warn!(
                    secret = %generated,
                    "SCIM_SHARED_SECRET not set; generated a one-time development secret"
                );
                SecretString::new(generated)
            }
        };

        let jwt_secret = match env::var("JWT_SECRET") {
            Ok(v) => SecretString::new(v),
            Err(_) if environment.is_production() => {
                return Err(ConfigError::MissingRequired("JWT_SECRET"));
            }
            Err(_) => SecretString::new(generate_dev_secret()),
        };

        let api_prefix = env::var("API_PREFIX").unwrap_or_else(|_| "scim".to_string());

        let port = match env::var("PORT") {
            Ok(v) => v.parse().map_err(|_| ConfigError::InvalidValue {
                key: "PORT",
                detail: v,
            })?,
            Err(_) => 8080,
        };

        let request_timeout = Duration::from_secs(
            env::var("REQUEST_TIMEOUT_SECONDS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
        );

        let body_limit_bytes = env::var("BODY_LIMIT_BYTES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(5 * 1024 * 1024);

        let log_truncate_bytes = env::var("LOG_TRUNCATE_BYTES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(8 * 1024);

        Ok(Self {
            database_url,
            shared_secret,
            jwt_secret,
            oauth_client_id: env::var("OAUTH_CLIENT_ID").ok(),
            oauth_client_secret: env::var("OAUTH_CLIENT_SECRET").ok().map(SecretString::new),
            oauth_client_scopes: env::var("OAUTH_CLIENT_SCOPES").ok(),
            api_prefix,
            port,
            environment,
            request_timeout,
            body_limit_bytes,
            log_truncate_bytes,
            blob_backup_account: env::var("BLOB_BACKUP_ACCOUNT").ok(),
            blob_backup_container: env::var("BLOB_BACKUP_CONTAINER").ok(),
        })
    }
}

fn generate_dev_secret() -> String {
    use rand::Rng;
    let bytes: [u8; 24] = rand::thread_rng().r#gen();
    base64::Engine::encode(&base64::engine::general_purpose::URL_SAFE_NO_PAD, bytes)
}
