use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use chrono::Duration;

const DEVELOPMENT_SESSION_SECRET: &str = "homestead-development-session-secret-do-not-use";
const MIN_SESSION_SECRET_LEN: usize = 32;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }

    pub fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub database: DatabaseConfig,
    pub accounts: AccountsConfig,
    pub mail: MailConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let database_path =
            env::var("APP_DATABASE_PATH").unwrap_or_else(|_| "homestead.db".to_string());

        let base_url = env::var("APP_BASE_URL")
            .map(|value| value.trim_end_matches('/').to_string())
            .unwrap_or_else(|_| format!("http://localhost:{port}"));

        let session_secret = match env::var("APP_SESSION_SECRET") {
            Ok(secret) if secret.len() >= MIN_SESSION_SECRET_LEN => secret,
            Ok(_) => return Err(ConfigError::WeakSessionSecret),
            Err(_) if environment.is_production() => {
                return Err(ConfigError::MissingSessionSecret)
            }
            Err(_) => DEVELOPMENT_SESSION_SECRET.to_string(),
        };

        let ttl_minutes = env::var("APP_VERIFICATION_TTL_MINUTES")
            .unwrap_or_else(|_| "10".to_string())
            .parse::<i64>()
            .ok()
            .filter(|minutes| *minutes > 0)
            .ok_or(ConfigError::InvalidVerificationTtl)?;

        let from = env::var("MAIL_FROM")
            .unwrap_or_else(|_| "Homestead <hello@homestead.local>".to_string());
        let api_url =
            env::var("MAIL_API_URL").unwrap_or_else(|_| "https://api.resend.com/emails".to_string());
        let api_key = env::var("MAIL_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            database: DatabaseConfig {
                path: database_path,
            },
            accounts: AccountsConfig {
                base_url,
                session_secret,
                verification_ttl_minutes: ttl_minutes,
                secure_cookies: environment.is_production(),
            },
            mail: MailConfig {
                from,
                api_url,
                api_key,
            },
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Location of the SQLite database file.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub path: String,
}

/// Session signing and verification code settings.
#[derive(Clone)]
pub struct AccountsConfig {
    /// Absolute origin used when building links that leave the browser (emails).
    pub base_url: String,
    pub session_secret: String,
    pub verification_ttl_minutes: i64,
    pub secure_cookies: bool,
}

impl AccountsConfig {
    pub fn verification_ttl(&self) -> Duration {
        Duration::minutes(self.verification_ttl_minutes)
    }
}

impl fmt::Debug for AccountsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountsConfig")
            .field("base_url", &self.base_url)
            .field("session_secret", &"<redacted>")
            .field("verification_ttl_minutes", &self.verification_ttl_minutes)
            .field("secure_cookies", &self.secure_cookies)
            .finish()
    }
}

/// Outbound email settings. Without an API key mail is written to the log.
#[derive(Clone)]
pub struct MailConfig {
    pub from: String,
    pub api_url: String,
    pub api_key: Option<String>,
}

impl fmt::Debug for MailConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailConfig")
            .field("from", &self.from)
            .field("api_url", &self.api_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    MissingSessionSecret,
    WeakSessionSecret,
    InvalidVerificationTtl,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::MissingSessionSecret => {
                write!(f, "APP_SESSION_SECRET must be set in production")
            }
            ConfigError::WeakSessionSecret => write!(
                f,
                "APP_SESSION_SECRET must be at least {MIN_SESSION_SECRET_LEN} bytes"
            ),
            ConfigError::InvalidVerificationTtl => {
                write!(f, "APP_VERIFICATION_TTL_MINUTES must be a positive integer")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}
