//! Configuration management for Account Service
//!
//! Loads settings from:
//! 1. Environment variables
//! 2. .env file (local development)
//!
//! # Example
//!
//! ```no_run
//! use account_service::config::Settings;
//!
//! fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     println!("Listening on {}:{}", settings.server.host, settings.server.port);
//!     Ok(())
//! }
//! ```

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use tracing::info;
use url::Url;

/// Longest accepted credential or verification-token lifetime (ten years)
pub const MAX_LIFETIME_SECONDS: u64 = 10 * 365 * 24 * 60 * 60;

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub jwt: JwtSettings,
    pub email: EmailSettings,
    pub account: AccountSettings,
}

impl Settings {
    pub fn load() -> Result<Self> {
        // Load .env file in development
        if cfg!(debug_assertions) && dotenvy::dotenv().is_ok() {
            info!("Loaded .env file for development");
        }

        Ok(Settings {
            server: ServerSettings::from_env()?,
            database: DatabaseSettings::from_env()?,
            jwt: JwtSettings::from_env()?,
            email: EmailSettings::from_env()?,
            account: AccountSettings::from_env()?,
        })
    }
}

/// Parse an optional variable, falling back to `default` when unset
fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid {}", key)),
        Err(_) => Ok(default),
    }
}

/// Reject lifetimes that are zero or beyond `MAX_LIFETIME_SECONDS`
fn check_lifetime(key: &str, seconds: u64) -> Result<u64> {
    if seconds == 0 || seconds > MAX_LIFETIME_SECONDS {
        bail!(
            "{} must be between 1 and {} seconds, got {}",
            key,
            MAX_LIFETIME_SECONDS,
            seconds
        );
    }
    Ok(seconds)
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl ServerSettings {
    fn from_env() -> Result<Self> {
        Ok(Self {
            host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env_or("SERVER_PORT", 8080)?,
        })
    }
}

/// Database connection settings
///
/// `url` is optional: without it the service keeps accounts in memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    pub url: Option<String>,
    pub max_connections: u32,
    pub acquire_timeout: u64,
}

impl DatabaseSettings {
    fn from_env() -> Result<Self> {
        Ok(Self {
            url: env::var("DATABASE_URL").ok().filter(|url| !url.trim().is_empty()),
            max_connections: env_or("DATABASE_MAX_CONNECTIONS", 10)?,
            acquire_timeout: env_or("DATABASE_ACQUIRE_TIMEOUT", 5)?,
        })
    }
}

/// Credential signing settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtSettings {
    #[serde(skip_serializing)]
    pub secret: String,
    pub issuer: String,
    pub expiry_seconds: u64,
}

impl JwtSettings {
    fn from_env() -> Result<Self> {
        let secret = env::var("JWT_SECRET").context("JWT_SECRET must be set")?;
        if secret.trim().is_empty() {
            bail!("JWT_SECRET must not be empty");
        }

        Ok(Self {
            secret,
            issuer: env::var("JWT_ISSUER").unwrap_or_else(|_| "account-service".to_string()),
            expiry_seconds: check_lifetime(
                "JWT_EXPIRY_SECONDS",
                env_or("JWT_EXPIRY_SECONDS", 3600)?,
            )?,
        })
    }
}

/// How the SMTP connection is secured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SmtpTls {
    None,
    Starttls,
    Tls,
}

impl FromStr for SmtpTls {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(SmtpTls::None),
            "starttls" => Ok(SmtpTls::Starttls),
            "tls" => Ok(SmtpTls::Tls),
            other => bail!("Invalid SMTP_TLS value: {}", other),
        }
    }
}

/// Email service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailSettings {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: Option<String>,
    #[serde(skip_serializing)]
    pub smtp_password: Option<String>,
    pub smtp_from: String,
    pub smtp_tls: SmtpTls,
}

impl EmailSettings {
    fn from_env() -> Result<Self> {
        let smtp_tls = match env::var("SMTP_TLS") {
            Ok(raw) => raw.trim().parse()?,
            Err(_) => SmtpTls::Starttls,
        };

        Ok(Self {
            smtp_host: env::var("SMTP_HOST").unwrap_or_default(),
            smtp_port: env_or("SMTP_PORT", 587)?,
            smtp_username: env::var("SMTP_USERNAME").ok(),
            smtp_password: env::var("SMTP_PASSWORD").ok(),
            smtp_from: env::var("SMTP_FROM")
                .unwrap_or_else(|_| "noreply@account-service.local".to_string()),
            smtp_tls,
        })
    }
}

impl Default for EmailSettings {
    /// No SMTP host, so the mailer runs in no-op mode
    fn default() -> Self {
        Self {
            smtp_host: String::new(),
            smtp_port: 587,
            smtp_username: None,
            smtp_password: None,
            smtp_from: "noreply@account-service.local".to_string(),
            smtp_tls: SmtpTls::Starttls,
        }
    }
}

/// Account policy switches
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountSettings {
    /// Reject verification tokens older than this. `None` keeps them valid forever.
    pub verification_ttl_seconds: Option<u64>,
    /// Refuse logins for accounts that never followed their verification link.
    pub require_verified_login: bool,
    /// Echo the verification link and token in the registration response.
    pub expose_verification_token: bool,
    /// Origin for verification links. Unset means the request's own origin.
    pub public_base_url: Option<Url>,
}

impl AccountSettings {
    fn from_env() -> Result<Self> {
        let verification_ttl_seconds = match env::var("ACCOUNT_VERIFICATION_TTL_SECONDS") {
            Ok(raw) if !raw.trim().is_empty() => {
                let seconds = raw
                    .trim()
                    .parse()
                    .context("Invalid ACCOUNT_VERIFICATION_TTL_SECONDS")?;
                Some(check_lifetime("ACCOUNT_VERIFICATION_TTL_SECONDS", seconds)?)
            }
            _ => None,
        };

        let public_base_url = match env::var("ACCOUNT_PUBLIC_BASE_URL") {
            Ok(raw) if !raw.trim().is_empty() => Some(parse_base_url(raw.trim())?),
            _ => None,
        };

        Ok(Self {
            verification_ttl_seconds,
            require_verified_login: env_or("ACCOUNT_REQUIRE_VERIFIED_LOGIN", false)?,
            expose_verification_token: env_or("ACCOUNT_EXPOSE_VERIFICATION_TOKEN", true)?,
            public_base_url,
        })
    }
}

/// An absolute http(s) URL with a host and no query or fragment
fn parse_base_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw).context("Invalid ACCOUNT_PUBLIC_BASE_URL")?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        bail!("ACCOUNT_PUBLIC_BASE_URL must be an http or https URL with a host");
    }
    if url.query().is_some() || url.fragment().is_some() {
        bail!("ACCOUNT_PUBLIC_BASE_URL must not carry a query or fragment");
    }
    Ok(url)
}

impl Default for AccountSettings {
    fn default() -> Self {
        Self {
            verification_ttl_seconds: None,
            require_verified_login: false,
            expose_verification_token: true,
            public_base_url: None,
        }
    }
}
