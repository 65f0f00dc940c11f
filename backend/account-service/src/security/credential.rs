/// Signed login credentials (HS256 JWT)
use crate::config::JwtSettings;
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Credential encoding failed: {0}")]
    Encoding(#[from] jsonwebtoken::errors::Error),

    #[error("Credential lifetime of {0}s is out of range")]
    LifetimeOutOfRange(u64),
}

/// Claims carried by a login credential
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (account email)
    pub sub: String,
    pub email: String,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Clone)]
pub struct CredentialIssuer {
    encoding_key: EncodingKey,
    issuer: String,
    expiry_seconds: u64,
}

impl CredentialIssuer {
    pub fn new(settings: &JwtSettings) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(settings.secret.as_bytes()),
            issuer: settings.issuer.clone(),
            expiry_seconds: settings.expiry_seconds,
        }
    }

    /// Issue a credential asserting the bearer owns `email`
    pub fn issue(&self, email: &str) -> Result<String, CredentialError> {
        let now = Utc::now();
        let expires_at = i64::try_from(self.expiry_seconds)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .ok_or(CredentialError::LifetimeOutOfRange(self.expiry_seconds))?;

        let claims = Claims {
            sub: email.to_string(),
            email: email.to_string(),
            iss: self.issuer.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        Ok(encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.encoding_key,
        )?)
    }
}
