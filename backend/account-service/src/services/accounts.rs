/// Registration, login and email verification flows
///
/// Each flow is a straight line of awaited store calls. Infrastructure
/// errors are logged here and collapsed into the flow's generic failure, so
/// nothing internal reaches the client.
use crate::config::AccountSettings;
use crate::db::{UserStore, VerificationTokenStore};
use crate::error::{AccountError, Result, StoreError};
use crate::models::{LoginRequest, RegisterRequest, User, VerificationToken};
use crate::security::{generate_verification_token, CredentialIssuer, PasswordHasher};
use crate::services::email::Mailer;
use crate::services::templates;
use chrono::{Duration, Utc};
use std::fmt::Display;
use std::sync::Arc;
use tracing::{error, info, warn};
use url::Url;
use uuid::Uuid;
use validator::Validate;

/// Origin that verification links point back to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkOrigin {
    base: String,
}

impl LinkOrigin {
    /// Scheme and host the registration request arrived on
    pub fn from_request(scheme: &str, host: &str) -> Self {
        Self {
            base: format!("{}://{}", scheme, host),
        }
    }

    /// A configured public URL; any path on it prefixes the verify route
    pub fn from_base_url(url: &Url) -> Self {
        Self {
            base: url.as_str().trim_end_matches('/').to_string(),
        }
    }

    pub fn verification_link(&self, user_id: Uuid, token: &str) -> String {
        format!("{}/users/verify/{}/{}", self.base, user_id, token)
    }
}

#[derive(Debug, Clone)]
pub struct Registration {
    pub user: User,
    pub token: String,
    pub verification_link: String,
}

#[derive(Debug, Clone)]
pub struct LoginGrant {
    pub email: String,
    pub credential: String,
}

#[derive(Debug, Clone)]
pub enum Verification {
    Activated(User),
    AlreadyVerified,
}

/// Log `err` at `stage` and replace it with the flow's generic failure
fn log_failure<E: Display>(failure: AccountError, stage: &'static str) -> impl FnOnce(E) -> AccountError {
    move |err| {
        error!(error = %err, stage, "{}", failure);
        failure
    }
}

pub struct AccountService {
    users: Arc<dyn UserStore>,
    tokens: Arc<dyn VerificationTokenStore>,
    hasher: Arc<dyn PasswordHasher>,
    credentials: CredentialIssuer,
    mailer: Arc<dyn Mailer>,
    policy: AccountSettings,
}

impl AccountService {
    pub fn new(
        users: Arc<dyn UserStore>,
        tokens: Arc<dyn VerificationTokenStore>,
        hasher: Arc<dyn PasswordHasher>,
        credentials: CredentialIssuer,
        mailer: Arc<dyn Mailer>,
        policy: AccountSettings,
    ) -> Self {
        Self {
            users,
            tokens,
            hasher,
            credentials,
            mailer,
            policy,
        }
    }

    pub fn policy(&self) -> &AccountSettings {
        &self.policy
    }

    pub async fn register(
        &self,
        request: RegisterRequest,
        origin: &LinkOrigin,
    ) -> Result<Registration> {
        let request = RegisterRequest {
            email: request.email.trim().to_string(),
            password: request.password,
        };
        request.validate()?;

        let existing = self
            .users
            .find_by_email(&request.email)
            .await
            .map_err(log_failure(AccountError::RegistrationFailed, "find user by email"))?;
        if existing.is_some() {
            info!("Registration rejected: email already exists");
            return Err(AccountError::DuplicateEmail);
        }

        let hasher = Arc::clone(&self.hasher);
        let password = request.password;
        let password_hash = tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(log_failure(AccountError::RegistrationFailed, "join hashing task"))?
            .map_err(log_failure(AccountError::RegistrationFailed, "hash password"))?;

        let user = User::new(request.email, password_hash);
        let token = generate_verification_token();
        let verification_token = VerificationToken::new(user.id, token.clone());
        let verification_link = origin.verification_link(user.id, &token);

        let user = match self
            .users
            .create_with_token(&user, &verification_token)
            .await
        {
            Ok(user) => user,
            Err(StoreError::UniqueViolation) => {
                info!("Registration lost a race on a taken email");
                return Err(AccountError::DuplicateEmail);
            }
            Err(err) => {
                return Err(log_failure(AccountError::RegistrationFailed, "persist account")(err))
            }
        };

        info!(user_id = %user.id, "User registered");
        self.dispatch_registration_mail(&user, &verification_link);

        Ok(Registration {
            user,
            token,
            verification_link,
        })
    }

    /// Fire and forget: the outcome is only logged, never awaited or retried.
    fn dispatch_registration_mail(&self, user: &User, verification_link: &str) {
        let mailer = Arc::clone(&self.mailer);
        let message = templates::successful_registration(&user.email, verification_link);
        let user_id = user.id;

        tokio::spawn(async move {
            match mailer.send(message).await {
                Ok(()) => info!(user_id = %user_id, "Verification email dispatched"),
                Err(err) => {
                    error!(user_id = %user_id, error = %err, "Error sending verification email")
                }
            }
        });
    }

    pub async fn login(&self, request: LoginRequest) -> Result<LoginGrant> {
        let email = request.email.trim();

        let user = self
            .users
            .find_by_email(email)
            .await
            .map_err(log_failure(AccountError::LoginFailed, "find user by email"))?
            .ok_or(AccountError::InvalidCredentials)?;

        let hasher = Arc::clone(&self.hasher);
        let password = request.password;
        let password_hash = user.password_hash.clone();
        let matches = tokio::task::spawn_blocking(move || hasher.verify(&password, &password_hash))
            .await
            .map_err(log_failure(AccountError::LoginFailed, "join verify task"))?
            .map_err(log_failure(AccountError::LoginFailed, "verify password"))?;

        if !matches {
            warn!(user_id = %user.id, "Login rejected: wrong password");
            return Err(AccountError::InvalidCredentials);
        }

        if self.policy.require_verified_login && !user.active {
            warn!(user_id = %user.id, "Login rejected: account not verified");
            return Err(AccountError::InvalidCredentials);
        }

        let credential = self
            .credentials
            .issue(&user.email)
            .map_err(log_failure(AccountError::LoginFailed, "issue credential"))?;

        info!(user_id = %user.id, "User logged in");

        Ok(LoginGrant {
            email: user.email,
            credential,
        })
    }

    pub async fn verify(&self, user_id: &str, token: &str) -> Result<Verification> {
        // An id that cannot exist cannot own a token
        let Ok(user_id) = Uuid::parse_str(user_id) else {
            return Err(AccountError::InvalidOrExpiredToken);
        };

        let verification_token = self
            .tokens
            .find_by_user_id_and_token(user_id, token)
            .await
            .map_err(log_failure(AccountError::VerificationFailed, "find verification token"))?
            .ok_or(AccountError::InvalidOrExpiredToken)?;

        // A TTL chrono cannot represent outlives every token
        let ttl = self
            .policy
            .verification_ttl_seconds
            .and_then(|secs| i64::try_from(secs).ok())
            .and_then(Duration::try_seconds);
        if verification_token.is_expired(ttl, Utc::now()) {
            info!(user_id = %user_id, "Verification rejected: token expired");
            return Err(AccountError::InvalidOrExpiredToken);
        }

        let mut user = self
            .users
            .find_by_id(user_id)
            .await
            .map_err(log_failure(AccountError::VerificationFailed, "find user by id"))?
            .ok_or(AccountError::UserNotFound)?;

        if !user.activate() {
            return Ok(Verification::AlreadyVerified);
        }

        let user = self
            .users
            .save(&user)
            .await
            .map_err(log_failure(AccountError::VerificationFailed, "activate user"))?;

        info!(user_id = %user.id, "User verified");
        Ok(Verification::Activated(user))
    }
}
