/// Account Service Library
///
/// Registration with hashed-password storage, email verification through an
/// opaque token, and login issuing a signed bearer credential.
///
/// ## Modules
///
/// - `config`: Service configuration
/// - `db`: Store traits with Postgres and in-memory implementations
/// - `error`: Error types
/// - `handlers`: actix-web handlers
/// - `models`: Data models and request/response bodies
/// - `routes`: Route table
/// - `security`: Password hashing, verification tokens, credentials
/// - `services`: Account flows and outbound mail
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod security;
pub mod services;

use std::sync::Arc;

// Re-export commonly used types
pub use error::{AccountError, Result};
pub use models::{User, VerificationToken};
pub use services::AccountService;

#[derive(Clone)]
pub struct AppState {
    pub accounts: Arc<AccountService>,
}
