/// Persistence seams for accounts
///
/// Handlers only see these traits. `PgStore` backs production, `MemoryStore`
/// backs local runs without `DATABASE_URL` and the HTTP tests. Both enforce
/// email uniqueness at the storage layer, so the handler's existence check
/// is only an early-out.
use crate::error::StoreResult;
use crate::models::{User, VerificationToken};
use async_trait::async_trait;
use uuid::Uuid;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Exact-match lookup; emails are not case-folded.
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;

    /// Insert or update by id.
    async fn save(&self, user: &User) -> StoreResult<User>;

    /// Insert a fresh user together with its verification token, all or
    /// nothing. Fails with `StoreError::UniqueViolation` on a taken email.
    async fn create_with_token(&self, user: &User, token: &VerificationToken)
        -> StoreResult<User>;
}

#[async_trait]
pub trait VerificationTokenStore: Send + Sync {
    async fn find_by_user_id_and_token(
        &self,
        user_id: Uuid,
        token: &str,
    ) -> StoreResult<Option<VerificationToken>>;

    async fn save(&self, token: &VerificationToken) -> StoreResult<VerificationToken>;
}
