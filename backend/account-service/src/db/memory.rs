/// In-process account storage
///
/// Used when no database is configured and by the HTTP tests. The email
/// index is claimed through a map entry, so two concurrent registrations for
/// the same address cannot both succeed.
use super::{UserStore, VerificationTokenStore};
use crate::error::{StoreError, StoreResult};
use crate::models::{User, VerificationToken};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

#[derive(Default)]
pub struct MemoryStore {
    users: DashMap<Uuid, User>,
    emails: DashMap<String, Uuid>,
    tokens: DashMap<(Uuid, String), VerificationToken>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    /// All tokens issued to one user
    pub fn tokens_for(&self, user_id: Uuid) -> Vec<VerificationToken> {
        self.tokens
            .iter()
            .filter(|entry| entry.key().0 == user_id)
            .map(|entry| entry.value().clone())
            .collect()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let Some(id) = self.emails.get(email).map(|entry| *entry.value()) else {
            return Ok(None);
        };
        Ok(self.users.get(&id).map(|entry| entry.value().clone()))
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.users.get(&id).map(|entry| entry.value().clone()))
    }

    async fn save(&self, user: &User) -> StoreResult<User> {
        match self.emails.entry(user.email.clone()) {
            Entry::Occupied(entry) if *entry.get() != user.id => {
                return Err(StoreError::UniqueViolation);
            }
            Entry::Occupied(_) => {}
            Entry::Vacant(entry) => {
                entry.insert(user.id);
            }
        }

        if let Some(previous) = self.users.insert(user.id, user.clone()) {
            if previous.email != user.email {
                self.emails.remove(&previous.email);
            }
        }

        Ok(user.clone())
    }

    async fn create_with_token(
        &self,
        user: &User,
        token: &VerificationToken,
    ) -> StoreResult<User> {
        match self.emails.entry(user.email.clone()) {
            Entry::Occupied(_) => return Err(StoreError::UniqueViolation),
            Entry::Vacant(entry) => {
                entry.insert(user.id);
            }
        }

        self.users.insert(user.id, user.clone());
        self.tokens
            .insert((token.user_id, token.token.clone()), token.clone());

        Ok(user.clone())
    }
}

#[async_trait]
impl VerificationTokenStore for MemoryStore {
    async fn find_by_user_id_and_token(
        &self,
        user_id: Uuid,
        token: &str,
    ) -> StoreResult<Option<VerificationToken>> {
        Ok(self
            .tokens
            .get(&(user_id, token.to_string()))
            .map(|entry| entry.value().clone()))
    }

    async fn save(&self, token: &VerificationToken) -> StoreResult<VerificationToken> {
        self.tokens
            .insert((token.user_id, token.token.clone()), token.clone());
        Ok(token.clone())
    }
}
