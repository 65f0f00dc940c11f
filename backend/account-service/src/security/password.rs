/// Password hashing and verification using bcrypt
use thiserror::Error;

/// Work factor used for every stored hash
pub const PASSWORD_HASH_COST: u32 = 12;

#[derive(Debug, Error)]
#[error("Password hashing failed: {0}")]
pub struct HashError(String);

impl From<bcrypt::BcryptError> for HashError {
    fn from(err: bcrypt::BcryptError) -> Self {
        HashError(err.to_string())
    }
}

/// One-way password hashing primitive
///
/// Salting is internal to the implementation; callers only ever see the
/// encoded hash string.
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, password: &str) -> Result<String, HashError>;

    /// `Ok(false)` on mismatch, `Err` only when the stored hash is unusable.
    fn verify(&self, password: &str, password_hash: &str) -> Result<bool, HashError>;
}

#[derive(Debug, Clone, Copy)]
pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    pub fn new() -> Self {
        Self {
            cost: PASSWORD_HASH_COST,
        }
    }

    /// Lower work factors exist for tests only; bcrypt rejects anything below 4.
    pub fn with_cost(cost: u32) -> Self {
        Self { cost }
    }
}

impl Default for BcryptHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl PasswordHasher for BcryptHasher {
    fn hash(&self, password: &str) -> Result<String, HashError> {
        Ok(bcrypt::hash(password, self.cost)?)
    }

    fn verify(&self, password: &str, password_hash: &str) -> Result<bool, HashError> {
        Ok(bcrypt::verify(password, password_hash)?)
    }
}
