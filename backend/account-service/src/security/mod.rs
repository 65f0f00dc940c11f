/// Security primitives for accounts
/// Password hashing, verification tokens and login credentials
pub mod credential;
pub mod password;
pub mod token;

pub use credential::{Claims, CredentialError, CredentialIssuer};
pub use password::{BcryptHasher, HashError, PasswordHasher, PASSWORD_HASH_COST};
pub use token::generate_verification_token;
