/// Data models for accounts
pub mod user;
pub mod verification_token;

pub use user::{
    LoginRequest, LoginResponse, RegisterRequest, RegisterResponse, User, VerifyResponse,
};
pub use verification_token::VerificationToken;
