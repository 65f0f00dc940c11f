/// Business logic services
pub mod accounts;
pub mod email;
pub mod templates;

pub use accounts::{AccountService, LinkOrigin, LoginGrant, Registration, Verification};
pub use email::{MailError, MailMessage, Mailer, SmtpMailer};
