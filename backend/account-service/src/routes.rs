/// Route definitions
use actix_web::{error::JsonPayloadError, web, HttpRequest};

use crate::error::AccountError;
use crate::handlers::{health_check, login, register, verify_email};

/// Malformed JSON bodies get the same `{message}` shape as every other error
fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    tracing::debug!(error = %err, "Rejected request body");
    AccountError::Validation("Request body must be JSON with email and password".to_string())
        .into()
}

/// Configure routes for account service
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .route("/health", web::get().to(health_check))
        .service(
            web::scope("/users")
                .route("/register", web::post().to(register))
                .route("/login", web::post().to(login))
                .route("/verify/{user_id}/{token}", web::get().to(verify_email)),
        );
}
