/// HTTP request handlers (REST API)
pub mod accounts;

pub use accounts::{login, register, verify_email};

use actix_web::HttpResponse;

/// Health check endpoint
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().body("OK")
}
