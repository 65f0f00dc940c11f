/// Account handlers
use actix_web::{web, HttpRequest, HttpResponse};

use crate::{
    error::AccountError,
    models::{LoginRequest, LoginResponse, RegisterRequest, RegisterResponse, VerifyResponse},
    services::{LinkOrigin, Verification},
    AppState,
};

const REGISTERED_MESSAGE: &str =
    "User registered successfully. Please check your email for verification link.";

/// Register endpoint handler
///
/// `POST /users/register` → 201 `{message, verificationLink, token}`
pub async fn register(
    state: web::Data<AppState>,
    req: HttpRequest,
    payload: web::Json<RegisterRequest>,
) -> Result<HttpResponse, AccountError> {
    // Forwarded headers are client-controlled unless a public URL is pinned
    let origin = match &state.accounts.policy().public_base_url {
        Some(base) => LinkOrigin::from_base_url(base),
        None => {
            let info = req.connection_info();
            LinkOrigin::from_request(info.scheme(), info.host())
        }
    };

    let registration = state
        .accounts
        .register(payload.into_inner(), &origin)
        .await?;

    let (verification_link, token) = if state.accounts.policy().expose_verification_token {
        (
            Some(registration.verification_link),
            Some(registration.token),
        )
    } else {
        (None, None)
    };

    Ok(HttpResponse::Created().json(RegisterResponse {
        message: REGISTERED_MESSAGE.to_string(),
        verification_link,
        token,
    }))
}

/// Login endpoint handler
///
/// `POST /users/login` → 200 `{message, user, token}`
pub async fn login(
    state: web::Data<AppState>,
    payload: web::Json<LoginRequest>,
) -> Result<HttpResponse, AccountError> {
    let grant = state.accounts.login(payload.into_inner()).await?;

    Ok(HttpResponse::Ok().json(LoginResponse {
        message: "User Logged In".to_string(),
        user: grant.email,
        token: grant.credential,
    }))
}

/// Email verification endpoint handler
///
/// `GET /users/verify/{user_id}/{token}`
pub async fn verify_email(
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, AccountError> {
    let (user_id, token) = path.into_inner();

    let body = match state.accounts.verify(&user_id, &token).await? {
        Verification::Activated(user) => VerifyResponse {
            message: "User verified successfully".to_string(),
            user: Some(user),
        },
        Verification::AlreadyVerified => VerifyResponse {
            message: "User already verified".to_string(),
            user: None,
        },
    };

    Ok(HttpResponse::Ok().json(body))
}
