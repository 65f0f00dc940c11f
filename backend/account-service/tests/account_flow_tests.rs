use actix_web::{http::StatusCode, test, web, App};
use async_trait::async_trait;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

use account_service::{
    config::{AccountSettings, JwtSettings},
    db::{MemoryStore, UserStore, VerificationTokenStore},
    error::{StoreError, StoreResult},
    models::{User, VerificationToken},
    routes::configure_routes,
    security::{BcryptHasher, Claims, CredentialIssuer},
    services::{AccountService, MailError, MailMessage, Mailer},
    AppState,
};

#[derive(Default)]
struct RecordingMailer {
    sent: Mutex<Vec<MailMessage>>,
}

impl RecordingMailer {
    fn sent(&self) -> Vec<MailMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: MailMessage) -> Result<(), MailError> {
        self.sent.lock().unwrap().push(message);
        Ok(())
    }
}

/// Every call fails the way an unreachable database would
struct BrokenStore;

#[async_trait]
impl UserStore for BrokenStore {
    async fn find_by_email(&self, _email: &str) -> StoreResult<Option<User>> {
        Err(StoreError::Database("connection reset by peer".to_string()))
    }

    async fn find_by_id(&self, _id: Uuid) -> StoreResult<Option<User>> {
        Err(StoreError::Database("connection reset by peer".to_string()))
    }

    async fn save(&self, _user: &User) -> StoreResult<User> {
        Err(StoreError::Database("connection reset by peer".to_string()))
    }

    async fn create_with_token(
        &self,
        _user: &User,
        _token: &VerificationToken,
    ) -> StoreResult<User> {
        Err(StoreError::Database("connection reset by peer".to_string()))
    }
}

#[async_trait]
impl VerificationTokenStore for BrokenStore {
    async fn find_by_user_id_and_token(
        &self,
        _user_id: Uuid,
        _token: &str,
    ) -> StoreResult<Option<VerificationToken>> {
        Err(StoreError::Database("connection reset by peer".to_string()))
    }

    async fn save(&self, _token: &VerificationToken) -> StoreResult<VerificationToken> {
        Err(StoreError::Database("connection reset by peer".to_string()))
    }
}

fn jwt_settings() -> JwtSettings {
    JwtSettings {
        secret: "integration-test-secret".to_string(),
        issuer: "account-service".to_string(),
        expiry_seconds: 3600,
    }
}

fn build_state(
    users: Arc<dyn UserStore>,
    tokens: Arc<dyn VerificationTokenStore>,
    mailer: Arc<dyn Mailer>,
    policy: AccountSettings,
) -> AppState {
    let accounts = AccountService::new(
        users,
        tokens,
        Arc::new(BcryptHasher::with_cost(4)),
        CredentialIssuer::new(&jwt_settings()),
        mailer,
        policy,
    );
    AppState {
        accounts: Arc::new(accounts),
    }
}

fn memory_state(policy: AccountSettings) -> (AppState, Arc<MemoryStore>, Arc<RecordingMailer>) {
    let store = Arc::new(MemoryStore::new());
    let mailer = Arc::new(RecordingMailer::default());
    let state = build_state(store.clone(), store.clone(), mailer.clone(), policy);
    (state, store, mailer)
}

async fn wait_for_mail(mailer: &RecordingMailer, count: usize) -> Vec<MailMessage> {
    for _ in 0..50 {
        let sent = mailer.sent();
        if sent.len() >= count {
            return sent;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    mailer.sent()
}

fn credentials(email: &str, password: &str) -> Value {
    json!({ "email": email, "password": password })
}

/// Strip scheme and host from an absolute verification link
fn link_path(link: &str) -> String {
    let after_scheme = link.split_once("://").map(|(_, rest)| rest).unwrap_or(link);
    let start = after_scheme.find('/').unwrap_or(0);
    after_scheme[start..].to_string()
}

#[actix_web::test]
async fn register_verify_login_flow() {
    let (state, store, mailer) = memory_state(AccountSettings::default());
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(configure_routes),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/users/register")
        .insert_header(("host", "accounts.test"))
        .set_json(credentials("a@x.io", "pw1"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(
        body["message"],
        "User registered successfully. Please check your email for verification link."
    );
    let token = body["token"].as_str().unwrap().to_string();
    let link = body["verificationLink"].as_str().unwrap().to_string();
    assert_eq!(token.len(), 64);
    assert!(link.starts_with("http://accounts.test/users/verify/"));
    assert!(link.ends_with(&token));

    let user = store.find_by_email("a@x.io").await.unwrap().unwrap();
    assert!(!user.active);
    assert!(user.password_hash.starts_with("$2b$"));
    assert_ne!(user.password_hash, "pw1");

    let sent = wait_for_mail(&mailer, 1).await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "a@x.io");
    assert!(sent[0].text_body.contains(&link));

    // An unverified account can still log in by default
    let req = test::TestRequest::post()
        .uri("/users/login")
        .set_json(credentials("a@x.io", "pw1"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::get().uri(&link_path(&link)).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "User verified successfully");
    assert_eq!(body["user"]["email"], "a@x.io");
    assert_eq!(body["user"]["active"], true);
    assert!(body["user"].get("passwordHash").is_none());
    assert!(body["user"].get("password_hash").is_none());

    let req = test::TestRequest::post()
        .uri("/users/login")
        .set_json(credentials("a@x.io", "pw1"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "User Logged In");
    assert_eq!(body["user"], "a@x.io");

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&["account-service"]);
    let claims = decode::<Claims>(
        body["token"].as_str().unwrap(),
        &DecodingKey::from_secret(jwt_settings().secret.as_bytes()),
        &validation,
    )
    .unwrap()
    .claims;
    assert_eq!(claims.email, "a@x.io");
    assert_eq!(claims.iss, "account-service");
}

#[actix_web::test]
async fn duplicate_registration_returns_400() {
    let (state, store, _mailer) = memory_state(AccountSettings::default());
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(configure_routes),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/users/register")
        .set_json(credentials("dup@x.io", "pw1"))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

    let req = test::TestRequest::post()
        .uri("/users/register")
        .set_json(credentials("dup@x.io", "other"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body, json!({ "message": "Email already exists" }));

    assert_eq!(store.user_count(), 1);
    assert_eq!(store.token_count(), 1);
}

#[actix_web::test]
async fn login_failures_are_indistinguishable() {
    let (state, _store, _mailer) = memory_state(AccountSettings::default());
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(configure_routes),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/users/register")
        .set_json(credentials("b@x.io", "right"))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

    let req = test::TestRequest::post()
        .uri("/users/login")
        .set_json(credentials("b@x.io", "wrong"))
        .to_request();
    let wrong_password = test::call_service(&app, req).await;
    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
    let wrong_password = test::read_body(wrong_password).await;

    let req = test::TestRequest::post()
        .uri("/users/login")
        .set_json(credentials("nobody@x.io", "right"))
        .to_request();
    let unknown_email = test::call_service(&app, req).await;
    assert_eq!(unknown_email.status(), StatusCode::UNAUTHORIZED);
    let unknown_email = test::read_body(unknown_email).await;

    assert_eq!(wrong_password, unknown_email);
    let body: Value = serde_json::from_slice(&wrong_password).unwrap();
    assert_eq!(body, json!({ "message": "Invalid credentials" }));
}

#[actix_web::test]
async fn verification_is_idempotent() {
    let (state, _store, _mailer) = memory_state(AccountSettings::default());
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(configure_routes),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/users/register")
        .set_json(credentials("c@x.io", "pw"))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let path = link_path(body["verificationLink"].as_str().unwrap());

    let req = test::TestRequest::get().uri(&path).to_request();
    let first: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(first["message"], "User verified successfully");

    let req = test::TestRequest::get().uri(&path).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let second: Value = test::read_body_json(resp).await;
    assert_eq!(second, json!({ "message": "User already verified" }));
}

#[actix_web::test]
async fn verification_rejects_unknown_links() {
    let (state, store, _mailer) = memory_state(AccountSettings::default());
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(configure_routes),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/users/register")
        .set_json(credentials("d@x.io", "pw"))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let token = body["token"].as_str().unwrap().to_string();
    let user = store.find_by_email("d@x.io").await.unwrap().unwrap();

    let cases = [
        format!("/users/verify/{}/{}", user.id, "0".repeat(64)),
        format!("/users/verify/{}/{}", Uuid::new_v4(), token),
        format!("/users/verify/not-a-uuid/{}", token),
    ];
    for uri in cases {
        let req = test::TestRequest::get().uri(&uri).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{}", uri);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(
            body,
            json!({ "message": "Invalid or expired verification link" })
        );
    }

    let still_inactive = store.find_by_email("d@x.io").await.unwrap().unwrap();
    assert!(!still_inactive.active);
}

#[actix_web::test]
async fn verification_of_orphaned_token_returns_user_not_found() {
    let (state, store, _mailer) = memory_state(AccountSettings::default());
    let orphan = VerificationToken::new(Uuid::new_v4(), "f".repeat(64));
    VerificationTokenStore::save(store.as_ref(), &orphan)
        .await
        .unwrap();

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(configure_routes),
    )
    .await;

    let uri = format!("/users/verify/{}/{}", orphan.user_id, orphan.token);
    let req = test::TestRequest::get().uri(&uri).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body, json!({ "message": "User not found" }));
}

#[actix_web::test]
async fn register_invalid_payload_returns_400() {
    let (state, store, _mailer) = memory_state(AccountSettings::default());
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(configure_routes),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/users/register")
        .set_json(credentials("not-an-email", "pw"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "A valid email address is required");

    // Longer than the users.email column
    let long_email = format!(
        "{}@{}.{}.{}.{}.com",
        "a".repeat(64),
        "b".repeat(57),
        "c".repeat(57),
        "d".repeat(57),
        "e".repeat(57)
    );
    assert_eq!(long_email.len(), 300);
    let req = test::TestRequest::post()
        .uri("/users/register")
        .set_json(credentials(&long_email, "pw"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "A valid email address is required");

    let req = test::TestRequest::post()
        .uri("/users/register")
        .set_json(credentials("e@x.io", ""))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::post()
        .uri("/users/register")
        .insert_header(("content-type", "application/json"))
        .set_payload("{\"email\":")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["message"].is_string());

    assert_eq!(store.user_count(), 0);
}

#[actix_web::test]
async fn register_hides_token_when_not_exposed() {
    let policy = AccountSettings {
        expose_verification_token: false,
        ..AccountSettings::default()
    };
    let (state, _store, mailer) = memory_state(policy);
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(configure_routes),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/users/register")
        .set_json(credentials("f@x.io", "pw"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    assert!(body.get("token").is_none());
    assert!(body.get("verificationLink").is_none());
    assert!(body["message"].is_string());

    // The link still goes out by mail
    let sent = wait_for_mail(&mailer, 1).await;
    assert_eq!(sent.len(), 1);
    assert!(sent[0].text_body.contains("/users/verify/"));
}

#[actix_web::test]
async fn login_requires_verification_when_configured() {
    let policy = AccountSettings {
        require_verified_login: true,
        ..AccountSettings::default()
    };
    let (state, _store, _mailer) = memory_state(policy);
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(configure_routes),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/users/register")
        .set_json(credentials("g@x.io", "pw"))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let path = link_path(body["verificationLink"].as_str().unwrap());

    let req = test::TestRequest::post()
        .uri("/users/login")
        .set_json(credentials("g@x.io", "pw"))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::UNAUTHORIZED
    );

    let req = test::TestRequest::get().uri(&path).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::post()
        .uri("/users/login")
        .set_json(credentials("g@x.io", "pw"))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
}

#[actix_web::test]
async fn store_failures_return_generic_500() {
    let store = Arc::new(BrokenStore);
    let mailer = Arc::new(RecordingMailer::default());
    let state = build_state(
        store.clone(),
        store,
        mailer.clone(),
        AccountSettings::default(),
    );
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(configure_routes),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/users/register")
        .set_json(credentials("h@x.io", "pw"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body, json!({ "message": "Error registering user" }));

    let req = test::TestRequest::post()
        .uri("/users/login")
        .set_json(credentials("h@x.io", "pw"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body, json!({ "message": "Error during login" }));

    let uri = format!("/users/verify/{}/{}", Uuid::new_v4(), "a".repeat(64));
    let req = test::TestRequest::get().uri(&uri).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body, json!({ "message": "Error verifying user" }));

    assert!(mailer.sent().is_empty());
}

#[actix_web::test]
async fn health_check_returns_ok() {
    let (state, _store, _mailer) = memory_state(AccountSettings::default());
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(configure_routes),
    )
    .await;

    let req = test::TestRequest::get().uri("/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(test::read_body(resp).await.as_ref(), b"OK");
}

#[actix_web::test]
async fn configured_base_url_ignores_forwarded_host() {
    let policy = AccountSettings {
        public_base_url: Some("https://accounts.example.com/".parse().unwrap()),
        ..AccountSettings::default()
    };
    let (state, _store, mailer) = memory_state(policy);
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(configure_routes),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/users/register")
        .insert_header(("x-forwarded-host", "evil.test"))
        .insert_header(("forwarded", "host=evil.test;proto=http"))
        .set_json(credentials("i@x.io", "pw"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    let link = body["verificationLink"].as_str().unwrap();
    assert!(link.starts_with("https://accounts.example.com/users/verify/"));

    let sent = wait_for_mail(&mailer, 1).await;
    assert_eq!(sent.len(), 1);
    assert!(!sent[0].text_body.contains("evil.test"));
    assert!(!sent[0].html_body.as_deref().unwrap().contains("evil.test"));
}

#[actix_web::test]
async fn forwarded_host_markup_is_escaped_in_mail() {
    let (state, _store, mailer) = memory_state(AccountSettings::default());
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(configure_routes),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/users/register")
        .insert_header(("x-forwarded-host", "evil.test\"><b>x</b>"))
        .set_json(credentials("j@x.io", "pw"))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

    let sent = wait_for_mail(&mailer, 1).await;
    assert_eq!(sent.len(), 1);
    let html = sent[0].html_body.as_deref().unwrap();
    assert!(!html.contains("<b>x</b>"));
    assert!(html.contains("&lt;b&gt;x&lt;/b&gt;"));
}
