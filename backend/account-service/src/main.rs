/// Account Service Main Entry Point
///
/// Starts the HTTP server with:
/// - PostgreSQL connection pool (or in-memory store without DATABASE_URL)
/// - bcrypt password hasher
/// - JWT credential issuer
/// - SMTP mailer (no-op without SMTP_HOST)
use account_service::{
    config::Settings,
    db::{MemoryStore, PgStore, UserStore, VerificationTokenStore},
    routes::configure_routes,
    security::{BcryptHasher, CredentialIssuer},
    services::{AccountService, SmtpMailer},
    AppState,
};
use actix_web::{web, App, HttpServer};
use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[actix_web::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "account_service=info,info".into()),
        )
        .with_target(false)
        .json()
        .init();

    info!("Starting Account Service");

    let settings = Settings::load().context("Failed to load configuration")?;
    info!("Configuration loaded successfully");

    let (users, tokens): (Arc<dyn UserStore>, Arc<dyn VerificationTokenStore>) =
        match &settings.database.url {
            Some(url) => {
                let pool = PgPoolOptions::new()
                    .max_connections(settings.database.max_connections)
                    .acquire_timeout(Duration::from_secs(settings.database.acquire_timeout))
                    .connect(url)
                    .await
                    .context("Failed to connect to PostgreSQL")?;
                info!(
                    "Database pool initialized with {} max connections",
                    settings.database.max_connections
                );

                sqlx::migrate!("./migrations")
                    .run(&pool)
                    .await
                    .context("Failed to run database migrations")?;
                info!("Database migrations completed");

                let store = Arc::new(PgStore::new(pool));
                (
                    store.clone() as Arc<dyn UserStore>,
                    store as Arc<dyn VerificationTokenStore>,
                )
            }
            None => {
                warn!("DATABASE_URL not set; accounts are kept in memory and lost on restart");
                let store = Arc::new(MemoryStore::new());
                (
                    store.clone() as Arc<dyn UserStore>,
                    store as Arc<dyn VerificationTokenStore>,
                )
            }
        };

    let mailer = SmtpMailer::new(&settings.email).context("Failed to configure email service")?;

    let accounts = AccountService::new(
        users,
        tokens,
        Arc::new(BcryptHasher::new()),
        CredentialIssuer::new(&settings.jwt),
        Arc::new(mailer),
        settings.account.clone(),
    );
    let state = web::Data::new(AppState {
        accounts: Arc::new(accounts),
    });

    let bind_addr = format!("{}:{}", settings.server.host, settings.server.port);
    info!("HTTP server listening on {}", bind_addr);

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(tracing_actix_web::TracingLogger::default())
            .configure(configure_routes)
    })
    .bind(&bind_addr)
    .with_context(|| format!("Failed to bind {}", bind_addr))?
    .run()
    .await
    .context("HTTP server error")?;

    info!("Account Service stopped");
    Ok(())
}
