// src/main.rs

use std::{net::SocketAddr, sync::Arc, time::Duration};

use sqlx::SqlitePool;
use timed_quiz::{
    clock::SystemClock,
    config::Config,
    routes,
    services::{
        certificate::{CertificateIssuer, PdfCertificateIssuer},
        identity::{DisabledVerifier, GoogleTokenVerifier, IdentityVerifier},
    },
    state::AppState,
    store,
    utils::hash::hash_password,
};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration from environment (.env included)
    let config = Config::from_env()?;

    let file_appender = tracing_appender::rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    // Initialize Tracing (Logging)
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    // Initialize Database Pool with Retry
    let mut retry_count = 0;
    let pool = loop {
        match store::connect(&config.database_url, 5).await {
            Ok(pool) => break pool,
            Err(e) => {
                retry_count += 1;
                if retry_count > 5 {
                    tracing::error!("Failed to open database after 5 retries: {}", e);
                    return Err(e.into());
                }
                tracing::warn!("Database not ready, retrying in 2s... (Attempt {})", retry_count);
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
        }
    };

    tracing::info!("Database connected...");

    // Run Migrations Automatically
    tracing::info!("Running migrations...");
    store::migrate(&pool).await?;
    tracing::info!("Migrations applied successfully.");

    let seeded = store::questions::seed_default_questions(&pool).await?;
    if seeded > 0 {
        tracing::info!("Seeded {} sample questions", seeded);
    }

    if let Err(e) = seed_admin(&pool, &config).await {
        tracing::error!("Failed to seed admin: {:?}", e);
    }

    let verifier: Arc<dyn IdentityVerifier> = match &config.google_client_id {
        Some(client_id) => Arc::new(GoogleTokenVerifier::new(client_id.clone())),
        None => {
            if config.verification.required {
                tracing::warn!(
                    "REQUIRE_EMAIL_VERIFICATION is set but GOOGLE_CLIENT_ID is missing; every start will be rejected"
                );
            }
            Arc::new(DisabledVerifier)
        }
    };

    tokio::fs::create_dir_all(&config.certificate_dir).await?;
    let issuer: Arc<dyn CertificateIssuer> =
        Arc::new(PdfCertificateIssuer::new(config.certificate_dir.clone()));

    let state = AppState {
        pool,
        config: config.clone(),
        clock: Arc::new(SystemClock),
        verifier,
        issuer,
    };

    // Create the Axum application router
    let app = routes::create_router(state);

    tracing::info!("Listening on {}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;

    // Peer addresses identify students, so the server keeps connect info
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

async fn seed_admin(pool: &SqlitePool, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    if let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) {
        let hashed_password = hash_password(password)?;
        if store::admins::insert_admin_if_missing(pool, email, &hashed_password).await? {
            tracing::info!("Admin {} created successfully.", email);
        }
    }
    Ok(())
}
