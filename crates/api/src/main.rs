use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use verity_api::auth::password::Argon2Hasher;
use verity_api::background::token_sweep;
use verity_api::config::ServerConfig;
use verity_api::router::build_app_router;
use verity_api::service::{AuthService, AuthServiceConfig};
use verity_api::state::AppState;
use verity_core::clock::{Clock, SystemClock};
use verity_db::memory::MemoryStore;
use verity_db::repositories::PgStore;
use verity_db::store::Stores;
use verity_notify::{EmailConfig, EmailNotifier, LogNotifier, Notifier};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "verity_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env().context("Invalid configuration")?;
    tracing::info!(host = %config.host, port = config.port, "Loaded server configuration");

    // --- Storage ---
    let stores = match &config.database_url {
        Some(url) => {
            let pool = verity_db::create_pool(url)
                .await
                .context("Failed to connect to database")?;
            tracing::info!("Database connection pool created");

            verity_db::health_check(&pool)
                .await
                .context("Database health check failed")?;
            verity_db::run_migrations(&pool)
                .await
                .context("Failed to run database migrations")?;
            tracing::info!("Database migrations applied");

            Stores::shared(Arc::new(PgStore::new(pool)))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, accounts and tokens are kept in memory");
            Stores::shared(Arc::new(MemoryStore::new()))
        }
    };

    // --- Delivery ---
    let email_config = EmailConfig::from_env().context("Invalid SMTP configuration")?;
    let notifier: Arc<dyn Notifier> = match email_config {
        Some(email) => {
            tracing::info!(smtp_host = %email.smtp_host, "SMTP delivery enabled");
            Arc::new(
                EmailNotifier::new(email, config.verification.clone())
                    .context("Failed to build SMTP transport")?,
            )
        }
        None => {
            tracing::warn!("SMTP_HOST not set, verification messages are only logged");
            Arc::new(LogNotifier::new(config.verification.clone()))
        }
    };

    // --- Services ---
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let auth = Arc::new(AuthService::new(
        stores.clone(),
        notifier,
        Arc::new(Argon2Hasher),
        Arc::clone(&clock),
        AuthServiceConfig {
            verification: config.verification.clone(),
            session: config.session.clone(),
        },
    ));

    // --- Token sweep ---
    let sweep_cancel = CancellationToken::new();
    let sweep_handle = tokio::spawn(token_sweep::run(
        Arc::clone(&stores.tokens),
        clock,
        config.sweep_interval,
        sweep_cancel.clone(),
    ));

    // --- Router ---
    let app = build_app_router(
        AppState::new(auth),
        Duration::from_secs(config.request_timeout_secs),
    );

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().context("Invalid HOST address")?,
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    sweep_cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(5), sweep_handle).await;
    tracing::info!("Token sweep stopped");

    tracing::info!("Graceful shutdown complete");
    Ok(())
}

/// Wait for SIGINT (Ctrl-C) or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
