//! Robo Pilot Auth Gateway Server
//!
//! Serves the signup, login, logout, CSRF and check-auth endpoints used by
//! the Robo Pilot web client.

use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;

use robo_pilot_auth::{
    config::Config,
    create_router, db,
    store::{
        IdentityStore, InMemoryIdentityStore, InMemorySessionStore, PgIdentityStore,
        PgSessionStore, SessionStore,
    },
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!(
        environment = config.environment.as_str(),
        csrf_mode = ?config.csrf_mode,
        "Starting Robo Pilot auth gateway"
    );

    let (identities, sessions) = build_stores(&config).await?;
    let app_state = AppState::new(config.clone(), identities, sessions);

    spawn_cleanup_task(app_state.clone(), config.session_cleanup_interval_seconds);

    let app = create_router(app_state);

    let addr = config.bind_addr();
    tracing::info!("Server listening on {}", addr);
    tracing::info!("Health check at http://{}/health", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    // Serve with graceful shutdown
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Postgres when DATABASE_URL is set, process memory otherwise
async fn build_stores(
    config: &Config,
) -> anyhow::Result<(Arc<dyn IdentityStore>, Arc<dyn SessionStore>)> {
    if config.database_url.is_none() {
        tracing::warn!("DATABASE_URL not set, using in-memory stores; users and sessions are lost on restart");
        return Ok((
            Arc::new(InMemoryIdentityStore::new()),
            Arc::new(InMemorySessionStore::new()),
        ));
    }

    let pool = db::create_pool(config).await?;
    db::check_health(&pool).await?;
    db::run_migrations(&pool).await?;

    Ok((
        Arc::new(PgIdentityStore::new(pool.clone())),
        Arc::new(PgSessionStore::new(pool)),
    ))
}

/// Periodically purge expired sessions and idle rate-limit buckets
fn spawn_cleanup_task(state: AppState, interval_seconds: u64) {
    let period = Duration::from_secs(interval_seconds);

    tokio::spawn(async move {
        tracing::info!("Session cleanup task started");
        let mut ticker = tokio::time::interval(period);
        ticker.tick().await;

        loop {
            ticker.tick().await;

            match state.auth_service.purge_expired_sessions().await {
                Ok(0) => {}
                Ok(removed) => tracing::info!(removed, "Purged expired sessions"),
                Err(e) => tracing::error!(error = %e, "Failed to purge expired sessions"),
            }

            state.rate_limiter.cleanup(period).await;
        }
    });
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
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
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}
