use std::net::SocketAddr;

use anyhow::Context;
use dotenv::dotenv;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    prelude::*,
    EnvFilter,
};

use migraine_diary_api::{create_app, AppState, Clients};
use migraine_diary_domain::config::AppConfig;
use migraine_diary_domain::database::DatabasePool;
use migraine_diary_domain::scheduler::ReminderScheduler;

/// The main entry point for the Migraine Diary API server
///
/// Loads `.env`, sets up tracing, opens and migrates the SQLite database,
/// starts the reminder scheduler and serves the router until a shutdown
/// signal arrives.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if dotenv().is_err() {
        eprintln!("Warning: .env file not found or couldn't be read. Using environment variables.");
    }

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_span_events(FmtSpan::CLOSE)
                .with_target(false)
                .with_ansi(true)
                .with_timer(fmt::time::uptime())
                .with_writer(std::io::stdout),
        )
        .with(env_filter)
        .init();

    info!("Starting Migraine Diary API server");

    let config = AppConfig::from_env();
    if config.cron_secret.is_none() {
        warn!("CRON_SECRET is not set; /cron routes will reject every call");
    }
    if config.is_production() && std::env::var("JWT_SECRET").is_err() {
        warn!("JWT_SECRET is not set in production; every authenticated request will fail");
    }

    let pool = DatabasePool::connect(&config.database).context("failed to open the database")?;
    info!("Database ready: {}", pool.connection_info());

    let clients = Clients::from_config(&config).context("failed to build outbound clients")?;
    let state = AppState::new(&config, pool, clients);

    let scheduler = ReminderScheduler::spawn(state.reminders.clone(), config.reminder_poll_interval);

    let app = create_app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    if let Some(handle) = scheduler {
        handle.abort();
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
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

    info!("Shutting down server...");
}
