// # hackregd - Registration and Check-In Daemon
//
// Thin integration layer over hackreg-core. The daemon is responsible for:
// 1. Reading configuration from environment variables (and `.env`)
// 2. Initializing logging and the runtime
// 3. Wiring the record store and outbound collaborators
// 4. Serving the `/api/v25` routes until SIGTERM or SIGINT
//
// Redemption, intake and resend logic live in hackreg-core; handlers only
// translate outcomes into HTTP statuses.
//
// ## Configuration
//
// ### Record Store
// - `HACKREG_STORE_TYPE`: notion (default) or memory
// - `NOTION_TOKEN` (or `NOTION_KEY`): Notion integration token
// - `NOTION_DATABASE_ID`: Attendee database id
//
// ### Notifications
// - `DISCORD_WEBHOOK_URL`: Organizer alert webhook (optional)
// - `GOOGLE_APP_PASS`: SMTP password; enables ticket emails
// - `HACKREG_SMTP_USERNAME`: Sender address, required with `GOOGLE_APP_PASS`
// - `HACKREG_SMTP_SERVER`, `HACKREG_SMTP_PORT`: Relay (default smtp.gmail.com:587)
//
// ### Event
// - `HACKREG_EVENT_NAME`: Shown in email subjects
// - `HACKREG_PUBLIC_BASE_URL`: Base for ticket image links
//
// ### Engine
// - `HACKREG_MAX_ATTEMPTS`: Store calls per operation under rate limiting
// - `HACKREG_RETRY_DEADLINE_SECS`: Time budget per operation
// - `HACKREG_RESEND_PACING_MS`: Pause between bulk resend emails
//
// ### Server
// - `HACKREG_BIND_ADDR`: Listen address (default 0.0.0.0:8080)
// - `HACKREG_LOG_LEVEL`: trace, debug, info, warn, error
//
// ## Example
//
// ```bash
// export NOTION_TOKEN=secret_...
// export NOTION_DATABASE_ID=1a2b3c...
// export DISCORD_WEBHOOK_URL=https://discord.com/api/webhooks/...
// export GOOGLE_APP_PASS=...
// export HACKREG_SMTP_USERNAME=club@example.com
//
// hackregd
// ```

mod app;
mod config;
mod routes;

use anyhow::{Context, Result};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

use crate::app::AppState;
use crate::config::DaemonConfig;

/// How long in-flight requests may run after a shutdown signal
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum HackregExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<HackregExitCode> for ExitCode {
    fn from(code: HackregExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

fn main() -> ExitCode {
    // A missing .env is normal outside local development
    let dotenv = dotenvy::dotenv();

    let config = match DaemonConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return HackregExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {:#}", e);
        return HackregExitCode::ConfigError.into();
    }

    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return HackregExitCode::ConfigError.into();
    }

    info!("Starting hackregd for {}", config.pipeline.event.name);
    if let Ok(path) = dotenv {
        info!("Loaded environment from {}", path.display());
    }

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return HackregExitCode::RuntimeError.into();
        }
    };

    rt.block_on(async {
        // Adapters are built inside the runtime; some of them spawn tasks
        let state = match AppState::from_config(&config.pipeline) {
            Ok(state) => Arc::new(state),
            Err(e) => {
                error!("Failed to initialize pipeline: {:#}", e);
                return HackregExitCode::ConfigError;
            }
        };

        if let Err(e) = run_daemon(config, state).await {
            error!("Daemon error: {:#}", e);
            HackregExitCode::RuntimeError
        } else {
            HackregExitCode::CleanShutdown
        }
    })
    .into()
}

/// Serve the API until a shutdown signal arrives
async fn run_daemon(config: DaemonConfig, state: Arc<AppState>) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;

    info!("Listening on {}", config.bind_addr);

    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let mut server = tokio::spawn(async move {
        axum::serve(listener, routes::router(state))
            .with_graceful_shutdown(async move {
                let _ = stop_rx.await;
            })
            .await
    });

    tokio::select! {
        joined = &mut server => {
            // The server only stops on its own when it fails
            joined.context("Server task panicked")??;
            anyhow::bail!("Server stopped unexpectedly");
        }
        signal = wait_for_shutdown() => {
            info!("Received shutdown signal: {}", signal?);
        }
    }

    info!("Draining in-flight requests");
    let _ = stop_tx.send(());

    match tokio::time::timeout(SHUTDOWN_GRACE, server).await {
        Ok(joined) => {
            joined.context("Server task panicked")??;
            info!("Shutdown complete");
            Ok(())
        }
        Err(_) => {
            warn!("Requests still running after {:?}; exiting anyway", SHUTDOWN_GRACE);
            Ok(())
        }
    }
}

/// Wait for SIGTERM or SIGINT
///
/// Returns the name of the signal received.
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

/// Wait for CTRL-C
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
