//! Talking Stick Service
//!
//! HTTP command API in front of the session registry.
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment
//! 2. Initialize tracing
//! 3. Initialize Prometheus metrics recorder
//! 4. Build the chat-platform gateway and the session registry
//! 5. Bind the HTTP listener (command API, health, metrics)
//! 6. Serve until SIGTERM / Ctrl+C, then close every session

#![warn(clippy::pedantic)]

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use ts_service::config::Config;
use ts_service::observability::{metrics::init_metrics_recorder, HealthState};
use ts_service::platform::DiscordGateway;
use ts_service::routes::{build_routes, AppState};
use ts_service::session::{SessionMetrics, SessionRegistry};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Configuration first: the log filter comes from it
    let config = Config::from_env().map_err(|e| {
        eprintln!("Failed to load configuration: {e}");
        e
    })?;

    let filter = EnvFilter::try_new(&config.logging.filter)
        .unwrap_or_else(|_| EnvFilter::new(common::config::DEFAULT_LOG_FILTER));
    if config.logging.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    info!("Starting Talking Stick service");
    info!(
        discord_api_base_url = %config.discord_api_base_url,
        http_bind_address = %config.http_bind_address,
        default_turn_seconds = config.default_turn_seconds,
        idle_timeout_seconds = config.idle_timeout_seconds,
        tts_grace_seconds = config.tts_grace_seconds,
        shuffle_members = config.shuffle_members,
        "Configuration loaded successfully"
    );

    // Must happen before any metrics are recorded
    let prometheus_handle = init_metrics_recorder().map_err(|e| {
        error!(error = %e, "Failed to install Prometheus metrics recorder");
        e
    })?;
    info!("Prometheus metrics recorder initialized");

    let gateway = DiscordGateway::new(
        config.discord_api_base_url.clone(),
        config.discord_bot_token.clone(),
        config.member_fetch_limit,
    )
    .map_err(|e| {
        error!(error = %e, "Failed to create platform client");
        e
    })?;

    let registry = Arc::new(SessionRegistry::new(
        Arc::new(gateway),
        config.session_settings(),
        SessionMetrics::new(),
    ));

    let health_state = Arc::new(HealthState::new());

    let bind_address: SocketAddr = config.http_bind_address.parse().map_err(|e| {
        error!(error = %e, addr = %config.http_bind_address, "Invalid HTTP bind address");
        format!("Invalid HTTP bind address: {e}")
    })?;

    let state = Arc::new(AppState {
        registry: Arc::clone(&registry),
    });
    let app = build_routes(state, Arc::clone(&health_state), Some(prometheus_handle));

    // Bind before marking ready so bind errors fail startup
    let listener = tokio::net::TcpListener::bind(bind_address)
        .await
        .map_err(|e| {
            error!(error = %e, addr = %bind_address, "Failed to bind HTTP server");
            format!("Failed to bind HTTP server to {bind_address}: {e}")
        })?;
    info!(addr = %bind_address, "HTTP server bound successfully");

    health_state.set_ready();

    let shutdown_health = Arc::clone(&health_state);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            info!("Shutdown signal received, initiating graceful shutdown...");
            // Stop receiving traffic before sessions start closing
            shutdown_health.set_not_ready();
        })
        .await
        .map_err(|e| {
            error!(error = %e, "HTTP server failed");
            e
        })?;

    registry.shutdown().await;

    info!("Talking Stick service shutdown complete");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        #[expect(
            clippy::expect_used,
            reason = "Signal handler installation is critical - panic is appropriate if it fails"
        )]
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        #[expect(
            clippy::expect_used,
            reason = "Signal handler installation is critical - panic is appropriate if it fails"
        )]
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
