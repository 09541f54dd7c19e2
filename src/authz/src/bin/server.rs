//! # Authorization HTTP Server
//!
//! Decision service for the fitness coaching platform backend.
//!
//! ## Configuration
//!
//! Environment variables:
//! - `PORT` - HTTP server port (default: 8080)
//! - `METRICS_PORT` - Metrics server port (default: 9090)
//! - `POLICY_FILE` - JSON policy document replacing the built-in tables
//! - `RUST_LOG` - Log level (default: info)

use anyhow::Context;
use axum::serve;
use fitcoach_authz::http::{create_metrics_router, create_router, AppState};
use fitcoach_authz::ServerConfig;
use std::net::SocketAddr;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Graceful shutdown handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received SIGTERM signal");
        }
    }

    info!("Starting graceful shutdown");
}

/// Main server entrypoint
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Fitcoach Authorization Server v{}", fitcoach_authz::VERSION);

    let config = ServerConfig::from_env().context("invalid server configuration")?;

    info!("Configuration:");
    info!("  Port: {}", config.port);
    info!("  Metrics Port: {}", config.metrics_port);
    if let Some(path) = &config.policy_file {
        info!("  Policy File: {}", path.display());
    }

    // A malformed policy must stop the process here.
    let authorizer = config
        .load_authorizer()
        .context("refusing to start with an invalid policy")?;

    info!(
        "Authorizer ready: {} declared rules, scoped resources {:?}",
        authorizer.policy().len(),
        authorizer.scopes().scoped_resources()
    );

    let state = AppState::new(authorizer);

    let app = create_router(state.clone());
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    let metrics_app = create_metrics_router(state);
    let metrics_addr = SocketAddr::from(([0, 0, 0, 0], config.metrics_port));

    info!("Starting HTTP server on {}", addr);
    info!("Starting metrics server on {}", metrics_addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind HTTP server on {}", addr))?;

    let metrics_listener = tokio::net::TcpListener::bind(metrics_addr)
        .await
        .with_context(|| format!("failed to bind metrics server on {}", metrics_addr))?;

    let server = serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal());

    let metrics_server = serve(metrics_listener, metrics_app.into_make_service())
        .with_graceful_shutdown(shutdown_signal());

    let result = tokio::try_join!(
        async {
            server.await.map_err(|e| {
                error!("HTTP server error: {}", e);
                e
            })
        },
        async {
            metrics_server.await.map_err(|e| {
                error!("Metrics server error: {}", e);
                e
            })
        }
    );

    result.context("server error")?;
    info!("Servers shut down gracefully");
    Ok(())
}
