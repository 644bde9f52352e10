use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use tokio::signal;
use tracing::info;

use enforcr::api::{create_router, AppState};
use enforcr::config::Config;
use enforcr::engine::PolicyEngine;
use enforcr::observability::{init_tracing, MetricsRegistry};
use enforcr::policy::{PolicySource, PolicyWatcher};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse configuration
    let config = Config::parse();

    // Initialize tracing
    init_tracing(&config.log_level, config.log_json);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting enforcr policy engine"
    );

    // Load initial policy; refuse to start without one
    let loader = config.policy_loader();
    let (document, ruleset) = loader
        .load()
        .with_context(|| format!("failed to load initial policy from {:?}", loader.source()))?;

    info!(
        policy_version = %ruleset.policy_version,
        rules = ruleset.len(),
        "Loaded initial policy"
    );

    let engine = Arc::new(PolicyEngine::new(ruleset));
    let metrics = Arc::new(MetricsRegistry::new());

    // Watch the policy file for changes
    let policy_handle = match loader.source() {
        PolicySource::File(path) => {
            info!(path = %path.display(), interval_secs = config.policy_reload_secs, "Policy hot reload enabled");
            let watcher = PolicyWatcher::new(
                loader.clone(),
                engine.clone(),
                metrics.clone(),
                config.policy_reload_interval(),
            )
            .with_installed(&document);
            Some(watcher.start())
        }
        PolicySource::Builtin => {
            info!("Using built-in policy (hot reload disabled)");
            None
        }
    };

    // Create application state
    let state = Arc::new(AppState {
        engine,
        metrics,
        loader,
        start_time: Instant::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        latency_budget: config.latency_budget(),
    });

    // Create router
    let app = create_router(state);

    // Parse listen address
    let addr: SocketAddr = config
        .listen_addr
        .parse()
        .with_context(|| format!("invalid listen address {}", config.listen_addr))?;

    info!(addr = %addr, "Starting HTTP server");

    // Create TCP listener
    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Run server with graceful shutdown
    if config.graceful_shutdown {
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
    } else {
        axum::serve(listener, app).await?;
    }

    // Cleanup
    info!("Shutting down...");
    if let Some(handle) = policy_handle {
        handle.abort();
    }

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Received shutdown signal");
}
