use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use snapshot_core::settings::Settings;
use snapshot_server::HandlerState;
use snapshot_store::{Database, SnapshotRepo};
use snapshot_telemetry::TelemetryConfig;

/// Conversation snapshot server speaking JSON-RPC over stdio.
#[derive(Debug, Parser)]
#[command(name = "snapshot-server", version)]
struct Args {
    /// SQLite database file. Overrides SNAPSHOT_DB_PATH.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Default log filter. Overrides SNAPSHOT_LOG.
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let (mut settings, rejected) = Settings::from_env();
    if let Some(path) = args.db_path {
        settings.db_path = path;
    }
    if let Some(level) = args.log_level {
        settings.log_level = level;
    }

    snapshot_telemetry::init_telemetry(&TelemetryConfig {
        log_level: settings.log_level.clone(),
        module_levels: Vec::new(),
        json: settings.log_json,
    })
    .context("failed to initialize logging")?;

    for entry in &rejected {
        tracing::warn!(key = entry.key, value = %entry.value, reason = entry.reason, "ignoring invalid setting");
    }

    let db = Database::open(&settings.db_path)
        .with_context(|| format!("failed to open database at {}", settings.db_path.display()))?;

    let stored = SnapshotRepo::new(db.clone())
        .count()
        .context("failed to count stored snapshots")?;

    let state = Arc::new(HandlerState::new(&db, &settings));
    tracing::info!(
        tools = state.registry.count(),
        policy = state.policy.name(),
        snapshots = stored,
        "snapshot server ready"
    );

    tokio::select! {
        result = snapshot_server::serve_stdio(state) => {
            result.context("stdio transport failed")?;
        }
        signal = shutdown_signal() => {
            tracing::info!(signal, "shutdown signal received");
        }
    }

    tracing::info!("shutting down");
    db.close().context("failed to close database")?;
    Ok(())
}

/// Resolves on Ctrl-C or, on Unix, SIGTERM. Returns the signal's name.
async fn shutdown_signal() -> &'static str {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => "SIGINT",
        _ = terminate => "SIGTERM",
    }
}
