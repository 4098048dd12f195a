//! qrtrack HTTP server.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};

use qrtrack_core::config::{default_database_path, load_config};
use qrtrack_core::tracing_init::init_tracing;
use qrtrack_server::geo::GeoTable;
use qrtrack_server::server::{AppState, build_router};
use qrtrack_server::storage::QrDatabase;

#[derive(Parser, Debug)]
#[command(name = "qrtrack-server")]
#[command(version, about = "qrtrack server - QR code scan tracking and expiry enforcement")]
struct Args {
    /// Address to listen on.
    #[arg(long, default_value = "0.0.0.0:8080", env = "LISTEN_ADDR")]
    addr: SocketAddr,

    /// Path to SQLite database file.
    #[arg(long, env = "QRTRACK_DB_PATH")]
    db_path: Option<PathBuf>,

    /// Explicit config file, layered over the global one.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Public origin used in issued tracking URLs.
    #[arg(long)]
    base_url: Option<String>,

    /// Take client addresses from `X-Forwarded-For` (behind a trusted proxy).
    #[arg(long)]
    trust_forwarded_for: bool,

    /// JSON table mapping IP addresses to `{country, city}`.
    #[arg(long, env = "QRTRACK_GEO_TABLE")]
    geo_table: Option<PathBuf>,

    /// Output logs as JSON (for structured log aggregation).
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing("qrtrack_server=info,tower_http=info", args.log_json);

    let mut config = load_config(args.config.as_deref())?;
    if let Some(url) = args.base_url {
        config.server.public_base_url = Some(url);
    }
    if args.trust_forwarded_for {
        config.server.trust_forwarded_for = true;
    }
    if let Some(path) = args.db_path {
        config.storage.database_path = Some(path);
    }

    let db_path = config
        .storage
        .database_path
        .clone()
        .or_else(default_database_path)
        .ok_or_else(|| anyhow::anyhow!("Cannot determine data directory, pass --db-path"))?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %args.addr,
        db = %db_path.display(),
        "Starting qrtrack-server"
    );

    let db = QrDatabase::open(&db_path, &config.storage.pool_settings()).await?;
    let mut state = AppState::new(db, config);

    if let Some(path) = &args.geo_table {
        let table = GeoTable::from_json_file(path)?;
        info!(path = %path.display(), entries = table.len(), "Loaded geo table");
        state = state.with_geo(Arc::new(table));
    }

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(args.addr).await?;
    info!(addr = %args.addr, "HTTP server ready");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
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
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C shutdown signal"),
        () = terminate => info!("Received SIGTERM shutdown signal"),
    }
}
