//! Courier server binary.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use courier_core::{Config, tracing_init};
use tracing::{info, warn};

use courier_server::routes::{AppState, build_router};
use courier_server::storage::Database;

#[derive(Parser, Debug)]
#[command(name = "courier-server")]
#[command(version, about = "Courier messaging server - webhooks, dispatch, OAuth linking")]
struct Args {
    /// Address to listen on.
    #[arg(long, default_value = "0.0.0.0:8080", env = "COURIER_LISTEN_ADDR")]
    addr: SocketAddr,

    /// Path to the SQLite database file.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Output logs as JSON (for structured log aggregation).
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    tracing_init::init_tracing("courier_server=info,tower_http=info", args.log_json);

    let config = Arc::new(Config::from_env());

    info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %args.addr,
        "Starting courier-server"
    );
    if config.twilio.is_none() {
        warn!("Twilio credentials not configured; sub-account linking is disabled");
    }
    if config.meta.is_none() {
        warn!("Meta app credentials not configured; page linking is disabled");
    }

    let db_path = args
        .db_path
        .or_else(|| config.database_path.clone())
        .unwrap_or_else(|| PathBuf::from("courier.db"));
    info!(path = %db_path.display(), "Opening database");
    let db = Database::open(&db_path).await?;

    let state = AppState::new(db, config);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(args.addr).await?;
    info!(addr = %args.addr, "Courier server listening");

    tokio::select! {
        result = axum::serve(listener, app) => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
    }

    info!("Courier stopped");
    Ok(())
}
