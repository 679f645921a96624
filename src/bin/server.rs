//! csvdb Server
//!
//! The `csvdb-server` binary opens one database and serves it over TCP.
//! SIGINT/SIGTERM release the schema-wide lock before the process exits.
//!
//! # Usage
//!
//! ```bash
//! csvdb-server --schema schema.json --data-dir /var/lib/csvdb --port 7432
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tokio::sync::oneshot;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use csvdb::catalog::Schema;
use csvdb::server::{Server, ServerConfig, DEFAULT_PORT};
use csvdb::storage::Database;

/// csvdb TCP server
#[derive(Parser, Debug)]
#[command(name = "csvdb-server", version, about = "Serve a csvdb database over TCP")]
struct Args {
    /// Host address to bind
    #[arg(short = 'H', long, default_value = "127.0.0.1", env = "CSVDB_HOST")]
    host: String,

    /// Port to listen on
    #[arg(short = 'p', long, default_value_t = DEFAULT_PORT, env = "CSVDB_PORT")]
    port: u16,

    /// Schema document
    #[arg(short = 's', long, value_name = "FILE", default_value = "schema.json")]
    schema: PathBuf,

    /// Directory that holds the schema directory
    #[arg(short = 'd', long, value_name = "DIR", default_value = ".", env = "CSVDB_DATA_DIR")]
    data_dir: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging();

    let config = ServerConfig::new()
        .host(args.host)
        .port(args.port)
        .schema_path(args.schema)
        .data_dir(args.data_dir);

    run_server(config).await
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run_server(config: ServerConfig) -> Result<()> {
    let schema = Schema::load_from_file(&config.schema_path).with_context(|| {
        format!("Failed to load schema {}", config.schema_path.display())
    })?;

    let db = Database::open(schema, &config.data_dir).context("Failed to open database")?;
    let db = Arc::new(db);

    info!(
        schema = %db.schema_name(),
        tables = %db.table_names().join(", "),
        "database ready"
    );

    let server = Server::new(config, db.clone());
    let listener = server
        .bind()
        .with_context(|| format!("Failed to bind {}", server.config().bind_address()))?;

    // The accept loop blocks, so it runs on a plain thread that is abandoned at exit
    let (done_tx, done_rx) = oneshot::channel();
    thread::spawn(move || {
        let _ = done_tx.send(server.serve(listener));
    });

    info!("Press Ctrl+C to shutdown");

    let outcome = tokio::select! {
        result = done_rx => match result {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                error!(error = %e, "server error");
                Err(anyhow::Error::from(e).context("Server error"))
            }
            Err(_) => Err(anyhow::anyhow!("server thread exited unexpectedly")),
        },
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
            Ok(())
        }
    };

    db.close().context("Failed to release database lock")?;
    info!("Server stopped");

    outcome
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl+C");
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
                warn!(error = %e, "failed to install SIGTERM handler");
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
}
