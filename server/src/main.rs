mod auth;
mod config;
mod connections;
mod patch;
mod persistence;
mod profiles;
mod qr;
mod service;
mod storage;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use persistence::sqlite::{Database, SqlitePersistence};
use service::AppState;
use storage::ImageStore;
use tracing_appender::non_blocking::WorkerGuard;

/// QRsona profile and contact-exchange server
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Address to listen on (overrides QRSONA_BIND_ADDR and PORT)
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// SQLite database file (overrides QRSONA_DATABASE_PATH)
    #[arg(long)]
    database: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = config::Config::from_env().context("invalid configuration")?;
    if let Some(bind) = cli.bind {
        config.bind_addr = bind;
    }
    if let Some(database) = cli.database {
        config.database_path = database;
    }

    let _log_guard = init_tracing(&config)?;

    tracing::info!("Starting QRsona server");
    tracing::info!("Using database: {}", config.database_path.display());

    let db = Database::open(&config.database_path)
        .await
        .context("failed to open database")?;
    let store = Arc::new(SqlitePersistence::new(&db));

    let images = Arc::new(ImageStore::from_config(&config));
    tracing::info!(
        backend = images.backend_name(),
        upload_dir = %images.upload_dir().display(),
        max_bytes = images.max_bytes(),
        "Image storage ready"
    );

    let state = AppState::new(store, images, &config);
    let app = service::router(state, &config.allowed_origins);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("Shutting down");
    db.close().await;
    Ok(())
}

/// Initialize tracing with span durations. With `QRSONA_LOG_DIR` set, also
/// write a daily rolling file; the returned guard flushes it on drop.
fn init_tracing(config: &config::Config) -> anyhow::Result<Option<WorkerGuard>> {
    use tracing_subscriber::fmt::format::FmtSpan;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout = tracing_subscriber::fmt::layer().with_span_events(FmtSpan::CLOSE);

    let (file, guard) = match &config.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create log directory {}", dir.display()))?;
            let appender = tracing_appender::rolling::daily(dir, "qrsona-server.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_span_events(FmtSpan::CLOSE)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout)
        .with(file)
        .init();

    Ok(guard)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
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
