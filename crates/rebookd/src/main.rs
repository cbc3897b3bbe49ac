//! rebookd - The booking reschedule service
//!
//! This is the main entry point for the rebookd service.
//! It wires together all the components:
//! - Configuration loading
//! - Store initialization and fixture import
//! - Stale request reconciliation
//! - HTTP server

use anyhow::{Context, Result};
use clap::Parser;
use rebook_config::{Settings, load_config_or_default};
use rebook_store::{AuditEvent, AuditEventType, Fixtures, SqliteStore, Store};
use rebook_util::default_config_path;
use rebookd::{AppState, build_router};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal::unix::{SignalKind, signal};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// rebookd - Booking reschedule service
#[derive(Parser, Debug)]
#[command(name = "rebookd")]
#[command(about = "Booking reschedule request service", long_about = None)]
struct Args {
    /// Configuration file path (default: ~/.config/rebook/config.toml)
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Listen address override (or set REBOOK_LISTEN env var)
    #[arg(long, env = "REBOOK_LISTEN")]
    listen: Option<SocketAddr>,

    /// Data directory override (or set REBOOK_DATA_DIR env var)
    #[arg(short, long, env = "REBOOK_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// JSON file of experts, dates, slots and bookings to load at startup
    #[arg(short, long)]
    fixtures: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

/// Main service state
struct Service {
    listen: SocketAddr,
    state: AppState,
    store: Arc<dyn Store>,
}

impl Service {
    fn new(args: &Args) -> Result<Self> {
        let mut settings: Settings = load_config_or_default(&args.config)
            .with_context(|| format!("Failed to load config from {:?}", args.config))?;

        info!(config_path = %args.config.display(), "Configuration loaded");

        if let Some(listen) = args.listen {
            settings.server.listen = listen;
        }
        if let Some(data_dir) = &args.data_dir {
            settings.server.data_dir = data_dir.clone();
        }

        std::fs::create_dir_all(&settings.server.data_dir).with_context(|| {
            format!(
                "Failed to create data directory {:?}",
                settings.server.data_dir
            )
        })?;

        let db_path = settings.server.database_path();
        let store: Arc<dyn Store> = Arc::new(
            SqliteStore::open(&db_path)
                .with_context(|| format!("Failed to open database {:?}", db_path))?,
        );

        info!(db_path = %db_path.display(), "Store initialized");

        store.append_audit(AuditEvent::new(AuditEventType::ServiceStarted))?;

        if let Some(path) = &args.fixtures {
            let fixtures = Fixtures::load(path)
                .with_context(|| format!("Failed to read fixtures from {:?}", path))?;
            fixtures
                .import(store.as_ref())
                .context("Failed to import fixtures")?;
        }

        let state = AppState::new(store.clone(), settings.reschedule);

        if settings.reschedule.reconcile_on_startup {
            let removed = state
                .engine
                .reconcile()
                .context("Failed to reconcile stale reschedule requests")?;
            info!(removed = removed.len(), "Startup reconciliation complete");
        }

        Ok(Self {
            listen: settings.server.listen,
            state,
            store,
        })
    }

    async fn run(self) -> Result<()> {
        let listener = TcpListener::bind(self.listen)
            .await
            .with_context(|| format!("Failed to bind {}", self.listen))?;

        info!(listen = %self.listen, "HTTP server listening");

        let app = build_router(self.state);
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal()?)
            .await
            .context("HTTP server error")?;

        info!("Shutting down rebookd");

        if let Err(e) = self
            .store
            .append_audit(AuditEvent::new(AuditEventType::ServiceStopped))
        {
            warn!(error = %e, "Failed to log service shutdown");
        }

        info!("Shutdown complete");
        Ok(())
    }
}

/// Resolves on SIGTERM or SIGINT
fn shutdown_signal() -> Result<impl std::future::Future<Output = ()>> {
    let mut sigterm =
        signal(SignalKind::terminate()).context("Failed to create SIGTERM handler")?;
    let mut sigint = signal(SignalKind::interrupt()).context("Failed to create SIGINT handler")?;

    Ok(async move {
        tokio::select! {
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down gracefully"),
            _ = sigint.recv() => info!("Received SIGINT, shutting down gracefully"),
        }
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "rebookd starting");

    let service = Service::new(&args)?;
    service.run().await
}
