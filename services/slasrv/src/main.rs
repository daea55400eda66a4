//! SLA Monitoring Service (SlaSrv)
//!
//! Watches active tickets against their SLA deadlines, raises deduplicated
//! alerts and queues notifications for assignees and reporters.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use sqlx::sqlite::SqlitePoolOptions;
use tracing::{info, warn};

use slasrv::api::{self, AppState};
use slasrv::config::Config;
use slasrv::error::{Result, SlasrvError};
use slasrv::notifier::StoreNotifier;
use slasrv::storage::{self, SqliteTicketStore};

use opsdesk_sla::{SlaCalculator, SlaMonitor, TicketRepository};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run in service mode (monitor + API server)
    Service,

    /// Run a single breach-check pass and print the summary
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = if let Some(config_path) = args.config {
        Config::from_file(config_path)?
    } else {
        Config::load()?
    };

    // Initialize logging
    let log_config = common::logging::LogConfig {
        service_name: config.service.name.clone(),
        level: config.log_level.clone(),
        log_dir: None,
        json: false,
    };
    let _log_guard = common::logging::init_logging(&log_config)
        .map_err(|e| SlasrvError::Config(format!("Failed to initialize logging: {}", e)))?;

    info!("Starting SLA Monitoring Service");

    // Connect to the database and ensure the schema exists
    prepare_database_path(&config.database.url)?;
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&config.database.url)
        .await?;
    storage::init_schema(&pool).await?;

    let store = Arc::new(SqliteTicketStore::new(pool.clone()));
    let notifier = Arc::new(StoreNotifier::new(pool));

    // Per-priority resolution hours: environment-level settings first,
    // persisted configuration layered on top, compiled-in defaults last
    let mut priority_hours = config.priority_hours();
    match store.load_priority_hours().await {
        Ok(persisted) => priority_hours.merge_from(&persisted),
        Err(e) => {
            warn!("Failed to load persisted resolution hours, using configured defaults: {}", e);
        },
    }
    let calculator = SlaCalculator::new(priority_hours);

    let monitor = Arc::new(SlaMonitor::new(
        Arc::clone(&store),
        notifier,
        config.monitor_config(),
        config.thresholds(),
    ));

    match args.command {
        Some(Commands::Service) | None => {
            run_service(&config, monitor, calculator).await?;
        },
        Some(Commands::Check) => {
            run_check(monitor).await;
        },
    }

    Ok(())
}

/// Run the monitor and the API server until terminated
async fn run_service(
    config: &Config,
    monitor: Arc<SlaMonitor<SqliteTicketStore, StoreNotifier>>,
    calculator: SlaCalculator,
) -> Result<()> {
    monitor.start().await?;

    let state = Arc::new(AppState {
        monitor,
        calculator,
        business_hours_only: config.monitor.business_hours_only,
    });
    let app = api::router(state);

    let addr = format!("0.0.0.0:{}", config.service.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("SLA service started on {}", addr);
    info!("API endpoints:");
    info!("  GET  /health - Health check");
    info!("  GET  /api/sla/status - Monitor status");
    info!("  POST /api/sla/monitor/start|stop - Monitor lifecycle");
    info!("  POST /api/sla/check - Run one pass now");
    info!("  GET  /api/sla/target - Deadline preview");

    axum::serve(listener, app)
        .await
        .map_err(|e| SlasrvError::Server(e.to_string()))?;

    Ok(())
}

/// Run a single breach-check pass and print the summary
async fn run_check(monitor: Arc<SlaMonitor<SqliteTicketStore, StoreNotifier>>) {
    let summary = monitor.run_pass().await;
    println!(
        "Pass complete: {} checked, {} alerts, {} notifications, {} failed",
        summary.checked, summary.alerts, summary.notified, summary.failed
    );
}

/// Ensure the directory for a `sqlite://` file URL exists
fn prepare_database_path(url: &str) -> Result<()> {
    let Some(path) = url.strip_prefix("sqlite://") else {
        return Ok(());
    };
    if path.starts_with(':') {
        // in-memory database
        return Ok(());
    }
    let path = path.split('?').next().unwrap_or(path);
    if let Some(parent) = std::path::Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
