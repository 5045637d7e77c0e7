//! CloudEvents Hub - Binary Entry Point
//!
//! Runs one service role per process:
//!
//! ```text
//! cloudevents-server queue      # retry queue  (POST /enqueue)
//! cloudevents-server bus        # pub/sub bus  (POST /publish)
//! cloudevents-server database   # event store  (POST /add)
//! ```
//!
//! The role may also be given through `SERVICE_ROLE`.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tracing_subscriber::EnvFilter;

use cloudevents_hub::api::{bus_router, database_router, queue_router};
use cloudevents_hub::config::{self, BusConfig, ConfigError, DatabaseConfig, QueueConfig, Role};
use cloudevents_hub::{DeliveryQueue, EventStore, HubResult, Publisher, SnapshotConfig, WebhookSender};

/// Upper bound for writing the snapshot on shutdown
const PERSIST_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> HubResult<()> {
    config::load_dotenv();
    init_tracing();

    let role = resolve_role()?;
    tracing::info!(%role, version = cloudevents_hub::VERSION, "Starting service");

    match role {
        Role::Queue => run_queue(QueueConfig::from_env()).await,
        Role::Bus => run_bus(BusConfig::from_env()?).await,
        Role::Database => run_database(DatabaseConfig::from_env()).await,
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn resolve_role() -> Result<Role, ConfigError> {
    std::env::args()
        .nth(1)
        .or_else(|| std::env::var("SERVICE_ROLE").ok())
        .ok_or(ConfigError::Missing("SERVICE_ROLE"))?
        .parse()
}

async fn run_queue(cfg: QueueConfig) -> HubResult<()> {
    let queue = Arc::new(DeliveryQueue::new(cfg.capacity, cfg.delivery_attempts));
    let consumer = queue.spawn(WebhookSender::new()?, cfg.consumer_url.clone());
    tracing::info!(
        capacity = cfg.capacity,
        max_attempts = cfg.delivery_attempts,
        consumer_url = %cfg.consumer_url,
        "Queue consumer started"
    );

    serve(cfg.port, queue_router(Arc::clone(&queue))).await?;

    queue.shutdown();
    consumer.await??;

    tracing::info!(dead_letters = queue.dead_letter_count(), "Shutdown complete");
    Ok(())
}

async fn run_bus(cfg: BusConfig) -> HubResult<()> {
    tracing::info!(subscribers = ?cfg.subscribers, "Publishing to subscribers");
    let publisher = Arc::new(Publisher::new(cfg.subscribers, WebhookSender::new()?));

    serve(cfg.port, bus_router(publisher)).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn run_database(cfg: DatabaseConfig) -> HubResult<()> {
    let snapshot = SnapshotConfig::new(&cfg.data_dir);
    let store = Arc::new(EventStore::open(&snapshot)?);

    serve(cfg.port, database_router(Arc::clone(&store))).await?;

    tracing::info!(path = %snapshot.snapshot_path().display(), "Persisting event store");
    if let Err(e) = store.persist_detached(&snapshot, PERSIST_TIMEOUT).await {
        tracing::error!(error = %e, "Error persisting event store");
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn serve(port: u16, app: Router) -> HubResult<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Starting server");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
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
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
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

    tracing::info!("Shutdown signal received, gracefully stopping...");
}
