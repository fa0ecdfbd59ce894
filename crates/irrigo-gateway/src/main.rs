use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use irrigo_core::ActionSink;
use irrigo_device::{DeviceClient, ValveDriver};
use irrigo_scheduler::{SchedulerEngine, SchedulerHandle};
use irrigo_store::{ActionJournal, ScheduleStore};
use tracing::info;

mod app;
mod controller;
mod http;

#[derive(Parser)]
#[command(name = "irrigo-gateway", version, about = "Weekly irrigation scheduler and relay console")]
struct Cli {
    /// Path to irrigo.toml (falls back to IRRIGO_CONFIG, then ~/.irrigo/irrigo.toml).
    #[arg(short, long, env = "IRRIGO_CONFIG")]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(
            |_| {
                "irrigo_gateway=info,irrigo_scheduler=info,irrigo_device=info,irrigo_store=info,tower_http=debug"
                    .into()
            },
        ))
        .init();

    let cli = Cli::parse();
    let config = irrigo_core::IrrigoConfig::load(cli.config.as_deref()).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        irrigo_core::IrrigoConfig::default()
    });

    let db_path = &config.database.path;
    ensure_parent_dir(db_path);
    info!(path = %db_path, "opening SQLite database");

    let db = rusqlite::Connection::open(db_path)?;
    db.execute_batch("PRAGMA journal_mode=WAL;")?;
    irrigo_store::db::init_db(&db)?;
    drop(db);

    // each subsystem gets its own connection
    let store = ScheduleStore::new(rusqlite::Connection::open(db_path)?)?;
    let journal = Arc::new(ActionJournal::new(rusqlite::Connection::open(db_path)?)?);

    if store.seed_valves(&config.valves)? {
        info!(valves = config.valves.len(), "valve table seeded from config");
    }
    let registry = irrigo_core::ValveRegistry::from_rows(store.valves()?).into_shared();

    let sink: Arc<dyn ActionSink> = journal.clone();
    let device: Arc<dyn ValveDriver> = Arc::new(DeviceClient::new(
        &config.device,
        Arc::clone(&registry),
        sink,
    ));
    info!(device = %config.device.address(), "relay controller configured");

    let scheduler = SchedulerHandle::new();
    let controller = controller::Controller::new(
        store,
        journal,
        registry,
        Arc::clone(&device),
        scheduler.clone(),
        Box::new(|| chrono::Local::now().date_naive()),
    );
    controller.recompile()?;

    let engine = SchedulerEngine::new(
        scheduler,
        device,
        Duration::from_millis(config.scheduler.tick_ms),
    );
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let engine_task = tokio::spawn(engine.run(shutdown_rx));

    let addr: SocketAddr = format!("{}:{}", config.gateway.bind, config.gateway.port).parse()?;
    let state = Arc::new(app::AppState::new(config, controller));
    let router = app::build_router(state);

    info!("Irrigo gateway listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown requested");
        })
        .await?;

    // signal scheduler to stop
    let _ = shutdown_tx.send(true);
    let _ = engine_task.await;
    Ok(())
}

fn ensure_parent_dir(path: &str) {
    if let Some(parent) = std::path::Path::new(path).parent() {
        let _ = std::fs::create_dir_all(parent);
    }
}
