use std::sync::Arc;

use rollcall_config::{get_log_dir, Config};
use rollcall_sheets::{Mirror, SheetsMirror};
use rollcall_store::{MemoryStore, RecordStore};
use rollcall_types::seed_records;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod handlers;
mod server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load()?;

    let log_dir = get_log_dir();
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("daemon.log"))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.daemon.log_level)),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .init();

    let store: Arc<dyn RecordStore> = if config.store.seed {
        Arc::new(MemoryStore::with_records(seed_records()))
    } else {
        Arc::new(MemoryStore::new())
    };

    let mirror: Option<Arc<dyn Mirror>> = if config.sheets.enabled {
        info!(
            "Mirroring new users to spreadsheet {} ({})",
            config.sheets.spreadsheet_id, config.sheets.range
        );
        Some(Arc::new(SheetsMirror::from_config(&config.sheets)?))
    } else {
        None
    };

    let daemon = server::DaemonServer::new(config, store, mirror);

    info!("Starting rollcall daemon");
    daemon.run().await?;

    Ok(())
}
