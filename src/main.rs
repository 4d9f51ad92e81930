//! # LoRaWatch Service Entry Point
//!
//! Wires configuration, logging, the store and both pipeline services: the
//! telemetry consumer (when an event stream is configured) and the KPI
//! aggregation scheduler.

use std::sync::Arc;

use lorawatch::config::ConfigLoader;
use lorawatch::consumer::{EventConsumer, NdjsonFileSource};
use lorawatch::decoder::TelemetryDecoder;
use lorawatch::scheduler::KpiScheduler;
use lorawatch::{db, logging};
use migration::{Migrator, MigratorTrait};
use tokio_util::sync::CancellationToken;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Arc::new(ConfigLoader::new().load()?);
    logging::init_subscriber(&config);
    info!(profile = %config.profile, "Configuration loaded");

    let db = Arc::new(db::init_pool(&config).await?);
    Migrator::up(db.as_ref(), None).await?;

    let shutdown = CancellationToken::new();

    let scheduler = KpiScheduler::new(config.clone(), db.clone());
    let scheduler_handle = tokio::spawn(scheduler.run(shutdown.clone()));

    let consumer_handle = match config.event_stream_path.clone() {
        Some(path) => {
            let decoder = Arc::new(TelemetryDecoder::new(db.clone(), &config.decoder));
            let consumer = EventConsumer::new(decoder, &config.decoder);
            let consumer_shutdown = shutdown.clone();
            Some(tokio::spawn(async move {
                let source = NdjsonFileSource::open(&path).await?;
                consumer.run(source, consumer_shutdown).await
            }))
        }
        None => {
            info!("No event stream configured; running aggregation only");
            None
        }
    };

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");
    shutdown.cancel();

    scheduler_handle.await??;
    if let Some(handle) = consumer_handle {
        handle.await??;
    }
    Ok(())
}
