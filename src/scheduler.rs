//! # KPI Aggregation Scheduler
//!
//! Walks a watermark forward through accumulated telemetry in fixed-size
//! windows. Starts in a bootstrap state until either a persisted checkpoint
//! or the first telemetry row fixes the watermark, then advances one window
//! per cycle while telemetry extends past the watermark. Each cycle runs in
//! one transaction that also updates the checkpoint, so a restart resumes
//! exactly where the last committed cycle ended. Cycles never overlap and
//! windows are processed in strictly increasing time order.

use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use metrics::{counter, gauge, histogram};
use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionTrait};
use tokio::time::{Duration as TokioDuration, Instant, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::config::AppConfig;
use crate::error::{PipelineError, db_err};
use crate::kpi::{Window, compute_device_kpis, compute_gateway_kpis};
use crate::repositories::{
    CheckpointRepository, KpiRepository, MonitoredGatewayRepository, RelationRepository,
    UplinkRepository,
};

/// Background KPI aggregation service.
pub struct KpiScheduler {
    config: Arc<AppConfig>,
    db: Arc<DatabaseConnection>,
}

impl KpiScheduler {
    pub fn new(config: Arc<AppConfig>, db: Arc<DatabaseConnection>) -> Self {
        Self { config, db }
    }

    fn window_size(&self) -> ChronoDuration {
        ChronoDuration::minutes(self.config.aggregation.window_minutes as i64)
    }

    /// Run the scheduler loop until the provided shutdown token fires.
    #[instrument(skip_all)]
    pub async fn run(self, shutdown: CancellationToken) -> Result<(), PipelineError> {
        info!("Starting KPI aggregation scheduler");

        let Some(mut watermark) = self.bootstrap(&shutdown).await? else {
            info!("KPI aggregation scheduler stopped during bootstrap");
            return Ok(());
        };
        info!(watermark = %watermark, "Watermark initialized");

        let tick_interval = TokioDuration::from_secs(self.config.aggregation.tick_seconds);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("KPI aggregation scheduler shutdown requested");
                    break;
                }
                _ = sleep(tick_interval) => {
                    let tick_started = Instant::now();
                    match self.advance(&mut watermark).await {
                        Ok(cycles) if cycles > 0 => {
                            debug!(cycles, watermark = %watermark, "Aggregation tick completed");
                        }
                        Ok(_) => {}
                        Err(err) => error!(error = ?err, "Aggregation tick failed"),
                    }
                    histogram!("lorawatch_aggregation_tick_duration_ms")
                        .record(tick_started.elapsed().as_secs_f64() * 1_000.0);
                }
            }
        }

        info!("KPI aggregation scheduler stopped");
        Ok(())
    }

    /// Waits until a watermark can be fixed: a persisted checkpoint wins,
    /// otherwise the earliest telemetry timestamp once one exists. Returns
    /// `None` when shut down while still waiting.
    async fn bootstrap(
        &self,
        shutdown: &CancellationToken,
    ) -> Result<Option<DateTime<Utc>>, PipelineError> {
        if let Some(checkpoint) = CheckpointRepository::new(self.db.as_ref()).load().await? {
            info!(checkpoint = %checkpoint, "Resuming from persisted checkpoint");
            return Ok(Some(checkpoint));
        }

        let poll = TokioDuration::from_secs(self.config.aggregation.bootstrap_poll_seconds);
        loop {
            if let Some((earliest, _)) = UplinkRepository::new(self.db.as_ref())
                .arrival_bounds()
                .await?
            {
                return Ok(Some(earliest));
            }
            debug!("No telemetry yet; waiting for the first uplink");
            tokio::select! {
                _ = shutdown.cancelled() => return Ok(None),
                _ = sleep(poll) => {}
            }
        }
    }

    /// Runs aggregation cycles while telemetry extends more than one window
    /// past the watermark, re-querying the bound after each cycle since new
    /// data may have arrived while processing. Returns the number of cycles
    /// run.
    pub async fn advance(&self, watermark: &mut DateTime<Utc>) -> Result<u64, PipelineError> {
        let window_size = self.window_size();
        let mut cycles = 0;

        loop {
            let Some((_, latest)) = UplinkRepository::new(self.db.as_ref())
                .arrival_bounds()
                .await?
            else {
                break;
            };

            if latest - *watermark <= window_size {
                gauge!("lorawatch_aggregation_backlog_windows").set(0.0);
                break;
            }

            let window = Window {
                start: *watermark,
                end: *watermark + window_size,
            };
            self.run_cycle(&window).await?;
            *watermark = window.end;
            cycles += 1;

            let backlog = (latest - *watermark).num_seconds() as f64
                / window_size.num_seconds().max(1) as f64;
            gauge!("lorawatch_aggregation_backlog_windows").set(backlog.max(0.0));
        }

        Ok(cycles)
    }

    /// One aggregation cycle for `[window.start, window.end)`. KPI rows and
    /// the checkpoint commit atomically; a gateway that fails is skipped and
    /// logged without holding back the others or the watermark.
    async fn run_cycle(&self, window: &Window) -> Result<(), PipelineError> {
        let cycle_started = Instant::now();
        let txn = self
            .db
            .begin()
            .await
            .map_err(db_err("starting aggregation cycle transaction"))?;

        let gateways = MonitoredGatewayRepository::new(&txn).all_ids().await?;
        for gateway_id in &gateways {
            if let Err(err) = self.aggregate_gateway(&txn, gateway_id, window).await {
                error!(
                    gateway_id = %gateway_id,
                    window_start = %window.start,
                    error = ?err,
                    "Skipping gateway for this window"
                );
                counter!("lorawatch_aggregation_gateway_failures_total").increment(1);
            }
        }

        CheckpointRepository::new(&txn).save(window.end).await?;
        txn.commit()
            .await
            .map_err(db_err("committing aggregation cycle transaction"))?;

        counter!("lorawatch_aggregation_cycles_total").increment(1);
        histogram!("lorawatch_aggregation_cycle_duration_ms")
            .record(cycle_started.elapsed().as_secs_f64() * 1_000.0);
        debug!(
            window_start = %window.start,
            window_end = %window.end,
            gateways = gateways.len(),
            "Aggregation cycle committed"
        );
        Ok(())
    }

    /// Device KPIs first, then the gateway rollup over the devices that
    /// produced a row. A failing device is skipped on its own; the rest of
    /// the gateway's devices and the rollup still proceed.
    async fn aggregate_gateway(
        &self,
        txn: &DatabaseTransaction,
        gateway_id: &str,
        window: &Window,
    ) -> Result<(), PipelineError> {
        let tx_replicas = self.config.decoder.tx_replicas;
        let device_ids = RelationRepository::new(txn)
            .device_ids_for_gateway(gateway_id)
            .await?;

        let kpi_rows = KpiRepository::new(txn);
        let mut device_kpis = Vec::new();
        for device_id in &device_ids {
            match compute_device_kpis(txn, device_id, gateway_id, window, tx_replicas).await {
                Ok(Some(kpi)) => {
                    kpi_rows.insert_device_row(kpi.clone().into_row(window)).await?;
                    counter!("lorawatch_end_device_kpi_rows_total").increment(1);
                    device_kpis.push(kpi);
                }
                Ok(None) => {
                    // silent this window; no row, no rollup contribution
                }
                Err(err) => {
                    warn!(
                        device_id = %device_id,
                        gateway_id = %gateway_id,
                        window_start = %window.start,
                        error = ?err,
                        "Skipping device for this window"
                    );
                    counter!("lorawatch_aggregation_device_failures_total").increment(1);
                }
            }
        }

        let gateway_kpi = compute_gateway_kpis(txn, gateway_id, window, &device_kpis).await?;
        kpi_rows
            .insert_gateway_row(gateway_kpi.into_row(window))
            .await?;
        counter!("lorawatch_gateway_kpi_rows_total").increment(1);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use migration::{Migrator, MigratorTrait};
    use sea_orm::{Database, Set};

    use crate::models::{connection_stats, uplink};
    use crate::repositories::ConnectionStatsRepository;

    async fn test_db() -> DatabaseConnection {
        let db = Database::connect("sqlite::memory:")
            .await
            .expect("create in-memory db");
        Migrator::up(&db, None).await.expect("apply migrations");
        db
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 4, 2, 0, 0, 0).unwrap()
    }

    fn minutes(m: i64) -> ChronoDuration {
        ChronoDuration::minutes(m)
    }

    async fn insert_uplink(
        db: &DatabaseConnection,
        gateway_id: &str,
        device_id: &str,
        f_cnt: i64,
        received_at: DateTime<Utc>,
    ) {
        let row = uplink::ActiveModel {
            dev_addr: Set(Some("01020304".to_string())),
            device_id: Set(Some(device_id.to_string())),
            gateway_id: Set(gateway_id.to_string()),
            f_cnt: Set(Some(f_cnt)),
            raw_payload: Set("AAAAAAAAAAAAAAAAAAAAAAAAAAA=".to_string()),
            payload_size: Set(20),
            spreading_factor: Set(7),
            frequency: Set(Some("868100000".to_string())),
            snr: Set(Some(7.5)),
            rssi: Set(Some(-41.0)),
            consumed_airtime_ms: Set(56.576),
            received_at_gw: Set(received_at.into()),
            ..Default::default()
        };
        UplinkRepository::new(db).insert(row).await.expect("insert uplink");
    }

    async fn insert_connection_stats(
        db: &DatabaseConnection,
        gateway_id: &str,
        event_time: DateTime<Utc>,
        connected_at: DateTime<Utc>,
    ) {
        let row = connection_stats::ActiveModel {
            gateway_id: Set(gateway_id.to_string()),
            connected_at: Set(Some(connected_at.into())),
            event_time: Set(event_time.into()),
            ..Default::default()
        };
        ConnectionStatsRepository::new(db)
            .insert(row)
            .await
            .expect("insert connection stats");
    }

    async fn monitor_gateway_with_device(db: &DatabaseConnection, gateway_id: &str, device_id: &str) {
        MonitoredGatewayRepository::new(db)
            .add(gateway_id)
            .await
            .expect("add monitored gateway");
        RelationRepository::new(db)
            .upsert("01020304", gateway_id, device_id, None, 0)
            .await
            .expect("insert relation");
    }

    fn scheduler(db: DatabaseConnection) -> KpiScheduler {
        KpiScheduler::new(Arc::new(AppConfig::default()), Arc::new(db))
    }

    #[tokio::test]
    async fn advances_once_per_complete_window() {
        let db = test_db().await;
        monitor_gateway_with_device(&db, "gw-a", "dev-1").await;
        // a second device known at the gateway but silent all along
        RelationRepository::new(&db)
            .upsert("0a0b0c0d", "gw-a", "dev-2", None, 0)
            .await
            .expect("insert silent relation");

        // telemetry spans 2.5 windows of 60 minutes
        insert_uplink(&db, "gw-a", "dev-1", 1, t0() + minutes(10)).await;
        insert_uplink(&db, "gw-a", "dev-1", 2, t0() + minutes(20)).await;
        insert_uplink(&db, "gw-a", "dev-1", 3, t0() + minutes(70)).await;
        insert_uplink(&db, "gw-a", "dev-1", 4, t0() + minutes(150)).await;

        let scheduler = scheduler(db.clone());
        let mut watermark = t0();
        let cycles = scheduler.advance(&mut watermark).await.expect("advance");

        assert_eq!(cycles, 2);
        assert_eq!(watermark, t0() + minutes(120));

        let first_window = Window {
            start: t0(),
            end: t0() + minutes(60),
        };
        let second_window = Window {
            start: t0() + minutes(60),
            end: t0() + minutes(120),
        };
        let kpis = KpiRepository::new(&db);
        let first_rows = kpis.device_rows_for_window(&first_window).await.unwrap();
        let second_rows = kpis.device_rows_for_window(&second_window).await.unwrap();
        assert_eq!(first_rows.len(), 1, "one active device in window one");
        assert_eq!(second_rows.len(), 1, "one active device in window two");
        assert!(first_rows.iter().all(|row| row.device_id == "dev-1"));
        assert_eq!(kpis.gateway_rows_for_window(&first_window).await.unwrap().len(), 1);
        assert_eq!(first_rows[0].total_ul_pkt_count, 2);
        assert_eq!(second_rows[0].total_ul_pkt_count, 1);

        // watermark persisted with the cycle
        let checkpoint = CheckpointRepository::new(&db).load().await.unwrap();
        assert_eq!(checkpoint, Some(t0() + minutes(120)));

        // nothing left to do until more telemetry arrives
        let cycles = scheduler.advance(&mut watermark).await.expect("re-advance");
        assert_eq!(cycles, 0);
    }

    #[tokio::test]
    async fn packet_loss_and_availability_flow_into_rows() {
        let db = test_db().await;
        monitor_gateway_with_device(&db, "gw-a", "dev-1").await;

        // frame 10 fully received, frame 11 missing, frame 12 once
        insert_uplink(&db, "gw-a", "dev-1", 10, t0() + minutes(1)).await;
        insert_uplink(&db, "gw-a", "dev-1", 10, t0() + minutes(1)).await;
        insert_uplink(&db, "gw-a", "dev-1", 10, t0() + minutes(1)).await;
        insert_uplink(&db, "gw-a", "dev-1", 12, t0() + minutes(5)).await;
        // connection held for ten minutes, then a reconnect 120 s after loss
        insert_connection_stats(&db, "gw-a", t0(), t0()).await;
        insert_connection_stats(&db, "gw-a", t0() + minutes(10), t0()).await;
        insert_connection_stats(
            &db,
            "gw-a",
            t0() + minutes(12),
            t0() + ChronoDuration::seconds(120),
        )
        .await;
        // an arrival past the window so the watermark can move
        insert_uplink(&db, "gw-a", "dev-1", 13, t0() + minutes(70)).await;

        let scheduler = scheduler(db.clone());
        let mut watermark = t0();
        let cycles = scheduler.advance(&mut watermark).await.expect("advance");
        assert_eq!(cycles, 1);

        let window = Window {
            start: t0(),
            end: t0() + minutes(60),
        };
        let kpis = KpiRepository::new(&db);
        let device_rows = kpis.device_rows_for_window(&window).await.unwrap();
        assert_eq!(device_rows.len(), 1);
        let row = &device_rows[0];
        assert_eq!(row.total_ul_pkt_count, 4);
        assert_eq!(row.total_unique_ul_count, 2);
        assert_eq!(row.total_packet_loss, 5);
        assert!((row.total_packet_loss_ratio - 5.0 / 9.0).abs() < 1e-9);
        assert_eq!(row.missing_f_cnt_count, 1);
        assert_eq!(row.replica_1_count, 1);
        assert_eq!(row.replica_3_count, 1);
        // counters 10 and 12 are not consecutive
        assert_eq!(row.sampling_rate, None);

        let gateway_rows = kpis.gateway_rows_for_window(&window).await.unwrap();
        assert_eq!(gateway_rows.len(), 1);
        let gateway_row = &gateway_rows[0];
        assert_eq!(gateway_row.total_ul_pkt_count, 4);
        assert_eq!(gateway_row.num_identified_devices, Some(1));
        let availability = gateway_row.availability.expect("availability present");
        assert!((availability - 100.0 * (3600.0 - 120.0) / 3600.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn sampling_rate_averages_consecutive_arrivals() {
        let db = test_db().await;
        monitor_gateway_with_device(&db, "gw-a", "dev-1").await;

        // 5 -> 6 arrives 60 s apart, 6 -> 7 arrives 120 s apart
        insert_uplink(&db, "gw-a", "dev-1", 5, t0()).await;
        insert_uplink(&db, "gw-a", "dev-1", 6, t0() + ChronoDuration::seconds(60)).await;
        insert_uplink(&db, "gw-a", "dev-1", 7, t0() + ChronoDuration::seconds(180)).await;
        insert_uplink(&db, "gw-a", "dev-1", 8, t0() + minutes(70)).await;

        let scheduler = scheduler(db.clone());
        let mut watermark = t0();
        scheduler.advance(&mut watermark).await.expect("advance");

        let window = Window {
            start: t0(),
            end: t0() + minutes(60),
        };
        let rows = KpiRepository::new(&db)
            .device_rows_for_window(&window)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].sampling_rate, Some(90));
    }

    #[tokio::test]
    async fn bootstrap_prefers_persisted_checkpoint() {
        let db = test_db().await;
        // telemetry reaches back before the checkpoint
        insert_uplink(&db, "gw-a", "dev-1", 1, t0()).await;
        CheckpointRepository::new(&db)
            .save(t0() + minutes(60))
            .await
            .expect("save checkpoint");

        let scheduler = scheduler(db.clone());
        let shutdown = CancellationToken::new();
        let watermark = scheduler.bootstrap(&shutdown).await.expect("bootstrap");
        assert_eq!(watermark, Some(t0() + minutes(60)));
    }

    #[tokio::test]
    async fn bootstrap_uses_earliest_telemetry_without_checkpoint() {
        let db = test_db().await;
        insert_uplink(&db, "gw-a", "dev-1", 1, t0() + minutes(3)).await;
        insert_uplink(&db, "gw-b", "dev-1", 1, t0() + minutes(1)).await;

        let scheduler = scheduler(db.clone());
        let shutdown = CancellationToken::new();
        let watermark = scheduler.bootstrap(&shutdown).await.expect("bootstrap");
        assert_eq!(watermark, Some(t0() + minutes(1)));
    }
}
