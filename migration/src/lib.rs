//! Database migrations for the LoRaWatch telemetry pipeline.
//!
//! This module contains all database migrations using SeaORM Migration.

pub use sea_orm_migration::prelude::*;

mod m2025_05_12_100000_create_uplink_frames;
mod m2025_05_12_100100_create_downlink_frames;
mod m2025_05_12_100200_create_gateway_status_snapshots;
mod m2025_05_12_100300_create_gateway_connection_stats;
mod m2025_05_12_100400_create_replica_counters;
mod m2025_05_12_100500_create_device_gateway_relations;
mod m2025_05_19_090000_create_end_device_kpis;
mod m2025_05_19_090100_create_gateway_kpis;
mod m2025_05_19_090200_create_monitored_gateways;
mod m2025_05_26_110000_create_aggregation_checkpoints;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2025_05_12_100000_create_uplink_frames::Migration),
            Box::new(m2025_05_12_100100_create_downlink_frames::Migration),
            Box::new(m2025_05_12_100200_create_gateway_status_snapshots::Migration),
            Box::new(m2025_05_12_100300_create_gateway_connection_stats::Migration),
            Box::new(m2025_05_12_100400_create_replica_counters::Migration),
            Box::new(m2025_05_12_100500_create_device_gateway_relations::Migration),
            Box::new(m2025_05_19_090000_create_end_device_kpis::Migration),
            Box::new(m2025_05_19_090100_create_gateway_kpis::Migration),
            Box::new(m2025_05_19_090200_create_monitored_gateways::Migration),
            Box::new(m2025_05_26_110000_create_aggregation_checkpoints::Migration),
        ]
    }
}
