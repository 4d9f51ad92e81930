//! End-device KPI entity model
//!
//! One row per (device, gateway, window). Immutable once written; the
//! window boundaries plus entity ids form the natural key.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde_json::Value as JsonValue;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "end_device_kpis")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub window_start: DateTimeWithTimeZone,

    pub window_end: DateTimeWithTimeZone,

    pub device_id: String,

    pub gateway_id: String,

    /// Average inter-arrival seconds over consecutive frame counters,
    /// floored; null when the window holds no consecutive pair
    pub sampling_rate: Option<i64>,

    pub total_dl_pkt_count: i64,

    pub total_ul_pkt_count: i64,

    pub total_unique_ul_count: i64,

    pub total_packet_loss: i64,

    pub total_packet_loss_ratio: f64,

    pub missing_f_cnt_count: i64,

    pub missing_f_cnt_ratio: f64,

    pub replica_1_count: i64,

    pub replica_2_count: i64,

    pub replica_3_count: i64,

    pub replica_1_ratio: f64,

    pub replica_2_ratio: f64,

    pub replica_3_ratio: f64,

    pub gw_total_packet_loss: i64,

    pub gw_total_packet_loss_ratio: f64,

    pub gw_missing_f_cnt_count: i64,

    pub gw_missing_f_cnt_ratio: f64,

    pub gw_replica_1_count: i64,

    pub gw_replica_2_count: i64,

    pub gw_replica_3_count: i64,

    pub gw_replica_1_ratio: f64,

    pub gw_replica_2_ratio: f64,

    pub gw_replica_3_ratio: f64,

    /// Airtime of one copy of each distinct frame, times the configured
    /// replica count N
    pub consumed_duty_cycle_ms: f64,

    pub snr_mean: Option<f64>,

    pub snr_variance: Option<f64>,

    pub rssi_mean: Option<f64>,

    pub rssi_variance: Option<f64>,

    pub payload_size_mean: Option<f64>,

    pub payload_size_variance: Option<f64>,

    pub toa_mean: Option<f64>,

    pub toa_variance: Option<f64>,

    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub sf_distribution: Option<JsonValue>,

    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub sf_ratios: Option<JsonValue>,

    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub freq_distribution: Option<JsonValue>,

    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub freq_ratios: Option<JsonValue>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
