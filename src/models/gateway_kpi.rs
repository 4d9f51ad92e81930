//! Gateway KPI entity model
//!
//! One row per (gateway, window): averages and sums over the devices that
//! produced an end-device row, plus gateway-only metrics.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "gateway_kpis")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub window_start: DateTimeWithTimeZone,

    pub window_end: DateTimeWithTimeZone,

    pub gateway_id: String,

    /// All uplinks at the gateway in-window, regardless of attribution
    pub total_ul_pkt_count: i64,

    pub num_connected_devices: Option<i64>,

    pub num_identified_devices: Option<i64>,

    pub num_unidentified_devices: Option<i64>,

    pub total_consumed_airtime_ms: Option<f64>,

    /// Sum of time-on-air over the window duration
    pub utilization: Option<f64>,

    pub jitter_mean_ms: Option<f64>,

    pub jitter_std_dev_ms: Option<f64>,

    /// Percentage of the window the gateway was connected
    pub availability: Option<f64>,

    pub avg_sampling_rate: Option<f64>,

    pub total_dl_pkt_count: Option<i64>,

    pub total_registered_ul_pkt_count: Option<i64>,

    pub total_unique_ul_count: Option<i64>,

    pub total_packet_loss: Option<i64>,

    pub total_packet_loss_ratio: Option<f64>,

    pub missing_f_cnt_count: Option<i64>,

    pub missing_f_cnt_ratio: Option<f64>,

    pub replica_1_count: Option<i64>,

    pub replica_2_count: Option<i64>,

    pub replica_3_count: Option<i64>,

    pub replica_1_ratio: Option<f64>,

    pub replica_2_ratio: Option<f64>,

    pub replica_3_ratio: Option<f64>,

    pub snr_mean: Option<f64>,

    pub snr_variance: Option<f64>,

    pub rssi_mean: Option<f64>,

    pub rssi_variance: Option<f64>,

    pub payload_size_mean: Option<f64>,

    pub payload_size_variance: Option<f64>,

    pub toa_mean: Option<f64>,

    pub toa_variance: Option<f64>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
