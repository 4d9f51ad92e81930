//! Uplink frame entity model
//!
//! One row per physical-layer reception of one LoRaWAN frame at one gateway.
//! Rows are immutable once stored; several rows sharing
//! (dev_addr, gateway_id, f_cnt) are replicas of the same frame, not
//! duplicates.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "uplink_frames")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// Network-assigned device address; reused across devices over time
    pub dev_addr: Option<String>,

    /// Durable device identity resolved at decode time; null when unknown
    pub device_id: Option<String>,

    pub application_id: Option<String>,

    pub gateway_id: String,

    pub gateway_eui: Option<String>,

    /// MAC message type (UnconfirmedDataUp, JoinRequest, ...)
    pub m_type: Option<String>,

    /// Frame counter; null for join requests
    pub f_cnt: Option<i64>,

    pub f_port: Option<i32>,

    /// ADR bit from the frame control field
    pub f_ctrl_adr: Option<bool>,

    pub join_eui: Option<String>,

    pub dev_eui: Option<String>,

    pub dev_nonce: Option<String>,

    /// Base64 PHY payload as received
    pub raw_payload: String,

    pub frm_payload: Option<String>,

    /// Byte length of the decoded PHY payload
    pub payload_size: i32,

    /// Bandwidth in Hz
    pub bandwidth: Option<i64>,

    pub spreading_factor: i32,

    pub coding_rate: Option<String>,

    pub frequency: Option<String>,

    pub rssi: Option<f64>,

    pub channel_rssi: Option<f64>,

    pub snr: Option<f64>,

    pub channel_index: Option<i32>,

    /// Computed LoRa PHY time-on-air in milliseconds
    pub consumed_airtime_ms: f64,

    pub gps_time: Option<String>,

    pub concentrator_timestamp: Option<i64>,

    pub event_time: Option<DateTimeWithTimeZone>,

    /// Gateway receive timestamp; every KPI window filters on this
    pub received_at_gw: DateTimeWithTimeZone,

    /// Network-server receive timestamp
    pub received_at_net: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
