//! Gateway connection stats entity model
//!
//! Connection-lifecycle snapshots from `gs.gateway.connection.stats` events.
//! Append-only; availability is derived from consecutive rows ordered by
//! event_time. `sub_bands` holds the positional duty-cycle list as JSON,
//! each entry labelled with its list index.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde_json::Value as JsonValue;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "gateway_connection_stats")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub gateway_id: String,

    pub gateway_eui: Option<String>,

    pub protocol: Option<String>,

    /// When the current connection was established; advances on reconnect
    pub connected_at: Option<DateTimeWithTimeZone>,

    pub last_status_received_at: Option<DateTimeWithTimeZone>,

    pub last_status_time: Option<DateTimeWithTimeZone>,

    pub last_uplink_received_at: Option<DateTimeWithTimeZone>,

    pub last_downlink_received_at: Option<DateTimeWithTimeZone>,

    pub boot_time: Option<DateTimeWithTimeZone>,

    pub gateway_server_version: Option<String>,

    pub fpga_version: Option<String>,

    pub hal_version: Option<String>,

    pub latitude: Option<f64>,

    pub longitude: Option<f64>,

    pub altitude: Option<f64>,

    pub source: Option<String>,

    pub ip: Option<String>,

    pub txin: Option<f64>,

    pub txok: Option<f64>,

    pub lpps: Option<f64>,

    pub rxin: Option<f64>,

    pub rxok: Option<f64>,

    pub rxfw: Option<f64>,

    pub ackr: Option<f64>,

    pub uplink_count: Option<i64>,

    pub downlink_count: Option<i64>,

    pub rtt_min: Option<String>,

    pub rtt_max: Option<String>,

    pub rtt_median: Option<String>,

    pub rtt_count: Option<i64>,

    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub sub_bands: Option<JsonValue>,

    pub event_time: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
