//! Gateway status snapshot entity model
//!
//! Periodic health reports from `gs.status.receive` events: versions,
//! geolocation and packet-forwarder metrics. Gateways report whatever
//! sub-objects they have, so every data field is nullable.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "gateway_status_snapshots")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub gateway_id: String,

    pub gateway_eui: Option<String>,

    pub status_time: Option<DateTimeWithTimeZone>,

    pub boot_time: Option<DateTimeWithTimeZone>,

    pub gateway_server_version: Option<String>,

    pub fpga_version: Option<String>,

    pub hal_version: Option<String>,

    pub latitude: Option<f64>,

    pub longitude: Option<f64>,

    pub altitude: Option<f64>,

    /// Provenance of the antenna location (registry, gps, ...)
    pub source: Option<String>,

    pub ip: Option<String>,

    pub txin: Option<f64>,

    pub txok: Option<f64>,

    pub lpps: Option<f64>,

    pub rxin: Option<f64>,

    pub rxok: Option<f64>,

    pub rxfw: Option<f64>,

    pub ackr: Option<f64>,

    pub event_time: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
