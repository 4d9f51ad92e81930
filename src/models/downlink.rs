//! Downlink frame entity model

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;

/// One transmitted downlink per gateway, recorded from `gs.down.send` events.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "downlink_frames")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub gateway_id: String,

    pub gateway_eui: Option<String>,

    pub raw_payload: Option<String>,

    pub bandwidth: Option<i64>,

    pub spreading_factor: Option<i32>,

    pub coding_rate: Option<String>,

    pub frequency: Option<String>,

    pub concentrator_timestamp: Option<i64>,

    pub tx_power: Option<f64>,

    pub invert_polarization: Option<bool>,

    pub event_time: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
