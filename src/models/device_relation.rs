//! Device-gateway relation entity model
//!
//! Written by the companion process that watches application-level uplinks
//! carrying durable identity. This service reads it to resolve device ids
//! and to enumerate the devices ever seen at a gateway. Rows are never
//! deleted, so one dev_addr can map to several historical identities.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "device_gateway_relations")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub dev_addr: String,

    pub gateway_id: String,

    pub device_id: String,

    pub application_id: Option<String>,

    /// Last frame counter seen for this identity; resolution picks the
    /// relation whose value is closest to an observed counter
    pub last_f_cnt: i64,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
