//! Replica counter entity model
//!
//! One row per (dev_addr, f_cnt) observed at least once, recomputed from the
//! full reception set every time another copy of the frame arrives. Never
//! deleted.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "replica_counters")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub dev_addr: String,

    pub f_cnt: i64,

    /// Largest per-gateway copy count for this frame
    pub num_rx_replica: i32,

    /// Total copies received across all gateways
    pub tot_rx_replica: i32,

    /// max(0, num_gateways * N - tot_rx_replica)
    pub tot_loss_replica: i32,

    pub num_gateways: i32,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
