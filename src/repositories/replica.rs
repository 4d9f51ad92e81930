//! # Replica Counter Repository
//!
//! Upserts replica counters keyed by (dev_addr, f_cnt). The ON CONFLICT
//! target is the unique index created by the migration, which is what makes
//! concurrent reconciliation of the same frame safe.

use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};

use crate::error::{DataAccessError, db_err};
use crate::models::replica_counter::{ActiveModel, Column, Entity as ReplicaCounter, Model};

/// Recomputed counters for one frame, covering every gateway that saw it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplicaCounts {
    /// Largest per-gateway copy count
    pub num_rx_replica: i32,
    /// Copies received across all gateways
    pub tot_rx_replica: i32,
    /// max(0, num_gateways * N - tot_rx_replica)
    pub tot_loss_replica: i32,
    pub num_gateways: i32,
}

/// Repository for replica counter database operations.
pub struct ReplicaRepository<'a, C: ConnectionTrait> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> ReplicaRepository<'a, C> {
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    pub async fn upsert(
        &self,
        dev_addr: &str,
        f_cnt: i64,
        counts: ReplicaCounts,
    ) -> Result<(), DataAccessError> {
        let model = ActiveModel {
            dev_addr: Set(dev_addr.to_string()),
            f_cnt: Set(f_cnt),
            num_rx_replica: Set(counts.num_rx_replica),
            tot_rx_replica: Set(counts.tot_rx_replica),
            tot_loss_replica: Set(counts.tot_loss_replica),
            num_gateways: Set(counts.num_gateways),
            updated_at: Set(Utc::now().into()),
            ..Default::default()
        };

        ReplicaCounter::insert(model)
            .on_conflict(
                OnConflict::columns([Column::DevAddr, Column::FCnt])
                    .update_columns([
                        Column::NumRxReplica,
                        Column::TotRxReplica,
                        Column::TotLossReplica,
                        Column::NumGateways,
                        Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec(self.db)
            .await
            .map_err(db_err("upserting replica counter"))?;
        Ok(())
    }

    pub async fn find_by_frame(
        &self,
        dev_addr: &str,
        f_cnt: i64,
    ) -> Result<Option<Model>, DataAccessError> {
        ReplicaCounter::find()
            .filter(Column::DevAddr.eq(dev_addr))
            .filter(Column::FCnt.eq(f_cnt))
            .one(self.db)
            .await
            .map_err(db_err("loading replica counter"))
    }
}
