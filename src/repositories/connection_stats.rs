//! # Gateway Connection Stats Repository

use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder};

use crate::error::{DataAccessError, db_err};
use crate::kpi::Window;
use crate::models::connection_stats::{ActiveModel, Column, Entity as GatewayConnectionStats, Model};

/// Repository for gateway connection stats database operations.
pub struct ConnectionStatsRepository<'a, C: ConnectionTrait> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> ConnectionStatsRepository<'a, C> {
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    pub async fn insert(&self, stats: ActiveModel) -> Result<(), DataAccessError> {
        GatewayConnectionStats::insert(stats)
            .exec(self.db)
            .await
            .map_err(db_err("inserting gateway connection stats"))?;
        Ok(())
    }

    /// In-window snapshots for one gateway ordered by event time; the
    /// availability KPI walks consecutive pairs of these.
    pub async fn window_rows(
        &self,
        gateway_id: &str,
        window: &Window,
    ) -> Result<Vec<Model>, DataAccessError> {
        GatewayConnectionStats::find()
            .filter(Column::GatewayId.eq(gateway_id))
            .filter(Column::EventTime.gte(window.start))
            .filter(Column::EventTime.lt(window.end))
            .order_by_asc(Column::EventTime)
            .all(self.db)
            .await
            .map_err(db_err("loading gateway connection stats"))
    }
}
