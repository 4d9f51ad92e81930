//! # Aggregation Checkpoint Repository
//!
//! The persisted scheduler watermark. `save` is called inside the same
//! transaction as a cycle's KPI writes, so the watermark and the rows it
//! covers commit atomically.

use chrono::{DateTime, Utc};
use sea_orm::sea_query::OnConflict;
use sea_orm::{ConnectionTrait, EntityTrait, Set};

use crate::error::{DataAccessError, db_err};
use crate::models::checkpoint::{ActiveModel, Column, Entity as AggregationCheckpoint};

/// Checkpoint row name for the KPI aggregation watermark.
pub const KPI_CHECKPOINT: &str = "kpi_aggregation";

/// Repository for aggregation checkpoint database operations.
pub struct CheckpointRepository<'a, C: ConnectionTrait> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> CheckpointRepository<'a, C> {
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    pub async fn load(&self) -> Result<Option<DateTime<Utc>>, DataAccessError> {
        let row = AggregationCheckpoint::find_by_id(KPI_CHECKPOINT)
            .one(self.db)
            .await
            .map_err(db_err("loading aggregation checkpoint"))?;
        Ok(row.map(|row| row.processed_till.with_timezone(&Utc)))
    }

    pub async fn save(&self, processed_till: DateTime<Utc>) -> Result<(), DataAccessError> {
        let model = ActiveModel {
            name: Set(KPI_CHECKPOINT.to_string()),
            processed_till: Set(processed_till.into()),
            updated_at: Set(Utc::now().into()),
        };
        AggregationCheckpoint::insert(model)
            .on_conflict(
                OnConflict::column(Column::Name)
                    .update_columns([Column::ProcessedTill, Column::UpdatedAt])
                    .to_owned(),
            )
            .exec(self.db)
            .await
            .map_err(db_err("saving aggregation checkpoint"))?;
        Ok(())
    }
}
