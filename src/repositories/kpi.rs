//! # KPI Repository
//!
//! Inserts the per-window KPI rows the scheduler produces. Rows are
//! immutable; (entity, window_start) is guarded by a unique index, so a
//! replayed window surfaces as a conflict instead of a silent duplicate.

use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};

use crate::error::{DataAccessError, db_err};
use crate::kpi::Window;
use crate::models::{end_device_kpi, gateway_kpi};

/// Repository for end-device and gateway KPI rows.
pub struct KpiRepository<'a, C: ConnectionTrait> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> KpiRepository<'a, C> {
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    pub async fn insert_device_row(
        &self,
        row: end_device_kpi::ActiveModel,
    ) -> Result<(), DataAccessError> {
        end_device_kpi::Entity::insert(row)
            .exec(self.db)
            .await
            .map_err(db_err("inserting end-device KPI row"))?;
        Ok(())
    }

    pub async fn insert_gateway_row(
        &self,
        row: gateway_kpi::ActiveModel,
    ) -> Result<(), DataAccessError> {
        gateway_kpi::Entity::insert(row)
            .exec(self.db)
            .await
            .map_err(db_err("inserting gateway KPI row"))?;
        Ok(())
    }

    pub async fn device_rows_for_window(
        &self,
        window: &Window,
    ) -> Result<Vec<end_device_kpi::Model>, DataAccessError> {
        end_device_kpi::Entity::find()
            .filter(end_device_kpi::Column::WindowStart.eq(window.start))
            .filter(end_device_kpi::Column::WindowEnd.eq(window.end))
            .all(self.db)
            .await
            .map_err(db_err("loading end-device KPI rows"))
    }

    pub async fn gateway_rows_for_window(
        &self,
        window: &Window,
    ) -> Result<Vec<gateway_kpi::Model>, DataAccessError> {
        gateway_kpi::Entity::find()
            .filter(gateway_kpi::Column::WindowStart.eq(window.start))
            .filter(gateway_kpi::Column::WindowEnd.eq(window.end))
            .all(self.db)
            .await
            .map_err(db_err("loading gateway KPI rows"))
    }
}
