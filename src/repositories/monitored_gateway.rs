//! # Monitored Gateway Repository
//!
//! The working set of gateway ids the pipeline tracks. The orchestration
//! collaborator adds and removes members; this service only reads the set,
//! but the mutations live here so that collaborator (and tests) share one
//! code path.

use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set};

use crate::error::{DataAccessError, db_err};
use crate::models::monitored_gateway::{ActiveModel, Column, Entity as MonitoredGateway};

/// Repository for the monitored gateway working set.
pub struct MonitoredGatewayRepository<'a, C: ConnectionTrait> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> MonitoredGatewayRepository<'a, C> {
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    pub async fn all_ids(&self) -> Result<Vec<String>, DataAccessError> {
        let rows = MonitoredGateway::find()
            .order_by_asc(Column::GatewayId)
            .all(self.db)
            .await
            .map_err(db_err("loading monitored gateways"))?;
        Ok(rows.into_iter().map(|row| row.gateway_id).collect())
    }

    pub async fn add(&self, gateway_id: &str) -> Result<(), DataAccessError> {
        let model = ActiveModel {
            gateway_id: Set(gateway_id.to_string()),
        };
        MonitoredGateway::insert(model)
            .on_conflict(
                OnConflict::column(Column::GatewayId)
                    .do_nothing()
                    .to_owned(),
            )
            .do_nothing()
            .exec(self.db)
            .await
            .map_err(db_err("adding monitored gateway"))?;
        Ok(())
    }

    pub async fn remove(&self, gateway_id: &str) -> Result<(), DataAccessError> {
        MonitoredGateway::delete_many()
            .filter(Column::GatewayId.eq(gateway_id))
            .exec(self.db)
            .await
            .map_err(db_err("removing monitored gateway"))?;
        Ok(())
    }
}
