//! # Device-Gateway Relation Repository
//!
//! Reads the identity relations maintained by the companion process and
//! exposes the upsert that process (and the test suites) use. Relations are
//! never deleted; a reused dev_addr accumulates rows.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QuerySelect, Set,
};

use crate::error::{DataAccessError, db_err};
use crate::models::device_relation::{ActiveModel, Column, Entity as DeviceGatewayRelation, Model};

/// Repository for device-gateway relation database operations.
pub struct RelationRepository<'a, C: ConnectionTrait> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> RelationRepository<'a, C> {
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    /// All relations ever recorded for a device address at one gateway.
    pub async fn for_address_at_gateway(
        &self,
        dev_addr: &str,
        gateway_id: &str,
    ) -> Result<Vec<Model>, DataAccessError> {
        DeviceGatewayRelation::find()
            .filter(Column::DevAddr.eq(dev_addr))
            .filter(Column::GatewayId.eq(gateway_id))
            .all(self.db)
            .await
            .map_err(db_err("loading device relations"))
    }

    /// Distinct device ids ever associated with a gateway; the scheduler
    /// iterates these per window.
    pub async fn device_ids_for_gateway(
        &self,
        gateway_id: &str,
    ) -> Result<Vec<String>, DataAccessError> {
        DeviceGatewayRelation::find()
            .select_only()
            .column(Column::DeviceId)
            .filter(Column::GatewayId.eq(gateway_id))
            .distinct()
            .into_tuple()
            .all(self.db)
            .await
            .map_err(db_err("loading gateway device ids"))
    }

    /// Creates the relation on first sighting, refreshes last_f_cnt on
    /// subsequent sightings of the same identity.
    pub async fn upsert(
        &self,
        dev_addr: &str,
        gateway_id: &str,
        device_id: &str,
        application_id: Option<&str>,
        last_f_cnt: i64,
    ) -> Result<(), DataAccessError> {
        let existing = DeviceGatewayRelation::find()
            .filter(Column::DevAddr.eq(dev_addr))
            .filter(Column::GatewayId.eq(gateway_id))
            .filter(Column::DeviceId.eq(device_id))
            .one(self.db)
            .await
            .map_err(db_err("loading device relation"))?;

        match existing {
            Some(model) => {
                let mut active: ActiveModel = model.into();
                active.last_f_cnt = Set(last_f_cnt);
                active.updated_at = Set(Utc::now().into());
                active
                    .update(self.db)
                    .await
                    .map_err(db_err("updating device relation"))?;
            }
            None => {
                let active = ActiveModel {
                    dev_addr: Set(dev_addr.to_string()),
                    gateway_id: Set(gateway_id.to_string()),
                    device_id: Set(device_id.to_string()),
                    application_id: Set(application_id.map(str::to_string)),
                    last_f_cnt: Set(last_f_cnt),
                    updated_at: Set(Utc::now().into()),
                    ..Default::default()
                };
                DeviceGatewayRelation::insert(active)
                    .exec(self.db)
                    .await
                    .map_err(db_err("inserting device relation"))?;
            }
        }
        Ok(())
    }
}
