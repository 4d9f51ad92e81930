//! # Gateway Status Repository

use sea_orm::{ConnectionTrait, EntityTrait};

use crate::error::{DataAccessError, db_err};
use crate::models::gateway_status::{ActiveModel, Entity as GatewayStatusSnapshot};

/// Repository for gateway status snapshot database operations.
pub struct GatewayStatusRepository<'a, C: ConnectionTrait> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> GatewayStatusRepository<'a, C> {
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    pub async fn insert(&self, snapshot: ActiveModel) -> Result<(), DataAccessError> {
        GatewayStatusSnapshot::insert(snapshot)
            .exec(self.db)
            .await
            .map_err(db_err("inserting gateway status snapshot"))?;
        Ok(())
    }
}
