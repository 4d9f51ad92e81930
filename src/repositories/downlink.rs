//! # Downlink Frame Repository

use sea_orm::{ConnectionTrait, EntityTrait};

use crate::error::{DataAccessError, db_err};
use crate::models::downlink::{ActiveModel, Entity as DownlinkFrame};

/// Repository for downlink frame database operations.
pub struct DownlinkRepository<'a, C: ConnectionTrait> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> DownlinkRepository<'a, C> {
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    pub async fn insert(&self, frame: ActiveModel) -> Result<(), DataAccessError> {
        DownlinkFrame::insert(frame)
            .exec(self.db)
            .await
            .map_err(db_err("inserting downlink frame"))?;
        Ok(())
    }
}
