//! Device identity resolution.
//!
//! A device address is a 4-byte network-assigned value reused across devices
//! over time, so it is not a durable identity. The resolver picks, among all
//! relations recorded for (dev_addr, gateway), the identity whose last-seen
//! frame counter sits closest to the observed one. Ties go to the first row
//! scanned.

use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::error::DataAccessError;
use crate::repositories::RelationRepository;

/// Identity attached to an uplink at decode time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedIdentity {
    pub device_id: String,
    pub application_id: Option<String>,
}

pub struct DeviceResolver {
    db: Arc<DatabaseConnection>,
}

impl DeviceResolver {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Returns the best-guess identity for an observed frame, or `None` when
    /// no relation exists yet. Absence is not an error; the frame is stored
    /// unattributed and picked up once the companion process writes the
    /// relation.
    pub async fn resolve(
        &self,
        dev_addr: &str,
        gateway_id: &str,
        f_cnt: i64,
    ) -> Result<Option<ResolvedIdentity>, DataAccessError> {
        let relations = RelationRepository::new(self.db.as_ref())
            .for_address_at_gateway(dev_addr, gateway_id)
            .await?;

        Ok(relations
            .into_iter()
            .min_by_key(|relation| (relation.last_f_cnt - f_cnt).abs())
            .map(|relation| ResolvedIdentity {
                device_id: relation.device_id,
                application_id: relation.application_id,
            }))
    }
}
