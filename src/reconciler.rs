//! Replica reconciliation.
//!
//! An end device transmits each uplink as N physical replicas; any subset of
//! them reaches any subset of gateways. Every time a new copy is stored the
//! reconciler recomputes the counters for that frame from the full reception
//! set and upserts one row keyed (dev_addr, f_cnt). Recomputing from scratch
//! makes the result independent of arrival order, and the transaction plus
//! the unique index serialize concurrent updates of the same frame.

use std::collections::BTreeMap;
use std::sync::Arc;

use sea_orm::{DatabaseConnection, TransactionTrait};
use tracing::debug;

use crate::error::{DataAccessError, db_err};
use crate::repositories::replica::ReplicaCounts;
use crate::repositories::{ReplicaRepository, UplinkRepository};

pub struct ReplicaReconciler {
    db: Arc<DatabaseConnection>,
    tx_replicas: u32,
}

impl ReplicaReconciler {
    pub fn new(db: Arc<DatabaseConnection>, tx_replicas: u32) -> Self {
        Self { db, tx_replicas }
    }

    /// Recomputes and upserts the replica counters for one frame. Called
    /// after each uplink insert carrying a device address and counter.
    pub async fn reconcile(&self, dev_addr: &str, f_cnt: i64) -> Result<(), DataAccessError> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(db_err("starting reconciliation transaction"))?;

        let gateways = UplinkRepository::new(&txn)
            .gateways_for_frame(dev_addr, f_cnt)
            .await?;

        if gateways.is_empty() {
            // Nothing stored yet for this frame; nothing to reconcile.
            txn.commit()
                .await
                .map_err(db_err("committing reconciliation transaction"))?;
            return Ok(());
        }

        let counts = count_replicas(&gateways, self.tx_replicas);
        debug!(
            dev_addr,
            f_cnt,
            tot_rx = counts.tot_rx_replica,
            gateways = counts.num_gateways,
            "reconciled frame replicas"
        );

        ReplicaRepository::new(&txn)
            .upsert(dev_addr, f_cnt, counts)
            .await?;

        txn.commit()
            .await
            .map_err(db_err("committing reconciliation transaction"))?;
        Ok(())
    }
}

/// Counter arithmetic over the gateway list of one frame's receptions.
fn count_replicas(gateways: &[String], tx_replicas: u32) -> ReplicaCounts {
    let tot_rx_replica = gateways.len() as i32;

    let mut per_gateway: BTreeMap<&str, i32> = BTreeMap::new();
    for gateway in gateways {
        *per_gateway.entry(gateway.as_str()).or_insert(0) += 1;
    }
    let num_gateways = per_gateway.len() as i32;
    let num_rx_replica = per_gateway.values().copied().max().unwrap_or(0);
    let tot_loss_replica = (num_gateways * tx_replicas as i32 - tot_rx_replica).max(0);

    ReplicaCounts {
        num_rx_replica,
        tot_rx_replica,
        tot_loss_replica,
        num_gateways,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gw(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn single_gateway_full_reception() {
        let counts = count_replicas(&gw(&["gw-a", "gw-a", "gw-a"]), 3);
        assert_eq!(counts.tot_rx_replica, 3);
        assert_eq!(counts.num_rx_replica, 3);
        assert_eq!(counts.num_gateways, 1);
        assert_eq!(counts.tot_loss_replica, 0);
    }

    #[test]
    fn losses_scale_with_gateway_count() {
        // two gateways, four copies total: 2 * 3 - 4 = 2 lost
        let counts = count_replicas(&gw(&["gw-a", "gw-a", "gw-b", "gw-b"]), 3);
        assert_eq!(counts.tot_rx_replica, 4);
        assert_eq!(counts.num_rx_replica, 2);
        assert_eq!(counts.num_gateways, 2);
        assert_eq!(counts.tot_loss_replica, 2);
    }

    #[test]
    fn loss_never_goes_negative() {
        // more copies than N at one gateway (duplicated delivery)
        let counts = count_replicas(&gw(&["gw-a", "gw-a", "gw-a", "gw-a"]), 3);
        assert_eq!(counts.tot_loss_replica, 0);
    }
}
