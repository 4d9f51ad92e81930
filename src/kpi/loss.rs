//! Packet loss over a multiset of frame counters.
//!
//! Each distinct counter should have been received N times; counters never
//! observed inside the observed min..=max range count as N lost replicas
//! each. Replica buckets split distinct counters by how many copies arrived
//! (one, two, three or more).

use std::collections::BTreeMap;

/// Loss and replica-distribution numbers for one (entity, window) scope.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PacketLossSummary {
    pub total_loss: i64,
    /// total_loss / (inclusive counter range length * N)
    pub loss_ratio: f64,
    pub missing_count: i64,
    pub missing_ratio: f64,
    pub replica_1_count: i64,
    pub replica_2_count: i64,
    pub replica_3_count: i64,
    pub replica_1_ratio: f64,
    pub replica_2_ratio: f64,
    pub replica_3_ratio: f64,
}

/// Computes the loss summary for the given counter multiset. An empty input
/// yields all zeros.
pub fn packet_loss(f_cnts: &[i64], tx_replicas: u32) -> PacketLossSummary {
    let mut counts: BTreeMap<i64, i64> = BTreeMap::new();
    for &f_cnt in f_cnts {
        *counts.entry(f_cnt).or_insert(0) += 1;
    }
    // BTreeMap keys are sorted, so the bounds are the first and last keys
    let (Some(&min), Some(&max)) = (counts.keys().next(), counts.keys().next_back()) else {
        return PacketLossSummary::default();
    };

    let n = tx_replicas as i64;
    let mut total_loss: i64 = counts.values().map(|&copies| (n - copies).max(0)).sum();

    let replica_1_count = counts.values().filter(|&&copies| copies == 1).count() as i64;
    let replica_2_count = counts.values().filter(|&&copies| copies == 2).count() as i64;
    let replica_3_count = counts.values().filter(|&&copies| copies >= 3).count() as i64;
    let range_len = max - min + 1;
    let distinct = counts.len() as i64;
    let missing_count = range_len - distinct;
    total_loss += missing_count * n;

    PacketLossSummary {
        total_loss,
        loss_ratio: total_loss as f64 / (range_len * n) as f64,
        missing_count,
        missing_ratio: missing_count as f64 / range_len as f64,
        replica_1_count,
        replica_2_count,
        replica_3_count,
        replica_1_ratio: replica_1_count as f64 / distinct as f64,
        replica_2_ratio: replica_2_count as f64 / distinct as f64,
        replica_3_ratio: replica_3_count as f64 / distinct as f64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn counters_with_a_gap() {
        // frame 10 fully received, frame 11 never seen, frame 12 once
        let summary = packet_loss(&[10, 10, 10, 12], 3);
        assert_eq!(summary.replica_3_count, 1);
        assert_eq!(summary.replica_2_count, 0);
        assert_eq!(summary.replica_1_count, 1);
        assert_eq!(summary.missing_count, 1);
        // (3-3) + (3-1) + 3*1 = 5 over a range of 3 counters
        assert_eq!(summary.total_loss, 5);
        assert_relative_eq!(summary.loss_ratio, 5.0 / 9.0);
        assert_relative_eq!(summary.missing_ratio, 1.0 / 3.0);
        assert_relative_eq!(summary.replica_1_ratio, 0.5);
        assert_relative_eq!(summary.replica_3_ratio, 0.5);
    }

    #[test]
    fn full_reception_has_no_loss() {
        let summary = packet_loss(&[1, 1, 1, 2, 2, 2], 3);
        assert_eq!(summary.total_loss, 0);
        assert_relative_eq!(summary.loss_ratio, 0.0);
        assert_eq!(summary.replica_3_count, 2);
        assert_relative_eq!(summary.replica_3_ratio, 1.0);
    }

    #[test]
    fn over_reception_does_not_go_negative() {
        let summary = packet_loss(&[7, 7, 7, 7, 7], 3);
        assert_eq!(summary.total_loss, 0);
        assert_eq!(summary.replica_3_count, 1);
    }

    #[test]
    fn empty_input_is_all_zeros() {
        assert_eq!(packet_loss(&[], 3), PacketLossSummary::default());
    }

    #[test]
    fn respects_configured_replica_count() {
        let summary = packet_loss(&[4, 4], 5);
        assert_eq!(summary.total_loss, 3);
        assert_relative_eq!(summary.loss_ratio, 3.0 / 5.0);
    }
}
