//! Gateway KPI computation: rollup of the window's device KPIs plus the
//! gateway-only metrics (attribution-independent uplink count, connected
//! nodes, airtime utilization, jitter, availability).

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use sea_orm::{ConnectionTrait, Set};

use crate::error::PipelineError;
use crate::kpi::device::DeviceKpi;
use crate::kpi::{Window, stats};
use crate::models::{connection_stats, gateway_kpi};
use crate::repositories::{ConnectionStatsRepository, UplinkRepository};

/// KPIs for one gateway over one window.
#[derive(Debug, Clone)]
pub struct GatewayKpi {
    pub gateway_id: String,
    pub total_ul_pkt_count: i64,
    pub num_connected_devices: i64,
    pub num_identified_devices: i64,
    pub num_unidentified_devices: i64,
    pub total_consumed_airtime_ms: Option<f64>,
    pub utilization: Option<f64>,
    pub jitter_mean_ms: Option<f64>,
    pub jitter_std_dev_ms: Option<f64>,
    pub availability: f64,
    pub avg_sampling_rate: Option<f64>,
    pub total_dl_pkt_count: Option<i64>,
    pub total_registered_ul_pkt_count: Option<i64>,
    pub total_unique_ul_count: Option<i64>,
    pub total_packet_loss: Option<i64>,
    pub total_packet_loss_ratio: Option<f64>,
    pub missing_f_cnt_count: Option<i64>,
    pub missing_f_cnt_ratio: Option<f64>,
    pub replica_1_count: Option<i64>,
    pub replica_2_count: Option<i64>,
    pub replica_3_count: Option<i64>,
    pub replica_1_ratio: Option<f64>,
    pub replica_2_ratio: Option<f64>,
    pub replica_3_ratio: Option<f64>,
    pub snr_mean: Option<f64>,
    pub snr_variance: Option<f64>,
    pub rssi_mean: Option<f64>,
    pub rssi_variance: Option<f64>,
    pub payload_size_mean: Option<f64>,
    pub payload_size_variance: Option<f64>,
    pub toa_mean: Option<f64>,
    pub toa_variance: Option<f64>,
}

impl GatewayKpi {
    /// Builds the row to persist for this window.
    pub fn into_row(self, window: &Window) -> gateway_kpi::ActiveModel {
        gateway_kpi::ActiveModel {
            window_start: Set(window.start.into()),
            window_end: Set(window.end.into()),
            gateway_id: Set(self.gateway_id),
            total_ul_pkt_count: Set(self.total_ul_pkt_count),
            num_connected_devices: Set(Some(self.num_connected_devices)),
            num_identified_devices: Set(Some(self.num_identified_devices)),
            num_unidentified_devices: Set(Some(self.num_unidentified_devices)),
            total_consumed_airtime_ms: Set(self.total_consumed_airtime_ms),
            utilization: Set(self.utilization),
            jitter_mean_ms: Set(self.jitter_mean_ms),
            jitter_std_dev_ms: Set(self.jitter_std_dev_ms),
            availability: Set(Some(self.availability)),
            avg_sampling_rate: Set(self.avg_sampling_rate),
            total_dl_pkt_count: Set(self.total_dl_pkt_count),
            total_registered_ul_pkt_count: Set(self.total_registered_ul_pkt_count),
            total_unique_ul_count: Set(self.total_unique_ul_count),
            total_packet_loss: Set(self.total_packet_loss),
            total_packet_loss_ratio: Set(self.total_packet_loss_ratio),
            missing_f_cnt_count: Set(self.missing_f_cnt_count),
            missing_f_cnt_ratio: Set(self.missing_f_cnt_ratio),
            replica_1_count: Set(self.replica_1_count),
            replica_2_count: Set(self.replica_2_count),
            replica_3_count: Set(self.replica_3_count),
            replica_1_ratio: Set(self.replica_1_ratio),
            replica_2_ratio: Set(self.replica_2_ratio),
            replica_3_ratio: Set(self.replica_3_ratio),
            snr_mean: Set(self.snr_mean),
            snr_variance: Set(self.snr_variance),
            rssi_mean: Set(self.rssi_mean),
            rssi_variance: Set(self.rssi_variance),
            payload_size_mean: Set(self.payload_size_mean),
            payload_size_variance: Set(self.payload_size_variance),
            toa_mean: Set(self.toa_mean),
            toa_variance: Set(self.toa_variance),
            ..Default::default()
        }
    }
}

/// Computes the KPIs for one gateway over one window, folding in the device
/// KPIs already computed for that window.
pub async fn compute_gateway_kpis<C: ConnectionTrait>(
    db: &C,
    gateway_id: &str,
    window: &Window,
    device_kpis: &[DeviceKpi],
) -> Result<GatewayKpi, PipelineError> {
    let uplinks = UplinkRepository::new(db);

    let total_ul_pkt_count = uplinks.count_for_gateway(gateway_id, window).await? as i64;

    // Connected nodes: identified devices deduplicate by device id with the
    // most recent sighting winning; sightings that never resolved count by
    // device address.
    let sightings = uplinks
        .device_sightings_for_gateway(gateway_id, window)
        .await?;
    let mut identified: BTreeMap<String, String> = BTreeMap::new();
    let mut unidentified: BTreeSet<String> = BTreeSet::new();
    for (dev_addr, device_id, _arrived) in sightings {
        match device_id {
            Some(id) => {
                identified.insert(id, dev_addr);
            }
            None => {
                unidentified.insert(dev_addr);
            }
        }
    }
    let num_identified_devices = identified.len() as i64;
    let num_unidentified_devices = unidentified.len() as i64;

    let airtimes = uplinks.airtimes_for_gateway(gateway_id, window).await?;
    let (total_consumed_airtime_ms, utilization) = if airtimes.is_empty() {
        (None, None)
    } else {
        let total: f64 = airtimes.iter().sum();
        (Some(total), Some(total / window.duration_ms()))
    };

    let arrivals: Vec<DateTime<Utc>> = uplinks
        .arrivals_for_gateway(gateway_id, window)
        .await?
        .into_iter()
        .map(|arrived| arrived.with_timezone(&Utc))
        .collect();
    let jitter = stats::jitter(&arrivals);

    let connection_rows = ConnectionStatsRepository::new(db)
        .window_rows(gateway_id, window)
        .await?;
    let availability = availability(&connection_rows, window);

    let rollup = rollup_devices(device_kpis);

    Ok(GatewayKpi {
        gateway_id: gateway_id.to_string(),
        total_ul_pkt_count,
        num_connected_devices: num_identified_devices + num_unidentified_devices,
        num_identified_devices,
        num_unidentified_devices,
        total_consumed_airtime_ms,
        utilization,
        jitter_mean_ms: jitter.map(|j| j.mean_ms),
        jitter_std_dev_ms: jitter.map(|j| j.std_dev_ms),
        availability,
        avg_sampling_rate: rollup.as_ref().and_then(|r| r.avg_sampling_rate),
        total_dl_pkt_count: rollup.as_ref().map(|_| 0),
        total_registered_ul_pkt_count: rollup.as_ref().map(|r| r.total_registered_ul_pkt_count),
        total_unique_ul_count: rollup.as_ref().map(|r| r.total_unique_ul_count),
        total_packet_loss: rollup.as_ref().map(|r| r.total_packet_loss),
        total_packet_loss_ratio: rollup.as_ref().map(|r| r.total_packet_loss_ratio),
        missing_f_cnt_count: rollup.as_ref().map(|r| r.missing_f_cnt_count),
        missing_f_cnt_ratio: rollup.as_ref().map(|r| r.missing_f_cnt_ratio),
        replica_1_count: rollup.as_ref().map(|r| r.replica_1_count),
        replica_2_count: rollup.as_ref().map(|r| r.replica_2_count),
        replica_3_count: rollup.as_ref().map(|r| r.replica_3_count),
        replica_1_ratio: rollup.as_ref().map(|r| r.replica_1_ratio),
        replica_2_ratio: rollup.as_ref().map(|r| r.replica_2_ratio),
        replica_3_ratio: rollup.as_ref().map(|r| r.replica_3_ratio),
        snr_mean: rollup.as_ref().and_then(|r| r.snr_mean),
        snr_variance: rollup.as_ref().and_then(|r| r.snr_variance),
        rssi_mean: rollup.as_ref().and_then(|r| r.rssi_mean),
        rssi_variance: rollup.as_ref().and_then(|r| r.rssi_variance),
        payload_size_mean: rollup.as_ref().and_then(|r| r.payload_size_mean),
        payload_size_variance: rollup.as_ref().and_then(|r| r.payload_size_variance),
        toa_mean: rollup.as_ref().and_then(|r| r.toa_mean),
        toa_variance: rollup.as_ref().and_then(|r| r.toa_variance),
    })
}

/// Downtime is the total forward movement of `connected_at` across
/// consecutive snapshots: a reconnect advances it by the outage length.
/// Out-of-order snapshots are clamped to zero contribution.
fn availability(rows: &[connection_stats::Model], window: &Window) -> f64 {
    let mut downtime_ms: i64 = 0;
    for pair in rows.windows(2) {
        if let (Some(prev), Some(next)) = (pair[0].connected_at, pair[1].connected_at) {
            downtime_ms += (next - prev).num_milliseconds().max(0);
        }
    }
    let duration_ms = window.duration_ms();
    100.0 * (duration_ms - downtime_ms as f64) / duration_ms
}

/// Averages and sums over the devices that produced a KPI row this window.
#[derive(Debug, Clone)]
struct DeviceRollup {
    avg_sampling_rate: Option<f64>,
    total_registered_ul_pkt_count: i64,
    total_unique_ul_count: i64,
    total_packet_loss: i64,
    total_packet_loss_ratio: f64,
    missing_f_cnt_count: i64,
    missing_f_cnt_ratio: f64,
    replica_1_count: i64,
    replica_2_count: i64,
    replica_3_count: i64,
    replica_1_ratio: f64,
    replica_2_ratio: f64,
    replica_3_ratio: f64,
    snr_mean: Option<f64>,
    snr_variance: Option<f64>,
    rssi_mean: Option<f64>,
    rssi_variance: Option<f64>,
    payload_size_mean: Option<f64>,
    payload_size_variance: Option<f64>,
    toa_mean: Option<f64>,
    toa_variance: Option<f64>,
}

fn rollup_devices(kpis: &[DeviceKpi]) -> Option<DeviceRollup> {
    if kpis.is_empty() {
        return None;
    }
    let count = kpis.len() as f64;

    let avg = |values: Vec<f64>| values.iter().sum::<f64>() / count;
    let avg_present = |values: Vec<f64>| stats::mean(&values);

    Some(DeviceRollup {
        avg_sampling_rate: avg_present(
            kpis.iter()
                .filter_map(|k| k.sampling_rate)
                .map(|rate| rate as f64)
                .collect(),
        ),
        total_registered_ul_pkt_count: kpis.iter().map(|k| k.total_ul_pkt_count).sum(),
        total_unique_ul_count: kpis.iter().map(|k| k.total_unique_ul_count).sum(),
        total_packet_loss: kpis.iter().map(|k| k.loss.total_loss).sum(),
        total_packet_loss_ratio: avg(kpis.iter().map(|k| k.loss.loss_ratio).collect()),
        missing_f_cnt_count: kpis.iter().map(|k| k.loss.missing_count).sum(),
        missing_f_cnt_ratio: avg(kpis.iter().map(|k| k.loss.missing_ratio).collect()),
        replica_1_count: kpis.iter().map(|k| k.loss.replica_1_count).sum(),
        replica_2_count: kpis.iter().map(|k| k.loss.replica_2_count).sum(),
        replica_3_count: kpis.iter().map(|k| k.loss.replica_3_count).sum(),
        replica_1_ratio: avg(kpis.iter().map(|k| k.loss.replica_1_ratio).collect()),
        replica_2_ratio: avg(kpis.iter().map(|k| k.loss.replica_2_ratio).collect()),
        replica_3_ratio: avg(kpis.iter().map(|k| k.loss.replica_3_ratio).collect()),
        snr_mean: avg_present(kpis.iter().filter_map(|k| k.snr_mean).collect()),
        snr_variance: avg_present(kpis.iter().filter_map(|k| k.snr_variance).collect()),
        rssi_mean: avg_present(kpis.iter().filter_map(|k| k.rssi_mean).collect()),
        rssi_variance: avg_present(kpis.iter().filter_map(|k| k.rssi_variance).collect()),
        payload_size_mean: avg_present(kpis.iter().filter_map(|k| k.payload_size_mean).collect()),
        payload_size_variance: avg_present(
            kpis.iter().filter_map(|k| k.payload_size_variance).collect(),
        ),
        toa_mean: avg_present(kpis.iter().filter_map(|k| k.toa_mean).collect()),
        toa_variance: avg_present(kpis.iter().filter_map(|k| k.toa_variance).collect()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::TimeZone;

    fn at(seconds: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 4, 2, 9, 0, 0).unwrap() + chrono::Duration::seconds(seconds)
    }

    fn connection_row(event_offset: i64, connected_at: Option<DateTime<Utc>>) -> connection_stats::Model {
        connection_stats::Model {
            id: event_offset,
            gateway_id: "gw-a".to_string(),
            gateway_eui: None,
            protocol: None,
            connected_at: connected_at.map(Into::into),
            last_status_received_at: None,
            last_status_time: None,
            last_uplink_received_at: None,
            last_downlink_received_at: None,
            boot_time: None,
            gateway_server_version: None,
            fpga_version: None,
            hal_version: None,
            latitude: None,
            longitude: None,
            altitude: None,
            source: None,
            ip: None,
            txin: None,
            txok: None,
            lpps: None,
            rxin: None,
            rxok: None,
            rxfw: None,
            ackr: None,
            uplink_count: None,
            downlink_count: None,
            rtt_min: None,
            rtt_max: None,
            rtt_median: None,
            rtt_count: None,
            sub_bands: None,
            event_time: at(event_offset).into(),
        }
    }

    fn hour_window() -> Window {
        Window {
            start: at(0),
            end: at(3600),
        }
    }

    #[test]
    fn availability_counts_connected_at_advances() {
        // two reports on the same connection, then a reconnect 120 s later
        let rows = vec![
            connection_row(0, Some(at(0))),
            connection_row(600, Some(at(0))),
            connection_row(720, Some(at(120))),
        ];
        let value = availability(&rows, &hour_window());
        assert_relative_eq!(value, 100.0 * (3600.0 - 120.0) / 3600.0, epsilon = 1e-9);
    }

    #[test]
    fn availability_is_full_without_reconnects() {
        let rows = vec![
            connection_row(0, Some(at(0))),
            connection_row(600, Some(at(0))),
        ];
        assert_relative_eq!(availability(&rows, &hour_window()), 100.0);
        assert_relative_eq!(availability(&[], &hour_window()), 100.0);
    }

    #[test]
    fn availability_ignores_out_of_order_snapshots() {
        let rows = vec![
            connection_row(0, Some(at(120))),
            connection_row(600, Some(at(0))),
        ];
        assert_relative_eq!(availability(&rows, &hour_window()), 100.0);
    }

    #[test]
    fn rollup_of_empty_set_is_none() {
        assert!(rollup_devices(&[]).is_none());
    }
}
