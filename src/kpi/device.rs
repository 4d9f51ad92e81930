//! End-device KPI computation for one (device, gateway, window).

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use sea_orm::{ConnectionTrait, Set};
use serde_json::Value as JsonValue;

use crate::error::PipelineError;
use crate::freq_plan;
use crate::kpi::loss::{self, PacketLossSummary};
use crate::kpi::{Window, stats};
use crate::models::end_device_kpi;
use crate::repositories::UplinkRepository;

/// KPIs for one device at one gateway over one window. Carried in memory so
/// the gateway rollup can consume the same numbers that get persisted.
#[derive(Debug, Clone)]
pub struct DeviceKpi {
    pub device_id: String,
    pub gateway_id: String,
    pub sampling_rate: Option<i64>,
    pub total_ul_pkt_count: i64,
    pub total_unique_ul_count: i64,
    /// Loss across all gateways that saw this device
    pub loss: PacketLossSummary,
    /// Loss at this gateway only
    pub gw_loss: PacketLossSummary,
    pub consumed_duty_cycle_ms: f64,
    pub snr_mean: Option<f64>,
    pub snr_variance: Option<f64>,
    pub rssi_mean: Option<f64>,
    pub rssi_variance: Option<f64>,
    pub payload_size_mean: Option<f64>,
    pub payload_size_variance: Option<f64>,
    pub toa_mean: Option<f64>,
    pub toa_variance: Option<f64>,
    pub sf_distribution: BTreeMap<String, i64>,
    pub sf_ratios: BTreeMap<String, f64>,
    pub freq_distribution: BTreeMap<String, i64>,
    pub freq_ratios: BTreeMap<String, f64>,
}

impl DeviceKpi {
    /// Builds the row to persist for this window.
    pub fn into_row(self, window: &Window) -> end_device_kpi::ActiveModel {
        end_device_kpi::ActiveModel {
            window_start: Set(window.start.into()),
            window_end: Set(window.end.into()),
            device_id: Set(self.device_id),
            gateway_id: Set(self.gateway_id),
            sampling_rate: Set(self.sampling_rate),
            total_dl_pkt_count: Set(0),
            total_ul_pkt_count: Set(self.total_ul_pkt_count),
            total_unique_ul_count: Set(self.total_unique_ul_count),
            total_packet_loss: Set(self.loss.total_loss),
            total_packet_loss_ratio: Set(self.loss.loss_ratio),
            missing_f_cnt_count: Set(self.loss.missing_count),
            missing_f_cnt_ratio: Set(self.loss.missing_ratio),
            replica_1_count: Set(self.loss.replica_1_count),
            replica_2_count: Set(self.loss.replica_2_count),
            replica_3_count: Set(self.loss.replica_3_count),
            replica_1_ratio: Set(self.loss.replica_1_ratio),
            replica_2_ratio: Set(self.loss.replica_2_ratio),
            replica_3_ratio: Set(self.loss.replica_3_ratio),
            gw_total_packet_loss: Set(self.gw_loss.total_loss),
            gw_total_packet_loss_ratio: Set(self.gw_loss.loss_ratio),
            gw_missing_f_cnt_count: Set(self.gw_loss.missing_count),
            gw_missing_f_cnt_ratio: Set(self.gw_loss.missing_ratio),
            gw_replica_1_count: Set(self.gw_loss.replica_1_count),
            gw_replica_2_count: Set(self.gw_loss.replica_2_count),
            gw_replica_3_count: Set(self.gw_loss.replica_3_count),
            gw_replica_1_ratio: Set(self.gw_loss.replica_1_ratio),
            gw_replica_2_ratio: Set(self.gw_loss.replica_2_ratio),
            gw_replica_3_ratio: Set(self.gw_loss.replica_3_ratio),
            consumed_duty_cycle_ms: Set(self.consumed_duty_cycle_ms),
            snr_mean: Set(self.snr_mean),
            snr_variance: Set(self.snr_variance),
            rssi_mean: Set(self.rssi_mean),
            rssi_variance: Set(self.rssi_variance),
            payload_size_mean: Set(self.payload_size_mean),
            payload_size_variance: Set(self.payload_size_variance),
            toa_mean: Set(self.toa_mean),
            toa_variance: Set(self.toa_variance),
            sf_distribution: Set(to_json(&self.sf_distribution)),
            sf_ratios: Set(to_json(&self.sf_ratios)),
            freq_distribution: Set(to_json(&self.freq_distribution)),
            freq_ratios: Set(to_json(&self.freq_ratios)),
            ..Default::default()
        }
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Option<JsonValue> {
    serde_json::to_value(value).ok()
}

/// Computes the KPIs for one device at one gateway over one window.
///
/// Returns `Ok(None)` when the device produced no uplinks at this gateway in
/// the window; the device is skipped for the window, which is not a failure.
pub async fn compute_device_kpis<C: ConnectionTrait>(
    db: &C,
    device_id: &str,
    gateway_id: &str,
    window: &Window,
    tx_replicas: u32,
) -> Result<Option<DeviceKpi>, PipelineError> {
    let uplinks = UplinkRepository::new(db);

    let frames = uplinks
        .frames_for_device_at_gateway(device_id, gateway_id, window)
        .await?;
    if frames.is_empty() {
        return Ok(None);
    }

    // Device-wide receptions drive sampling rate, duty cycle and the
    // cross-gateway loss numbers.
    let observations = uplinks
        .frame_observations_for_device(device_id, window)
        .await?;

    let mut first_arrival: BTreeMap<i64, DateTime<Utc>> = BTreeMap::new();
    let mut min_airtime: BTreeMap<i64, f64> = BTreeMap::new();
    let mut all_counters: Vec<i64> = Vec::with_capacity(observations.len());
    for obs in &observations {
        let arrived = obs.received_at_gw.with_timezone(&Utc);
        all_counters.push(obs.f_cnt);
        first_arrival
            .entry(obs.f_cnt)
            .and_modify(|earliest| {
                if arrived < *earliest {
                    *earliest = arrived;
                }
            })
            .or_insert(arrived);
        min_airtime
            .entry(obs.f_cnt)
            .and_modify(|cheapest| {
                if obs.airtime_ms < *cheapest {
                    *cheapest = obs.airtime_ms;
                }
            })
            .or_insert(obs.airtime_ms);
    }

    let ordered_arrivals: Vec<(i64, DateTime<Utc>)> = first_arrival.into_iter().collect();
    let sampling_rate = stats::sampling_rate(&ordered_arrivals);

    let gw_counters = uplinks
        .frame_counters_for_device_at_gateway(device_id, gateway_id, window)
        .await?;
    let total_unique_ul_count = {
        let mut distinct = gw_counters.clone();
        distinct.sort_unstable();
        distinct.dedup();
        distinct.len() as i64
    };

    let loss = loss::packet_loss(&all_counters, tx_replicas);
    let gw_loss = loss::packet_loss(&gw_counters, tx_replicas);

    // The device paid for all N replicas of each frame whether or not every
    // copy arrived; one reception's airtime stands in for the frame.
    let consumed_duty_cycle_ms = min_airtime.values().sum::<f64>() * tx_replicas as f64;

    let snr: Vec<f64> = frames.iter().filter_map(|frame| frame.snr).collect();
    let rssi: Vec<f64> = frames.iter().filter_map(|frame| frame.rssi).collect();
    let payload_sizes: Vec<f64> = frames
        .iter()
        .map(|frame| frame.payload_size as f64)
        .collect();
    let airtimes: Vec<f64> = frames
        .iter()
        .map(|frame| frame.consumed_airtime_ms)
        .collect();

    let mut sf_distribution: BTreeMap<String, i64> = BTreeMap::new();
    for sf in freq_plan::UPLINK_SPREADING_FACTORS {
        let count = frames
            .iter()
            .filter(|frame| frame.spreading_factor == sf as i32)
            .count() as i64;
        sf_distribution.insert(sf.to_string(), count);
    }
    let sf_total: i64 = sf_distribution.values().sum();
    let sf_ratios: BTreeMap<String, f64> = sf_distribution
        .iter()
        .map(|(sf, &count)| {
            let ratio = if sf_total > 0 {
                count as f64 / sf_total as f64
            } else {
                0.0
            };
            (sf.clone(), ratio)
        })
        .collect();

    let mut freq_distribution: BTreeMap<String, i64> = BTreeMap::new();
    let mut freq_ratios: BTreeMap<String, f64> = BTreeMap::new();
    let plan = frames
        .first()
        .and_then(|frame| frame.frequency.as_deref())
        .and_then(freq_plan::region_plan_for);
    if let Some(plan) = plan {
        for &channel in plan {
            let count = frames
                .iter()
                .filter(|frame| frame.frequency.as_deref() == Some(channel))
                .count() as i64;
            freq_distribution.insert(channel.to_string(), count);
        }
        let total: i64 = freq_distribution.values().sum();
        if total > 0 {
            freq_ratios = freq_distribution
                .iter()
                .map(|(channel, &count)| (channel.clone(), count as f64 / total as f64))
                .collect();
        }
    }

    Ok(Some(DeviceKpi {
        device_id: device_id.to_string(),
        gateway_id: gateway_id.to_string(),
        sampling_rate,
        total_ul_pkt_count: frames.len() as i64,
        total_unique_ul_count,
        loss,
        gw_loss,
        consumed_duty_cycle_ms,
        snr_mean: stats::mean(&snr),
        snr_variance: stats::population_variance(&snr),
        rssi_mean: stats::mean(&rssi),
        rssi_variance: stats::population_variance(&rssi),
        payload_size_mean: stats::mean(&payload_sizes),
        payload_size_variance: stats::population_variance(&payload_sizes),
        toa_mean: stats::mean(&airtimes),
        toa_variance: stats::population_variance(&airtimes),
        sf_distribution,
        sf_ratios,
        freq_distribution,
        freq_ratios,
    }))
}
