//! # Telemetry Decoder
//!
//! Classifies incoming gateway-server envelopes by event name, normalizes
//! them into typed rows, and persists them. Uplinks additionally run device
//! identity resolution and trigger replica reconciliation. One envelope's
//! failure never affects another; the consumer drops and logs at its own
//! boundary.

pub mod envelope;

use std::sync::Arc;

use metrics::counter;
use sea_orm::{DatabaseConnection, Set};
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::airtime::{self, ToaParams};
use crate::config::DecoderConfig;
use crate::error::PipelineError;
use crate::models::{connection_stats, downlink, gateway_status, uplink};
use crate::reconciler::ReplicaReconciler;
use crate::repositories::{
    ConnectionStatsRepository, DownlinkRepository, GatewayStatusRepository, UplinkRepository,
};
use crate::resolver::DeviceResolver;

use envelope::{
    ConnectionStatsData, DownlinkData, EventMeta, GatewayEvent, StatusData, UplinkData,
};

/// Wire key for the gateway-server version inside status reports.
const GATEWAY_SERVER_VERSION_KEY: &str = "ttn-lw-gateway-server";

pub struct TelemetryDecoder {
    db: Arc<DatabaseConnection>,
    resolver: DeviceResolver,
    reconciler: ReplicaReconciler,
}

impl TelemetryDecoder {
    pub fn new(db: Arc<DatabaseConnection>, config: &DecoderConfig) -> Self {
        Self {
            resolver: DeviceResolver::new(db.clone()),
            reconciler: ReplicaReconciler::new(db.clone(), config.tx_replicas),
            db,
        }
    }

    /// Decodes and persists one raw envelope.
    pub async fn handle(&self, raw: &[u8]) -> Result<(), PipelineError> {
        match GatewayEvent::parse(raw)? {
            GatewayEvent::UplinkReceive { meta, data } => self.handle_uplink(meta, *data).await,
            GatewayEvent::DownlinkSend { meta, data } => self.handle_downlink(meta, data).await,
            GatewayEvent::StatusReceive { meta, data } => self.handle_status(meta, data).await,
            GatewayEvent::ConnectionStats { meta, data } => {
                self.handle_connection_stats(meta, *data).await
            }
            GatewayEvent::Unhandled { name } => {
                debug!(event = %name, "ignoring unhandled event");
                counter!("lorawatch_events_unhandled_total").increment(1);
                Ok(())
            }
        }
    }

    async fn handle_uplink(&self, meta: EventMeta, data: UplinkData) -> Result<(), PipelineError> {
        let message = data.message;
        let rx = &message.rx_metadata[0];
        let lora = &message.settings.data_rate.lora;

        let payload_size = airtime::payload_size(&message.raw_payload)?;
        let toa = airtime::calculate_toa(
            payload_size as i64,
            lora.spreading_factor as i64,
            &ToaParams::default(),
        )?;

        let mac = message
            .payload
            .as_ref()
            .and_then(|payload| payload.mac_payload.as_ref());
        let frame = mac.and_then(|mac| mac.f_hdr.as_ref());
        let join = message
            .payload
            .as_ref()
            .and_then(|payload| payload.join_request_payload.as_ref());

        let dev_addr = frame.and_then(|frame| frame.dev_addr.clone());
        let f_cnt = frame.and_then(|frame| frame.f_cnt);

        let identity = match (dev_addr.as_deref(), f_cnt) {
            (Some(addr), Some(cnt)) => self.resolver.resolve(addr, &meta.gateway_id, cnt).await?,
            _ => None,
        };

        let row = uplink::ActiveModel {
            dev_addr: Set(dev_addr.clone()),
            device_id: Set(identity.as_ref().map(|id| id.device_id.clone())),
            application_id: Set(identity.and_then(|id| id.application_id)),
            gateway_id: Set(meta.gateway_id.clone()),
            gateway_eui: Set(meta.gateway_eui.clone()),
            m_type: Set(message
                .payload
                .as_ref()
                .and_then(|payload| payload.m_hdr.as_ref())
                .and_then(|hdr| hdr.m_type.clone())),
            f_cnt: Set(f_cnt),
            f_port: Set(mac.and_then(|mac| mac.f_port)),
            f_ctrl_adr: Set(frame
                .and_then(|frame| frame.f_ctrl.as_ref())
                .and_then(|ctrl| ctrl.adr)),
            join_eui: Set(join.and_then(|join| join.join_eui.clone())),
            dev_eui: Set(join.and_then(|join| join.dev_eui.clone())),
            dev_nonce: Set(join.and_then(|join| join.dev_nonce.clone())),
            raw_payload: Set(message.raw_payload.clone()),
            frm_payload: Set(mac.and_then(|mac| mac.frm_payload.clone())),
            payload_size: Set(payload_size),
            bandwidth: Set(lora.bandwidth),
            spreading_factor: Set(lora.spreading_factor),
            coding_rate: Set(lora.coding_rate.clone()),
            frequency: Set(message.settings.frequency.clone()),
            rssi: Set(rx.rssi),
            channel_rssi: Set(rx.channel_rssi),
            snr: Set(rx.snr),
            channel_index: Set(rx.channel_index),
            consumed_airtime_ms: Set(toa.packet_ms),
            gps_time: Set(rx.gps_time.clone()),
            concentrator_timestamp: Set(message.settings.timestamp),
            event_time: Set(Some(meta.time.into())),
            received_at_gw: Set(rx.received_at.into()),
            received_at_net: Set(message.received_at.map(Into::into)),
            ..Default::default()
        };

        UplinkRepository::new(self.db.as_ref()).insert(row).await?;
        counter!("lorawatch_uplinks_stored_total").increment(1);

        if let (Some(addr), Some(cnt)) = (dev_addr, f_cnt) {
            self.reconciler.reconcile(&addr, cnt).await?;
        }
        Ok(())
    }

    async fn handle_downlink(
        &self,
        meta: EventMeta,
        data: DownlinkData,
    ) -> Result<(), PipelineError> {
        let scheduled = data.scheduled;
        let lora = scheduled.data_rate.and_then(|rate| rate.lora);
        let radio = scheduled.downlink;

        let row = downlink::ActiveModel {
            gateway_id: Set(meta.gateway_id),
            gateway_eui: Set(meta.gateway_eui),
            raw_payload: Set(data.raw_payload),
            bandwidth: Set(lora.as_ref().and_then(|lora| lora.bandwidth)),
            spreading_factor: Set(lora.as_ref().map(|lora| lora.spreading_factor)),
            coding_rate: Set(lora.and_then(|lora| lora.coding_rate)),
            frequency: Set(scheduled.frequency),
            concentrator_timestamp: Set(scheduled.concentrator_timestamp),
            tx_power: Set(radio.as_ref().and_then(|radio| radio.tx_power)),
            invert_polarization: Set(radio.and_then(|radio| radio.invert_polarization)),
            event_time: Set(Some(meta.time.into())),
            ..Default::default()
        };

        DownlinkRepository::new(self.db.as_ref()).insert(row).await?;
        counter!("lorawatch_downlinks_stored_total").increment(1);
        Ok(())
    }

    async fn handle_status(&self, meta: EventMeta, data: StatusData) -> Result<(), PipelineError> {
        let versions = data.versions.unwrap_or_default();
        let metrics = data.metrics.unwrap_or_default();
        let location = data
            .antenna_locations
            .as_ref()
            .and_then(|locations| locations.first());

        let row = gateway_status::ActiveModel {
            gateway_id: Set(meta.gateway_id),
            gateway_eui: Set(meta.gateway_eui),
            status_time: Set(data.time.map(Into::into)),
            boot_time: Set(data.boot_time.map(Into::into)),
            gateway_server_version: Set(versions.get(GATEWAY_SERVER_VERSION_KEY).cloned()),
            fpga_version: Set(versions.get("fpga").cloned()),
            hal_version: Set(versions.get("hal").cloned()),
            latitude: Set(location.and_then(|loc| loc.latitude)),
            longitude: Set(location.and_then(|loc| loc.longitude)),
            altitude: Set(location.and_then(|loc| loc.altitude)),
            source: Set(location.and_then(|loc| loc.source.clone())),
            ip: Set(data.ip.and_then(|addresses| addresses.into_iter().next())),
            txin: Set(metrics.get("txin").copied()),
            txok: Set(metrics.get("txok").copied()),
            lpps: Set(metrics.get("lpps").copied()),
            rxin: Set(metrics.get("rxin").copied()),
            rxok: Set(metrics.get("rxok").copied()),
            rxfw: Set(metrics.get("rxfw").copied()),
            ackr: Set(metrics.get("ackr").copied()),
            event_time: Set(Some(meta.time.into())),
            ..Default::default()
        };

        GatewayStatusRepository::new(self.db.as_ref())
            .insert(row)
            .await?;
        counter!("lorawatch_status_snapshots_stored_total").increment(1);
        Ok(())
    }

    async fn handle_connection_stats(
        &self,
        meta: EventMeta,
        data: ConnectionStatsData,
    ) -> Result<(), PipelineError> {
        let last_status = data.last_status.unwrap_or_default();
        let versions = last_status.versions.unwrap_or_default();
        let metrics = last_status.metrics.unwrap_or_default();
        let location = last_status
            .antenna_locations
            .as_ref()
            .and_then(|locations| locations.first());
        let rtt = data.round_trip_times;

        let row = connection_stats::ActiveModel {
            gateway_id: Set(meta.gateway_id),
            gateway_eui: Set(meta.gateway_eui),
            protocol: Set(data.protocol),
            connected_at: Set(data.connected_at.map(Into::into)),
            last_status_received_at: Set(data.last_status_received_at.map(Into::into)),
            last_status_time: Set(last_status.time.map(Into::into)),
            last_uplink_received_at: Set(data.last_uplink_received_at.map(Into::into)),
            last_downlink_received_at: Set(data.last_downlink_received_at.map(Into::into)),
            boot_time: Set(last_status.boot_time.map(Into::into)),
            gateway_server_version: Set(versions.get(GATEWAY_SERVER_VERSION_KEY).cloned()),
            fpga_version: Set(versions.get("fpga").cloned()),
            hal_version: Set(versions.get("hal").cloned()),
            latitude: Set(location.and_then(|loc| loc.latitude)),
            longitude: Set(location.and_then(|loc| loc.longitude)),
            altitude: Set(location.and_then(|loc| loc.altitude)),
            source: Set(location.and_then(|loc| loc.source.clone())),
            ip: Set(last_status
                .ip
                .and_then(|addresses| addresses.into_iter().next())),
            txin: Set(metrics.get("txin").copied()),
            txok: Set(metrics.get("txok").copied()),
            lpps: Set(metrics.get("lpps").copied()),
            rxin: Set(metrics.get("rxin").copied()),
            rxok: Set(metrics.get("rxok").copied()),
            rxfw: Set(metrics.get("rxfw").copied()),
            ackr: Set(metrics.get("ackr").copied()),
            uplink_count: Set(data.uplink_count),
            downlink_count: Set(data.downlink_count),
            rtt_min: Set(rtt.as_ref().and_then(|rtt| rtt.min.clone())),
            rtt_max: Set(rtt.as_ref().and_then(|rtt| rtt.max.clone())),
            rtt_median: Set(rtt.as_ref().and_then(|rtt| rtt.median.clone())),
            rtt_count: Set(rtt.and_then(|rtt| rtt.count)),
            sub_bands: Set(data.sub_bands.as_deref().map(sub_bands_json)),
            event_time: Set(meta.time.into()),
            ..Default::default()
        };

        ConnectionStatsRepository::new(self.db.as_ref())
            .insert(row)
            .await?;
        counter!("lorawatch_connection_stats_stored_total").increment(1);
        Ok(())
    }
}

/// Flattens the positional sub-band list into one object whose keys carry
/// the list index, preserving the field naming reporting tools expect.
fn sub_bands_json(sub_bands: &[JsonValue]) -> JsonValue {
    let mut map = serde_json::Map::new();
    for (index, band) in sub_bands.iter().enumerate() {
        for (field, key) in [
            ("min_frequency", "min_freq_band"),
            ("max_frequency", "max_freq_band"),
            ("downlink_utilization_limit", "dl_utilization_limit_band"),
            ("downlink_utilization", "dl_utilization_band"),
        ] {
            map.insert(
                format!("{key}_{index}"),
                band.get(field).cloned().unwrap_or(JsonValue::Null),
            );
        }
    }
    JsonValue::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sub_bands_are_keyed_by_position() {
        let bands = vec![
            json!({
                "min_frequency": 100,
                "max_frequency": 200,
                "downlink_utilization_limit": 50,
                "downlink_utilization": 40
            }),
            json!({
                "min_frequency": 300,
                "max_frequency": 400,
                "downlink_utilization_limit": 80,
                "downlink_utilization": 70
            }),
        ];

        let value = sub_bands_json(&bands);
        assert_eq!(value["min_freq_band_0"], 100);
        assert_eq!(value["max_freq_band_0"], 200);
        assert_eq!(value["dl_utilization_limit_band_0"], 50);
        assert_eq!(value["dl_utilization_band_0"], 40);
        assert_eq!(value["min_freq_band_1"], 300);
        assert_eq!(value["max_freq_band_1"], 400);
        assert_eq!(value["dl_utilization_limit_band_1"], 80);
        assert_eq!(value["dl_utilization_band_1"], 70);
    }

    #[test]
    fn absent_sub_band_fields_become_null() {
        let bands = vec![json!({"min_frequency": 100})];
        let value = sub_bands_json(&bands);
        assert_eq!(value["min_freq_band_0"], 100);
        assert_eq!(value["max_freq_band_0"], JsonValue::Null);
    }
}
