//! Typed event envelopes.
//!
//! The gateway server publishes JSON envelopes whose `result.name` field
//! discriminates the payload shape. Parsing peels the (sometimes
//! double-encoded) JSON, validates the fields each event kind actually
//! requires, and produces one [`GatewayEvent`] variant per discriminant.
//! Genuinely optional sub-objects parse to `None`; missing required fields
//! fail closed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

use crate::error::DecodeError;

/// Envelopes below this size cannot carry a decodable event and are dropped
/// without logging an error.
pub const MIN_ENVELOPE_BYTES: usize = 100;

pub const UPLINK_RECEIVE: &str = "gs.up.receive";
pub const DOWNLINK_SEND: &str = "gs.down.send";
pub const STATUS_RECEIVE: &str = "gs.status.receive";
pub const CONNECTION_STATS: &str = "gs.gateway.connection.stats";

/// Fields shared by every event kind.
#[derive(Debug, Clone)]
pub struct EventMeta {
    pub time: DateTime<Utc>,
    pub gateway_id: String,
    pub gateway_eui: Option<String>,
    pub tenant_id: Option<String>,
    pub unique_id: Option<String>,
}

/// One decoded gateway-server event.
#[derive(Debug)]
pub enum GatewayEvent {
    UplinkReceive {
        meta: EventMeta,
        data: Box<UplinkData>,
    },
    DownlinkSend {
        meta: EventMeta,
        data: DownlinkData,
    },
    StatusReceive {
        meta: EventMeta,
        data: StatusData,
    },
    ConnectionStats {
        meta: EventMeta,
        data: Box<ConnectionStatsData>,
    },
    /// Discriminants the pipeline does not consume.
    Unhandled { name: String },
}

impl GatewayEvent {
    /// Parses one raw envelope. Envelopes may arrive double-encoded (a JSON
    /// string containing JSON); both layers are peeled.
    pub fn parse(raw: &[u8]) -> Result<Self, DecodeError> {
        if raw.len() < MIN_ENVELOPE_BYTES {
            return Err(DecodeError::Undersized { size: raw.len() });
        }

        let value: JsonValue = serde_json::from_slice(raw)?;
        let value = match value {
            // double-encoded: a JSON string containing the envelope
            JsonValue::String(inner) => serde_json::from_str(&inner)?,
            other => other,
        };

        let envelope: RawEnvelope = serde_json::from_value(value)?;
        let RawResult {
            name,
            time,
            identifiers,
            data,
            context,
            unique_id,
        } = envelope.result;

        let gateway = identifiers
            .into_iter()
            .find_map(|identifier| identifier.gateway_ids)
            .ok_or(DecodeError::MissingGateway)?;
        let meta = EventMeta {
            time,
            gateway_id: gateway.gateway_id,
            gateway_eui: gateway.eui,
            tenant_id: context.and_then(|ctx| ctx.tenant_id),
            unique_id,
        };

        let data = data.unwrap_or(JsonValue::Null);
        match name.as_str() {
            UPLINK_RECEIVE => {
                let data: UplinkData = typed_data(&name, data)?;
                if data.message.rx_metadata.is_empty() {
                    return Err(DecodeError::EmptyRxMetadata);
                }
                Ok(GatewayEvent::UplinkReceive {
                    meta,
                    data: Box::new(data),
                })
            }
            DOWNLINK_SEND => Ok(GatewayEvent::DownlinkSend {
                meta,
                data: typed_data(&name, data)?,
            }),
            STATUS_RECEIVE => Ok(GatewayEvent::StatusReceive {
                meta,
                data: typed_data(&name, data)?,
            }),
            CONNECTION_STATS => Ok(GatewayEvent::ConnectionStats {
                meta,
                data: Box::new(typed_data(&name, data)?),
            }),
            _ => Ok(GatewayEvent::Unhandled { name }),
        }
    }
}

fn typed_data<T: serde::de::DeserializeOwned>(
    event: &str,
    data: JsonValue,
) -> Result<T, DecodeError> {
    serde_json::from_value(data).map_err(|source| DecodeError::Schema {
        event: event.to_string(),
        source,
    })
}

#[derive(Debug, Deserialize)]
struct RawEnvelope {
    result: RawResult,
}

#[derive(Debug, Deserialize)]
struct RawResult {
    name: String,
    time: DateTime<Utc>,
    #[serde(default)]
    identifiers: Vec<RawIdentifier>,
    #[serde(default)]
    data: Option<JsonValue>,
    #[serde(default)]
    context: Option<EventContext>,
    #[serde(default)]
    unique_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawIdentifier {
    #[serde(default)]
    gateway_ids: Option<GatewayIds>,
}

#[derive(Debug, Clone, Deserialize)]
struct GatewayIds {
    gateway_id: String,
    #[serde(default)]
    eui: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct EventContext {
    #[serde(rename = "tenant-id", default)]
    tenant_id: Option<String>,
}

// ---- gs.up.receive -------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct UplinkData {
    pub message: UplinkMessage,
}

#[derive(Debug, Deserialize)]
pub struct UplinkMessage {
    /// Base64 PHY payload; required, its size feeds the airtime calculation
    pub raw_payload: String,
    #[serde(default)]
    pub payload: Option<LoraFramePayload>,
    pub settings: TxSettings,
    /// A gateway may report several reception contexts; only the first is
    /// used downstream
    #[serde(default)]
    pub rx_metadata: Vec<RxMetadata>,
    #[serde(default)]
    pub received_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct LoraFramePayload {
    #[serde(default)]
    pub m_hdr: Option<MacHeader>,
    #[serde(default)]
    pub mac_payload: Option<MacPayload>,
    #[serde(default)]
    pub join_request_payload: Option<JoinRequestPayload>,
}

#[derive(Debug, Deserialize)]
pub struct MacHeader {
    #[serde(default)]
    pub m_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MacPayload {
    #[serde(default)]
    pub f_hdr: Option<FrameHeader>,
    #[serde(default)]
    pub f_port: Option<i32>,
    #[serde(default)]
    pub frm_payload: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FrameHeader {
    #[serde(default)]
    pub dev_addr: Option<String>,
    #[serde(default)]
    pub f_ctrl: Option<FrameControl>,
    /// Absent on the wire when the counter is zero
    #[serde(default)]
    pub f_cnt: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct FrameControl {
    #[serde(default)]
    pub adr: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct JoinRequestPayload {
    #[serde(default)]
    pub join_eui: Option<String>,
    #[serde(default)]
    pub dev_eui: Option<String>,
    #[serde(default)]
    pub dev_nonce: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TxSettings {
    pub data_rate: UplinkDataRate,
    #[serde(default)]
    pub frequency: Option<String>,
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub time: Option<DateTime<Utc>>,
}

/// Uplinks must carry a LoRa data rate; the airtime formula has no meaning
/// without a spreading factor.
#[derive(Debug, Deserialize)]
pub struct UplinkDataRate {
    pub lora: LoraDataRate,
}

#[derive(Debug, Deserialize)]
pub struct LoraDataRate {
    pub spreading_factor: i32,
    #[serde(default)]
    pub bandwidth: Option<i64>,
    #[serde(default)]
    pub coding_rate: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RxMetadata {
    #[serde(default)]
    pub rssi: Option<f64>,
    #[serde(default)]
    pub channel_rssi: Option<f64>,
    #[serde(default)]
    pub snr: Option<f64>,
    #[serde(default)]
    pub channel_index: Option<i32>,
    #[serde(default)]
    pub gps_time: Option<String>,
    /// Gateway receive timestamp; every KPI window filters on it
    pub received_at: DateTime<Utc>,
}

// ---- gs.down.send --------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct DownlinkData {
    #[serde(default)]
    pub raw_payload: Option<String>,
    pub scheduled: ScheduledTx,
}

#[derive(Debug, Deserialize)]
pub struct ScheduledTx {
    #[serde(default)]
    pub data_rate: Option<DownlinkDataRate>,
    #[serde(default)]
    pub frequency: Option<String>,
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub concentrator_timestamp: Option<i64>,
    #[serde(default)]
    pub downlink: Option<DownlinkRadio>,
}

#[derive(Debug, Deserialize)]
pub struct DownlinkDataRate {
    #[serde(default)]
    pub lora: Option<LoraDataRate>,
}

#[derive(Debug, Deserialize)]
pub struct DownlinkRadio {
    #[serde(default)]
    pub tx_power: Option<f64>,
    #[serde(default)]
    pub invert_polarization: Option<bool>,
}

// ---- gs.status.receive ---------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub struct StatusData {
    #[serde(default)]
    pub time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub boot_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub versions: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub antenna_locations: Option<Vec<AntennaLocation>>,
    #[serde(default)]
    pub ip: Option<Vec<String>>,
    #[serde(default)]
    pub metrics: Option<BTreeMap<String, f64>>,
}

#[derive(Debug, Deserialize)]
pub struct AntennaLocation {
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub altitude: Option<f64>,
    #[serde(default)]
    pub source: Option<String>,
}

// ---- gs.gateway.connection.stats -----------------------------------------

#[derive(Debug, Deserialize)]
pub struct ConnectionStatsData {
    #[serde(default)]
    pub connected_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub protocol: Option<String>,
    #[serde(default)]
    pub last_status_received_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_status: Option<StatusData>,
    #[serde(default)]
    pub last_uplink_received_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_downlink_received_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub round_trip_times: Option<RoundTripTimes>,
    /// Per-sub-band duty-cycle summaries, significant by list position
    #[serde(default)]
    pub sub_bands: Option<Vec<JsonValue>>,
    #[serde(default, deserialize_with = "de_opt_count")]
    pub uplink_count: Option<i64>,
    #[serde(default, deserialize_with = "de_opt_count")]
    pub downlink_count: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct RoundTripTimes {
    #[serde(default)]
    pub min: Option<String>,
    #[serde(default)]
    pub max: Option<String>,
    #[serde(default)]
    pub median: Option<String>,
    #[serde(default, deserialize_with = "de_opt_count")]
    pub count: Option<i64>,
}

/// Counters arrive either as JSON numbers or as decimal strings (the wire
/// format renders 64-bit integers as strings).
fn de_opt_count<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<JsonValue>::deserialize(deserializer)?;
    match value {
        None | Some(JsonValue::Null) => Ok(None),
        Some(JsonValue::Number(n)) => Ok(n.as_i64()),
        Some(JsonValue::String(s)) => s
            .parse()
            .map(Some)
            .map_err(|err| serde::de::Error::custom(format!("invalid count `{s}`: {err}"))),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected count, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn uplink_envelope() -> JsonValue {
        json!({
            "result": {
                "name": "gs.up.receive",
                "time": "2025-04-02T09:30:00.123456Z",
                "identifiers": [{"gateway_ids": {"gateway_id": "gw-hall-1", "eui": "58A0CBFFFE800001"}}],
                "data": {
                    "message": {
                        "raw_payload": "QAMCAQGAAAABlq2o1w==",
                        "payload": {
                            "m_hdr": {"m_type": "UNCONFIRMED_UP"},
                            "mac_payload": {
                                "f_hdr": {
                                    "dev_addr": "01020304",
                                    "f_ctrl": {"adr": true},
                                    "f_cnt": 42
                                },
                                "f_port": 1,
                                "frm_payload": "lq2o1w=="
                            }
                        },
                        "settings": {
                            "data_rate": {"lora": {"bandwidth": 125000, "spreading_factor": 7, "coding_rate": "4/5"}},
                            "frequency": "868100000",
                            "timestamp": 3977834600u32
                        },
                        "rx_metadata": [{
                            "rssi": -42.0,
                            "channel_rssi": -42.5,
                            "snr": 9.25,
                            "channel_index": 2,
                            "received_at": "2025-04-02T09:30:00.100Z"
                        }],
                        "received_at": "2025-04-02T09:30:00.200Z"
                    }
                },
                "context": {"tenant-id": "campus"},
                "unique_id": "01HXYZ"
            }
        })
    }

    #[test]
    fn parses_uplink_envelope() {
        let raw = uplink_envelope().to_string();
        let event = GatewayEvent::parse(raw.as_bytes()).expect("uplink parses");
        let GatewayEvent::UplinkReceive { meta, data } = event else {
            panic!("expected uplink event");
        };
        assert_eq!(meta.gateway_id, "gw-hall-1");
        assert_eq!(meta.tenant_id.as_deref(), Some("campus"));

        let message = &data.message;
        assert_eq!(message.settings.data_rate.lora.spreading_factor, 7);
        assert_eq!(message.rx_metadata[0].snr, Some(9.25));
        let frame = message
            .payload
            .as_ref()
            .and_then(|p| p.mac_payload.as_ref())
            .and_then(|m| m.f_hdr.as_ref())
            .expect("frame header present");
        assert_eq!(frame.dev_addr.as_deref(), Some("01020304"));
        assert_eq!(frame.f_cnt, Some(42));
    }

    #[test]
    fn parses_double_encoded_envelope() {
        let inner = uplink_envelope().to_string();
        let raw = serde_json::to_string(&inner).unwrap();
        let event = GatewayEvent::parse(raw.as_bytes()).expect("double-encoded parses");
        assert!(matches!(event, GatewayEvent::UplinkReceive { .. }));
    }

    #[test]
    fn undersized_envelope_is_rejected() {
        let err = GatewayEvent::parse(b"{}").unwrap_err();
        assert!(matches!(err, DecodeError::Undersized { size: 2 }));
    }

    #[test]
    fn uplink_without_settings_fails_closed() {
        let mut envelope = uplink_envelope();
        envelope["result"]["data"]["message"]
            .as_object_mut()
            .unwrap()
            .remove("settings");
        let err = GatewayEvent::parse(envelope.to_string().as_bytes()).unwrap_err();
        assert!(matches!(err, DecodeError::Schema { .. }));
    }

    #[test]
    fn uplink_without_rx_metadata_is_rejected() {
        let mut envelope = uplink_envelope();
        envelope["result"]["data"]["message"]["rx_metadata"] = json!([]);
        let err = GatewayEvent::parse(envelope.to_string().as_bytes()).unwrap_err();
        assert!(matches!(err, DecodeError::EmptyRxMetadata));
    }

    #[test]
    fn unknown_discriminant_is_unhandled() {
        let envelope = json!({
            "result": {
                "name": "gs.txack.receive",
                "time": "2025-04-02T09:30:00Z",
                "identifiers": [{"gateway_ids": {"gateway_id": "gw-hall-1"}}],
                "data": {"some": "payload", "padding": "xxxxxxxxxxxxxxxxxxxxxxxx"}
            }
        });
        let event = GatewayEvent::parse(envelope.to_string().as_bytes()).unwrap();
        let GatewayEvent::Unhandled { name } = event else {
            panic!("expected unhandled event");
        };
        assert_eq!(name, "gs.txack.receive");
    }

    #[test]
    fn connection_stats_counts_accept_strings_and_numbers() {
        let envelope = json!({
            "result": {
                "name": "gs.gateway.connection.stats",
                "time": "2025-04-02T09:30:00Z",
                "identifiers": [{"gateway_ids": {"gateway_id": "gw-hall-1"}}],
                "data": {
                    "connected_at": "2025-04-02T08:00:00Z",
                    "protocol": "udp",
                    "uplink_count": "12345",
                    "downlink_count": 67,
                    "round_trip_times": {"min": "0.021s", "max": "0.084s", "median": "0.030s", "count": "20"},
                    "sub_bands": [{"min_frequency": "863000000", "max_frequency": "865000000", "downlink_utilization_limit": 0.001}]
                }
            }
        });
        let event = GatewayEvent::parse(envelope.to_string().as_bytes()).unwrap();
        let GatewayEvent::ConnectionStats { data, .. } = event else {
            panic!("expected connection stats event");
        };
        assert_eq!(data.uplink_count, Some(12345));
        assert_eq!(data.downlink_count, Some(67));
        assert_eq!(data.round_trip_times.as_ref().unwrap().count, Some(20));
        assert_eq!(data.sub_bands.as_ref().unwrap().len(), 1);
    }
}
