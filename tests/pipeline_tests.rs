//! End-to-end tests for the telemetry decode path: envelope in, typed rows
//! and replica counters out, against an in-memory store with the real
//! migrations applied.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use migration::{Migrator, MigratorTrait};
use sea_orm::{Database, DatabaseConnection, EntityTrait};
use serde_json::json;
use tokio_util::sync::CancellationToken;

use lorawatch::config::DecoderConfig;
use lorawatch::consumer::{EventConsumer, EventSource, NdjsonFileSource};
use lorawatch::decoder::TelemetryDecoder;
use lorawatch::error::ProcessError;
use lorawatch::models::{
    DownlinkFrame, GatewayConnectionStats, GatewayStatusSnapshot, UplinkFrame,
};
use lorawatch::repositories::{RelationRepository, ReplicaRepository};

/// 20 zero bytes, the payload used throughout these tests.
const RAW_PAYLOAD: &str = "AAAAAAAAAAAAAAAAAAAAAAAAAAA=";

async fn test_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("create in-memory db");
    Migrator::up(&db, None).await.expect("apply migrations");
    db
}

fn decoder(db: &DatabaseConnection) -> TelemetryDecoder {
    TelemetryDecoder::new(Arc::new(db.clone()), &DecoderConfig::default())
}

fn uplink_envelope(gateway_id: &str, dev_addr: &str, f_cnt: i64, received_at: &str) -> Vec<u8> {
    json!({
        "result": {
            "name": "gs.up.receive",
            "time": received_at,
            "identifiers": [{"gateway_ids": {"gateway_id": gateway_id, "eui": "58A0CBFFFE800001"}}],
            "data": {
                "message": {
                    "raw_payload": RAW_PAYLOAD,
                    "payload": {
                        "m_hdr": {"m_type": "UNCONFIRMED_UP"},
                        "mac_payload": {
                            "f_hdr": {
                                "dev_addr": dev_addr,
                                "f_ctrl": {"adr": true},
                                "f_cnt": f_cnt
                            },
                            "f_port": 1,
                            "frm_payload": "lq2o1w=="
                        }
                    },
                    "settings": {
                        "data_rate": {"lora": {"bandwidth": 125000, "spreading_factor": 7, "coding_rate": "4/5"}},
                        "frequency": "868100000"
                    },
                    "rx_metadata": [{
                        "rssi": -42.0,
                        "channel_rssi": -42.5,
                        "snr": 9.25,
                        "channel_index": 2,
                        "received_at": received_at
                    }],
                    "received_at": received_at
                }
            },
            "context": {"tenant-id": "campus"},
            "unique_id": "01HXYZ"
        }
    })
    .to_string()
    .into_bytes()
}

#[tokio::test]
async fn uplink_envelope_becomes_a_frame_row_with_counters() {
    let db = test_db().await;
    let decoder = decoder(&db);

    decoder
        .handle(&uplink_envelope("gw-a", "01020304", 42, "2025-04-02T09:30:00Z"))
        .await
        .expect("uplink decodes");

    let frames = UplinkFrame::find().all(&db).await.unwrap();
    assert_eq!(frames.len(), 1);
    let frame = &frames[0];
    assert_eq!(frame.gateway_id, "gw-a");
    assert_eq!(frame.dev_addr.as_deref(), Some("01020304"));
    assert_eq!(frame.f_cnt, Some(42));
    assert_eq!(frame.payload_size, 20);
    assert_eq!(frame.spreading_factor, 7);
    assert!((frame.consumed_airtime_ms - 56.576).abs() < 1e-9);
    assert_eq!(frame.snr, Some(9.25));
    assert_eq!(frame.device_id, None, "no relation recorded yet");

    let counter = ReplicaRepository::new(&db)
        .find_by_frame("01020304", 42)
        .await
        .unwrap()
        .expect("replica counter written");
    assert_eq!(counter.tot_rx_replica, 1);
    assert_eq!(counter.num_gateways, 1);
    assert_eq!(counter.num_rx_replica, 1);
    assert_eq!(counter.tot_loss_replica, 2);
}

#[tokio::test]
async fn replica_counters_are_order_independent() {
    let receptions = [
        ("gw-a", "2025-04-02T09:30:00.100Z"),
        ("gw-a", "2025-04-02T09:30:00.150Z"),
        ("gw-b", "2025-04-02T09:30:00.120Z"),
        ("gw-b", "2025-04-02T09:30:00.180Z"),
    ];

    let mut counters = Vec::new();
    for order in [[0, 1, 2, 3], [3, 2, 1, 0]] {
        let db = test_db().await;
        let decoder = decoder(&db);
        for index in order {
            let (gateway, received_at) = receptions[index];
            decoder
                .handle(&uplink_envelope(gateway, "01020304", 7, received_at))
                .await
                .expect("uplink decodes");
        }
        let counter = ReplicaRepository::new(&db)
            .find_by_frame("01020304", 7)
            .await
            .unwrap()
            .expect("replica counter written");
        counters.push((
            counter.num_rx_replica,
            counter.tot_rx_replica,
            counter.tot_loss_replica,
            counter.num_gateways,
        ));
    }

    assert_eq!(counters[0], counters[1]);
    // two gateways, four copies: 2 * 3 - 4 = 2 lost
    assert_eq!(counters[0], (2, 4, 2, 2));
}

#[tokio::test]
async fn resolution_picks_the_closest_frame_counter() {
    let db = test_db().await;
    let relations = RelationRepository::new(&db);
    relations
        .upsert("01020304", "gw-a", "sensor-recent", None, 100)
        .await
        .unwrap();
    relations
        .upsert("01020304", "gw-a", "sensor-stale", None, 9000)
        .await
        .unwrap();

    decoder(&db)
        .handle(&uplink_envelope("gw-a", "01020304", 105, "2025-04-02T09:30:00Z"))
        .await
        .expect("uplink decodes");

    let frames = UplinkFrame::find().all(&db).await.unwrap();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].device_id.as_deref(), Some("sensor-recent"));
}

#[tokio::test]
async fn status_and_connection_stats_envelopes_persist() {
    let db = test_db().await;
    let decoder = decoder(&db);

    let status = json!({
        "result": {
            "name": "gs.status.receive",
            "time": "2025-04-02T09:30:00Z",
            "identifiers": [{"gateway_ids": {"gateway_id": "gw-a", "eui": "58A0CBFFFE800001"}}],
            "data": {
                "versions": {"ttn-lw-gateway-server": "3.30.1", "hal": "5.0.1"},
                "antenna_locations": [{"latitude": 46.52, "longitude": 6.63, "altitude": 420.0, "source": "SOURCE_REGISTRY"}],
                "ip": ["10.0.0.7"],
                "metrics": {"rxin": 1200.0, "rxok": 1180.0, "ackr": 100.0}
            }
        }
    });
    decoder
        .handle(status.to_string().as_bytes())
        .await
        .expect("status decodes");

    let snapshots = GatewayStatusSnapshot::find().all(&db).await.unwrap();
    assert_eq!(snapshots.len(), 1);
    assert_eq!(snapshots[0].gateway_server_version.as_deref(), Some("3.30.1"));
    assert_eq!(snapshots[0].latitude, Some(46.52));
    assert_eq!(snapshots[0].rxok, Some(1180.0));
    assert_eq!(snapshots[0].fpga_version, None);

    let stats = json!({
        "result": {
            "name": "gs.gateway.connection.stats",
            "time": "2025-04-02T09:31:00Z",
            "identifiers": [{"gateway_ids": {"gateway_id": "gw-a"}}],
            "data": {
                "connected_at": "2025-04-02T08:00:00Z",
                "protocol": "udp",
                "last_status": {"versions": {"ttn-lw-gateway-server": "3.30.1"}},
                "uplink_count": "321",
                "round_trip_times": {"min": "0.021s", "max": "0.084s", "median": "0.030s", "count": 20},
                "sub_bands": [{"min_frequency": "863000000", "max_frequency": "865000000", "downlink_utilization_limit": 0.001, "downlink_utilization": 0.0002}]
            }
        }
    });
    decoder
        .handle(stats.to_string().as_bytes())
        .await
        .expect("connection stats decode");

    let rows = GatewayConnectionStats::find().all(&db).await.unwrap();
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row.protocol.as_deref(), Some("udp"));
    assert_eq!(row.uplink_count, Some(321));
    assert_eq!(row.rtt_median.as_deref(), Some("0.030s"));
    let sub_bands = row.sub_bands.as_ref().expect("sub bands stored");
    assert_eq!(sub_bands["min_freq_band_0"], "863000000");
    assert_eq!(sub_bands["dl_utilization_band_0"], 0.0002);
}

#[tokio::test]
async fn downlink_envelope_persists_scheduled_parameters() {
    let db = test_db().await;

    let envelope = json!({
        "result": {
            "name": "gs.down.send",
            "time": "2025-04-02T09:32:00Z",
            "identifiers": [{"gateway_ids": {"gateway_id": "gw-a"}}],
            "data": {
                "raw_payload": "YDEyMzQ1Ng==",
                "scheduled": {
                    "data_rate": {"lora": {"bandwidth": 125000, "spreading_factor": 9, "coding_rate": "4/5"}},
                    "frequency": "869525000",
                    "concentrator_timestamp": 91827364,
                    "downlink": {"tx_power": 16.15, "invert_polarization": true}
                }
            }
        }
    });
    decoder(&db)
        .handle(envelope.to_string().as_bytes())
        .await
        .expect("downlink decodes");

    let frames = DownlinkFrame::find().all(&db).await.unwrap();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].spreading_factor, Some(9));
    assert_eq!(frames[0].tx_power, Some(16.15));
    assert_eq!(frames[0].invert_polarization, Some(true));
}

struct VecSource(VecDeque<Vec<u8>>);

#[async_trait]
impl EventSource for VecSource {
    async fn recv(&mut self) -> Result<Option<Vec<u8>>, ProcessError> {
        Ok(self.0.pop_front())
    }
}

#[tokio::test]
async fn consumer_survives_malformed_envelopes() {
    let db = test_db().await;
    let decoder = Arc::new(TelemetryDecoder::new(
        Arc::new(db.clone()),
        &DecoderConfig::default(),
    ));
    let consumer = EventConsumer::new(decoder, &DecoderConfig::default());

    let envelopes: VecDeque<Vec<u8>> = VecDeque::from(vec![
        uplink_envelope("gw-a", "01020304", 1, "2025-04-02T09:30:00Z"),
        b"too short".to_vec(),
        vec![b'x'; 256],
        uplink_envelope("gw-a", "01020304", 2, "2025-04-02T09:31:00Z"),
    ]);

    consumer
        .run(VecSource(envelopes), CancellationToken::new())
        .await
        .expect("consumer drains the source");

    let frames = UplinkFrame::find().all(&db).await.unwrap();
    assert_eq!(frames.len(), 2, "both valid envelopes stored, bad ones dropped");
}

#[tokio::test]
async fn ndjson_file_source_feeds_the_consumer() {
    use std::io::Write;

    let mut file = tempfile::NamedTempFile::new().expect("create temp file");
    file.write_all(&uplink_envelope("gw-a", "01020304", 1, "2025-04-02T09:30:00Z"))
        .unwrap();
    file.write_all(b"\n\n").unwrap();
    file.write_all(&uplink_envelope("gw-b", "01020304", 1, "2025-04-02T09:30:00.050Z"))
        .unwrap();
    file.write_all(b"\n").unwrap();
    file.flush().unwrap();

    let db = test_db().await;
    let decoder = Arc::new(TelemetryDecoder::new(
        Arc::new(db.clone()),
        &DecoderConfig::default(),
    ));
    let consumer = EventConsumer::new(decoder, &DecoderConfig::default());
    let source = NdjsonFileSource::open(file.path().to_str().unwrap())
        .await
        .expect("open event stream");

    consumer
        .run(source, CancellationToken::new())
        .await
        .expect("consumer drains the file");

    let frames = UplinkFrame::find().all(&db).await.unwrap();
    assert_eq!(frames.len(), 2, "the blank line is dropped as undersized");

    // both gateways saw frame 1, so the counter reflects the pair
    let counter = ReplicaRepository::new(&db)
        .find_by_frame("01020304", 1)
        .await
        .unwrap()
        .expect("replica counter written");
    assert_eq!(counter.num_gateways, 2);
    assert_eq!(counter.tot_rx_replica, 2);
}
