//! # Data Models
//!
//! SeaORM entities for every table the pipeline owns: raw telemetry rows,
//! replica counters, identity relations, KPI outputs and scheduler state.

pub mod checkpoint;
pub mod connection_stats;
pub mod device_relation;
pub mod downlink;
pub mod end_device_kpi;
pub mod gateway_kpi;
pub mod gateway_status;
pub mod monitored_gateway;
pub mod replica_counter;
pub mod uplink;

pub use checkpoint::Entity as AggregationCheckpoint;
pub use connection_stats::Entity as GatewayConnectionStats;
pub use device_relation::Entity as DeviceGatewayRelation;
pub use downlink::Entity as DownlinkFrame;
pub use end_device_kpi::Entity as EndDeviceKpi;
pub use gateway_kpi::Entity as GatewayKpi;
pub use gateway_status::Entity as GatewayStatusSnapshot;
pub use monitored_gateway::Entity as MonitoredGateway;
pub use replica_counter::Entity as ReplicaCounter;
pub use uplink::Entity as UplinkFrame;
