//! # Repository Layer
//!
//! Repositories encapsulate SeaORM operations per entity. They are generic
//! over [`sea_orm::ConnectionTrait`] so the same query code runs against the
//! pool (decoder path) or inside a cycle transaction (scheduler path).

pub mod checkpoint;
pub mod connection_stats;
pub mod downlink;
pub mod gateway_status;
pub mod kpi;
pub mod monitored_gateway;
pub mod relation;
pub mod replica;
pub mod uplink;

pub use checkpoint::CheckpointRepository;
pub use connection_stats::ConnectionStatsRepository;
pub use downlink::DownlinkRepository;
pub use gateway_status::GatewayStatusRepository;
pub use kpi::KpiRepository;
pub use monitored_gateway::MonitoredGatewayRepository;
pub use relation::RelationRepository;
pub use replica::ReplicaRepository;
pub use uplink::UplinkRepository;
