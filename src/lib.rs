//! # LoRaWatch
//!
//! Telemetry pipeline for a LoRaWAN network: decodes the gateway-server
//! event stream into typed rows, reconciles physical-layer replicas per
//! frame, and aggregates per-device and per-gateway KPIs over rolling time
//! windows.

pub mod airtime;
pub mod config;
pub mod consumer;
pub mod db;
pub mod decoder;
pub mod error;
pub mod freq_plan;
pub mod kpi;
pub mod logging;
pub mod models;
pub mod reconciler;
pub mod repositories;
pub mod resolver;
pub mod scheduler;
pub use migration;
