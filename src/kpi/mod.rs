//! # KPI Computation
//!
//! Pure arithmetic ([`stats`], [`loss`]) plus the window-scoped
//! device and gateway calculations the scheduler drives. Everything here is
//! generic over the SeaORM connection so one aggregation cycle can run
//! inside a single transaction.

pub mod device;
pub mod gateway;
pub mod loss;
pub mod stats;

use chrono::{DateTime, Utc};

pub use device::{DeviceKpi, compute_device_kpis};
pub use gateway::{GatewayKpi, compute_gateway_kpis};
pub use loss::{PacketLossSummary, packet_loss};

/// Half-open aggregation window `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Window {
    pub fn duration_ms(&self) -> f64 {
        (self.end - self.start).num_milliseconds() as f64
    }

    pub fn duration_seconds(&self) -> f64 {
        self.duration_ms() / 1000.0
    }
}
