//! # Uplink Frame Repository
//!
//! Data access for uplink telemetry: inserts from the decoder and the
//! window-scoped scans the KPI pipeline is built on. All window filters are
//! half-open, `received_at_gw >= start AND < end`.

use chrono::{DateTime, Utc};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect,
};

use crate::error::{DataAccessError, db_err};
use crate::kpi::Window;
use crate::models::uplink::{ActiveModel, Column, Entity as UplinkFrame, Model};

/// One identified reception of a frame, as used by sampling-rate and
/// duty-cycle computation.
#[derive(Debug, Clone)]
pub struct FrameObservation {
    pub f_cnt: i64,
    pub received_at_gw: DateTimeWithTimeZone,
    pub airtime_ms: f64,
}

/// Repository for uplink frame database operations.
pub struct UplinkRepository<'a, C: ConnectionTrait> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> UplinkRepository<'a, C> {
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    pub async fn insert(&self, frame: ActiveModel) -> Result<(), DataAccessError> {
        UplinkFrame::insert(frame)
            .exec(self.db)
            .await
            .map_err(db_err("inserting uplink frame"))?;
        Ok(())
    }

    /// Earliest and latest gateway receive timestamps across all telemetry,
    /// or `None` before the first uplink arrives.
    pub async fn arrival_bounds(
        &self,
    ) -> Result<Option<(DateTime<Utc>, DateTime<Utc>)>, DataAccessError> {
        let earliest = UplinkFrame::find()
            .select_only()
            .column(Column::ReceivedAtGw)
            .order_by_asc(Column::ReceivedAtGw)
            .limit(1)
            .into_tuple::<DateTimeWithTimeZone>()
            .one(self.db)
            .await
            .map_err(db_err("loading earliest arrival"))?;

        let Some(earliest) = earliest else {
            return Ok(None);
        };

        let latest = UplinkFrame::find()
            .select_only()
            .column(Column::ReceivedAtGw)
            .order_by_desc(Column::ReceivedAtGw)
            .limit(1)
            .into_tuple::<DateTimeWithTimeZone>()
            .one(self.db)
            .await
            .map_err(db_err("loading latest arrival"))?
            .unwrap_or(earliest);

        Ok(Some((
            earliest.with_timezone(&Utc),
            latest.with_timezone(&Utc),
        )))
    }

    /// Gateway ids, one entry per reception, for every copy of a frame
    /// across all gateways.
    pub async fn gateways_for_frame(
        &self,
        dev_addr: &str,
        f_cnt: i64,
    ) -> Result<Vec<String>, DataAccessError> {
        UplinkFrame::find()
            .select_only()
            .column(Column::GatewayId)
            .filter(Column::DevAddr.eq(dev_addr))
            .filter(Column::FCnt.eq(f_cnt))
            .into_tuple()
            .all(self.db)
            .await
            .map_err(db_err("loading frame replicas"))
    }

    pub async fn frames_for_device_at_gateway(
        &self,
        device_id: &str,
        gateway_id: &str,
        window: &Window,
    ) -> Result<Vec<Model>, DataAccessError> {
        UplinkFrame::find()
            .filter(Column::DeviceId.eq(device_id))
            .filter(Column::GatewayId.eq(gateway_id))
            .filter(Column::ReceivedAtGw.gte(window.start))
            .filter(Column::ReceivedAtGw.lt(window.end))
            .all(self.db)
            .await
            .map_err(db_err("loading device frames at gateway"))
    }

    pub async fn frame_counters_for_device_at_gateway(
        &self,
        device_id: &str,
        gateway_id: &str,
        window: &Window,
    ) -> Result<Vec<i64>, DataAccessError> {
        UplinkFrame::find()
            .select_only()
            .column(Column::FCnt)
            .filter(Column::DeviceId.eq(device_id))
            .filter(Column::GatewayId.eq(gateway_id))
            .filter(Column::FCnt.is_not_null())
            .filter(Column::ReceivedAtGw.gte(window.start))
            .filter(Column::ReceivedAtGw.lt(window.end))
            .into_tuple()
            .all(self.db)
            .await
            .map_err(db_err("loading device frame counters at gateway"))
    }

    /// Counted receptions for a device across all gateways, one entry per
    /// stored row, frames without a counter excluded.
    pub async fn frame_observations_for_device(
        &self,
        device_id: &str,
        window: &Window,
    ) -> Result<Vec<FrameObservation>, DataAccessError> {
        let rows: Vec<(i64, DateTimeWithTimeZone, f64)> = UplinkFrame::find()
            .select_only()
            .column(Column::FCnt)
            .column(Column::ReceivedAtGw)
            .column(Column::ConsumedAirtimeMs)
            .filter(Column::DeviceId.eq(device_id))
            .filter(Column::FCnt.is_not_null())
            .filter(Column::ReceivedAtGw.gte(window.start))
            .filter(Column::ReceivedAtGw.lt(window.end))
            .into_tuple()
            .all(self.db)
            .await
            .map_err(db_err("loading device frame observations"))?;

        Ok(rows
            .into_iter()
            .map(|(f_cnt, received_at_gw, airtime_ms)| FrameObservation {
                f_cnt,
                received_at_gw,
                airtime_ms,
            })
            .collect())
    }

    pub async fn count_for_gateway(
        &self,
        gateway_id: &str,
        window: &Window,
    ) -> Result<u64, DataAccessError> {
        UplinkFrame::find()
            .filter(Column::GatewayId.eq(gateway_id))
            .filter(Column::ReceivedAtGw.gte(window.start))
            .filter(Column::ReceivedAtGw.lt(window.end))
            .count(self.db)
            .await
            .map_err(db_err("counting gateway uplinks"))
    }

    pub async fn airtimes_for_gateway(
        &self,
        gateway_id: &str,
        window: &Window,
    ) -> Result<Vec<f64>, DataAccessError> {
        UplinkFrame::find()
            .select_only()
            .column(Column::ConsumedAirtimeMs)
            .filter(Column::GatewayId.eq(gateway_id))
            .filter(Column::ReceivedAtGw.gte(window.start))
            .filter(Column::ReceivedAtGw.lt(window.end))
            .into_tuple()
            .all(self.db)
            .await
            .map_err(db_err("loading gateway airtimes"))
    }

    /// Arrival timestamps at a gateway in arrival order, for jitter.
    pub async fn arrivals_for_gateway(
        &self,
        gateway_id: &str,
        window: &Window,
    ) -> Result<Vec<DateTimeWithTimeZone>, DataAccessError> {
        UplinkFrame::find()
            .select_only()
            .column(Column::ReceivedAtGw)
            .filter(Column::GatewayId.eq(gateway_id))
            .filter(Column::ReceivedAtGw.gte(window.start))
            .filter(Column::ReceivedAtGw.lt(window.end))
            .order_by_asc(Column::ReceivedAtGw)
            .into_tuple()
            .all(self.db)
            .await
            .map_err(db_err("loading gateway arrival times"))
    }

    /// (dev_addr, device_id, received_at_gw) triples for connected-node
    /// counting, oldest first so later sightings win deduplication.
    pub async fn device_sightings_for_gateway(
        &self,
        gateway_id: &str,
        window: &Window,
    ) -> Result<Vec<(String, Option<String>, DateTimeWithTimeZone)>, DataAccessError> {
        UplinkFrame::find()
            .select_only()
            .column(Column::DevAddr)
            .column(Column::DeviceId)
            .column(Column::ReceivedAtGw)
            .filter(Column::GatewayId.eq(gateway_id))
            .filter(Column::DevAddr.is_not_null())
            .filter(Column::ReceivedAtGw.gte(window.start))
            .filter(Column::ReceivedAtGw.lt(window.end))
            .order_by_asc(Column::ReceivedAtGw)
            .into_tuple()
            .all(self.db)
            .await
            .map_err(db_err("loading gateway device sightings"))
    }
}
