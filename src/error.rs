//! # Error Handling
//!
//! Typed error taxonomy for the telemetry pipeline. Each variant family maps
//! to one propagation boundary: decode and calculation failures are dropped
//! per envelope, data-access and process failures propagate to the nearest
//! retry/skip boundary (per envelope in the decoder, per device or gateway
//! per cycle in the scheduler).

use sea_orm::DbErr;
use thiserror::Error;

/// Malformed or unparseable event envelope. Always dropped, never retried.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("envelope below minimum size ({size} bytes)")]
    Undersized { size: usize },

    #[error("envelope is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{event} envelope missing required fields: {source}")]
    Schema {
        event: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("envelope carries no gateway identifiers")]
    MissingGateway,

    #[error("uplink carries no reception metadata")]
    EmptyRxMetadata,

    #[error("raw payload is not valid base64: {0}")]
    Payload(#[from] base64::DecodeError),
}

/// Invalid physical-layer inputs to the time-on-air calculation.
#[derive(Debug, Error)]
#[error("time-on-air inputs must be positive (payload_size={payload_size}, spreading_factor={spreading_factor})")]
pub struct CalculationError {
    pub payload_size: i64,
    pub spreading_factor: i64,
}

/// Store unavailable or a query failed.
#[derive(Debug, Error)]
#[error("database operation failed while {context}: {source}")]
pub struct DataAccessError {
    pub context: &'static str,
    #[source]
    pub source: DbErr,
}

impl DataAccessError {
    pub fn new(context: &'static str, source: DbErr) -> Self {
        Self { context, source }
    }
}

/// Unexpected internal fault; propagated like a data-access failure.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct ProcessError(pub String);

/// Top-level error for pipeline operations that cross component boundaries.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Calculation(#[from] CalculationError),

    #[error(transparent)]
    DataAccess(#[from] DataAccessError),

    #[error(transparent)]
    Process(#[from] ProcessError),
}

/// Shorthand used with `map_err` around SeaORM calls.
pub fn db_err(context: &'static str) -> impl FnOnce(DbErr) -> DataAccessError {
    move |source| DataAccessError::new(context, source)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_error_reports_size() {
        let err = DecodeError::Undersized { size: 42 };
        assert!(err.to_string().contains("42"));
    }

    #[test]
    fn data_access_error_keeps_context() {
        let err = DataAccessError::new(
            "loading uplink frames",
            DbErr::Custom("connection refused".into()),
        );
        let msg = err.to_string();
        assert!(msg.contains("loading uplink frames"));
    }

    #[test]
    fn pipeline_error_converts_from_taxonomy() {
        let err: PipelineError = CalculationError {
            payload_size: 0,
            spreading_factor: 7,
        }
        .into();
        assert!(matches!(err, PipelineError::Calculation(_)));
    }
}
