//! Event consumption.
//!
//! [`EventSource`] is the transport seam: the queue/broker binding lives
//! outside this crate and only has to yield raw envelope bytes. The consumer
//! fans every envelope into a bounded worker pool; workers decode and
//! persist independently and share no state beyond the store. Failures are
//! logged and dropped per envelope, so one bad message never stalls the
//! stream. Sources are expected to redeliver on crash; replayed envelopes
//! are absorbed by the idempotent replica reconciler.

use std::sync::Arc;

use async_trait::async_trait;
use metrics::{counter, histogram};
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::DecoderConfig;
use crate::decoder::TelemetryDecoder;
use crate::error::{DecodeError, PipelineError, ProcessError};

/// A stream of raw event envelopes.
#[async_trait]
pub trait EventSource: Send {
    /// Next raw envelope, or `None` when the stream ends.
    async fn recv(&mut self) -> Result<Option<Vec<u8>>, ProcessError>;
}

/// Newline-delimited JSON file source. Serves as the dev/ops transport and
/// as the fixture loader in tests; production deployments bind a broker
/// source instead.
pub struct NdjsonFileSource {
    lines: Lines<BufReader<File>>,
}

impl NdjsonFileSource {
    pub async fn open(path: &str) -> Result<Self, ProcessError> {
        let file = File::open(path)
            .await
            .map_err(|err| ProcessError(format!("failed to open event stream {path}: {err}")))?;
        Ok(Self {
            lines: BufReader::new(file).lines(),
        })
    }
}

#[async_trait]
impl EventSource for NdjsonFileSource {
    async fn recv(&mut self) -> Result<Option<Vec<u8>>, ProcessError> {
        let line = self
            .lines
            .next_line()
            .await
            .map_err(|err| ProcessError(format!("failed to read event stream: {err}")))?;
        Ok(line.map(String::into_bytes))
    }
}

/// Message-consuming loop over one event source.
pub struct EventConsumer {
    decoder: Arc<TelemetryDecoder>,
    worker_pool_size: usize,
}

impl EventConsumer {
    pub fn new(decoder: Arc<TelemetryDecoder>, config: &DecoderConfig) -> Self {
        Self {
            decoder,
            worker_pool_size: config.worker_pool_size.max(1),
        }
    }

    /// Consumes the source until it ends or shutdown fires. Each envelope
    /// is handled by one worker; the semaphore bounds how many run at once.
    pub async fn run<S: EventSource>(
        &self,
        mut source: S,
        shutdown: CancellationToken,
    ) -> Result<(), PipelineError> {
        info!(workers = self.worker_pool_size, "Starting telemetry consumer");
        let semaphore = Arc::new(Semaphore::new(self.worker_pool_size));
        let mut workers = JoinSet::new();

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Telemetry consumer shutdown requested");
                    break;
                }
                next = source.recv() => {
                    match next {
                        Ok(Some(raw)) => {
                            let permit = semaphore
                                .clone()
                                .acquire_owned()
                                .await
                                .map_err(|_| ProcessError("worker pool semaphore closed".to_string()))?;
                            let decoder = self.decoder.clone();
                            workers.spawn(async move {
                                let _permit = permit;
                                handle_envelope(&decoder, &raw).await;
                            });
                            while workers.try_join_next().is_some() {}
                        }
                        Ok(None) => {
                            info!("Event source ended");
                            break;
                        }
                        Err(err) => {
                            error!(error = %err, "Event source failed");
                            return Err(err.into());
                        }
                    }
                }
            }
        }

        while workers.join_next().await.is_some() {}
        info!("Telemetry consumer stopped");
        Ok(())
    }
}

async fn handle_envelope(decoder: &TelemetryDecoder, raw: &[u8]) {
    let started = std::time::Instant::now();
    match decoder.handle(raw).await {
        Ok(()) => {
            counter!("lorawatch_envelopes_consumed_total").increment(1);
        }
        Err(PipelineError::Decode(DecodeError::Undersized { .. })) => {
            // below the minimum envelope size; not worth a log line
            counter!("lorawatch_envelopes_dropped_total", "reason" => "undersized").increment(1);
        }
        Err(err) => {
            warn!(error = %err, "Dropping envelope");
            counter!("lorawatch_envelopes_dropped_total", "reason" => "error").increment(1);
        }
    }
    histogram!("lorawatch_decode_duration_ms").record(started.elapsed().as_secs_f64() * 1_000.0);
}
