//! Stream driver
//!
//! Pulls micro-batches from an [`EventSource`], runs them through the matcher
//! one at a time, and publishes its lifecycle through a [`StatusHandle`].
//!
//! ```text
//! Initializing -> Subscribed -> AwaitingBatch <-> ProcessingBatch -> Terminated
//!        \______________\______________\_______________\_________-> Failed
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{mpsc, RwLock};
use tracing::Instrument;
use uuid::Uuid;

use crate::{
    context::PipelineContext,
    error::{AppError, AppResult},
    models::{BatchReport, MicroBatch},
    services::{event_source::EventSource, matcher::process_batch},
};

/// Lifecycle state of the stream driver
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DriverState {
    Initializing,
    Subscribed,
    AwaitingBatch,
    ProcessingBatch,
    Terminated,
    Failed,
}

impl DriverState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, DriverState::Terminated | DriverState::Failed)
    }
}

/// Snapshot of the driver's progress
#[derive(Debug, Clone, Serialize)]
pub struct DriverStatus {
    pub run_id: Uuid,
    pub state: DriverState,
    pub started_at: DateTime<Utc>,
    pub batches_processed: u64,
    pub events_processed: u64,
    pub events_dropped: u64,
    pub matches_emitted: u64,
    pub last_batch_id: Option<u64>,
    pub last_batch_at: Option<DateTime<Utc>>,
    pub failure: Option<String>,
}

/// Shared, read-mostly view of the driver status
#[derive(Clone)]
pub struct StatusHandle {
    inner: Arc<RwLock<DriverStatus>>,
}

impl Default for StatusHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusHandle {
    /// Creates a status in the `Initializing` state with a fresh run id
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(DriverStatus {
                run_id: Uuid::new_v4(),
                state: DriverState::Initializing,
                started_at: Utc::now(),
                batches_processed: 0,
                events_processed: 0,
                events_dropped: 0,
                matches_emitted: 0,
                last_batch_id: None,
                last_batch_at: None,
                failure: None,
            })),
        }
    }

    pub async fn snapshot(&self) -> DriverStatus {
        self.inner.read().await.clone()
    }

    pub async fn state(&self) -> DriverState {
        self.inner.read().await.state
    }

    pub async fn run_id(&self) -> Uuid {
        self.inner.read().await.run_id
    }

    /// Moves to `state` unless a terminal state was already reached
    pub async fn transition(&self, state: DriverState) {
        let mut status = self.inner.write().await;
        if status.state.is_terminal() {
            return;
        }
        tracing::debug!(from = ?status.state, to = ?state, "Driver state change");
        status.state = state;
    }

    pub async fn fail(&self, reason: impl Into<String>) {
        let mut status = self.inner.write().await;
        if status.state.is_terminal() {
            return;
        }
        status.state = DriverState::Failed;
        status.failure = Some(reason.into());
    }

    async fn record_batch(&self, report: &BatchReport) {
        let mut status = self.inner.write().await;
        status.batches_processed += 1;
        status.events_processed += report.events as u64;
        status.events_dropped += report.dropped as u64;
        status.matches_emitted += report.matches as u64;
        status.last_batch_id = Some(report.batch_id);
        status.last_batch_at = Some(Utc::now());
    }
}

/// Handle for stopping a running driver
pub struct DriverHandle {
    shutdown_tx: mpsc::Sender<()>,
}

impl DriverHandle {
    /// Asks the driver to stop once the batch in progress, if any, has completed
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(()).await;
        tracing::info!("Driver shutdown signal sent");
    }
}

/// Runs the micro-batch loop over one event source
pub struct StreamDriver {
    ctx: PipelineContext,
    source: Box<dyn EventSource>,
    status: StatusHandle,
    shutdown_rx: mpsc::Receiver<()>,
    /// Cleared once every [`DriverHandle`] is gone
    shutdown_open: bool,
    next_batch_id: u64,
}

impl StreamDriver {
    pub fn new(
        ctx: PipelineContext,
        source: Box<dyn EventSource>,
        status: StatusHandle,
    ) -> (Self, DriverHandle) {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let driver = Self {
            ctx,
            source,
            status,
            shutdown_rx,
            shutdown_open: true,
            next_batch_id: 0,
        };
        (driver, DriverHandle { shutdown_tx })
    }

    pub fn status(&self) -> StatusHandle {
        self.status.clone()
    }

    /// Runs until shut down, the source is exhausted, or an error occurs.
    ///
    /// Any error leaves the status in `Failed` and is returned to the caller.
    pub async fn run(mut self) -> AppResult<()> {
        let run_id = self.status.run_id().await;
        let span = tracing::info_span!("stream_driver", %run_id, source = self.source.name());

        async move {
            let status = self.status.clone();
            match self.run_loop().await {
                Ok(()) => {
                    status.transition(DriverState::Terminated).await;
                    tracing::info!("Stream driver terminated");
                    Ok(())
                }
                Err(e) => {
                    tracing::error!(error = %e, "Stream driver failed");
                    status.fail(e.to_string()).await;
                    Err(e)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn run_loop(&mut self) -> AppResult<()> {
        self.source.subscribe().await?;
        self.status.transition(DriverState::Subscribed).await;
        tracing::info!(catalog_entries = self.ctx.catalog.len(), "Stream driver subscribed");

        loop {
            self.status.transition(DriverState::AwaitingBatch).await;

            let messages = tokio::select! {
                signal = self.shutdown_rx.recv(), if self.shutdown_open => match signal {
                    Some(()) => {
                        tracing::info!("Shutdown requested");
                        return Ok(());
                    }
                    None => {
                        self.shutdown_open = false;
                        continue;
                    }
                },
                next = self.source.next_batch() => next?,
            };

            let Some(messages) = messages else {
                tracing::info!("Event source exhausted");
                return Ok(());
            };

            self.status.transition(DriverState::ProcessingBatch).await;
            let batch = MicroBatch::new(self.next_batch_id, messages);
            self.next_batch_id += 1;

            self.process(&batch).await?;
        }
    }

    async fn process(&mut self, batch: &MicroBatch) -> AppResult<()> {
        tracing::info!(batch_id = batch.id, messages = batch.len(), "Processing batch {}...", batch.id);

        let report = process_batch(&self.ctx, batch).await?;
        self.source
            .commit()
            .await
            .map_err(|e| AppError::BatchProcessing {
                batch_id: batch.id,
                reason: format!("commit failed: {}", e),
            })?;

        self.status.record_batch(&report).await;
        tracing::info!(
            batch_id = report.batch_id,
            events = report.events,
            dropped = report.dropped,
            matches = report.matches,
            "Batch complete"
        );
        Ok(())
    }
}
