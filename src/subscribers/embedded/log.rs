//! # LogWriter: tracing-backed event logger
//!
//! A subscriber that renders every intake [`Event`] as a `tracing` record under the
//! `intakevisor::events` target. Lifecycle noise (`TaskProgress`) goes to `trace`,
//! failures and subscriber trouble to `warn`, everything else to `info`/`debug`.
//!
//! ## Example output (`tracing-subscriber` fmt layer)
//! ```text
//! INFO intakevisor::events: batch accepted count=2
//! INFO intakevisor::events: task uploading task=a.pdf#0 file=a.pdf
//! WARN intakevisor::events: task failed task=b.pdf#1 file=b.pdf error=503 Service Unavailable
//! INFO intakevisor::events: task removed task=a.pdf#0 cause=auto_cleanup
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

const TARGET: &str = "intakevisor::events";

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let task = e.task.as_ref().map(|t| t.as_str()).unwrap_or("-");
        let file = e.file.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("-");

        match e.kind {
            EventKind::BatchAccepted => {
                tracing::info!(target: TARGET, count = e.count, "batch accepted");
            }
            EventKind::BatchRejected => {
                tracing::info!(target: TARGET, count = e.count, notice = reason, "batch rejected");
            }
            EventKind::TaskQueued => {
                tracing::debug!(target: TARGET, task, file, "task queued");
            }
            EventKind::TaskUploading => {
                tracing::info!(target: TARGET, task, file, "task uploading");
            }
            EventKind::TaskProgress => {
                tracing::trace!(target: TARGET, task, progress = e.progress, "task progress");
            }
            EventKind::TaskSucceeded => {
                tracing::info!(target: TARGET, task, file, "task succeeded");
            }
            EventKind::TaskFailed => {
                tracing::warn!(target: TARGET, task, file, error = reason, "task failed");
            }
            EventKind::TaskRemoved => {
                tracing::info!(target: TARGET, task, cause = reason, "task removed");
            }
            EventKind::CleanupScheduled => {
                tracing::debug!(target: TARGET, task, delay_ms = e.delay_ms, "cleanup scheduled");
            }
            EventKind::CleanupCancelled => {
                tracing::debug!(target: TARGET, task, "cleanup cancelled");
            }
            EventKind::GateChanged => {
                tracing::debug!(target: TARGET, disabled = e.disabled, "gate changed");
            }
            EventKind::RejectionDismissed => {
                tracing::debug!(target: TARGET, "rejection dismissed");
            }
            EventKind::ShutdownRequested => {
                tracing::info!(target: TARGET, "shutdown requested");
            }
            EventKind::AllSettledWithin => {
                tracing::info!(target: TARGET, "all uploads settled within grace");
            }
            EventKind::GraceExceeded => {
                tracing::warn!(target: TARGET, stuck = e.count, "grace exceeded");
            }
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked => {
                tracing::warn!(target: TARGET, kind = ?e.kind, details = reason, "subscriber trouble");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
