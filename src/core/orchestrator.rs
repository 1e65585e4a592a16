//! # Orchestrator: the intake's public face.
//!
//! The [`Orchestrator`] owns the event bus, the [`SubscriberSet`], the registry and
//! every intake component. The selection surface talks only to it.
//!
//! ## High-level architecture
//! ```text
//! accept(batch):
//!   closed? ─► Err(Closed)
//!   (admission lock)
//!     non_terminal_count() ─► ValidationPolicy::validate(batch, existing)
//!        ├─ rejected ─► RejectionReporter::report ─► BatchRejected
//!        └─ accepted ─► enforce_gate && gate disabled? ─► Err(GateClosed)
//!                   └─► TaskRegistry::enqueue ─► TaskQueued…
//!   tracker.spawn(BatchDriver::run(tasks)) ─► BatchAccepted ─► Ok(BatchHandle)
//!
//! remove(id):
//!   inflight.remove(id).cancel() ─► CleanupScheduler::cancel(id) ─► registry.remove(id)
//!   ─► TaskRemoved ─► gate.refresh()
//!
//! Event flow:
//!   Orchestrator / BatchDriver / Progress / Cleanup / Gate ── publish ──► Bus
//!   Bus ──► subscriber_listener ──► SubscriberSet::emit ──► [queue S1] … [queue SN]
//!   (the listener owns the set; shutdown flushes it after the final event)
//!
//! Shutdown path:
//!   shutdown()
//!     └─► publish(ShutdownRequested)
//!     └─► runtime_token.cancel()   → every in-flight child token
//!     └─► cleanup.shutdown()       → every timer
//!     └─► tracker.close() + wait (≤ grace):
//!            ├─ all drivers done → publish(AllSettledWithin)
//!            └─ timeout          → publish(GraceExceeded), Err(GraceExceeded { stuck })
//!     └─► listener forwards what is left ─► SubscriberSet::shutdown (≤ grace)
//! ```
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//! use intakevisor::{
//!     FileHandle, IntakeConfig, Orchestrator, Progress, TaskStatus, TransportError,
//!     TransportFn,
//! };
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let transport = TransportFn::arc(
//!         "demo",
//!         |file: FileHandle, progress: Progress, _ctx: CancellationToken| async move {
//!             progress.bytes(file.size(), file.size()).await;
//!             Ok::<_, TransportError>(())
//!         },
//!     );
//!
//!     let intake = Orchestrator::builder(IntakeConfig::default())
//!         .with_transport(transport)
//!         .build()?;
//!
//!     let batch = intake
//!         .accept(vec![FileHandle::from_bytes("a.pdf", "application/pdf", vec![0u8; 1024])])
//!         .await?;
//!     batch.settled().await;
//!
//!     assert_eq!(intake.list().await[0].status(), TaskStatus::Succeeded);
//!     intake.shutdown().await?;
//!     Ok(())
//! }
//! ```

use std::sync::{Arc, PoisonError};
use std::time::Duration;

use tokio::sync::{Mutex, broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::core::driver::{BatchDriver, Inflight, lock_inflight};
use crate::core::{
    CleanupScheduler, IntakeConfig, IntakeGate, IntakeStats, OrchestratorBuilder,
    RejectionNotice, RejectionReporter, TaskRegistry,
};
use crate::error::IntakeError;
use crate::events::{Bus, Event, EventKind};
use crate::policies::{RejectionRecord, Validation};
use crate::subscribers::SubscriberSet;
use crate::tasks::{FileHandle, TaskId, UploadTask};

/// Result of [`Orchestrator::accept`].
///
/// Dropping the handle does not stop the batch.
#[derive(Debug)]
pub struct BatchHandle {
    accepted: Vec<TaskId>,
    rejected: Vec<RejectionRecord>,
    done: Option<JoinHandle<()>>,
}

impl BatchHandle {
    /// Ids of the tasks created for this batch, in input order.
    pub fn accepted(&self) -> &[TaskId] {
        &self.accepted
    }

    /// Rejections produced for this batch.
    pub fn rejected(&self) -> &[RejectionRecord] {
        &self.rejected
    }

    /// True if no task was created.
    pub fn is_fully_rejected(&self) -> bool {
        self.accepted.is_empty()
    }

    /// Waits until every task of the batch has settled (or been skipped).
    pub async fn settled(self) {
        let Some(done) = self.done else {
            return;
        };
        if let Err(err) = done.await {
            tracing::warn!(tasks = self.accepted.len(), error = %err, "batch driver ended abnormally");
        }
    }
}

/// Upload intake orchestrator.
pub struct Orchestrator {
    cfg: IntakeConfig,
    bus: Bus,
    registry: Arc<TaskRegistry>,
    gate: Arc<IntakeGate>,
    cleanup: Arc<CleanupScheduler>,
    rejections: RejectionReporter,
    driver: BatchDriver,
    inflight: Inflight,
    admission: Mutex<()>,
    tracker: TaskTracker,
    runtime_token: CancellationToken,
    listener_token: CancellationToken,
    listener: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl Orchestrator {
    /// Starts building an orchestrator.
    pub fn builder(cfg: IntakeConfig) -> OrchestratorBuilder {
        OrchestratorBuilder::new(cfg)
    }

    pub(crate) fn new_internal(
        cfg: IntakeConfig,
        bus: Bus,
        subs: SubscriberSet,
        registry: Arc<TaskRegistry>,
        driver: BatchDriver,
    ) -> Self {
        let listener_token = CancellationToken::new();
        let listener = subscriber_listener(subs, &bus, listener_token.clone());
        Self {
            bus,
            gate: Arc::clone(&driver.gate),
            cleanup: Arc::clone(&driver.cleanup),
            inflight: Arc::clone(&driver.inflight),
            runtime_token: driver.runtime_token.clone(),
            registry,
            rejections: RejectionReporter::new(),
            driver,
            admission: Mutex::new(()),
            tracker: TaskTracker::new(),
            listener_token,
            listener: std::sync::Mutex::new(listener),
            cfg,
        }
    }

    /// Validates `batch`, enqueues accepted files and starts driving them.
    ///
    /// Rejections replace the current rejection notice. Returns immediately;
    /// await [`BatchHandle::settled`] to wait for the uploads.
    ///
    /// With `enforce_gate` set, a batch that has files to enqueue while the gate
    /// is disabled fails with [`IntakeError::GateClosed`]; its rejections are
    /// still reported and none of its files are enqueued.
    pub async fn accept(&self, batch: Vec<FileHandle>) -> Result<BatchHandle, IntakeError> {
        if self.runtime_token.is_cancelled() {
            return Err(IntakeError::Closed);
        }

        let (tasks, rejected) = {
            let _admission = self.admission.lock().await;
            let existing = self.registry.non_terminal_count().await;
            let Validation { accepted, rejected } = self.cfg.policy.validate(&batch, existing);

            if let Some(notice) = self.rejections.report(rejected.clone()) {
                self.bus.publish(
                    Event::new(EventKind::BatchRejected)
                        .with_count(rejected.len())
                        .with_reason(notice.message()),
                );
            }
            if !accepted.is_empty() && self.cfg.enforce_gate && self.gate.is_disabled() {
                tracing::debug!(refused = accepted.len(), "gate closed, batch refused");
                return Err(IntakeError::GateClosed);
            }
            let tasks = if accepted.is_empty() {
                Vec::new()
            } else {
                self.registry.enqueue(accepted).await
            };
            (tasks, rejected)
        };

        tracing::debug!(
            selected = batch.len(),
            accepted = tasks.len(),
            rejected = rejected.len(),
            "batch validated"
        );
        for task in &tasks {
            self.bus
                .publish(Event::new(EventKind::TaskQueued).for_task(task));
        }

        let accepted: Vec<TaskId> = tasks.iter().map(|t| t.id().clone()).collect();
        let done = if tasks.is_empty() {
            None
        } else {
            self.bus
                .publish(Event::new(EventKind::BatchAccepted).with_count(tasks.len()));
            let driver = self.driver.clone();
            Some(self.tracker.spawn(async move { driver.run(tasks).await }))
        };

        Ok(BatchHandle {
            accepted,
            rejected,
            done,
        })
    }

    /// Removes a task in any status.
    ///
    /// Cancels its cleanup timer and signals its in-flight upload (if any).
    /// Returns the removed task, or `None` if it was already gone.
    pub async fn remove(&self, id: &TaskId) -> Option<UploadTask> {
        let token = lock_inflight(&self.inflight).remove(id);
        if let Some(token) = token {
            token.cancel();
        }
        self.cleanup.cancel(id);

        let removed = self.registry.remove(id).await;
        if let Some(task) = &removed {
            self.bus.publish(
                Event::new(EventKind::TaskRemoved)
                    .for_task(task)
                    .with_reason("manual"),
            );
        }
        self.gate.refresh().await;
        removed
    }

    /// Removes every `Succeeded` and `Failed` task at once.
    pub async fn remove_finished(&self) -> Vec<UploadTask> {
        let removed = self.registry.remove_finished().await;
        for task in &removed {
            self.cleanup.cancel(task.id());
            self.bus.publish(
                Event::new(EventKind::TaskRemoved)
                    .for_task(task)
                    .with_reason("manual"),
            );
        }
        removed
    }

    /// Clears the rejection notice. Returns `true` if there was one.
    pub fn dismiss_rejection(&self) -> bool {
        let dismissed = self.rejections.dismiss();
        if dismissed {
            self.bus.publish(Event::new(EventKind::RejectionDismissed));
        }
        dismissed
    }

    /// Current rejection notice.
    pub fn rejection(&self) -> Option<RejectionNotice> {
        self.rejections.current()
    }

    /// Receiver observing the rejection notice.
    pub fn subscribe_rejections(&self) -> watch::Receiver<Option<RejectionNotice>> {
        self.rejections.subscribe()
    }

    /// Snapshot of all tasks in creation order.
    pub async fn list(&self) -> Vec<UploadTask> {
        self.registry.list().await
    }

    /// Snapshot of one task.
    pub async fn get(&self, id: &TaskId) -> Option<UploadTask> {
        self.registry.get(id).await
    }

    /// Per-status counts.
    pub async fn stats(&self) -> IntakeStats {
        self.registry.stats().await
    }

    /// True while any task is `Uploading`.
    pub fn is_disabled(&self) -> bool {
        self.gate.is_disabled()
    }

    /// Receiver observing the intake gate.
    pub fn subscribe_gate(&self) -> watch::Receiver<bool> {
        self.gate.subscribe()
    }

    /// Receiver of raw intake events published after this call.
    pub fn events(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// The underlying registry (read access for presentation layers).
    pub fn registry(&self) -> &Arc<TaskRegistry> {
        &self.registry
    }

    /// Configuration this orchestrator was built with.
    pub fn config(&self) -> &IntakeConfig {
        &self.cfg
    }

    /// True after [`shutdown`](Self::shutdown).
    pub fn is_closed(&self) -> bool {
        self.runtime_token.is_cancelled()
    }

    /// Closes the intake and waits up to `grace` for batch drivers.
    ///
    /// In-flight uploads are signalled through their tokens and every cleanup
    /// timer is cancelled. Tasks still `Uploading` when the grace period ends are
    /// reported in [`IntakeError::GraceExceeded`]. Subscriber queues are flushed
    /// before returning, so subscribers see the final event.
    pub async fn shutdown(&self) -> Result<(), IntakeError> {
        if !self.runtime_token.is_cancelled() {
            self.bus.publish(Event::new(EventKind::ShutdownRequested));
        }
        self.runtime_token.cancel();
        self.cleanup.shutdown();
        self.tracker.close();

        let grace = self.cfg.grace;
        let res = match tokio::time::timeout(grace, self.tracker.wait()).await {
            Ok(()) => {
                self.bus.publish(Event::new(EventKind::AllSettledWithin));
                Ok(())
            }
            Err(_elapsed) => {
                let stuck = self.registry.uploading_ids().await;
                tracing::warn!(?grace, stuck = stuck.len(), "uploads still in flight after grace");
                self.bus
                    .publish(Event::new(EventKind::GraceExceeded).with_count(stuck.len()));
                Err(IntakeError::GraceExceeded { grace, stuck })
            }
        };
        self.flush_subscribers(grace).await;
        res
    }

    /// Stops the listener after it forwarded every published event, then waits
    /// (at most `limit`) for the subscriber workers to drain their queues.
    async fn flush_subscribers(&self, limit: Duration) {
        self.listener_token.cancel();
        let handle = self
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(handle) = handle else {
            return;
        };
        match tokio::time::timeout(limit, handle).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => tracing::warn!(error = %err, "subscriber listener ended abnormally"),
            Err(_elapsed) => tracing::warn!(?limit, "subscribers still busy after shutdown"),
        }
    }
}

/// Forwards bus events to the subscriber set until `token` is cancelled.
///
/// On cancellation the events already published are still forwarded, then the
/// set is shut down so its workers drain their queues.
fn subscriber_listener(
    set: SubscriberSet,
    bus: &Bus,
    token: CancellationToken,
) -> Option<JoinHandle<()>> {
    if set.is_empty() {
        return None;
    }
    let mut rx = bus.subscribe();
    Some(tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                msg = rx.recv() => match msg {
                    Ok(ev) => set.emit(&ev),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(skipped = n, "subscriber listener lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
        loop {
            match rx.try_recv() {
                Ok(ev) => set.emit(&ev),
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "subscriber listener lagged");
                }
                Err(_) => break,
            }
        }
        set.shutdown().await;
    }))
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        self.runtime_token.cancel();
        self.cleanup.shutdown();
        self.listener_token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_settled_survives_a_crashed_driver() {
        let done: JoinHandle<()> = tokio::spawn(async { panic!("driver crashed") });
        let handle = BatchHandle {
            accepted: vec![TaskId::new("a.pdf", 1)],
            rejected: Vec::new(),
            done: Some(done),
        };
        handle.settled().await;
    }

    #[tokio::test]
    async fn test_settled_without_driver_returns_at_once() {
        let handle = BatchHandle {
            accepted: Vec::new(),
            rejected: Vec::new(),
            done: None,
        };
        assert!(handle.is_fully_rejected());
        handle.settled().await;
    }
}
