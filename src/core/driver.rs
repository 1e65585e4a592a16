//! # Batch driver: moves accepted tasks through the transport.
//!
//! A [`BatchDriver`] is cloned into one spawned tokio task per accepted batch.
//! It drives every task of that batch under the configured [`DrivePolicy`].
//!
//! ## Per-task flow
//! ```text
//! runtime cancelled? ── yes ──► leave Queued (shutdown in progress)
//!        │ no
//! mark_uploading(id) ── false ──► removed meanwhile, skip
//!        │ true
//! child token → inflight[id]; publish TaskUploading; gate.refresh()
//!        │
//! upload_once(transport, file, progress, child)
//!        ├─ Ok(())  → mark_succeeded → publish TaskSucceeded
//!        │            → (inflight lock) still tracked? → cleanup.schedule(id)
//!        └─ Err(e)  → mark_failed(e.failure_message()) → publish TaskFailed
//!        │
//! inflight.remove(id); gate.refresh()
//! ```
//!
//! ## Rules
//! - A failed task never affects its siblings; there is no retry.
//! - Settlement of a task removed mid-upload is a silent no-op.
//! - The inflight entry lives until settlement. A task removed after it
//!   succeeded but before its timer is armed gets no timer: `Orchestrator::remove`
//!   takes the entry before cancelling cleanup, and scheduling happens under the
//!   same lock.
//! - Under `DrivePolicy::Sequential` transport calls happen in creation order,
//!   one at a time.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::core::runner::upload_once;
use crate::core::{CleanupScheduler, IntakeGate, TaskRegistry};
use crate::events::{Bus, Event, EventKind};
use crate::policies::DrivePolicy;
use crate::tasks::{TaskId, UploadTask};
use crate::transport::{Progress, TransportRef};

/// Cancellation tokens of uploads currently in flight.
pub(crate) type Inflight = Arc<Mutex<HashMap<TaskId, CancellationToken>>>;

pub(crate) fn lock_inflight(
    inflight: &Inflight,
) -> MutexGuard<'_, HashMap<TaskId, CancellationToken>> {
    inflight.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Drives batches of tasks through the transport.
#[derive(Clone)]
pub(crate) struct BatchDriver {
    pub(crate) registry: Arc<TaskRegistry>,
    pub(crate) transport: TransportRef,
    pub(crate) bus: Bus,
    pub(crate) gate: Arc<IntakeGate>,
    pub(crate) cleanup: Arc<CleanupScheduler>,
    pub(crate) inflight: Inflight,
    pub(crate) runtime_token: CancellationToken,
    pub(crate) drive: DrivePolicy,
}

impl BatchDriver {
    /// Drives `tasks` to settlement under the drive policy.
    pub(crate) async fn run(&self, tasks: Vec<UploadTask>) {
        futures::stream::iter(tasks)
            .for_each_concurrent(self.drive.limit(), |task| self.drive_one(task))
            .await;
    }

    async fn drive_one(&self, task: UploadTask) {
        let id = task.id().clone();
        if self.runtime_token.is_cancelled() {
            tracing::trace!(task = %id, "intake closed, task left queued");
            return;
        }
        if !self.registry.mark_uploading(&id).await {
            tracing::trace!(task = %id, "task no longer queued, skipped");
            return;
        }

        let child = self.runtime_token.child_token();
        lock_inflight(&self.inflight).insert(id.clone(), child.clone());
        self.bus
            .publish(Event::new(EventKind::TaskUploading).for_task(&task));
        self.gate.refresh().await;

        let progress = Progress::new(id.clone(), Arc::clone(&self.registry), self.bus.clone());
        let res = upload_once(self.transport.as_ref(), task.file(), progress, child).await;

        match res {
            Ok(()) => {
                if self.registry.mark_succeeded(&id).await {
                    self.bus
                        .publish(Event::new(EventKind::TaskSucceeded).for_task(&task));
                    let mut inflight = lock_inflight(&self.inflight);
                    if inflight.remove(&id).is_some() {
                        self.cleanup.schedule(&id);
                    } else {
                        tracing::trace!(task = %id, "task removed before cleanup was armed");
                    }
                }
            }
            Err(err) => {
                let message = err.failure_message();
                if self.registry.mark_failed(&id, &message).await {
                    tracing::debug!(task = %id, label = err.as_label(), error = %message, "upload failed");
                    self.bus.publish(
                        Event::new(EventKind::TaskFailed)
                            .for_task(&task)
                            .with_reason(message),
                    );
                }
            }
        }
        lock_inflight(&self.inflight).remove(&id);
        self.gate.refresh().await;
    }
}
