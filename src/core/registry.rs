//! # Task registry: the single owner of upload task state.
//!
//! [`TaskRegistry`] holds every [`UploadTask`] of one intake in creation order and
//! applies the lifecycle transitions requested by the orchestrator.
//!
//! ## Architecture
//! ```text
//! Orchestrator::accept ──► enqueue(files)          (Queued, appended)
//! BatchDriver          ──► mark_uploading(id)      (Queued → Uploading)
//! Progress             ──► mark_progress(id, pct)  (rises only, clamped to 100)
//! BatchDriver          ──► mark_succeeded(id)      (→ Succeeded, terminal)
//!                      └─► mark_failed(id, msg)    (→ Failed, terminal)
//! CleanupScheduler     ──► remove(id)              (auto_cleanup)
//! Orchestrator::remove ──► remove(id)              (manual, any status)
//! surface              ──► list() / get(id)        (snapshots)
//! ```
//!
//! ## Rules
//! - Ids come from a per-registry counter and are never reused.
//! - Transition methods return `true` only if state changed. Calls against a
//!   terminal or missing task are absorbed (logged at `trace`), never errors.
//! - The lock is never held across an `.await` outside this module.
//! - Events are published by callers; the registry itself is a plain store.

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::RwLock;

use crate::tasks::{FileHandle, TaskId, TaskStatus, UploadTask};

/// Per-status task counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IntakeStats {
    /// Tasks waiting for the driver.
    pub queued: usize,
    /// Tasks with a transport call in flight.
    pub uploading: usize,
    /// Tasks that finished successfully and await cleanup.
    pub succeeded: usize,
    /// Tasks that failed and stay until removed.
    pub failed: usize,
}

impl IntakeStats {
    /// Total number of tasks.
    pub fn total(&self) -> usize {
        self.queued + self.uploading + self.succeeded + self.failed
    }

    /// Tasks counted against the aggregate limit (`Queued` + `Uploading`).
    pub fn non_terminal(&self) -> usize {
        self.queued + self.uploading
    }
}

/// In-memory store of upload tasks, ordered by creation.
pub struct TaskRegistry {
    tasks: RwLock<Vec<UploadTask>>,
    seq: AtomicU64,
}

impl TaskRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            tasks: RwLock::new(Vec::new()),
            seq: AtomicU64::new(0),
        }
    }

    /// Appends one `Queued` task per file, in input order, and returns their snapshots.
    pub async fn enqueue(&self, files: Vec<FileHandle>) -> Vec<UploadTask> {
        let mut tasks = self.tasks.write().await;
        let mut created = Vec::with_capacity(files.len());

        for file in files {
            let seq = self.seq.fetch_add(1, Ordering::Relaxed);
            let task = UploadTask::queued(TaskId::new(file.name(), seq), file, seq);
            tracing::debug!(task = %task.id, size = task.file.size(), "task queued");
            tasks.push(task.clone());
            created.push(task);
        }
        created
    }

    /// `Queued → Uploading`; resets progress to 0.
    pub async fn mark_uploading(&self, id: &TaskId) -> bool {
        self.transition(id, "mark_uploading", |t| {
            if t.status != TaskStatus::Queued {
                return false;
            }
            t.status = TaskStatus::Uploading;
            t.progress = 0;
            true
        })
        .await
    }

    /// Raises progress of an `Uploading` task (clamped to 100, never lowered).
    pub async fn mark_progress(&self, id: &TaskId, pct: u8) -> bool {
        let pct = pct.min(100);
        self.transition(id, "mark_progress", |t| {
            if t.status != TaskStatus::Uploading || pct <= t.progress {
                return false;
            }
            t.progress = pct;
            true
        })
        .await
    }

    /// Non-terminal → `Succeeded` with progress 100.
    pub async fn mark_succeeded(&self, id: &TaskId) -> bool {
        self.transition(id, "mark_succeeded", |t| {
            if t.status.is_terminal() {
                return false;
            }
            t.status = TaskStatus::Succeeded;
            t.progress = 100;
            true
        })
        .await
    }

    /// Non-terminal → `Failed` carrying `message`.
    pub async fn mark_failed(&self, id: &TaskId, message: &str) -> bool {
        self.transition(id, "mark_failed", |t| {
            if t.status.is_terminal() {
                return false;
            }
            t.status = TaskStatus::Failed;
            t.error = Some(message.into());
            true
        })
        .await
    }

    /// Removes a task regardless of its status.
    pub async fn remove(&self, id: &TaskId) -> Option<UploadTask> {
        let mut tasks = self.tasks.write().await;
        let idx = tasks.iter().position(|t| &t.id == id)?;
        let task = tasks.remove(idx);
        tracing::debug!(task = %id, status = %task.status, "task removed");
        Some(task)
    }

    /// Removes every terminal task and returns them in creation order.
    pub async fn remove_finished(&self) -> Vec<UploadTask> {
        let mut tasks = self.tasks.write().await;
        let (finished, keep): (Vec<_>, Vec<_>) =
            tasks.drain(..).partition(UploadTask::is_terminal);
        *tasks = keep;
        finished
    }

    /// Snapshot of all tasks in creation order.
    pub async fn list(&self) -> Vec<UploadTask> {
        self.tasks.read().await.clone()
    }

    /// Snapshot of one task.
    pub async fn get(&self, id: &TaskId) -> Option<UploadTask> {
        self.tasks.read().await.iter().find(|t| &t.id == id).cloned()
    }

    /// Number of tasks.
    pub async fn len(&self) -> usize {
        self.tasks.read().await.len()
    }

    /// True if there are no tasks.
    pub async fn is_empty(&self) -> bool {
        self.tasks.read().await.is_empty()
    }

    /// Number of `Queued` + `Uploading` tasks.
    pub async fn non_terminal_count(&self) -> usize {
        self.tasks
            .read()
            .await
            .iter()
            .filter(|t| !t.is_terminal())
            .count()
    }

    /// True if any task is `Uploading`.
    pub async fn any_uploading(&self) -> bool {
        self.tasks
            .read()
            .await
            .iter()
            .any(|t| t.status == TaskStatus::Uploading)
    }

    /// Ids of tasks currently `Uploading`, in creation order.
    pub async fn uploading_ids(&self) -> Vec<TaskId> {
        self.tasks
            .read()
            .await
            .iter()
            .filter(|t| t.status == TaskStatus::Uploading)
            .map(|t| t.id.clone())
            .collect()
    }

    /// Per-status counts.
    pub async fn stats(&self) -> IntakeStats {
        let tasks = self.tasks.read().await;
        let mut stats = IntakeStats::default();
        for t in tasks.iter() {
            match t.status {
                TaskStatus::Queued => stats.queued += 1,
                TaskStatus::Uploading => stats.uploading += 1,
                TaskStatus::Succeeded => stats.succeeded += 1,
                TaskStatus::Failed => stats.failed += 1,
            }
        }
        stats
    }

    async fn transition(
        &self,
        id: &TaskId,
        op: &'static str,
        apply: impl FnOnce(&mut UploadTask) -> bool,
    ) -> bool {
        let mut tasks = self.tasks.write().await;
        let Some(task) = tasks.iter_mut().find(|t| &t.id == id) else {
            tracing::trace!(task = %id, op, "transition on missing task ignored");
            return false;
        };
        let from = task.status;
        let changed = apply(task);
        if changed {
            if from != task.status {
                tracing::debug!(task = %id, from = %from, to = %task.status, "task transition");
            }
        } else {
            tracing::trace!(task = %id, op, status = %from, "transition ignored");
        }
        changed
    }
}

impl Default for TaskRegistry {
    fn default() -> Self {
        Self::new()
    }
}
