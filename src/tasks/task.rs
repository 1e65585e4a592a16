//! # Upload task: one file's journey through the intake lifecycle.
//!
//! An [`UploadTask`] is created in [`TaskStatus::Queued`] by the
//! [`TaskRegistry`](crate::TaskRegistry) and moves along a one-way lattice:
//!
//! ```text
//! Queued ──► Uploading ──┬──► Succeeded   (terminal)
//!                        └──► Failed      (terminal, carries error text)
//! ```
//!
//! ## Rules
//! - Terminal states never transition again.
//! - `progress` only rises while `Uploading` and is meaningless once terminal.
//! - `error` is set only in `Failed`.
//! - `created_at` is the registry sequence number; display order is creation order.
//!
//! Tasks handed out by the registry are **snapshots**: mutating them is not possible
//! and later transitions are only visible through a fresh `list()`/`get()`.

use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;

use crate::tasks::FileHandle;

/// Opaque task identifier, unique within one registry.
///
/// Built from the file name and the registry's monotonic counter (`"a.pdf#3"`),
/// so two selections of identically named files never collide.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(Arc<str>);

impl TaskId {
    pub(crate) fn new(name: &str, seq: u64) -> Self {
        Self(format!("{name}#{seq}").into())
    }

    /// String form of the id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TaskId({})", self.0)
    }
}

impl From<TaskId> for Arc<str> {
    fn from(id: TaskId) -> Self {
        id.0
    }
}

impl From<&TaskId> for Arc<str> {
    fn from(id: &TaskId) -> Self {
        Arc::clone(&id.0)
    }
}

/// Lifecycle status of an upload task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskStatus {
    /// Accepted and waiting for the driver.
    Queued,
    /// Transport call in flight.
    Uploading,
    /// Transport reported success (terminal).
    Succeeded,
    /// Transport reported failure (terminal).
    Failed,
}

impl TaskStatus {
    /// True for `Succeeded` and `Failed`.
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Succeeded | TaskStatus::Failed)
    }

    /// Stable upper-case code, e.g. for presentation layers.
    pub fn as_code(self) -> &'static str {
        match self {
            TaskStatus::Queued => "QUEUED",
            TaskStatus::Uploading => "UPLOADING",
            TaskStatus::Succeeded => "SUCCEEDED",
            TaskStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_code())
    }
}

/// Snapshot of one upload task.
#[derive(Clone, Debug)]
pub struct UploadTask {
    pub(crate) id: TaskId,
    pub(crate) file: FileHandle,
    pub(crate) status: TaskStatus,
    pub(crate) progress: u8,
    pub(crate) error: Option<Arc<str>>,
    pub(crate) created_at: u64,
    pub(crate) enqueued_at: SystemTime,
}

impl UploadTask {
    pub(crate) fn queued(id: TaskId, file: FileHandle, created_at: u64) -> Self {
        Self {
            id,
            file,
            status: TaskStatus::Queued,
            progress: 0,
            error: None,
            created_at,
            enqueued_at: SystemTime::now(),
        }
    }

    /// Task id.
    pub fn id(&self) -> &TaskId {
        &self.id
    }

    /// The file being uploaded.
    pub fn file(&self) -> &FileHandle {
        &self.file
    }

    /// Convenience: the file name.
    pub fn name(&self) -> &str {
        self.file.name()
    }

    /// Current status.
    pub fn status(&self) -> TaskStatus {
        self.status
    }

    /// Upload progress in percent (0..=100).
    pub fn progress(&self) -> u8 {
        self.progress
    }

    /// Failure message; only present when `status() == Failed`.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Creation order key (registry sequence).
    pub fn created_at(&self) -> u64 {
        self.created_at
    }

    /// Wall-clock time the task was enqueued.
    pub fn enqueued_at(&self) -> SystemTime {
        self.enqueued_at
    }

    /// True once the task reached `Succeeded` or `Failed`.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
