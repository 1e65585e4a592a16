//! # Runtime events emitted by the orchestrator.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Batch events**: what happened to a selection (accepted, rejected)
//! - **Task lifecycle events**: queued, uploading, progress, succeeded, failed, removed
//! - **Intake events**: cleanup timers, gate flips, rejection dismissal, teardown
//! - **Subscriber events**: overflow and panic of event subscribers
//!
//! The [`Event`] struct carries additional metadata such as timestamps, task id,
//! file name, reasons, progress and delays.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use intakevisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::TaskFailed)
//!     .with_file("a.pdf")
//!     .with_reason("503 Service Unavailable");
//!
//! assert_eq!(ev.kind, EventKind::TaskFailed);
//! assert_eq!(ev.file.as_deref(), Some("a.pdf"));
//! assert_eq!(ev.reason.as_deref(), Some("503 Service Unavailable"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

use crate::tasks::{TaskId, UploadTask};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `reason`: subscriber name and panic info
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `reason`: subscriber name and drop reason ("full", "closed")
    SubscriberOverflow,

    // === Batch events ===
    /// Some files of a batch were accepted and enqueued.
    ///
    /// Sets:
    /// - `count`: number of accepted files
    BatchAccepted,

    /// Some files of a batch (or the whole batch) were rejected.
    ///
    /// Sets:
    /// - `count`: number of rejection records
    /// - `reason`: rendered rejection notice
    BatchRejected,

    // === Task lifecycle events ===
    /// Task created in `Queued`.
    ///
    /// Sets:
    /// - `task`, `file`
    TaskQueued,

    /// Transport call started; task is `Uploading`.
    ///
    /// Sets:
    /// - `task`, `file`
    TaskUploading,

    /// Progress rose for an uploading task.
    ///
    /// Sets:
    /// - `task`
    /// - `progress`: new percentage
    TaskProgress,

    /// Task reached `Succeeded`.
    ///
    /// Sets:
    /// - `task`, `file`
    TaskSucceeded,

    /// Task reached `Failed`.
    ///
    /// Sets:
    /// - `task`, `file`
    /// - `reason`: failure message stored on the task
    TaskFailed,

    /// Task was removed from the registry.
    ///
    /// Sets:
    /// - `task`, `file`
    /// - `reason`: `"manual"` or `"auto_cleanup"`
    TaskRemoved,

    // === Intake events ===
    /// Auto-cleanup timer armed for a succeeded task.
    ///
    /// Sets:
    /// - `task`
    /// - `delay_ms`: delay before removal
    CleanupScheduled,

    /// Auto-cleanup timer disarmed before it fired.
    ///
    /// Sets:
    /// - `task`
    CleanupCancelled,

    /// Intake gate flipped.
    ///
    /// Sets:
    /// - `disabled`: new gate value
    GateChanged,

    /// The current rejection notice was dismissed.
    RejectionDismissed,

    /// Teardown requested; intake closed and tokens cancelled.
    ShutdownRequested,

    /// All batch drivers finished within the grace period.
    AllSettledWithin,

    /// Grace period exceeded; some uploads were still in flight.
    ///
    /// Sets:
    /// - `count`: number of stuck tasks
    GraceExceeded,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Task id, if applicable.
    pub task: Option<TaskId>,
    /// File name, if applicable.
    pub file: Option<Arc<str>>,
    /// Human-readable reason (failure text, removal cause, rejection notice).
    pub reason: Option<Arc<str>>,
    /// Upload progress in percent.
    pub progress: Option<u8>,
    /// Count (accepted files, rejection records, stuck tasks).
    pub count: Option<u32>,
    /// Delay in milliseconds (compact).
    pub delay_ms: Option<u32>,
    /// Gate value for `GateChanged`.
    pub disabled: Option<bool>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            task: None,
            file: None,
            reason: None,
            progress: None,
            count: None,
            delay_ms: None,
            disabled: None,
        }
    }

    /// Attaches a task id.
    #[inline]
    pub fn with_task(mut self, id: &TaskId) -> Self {
        self.task = Some(id.clone());
        self
    }

    /// Attaches a file name.
    #[inline]
    pub fn with_file(mut self, name: impl Into<Arc<str>>) -> Self {
        self.file = Some(name.into());
        self
    }

    /// Attaches task id and file name from a task snapshot.
    #[inline]
    pub fn for_task(self, task: &UploadTask) -> Self {
        self.with_task(task.id()).with_file(task.file().name_arc())
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a progress percentage.
    #[inline]
    pub fn with_progress(mut self, pct: u8) -> Self {
        self.progress = Some(pct);
        self
    }

    /// Attaches a count (saturated to `u32::MAX`).
    #[inline]
    pub fn with_count(mut self, n: usize) -> Self {
        self.count = Some(u32::try_from(n).unwrap_or(u32::MAX));
        self
    }

    /// Attaches a delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.delay_ms = Some(ms);
        self
    }

    /// Attaches the gate value.
    #[inline]
    pub fn with_disabled(mut self, disabled: bool) -> Self {
        self.disabled = Some(disabled);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_reason(format!("subscriber={subscriber} info={info}"))
    }

    /// True for subscriber overflow/panic events (never re-reported to avoid loops).
    #[inline]
    pub fn is_subscriber_event(&self) -> bool {
        matches!(
            self.kind,
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked
        )
    }
}
