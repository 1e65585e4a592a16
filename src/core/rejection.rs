//! # Rejection reporter: the single user-facing rejection notice.
//!
//! [`RejectionReporter`] holds at most one [`RejectionNotice`] describing why files
//! of the most recent batch were refused.
//!
//! ## Rules
//! - A non-empty report replaces the previous notice.
//! - An empty report leaves the current notice untouched.
//! - Only `dismiss()` clears it.

use tokio::sync::watch;

use crate::policies::RejectionRecord;

/// Rendered rejection notice for one batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectionNotice {
    records: Vec<RejectionRecord>,
    message: String,
}

impl RejectionNotice {
    /// Builds a notice; `None` when there is nothing to report.
    ///
    /// With no file names (batch-wide `COUNT_EXCEEDED`) the notice is that single
    /// message. Otherwise it has one line per rejected file.
    pub fn from_records(records: Vec<RejectionRecord>) -> Option<Self> {
        let first = records.first()?;
        let message = if records.iter().all(|r| r.file_name().is_none()) {
            first.message().to_string()
        } else {
            records
                .iter()
                .map(RejectionRecord::message)
                .collect::<Vec<_>>()
                .join("\n")
        };
        Some(Self { records, message })
    }

    /// The rejection records, in input order.
    pub fn records(&self) -> &[RejectionRecord] {
        &self.records
    }

    /// Rendered text.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for RejectionNotice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

/// Holder of the current rejection notice.
pub struct RejectionReporter {
    tx: watch::Sender<Option<RejectionNotice>>,
}

impl RejectionReporter {
    /// Creates a reporter with no notice.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    /// Replaces the notice with `records`. Returns the new notice, or `None`
    /// (and keeps the old one) if `records` is empty.
    pub fn report(&self, records: Vec<RejectionRecord>) -> Option<RejectionNotice> {
        let notice = RejectionNotice::from_records(records)?;
        tracing::debug!(records = notice.records.len(), "rejection reported");
        self.tx.send_replace(Some(notice.clone()));
        Some(notice)
    }

    /// Clears the notice. Returns `true` if there was one.
    pub fn dismiss(&self) -> bool {
        self.tx.send_if_modified(|current| current.take().is_some())
    }

    /// Current notice, if any.
    pub fn current(&self) -> Option<RejectionNotice> {
        self.tx.borrow().clone()
    }

    /// Receiver observing the notice.
    pub fn subscribe(&self) -> watch::Receiver<Option<RejectionNotice>> {
        self.tx.subscribe()
    }
}

impl Default for RejectionReporter {
    fn default() -> Self {
        Self::new()
    }
}
