//! Error types used by the intake runtime and transports.
//!
//! This module defines two main error enums:
//!
//! - [`IntakeError`]: errors raised by the orchestrator itself.
//! - [`TransportError`]: errors raised by a single upload attempt.
//!
//! Validation failures are **not** errors: they are data
//! ([`RejectionRecord`](crate::RejectionRecord)) and never reach these types.
//!
//! Both enums provide helper methods (`as_label`, `as_message`) for logging/metrics.

use std::time::Duration;

use thiserror::Error;

use crate::tasks::TaskId;

/// Message used when a transport failure carries no usable text.
pub const GENERIC_FAILURE_MESSAGE: &str = "Upload failed";

/// # Errors produced by the intake runtime.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum IntakeError {
    /// The orchestrator was shut down; no new batches are accepted.
    #[error("intake is closed")]
    Closed,

    /// The intake gate is disabled (an upload is in flight).
    #[error("intake gate is closed while uploads are in flight")]
    GateClosed,

    /// `OrchestratorBuilder::build` was called without a transport.
    #[error("no transport configured")]
    MissingTransport,

    /// Teardown grace period was exceeded; some uploads were still in flight.
    #[error("shutdown timeout {grace:?} exceeded; stuck: {stuck:?}")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Tasks that were still uploading.
        stuck: Vec<TaskId>,
    },
}

impl IntakeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use intakevisor::IntakeError;
    ///
    /// assert_eq!(IntakeError::GateClosed.as_label(), "intake_gate_closed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            IntakeError::Closed => "intake_closed",
            IntakeError::GateClosed => "intake_gate_closed",
            IntakeError::MissingTransport => "intake_missing_transport",
            IntakeError::GraceExceeded { .. } => "intake_grace_exceeded",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            IntakeError::Closed => "intake closed".to_string(),
            IntakeError::GateClosed => "uploads in flight".to_string(),
            IntakeError::MissingTransport => "builder has no transport".to_string(),
            IntakeError::GraceExceeded { grace, stuck } => {
                format!("grace exceeded after {grace:?}; stuck tasks={stuck:?}")
            }
        }
    }
}

/// # Errors produced by a transport upload.
///
/// The orchestrator turns these into the task's `error` text via
/// [`TransportError::failure_message`]: a usable message is used verbatim,
/// anything else becomes [`GENERIC_FAILURE_MESSAGE`].
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Upload failed with a message (server response, I/O error text, ...).
    #[error("upload failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// The transport observed its cancellation token and gave up.
    #[error("upload cancelled")]
    Canceled,

    /// The failure carried no recognizable error value (e.g. the transport panicked).
    #[error("upload failed with an unrecognized error")]
    Unrecognized,
}

impl TransportError {
    /// Shorthand for [`TransportError::Fail`].
    pub fn fail(error: impl Into<String>) -> Self {
        TransportError::Fail {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use intakevisor::TransportError;
    ///
    /// assert_eq!(TransportError::fail("503").as_label(), "transport_failed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            TransportError::Fail { .. } => "transport_failed",
            TransportError::Canceled => "transport_canceled",
            TransportError::Unrecognized => "transport_unrecognized",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            TransportError::Fail { error } => format!("error: {error}"),
            TransportError::Canceled => "cancelled".to_string(),
            TransportError::Unrecognized => "unrecognized".to_string(),
        }
    }

    /// Text stored on a failed task.
    ///
    /// # Example
    /// ```
    /// use intakevisor::{TransportError, GENERIC_FAILURE_MESSAGE};
    ///
    /// assert_eq!(TransportError::fail("quota exceeded").failure_message(), "quota exceeded");
    /// assert_eq!(TransportError::fail("  ").failure_message(), GENERIC_FAILURE_MESSAGE);
    /// assert_eq!(TransportError::Unrecognized.failure_message(), GENERIC_FAILURE_MESSAGE);
    /// ```
    pub fn failure_message(&self) -> String {
        match self {
            TransportError::Fail { error } if !error.trim().is_empty() => error.clone(),
            TransportError::Canceled => "Upload cancelled".to_string(),
            _ => GENERIC_FAILURE_MESSAGE.to_string(),
        }
    }
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        TransportError::fail(err.to_string())
    }
}
