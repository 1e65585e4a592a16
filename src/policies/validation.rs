//! # Validation policy for incoming batches.
//!
//! [`ValidationPolicy`] is a pure predicate set applied by the orchestrator before any
//! task exists. It splits a batch into accepted files and [`RejectionRecord`]s.
//!
//! ## Rules
//! ```text
//! validate(batch, existing_non_terminal):
//!   ├─ existing + batch.len() > max_aggregate_count ─► ONE CountExceeded, accept nothing
//!   ├─ batch.len() > max_batch_count               ─► ONE CountExceeded, accept nothing
//!   └─ per file (first failing rule wins):
//!        ├─ type not in allowed_types ─► UnsupportedType
//!        ├─ size > max_file_size      ─► TooLarge
//!        └─ otherwise                 ─► accepted
//! ```
//!
//! - Count overflow is reported once for the whole batch, never per file.
//! - Validation never touches the registry or the network and is idempotent.
//!
//! ## Sentinel values
//! - `allowed_types` empty → every type is allowed
//! - `max_file_size_bytes = 0` → no size cap
//! - `max_batch_count = 0` / `max_aggregate_count = 0` → no count cap
//!
//! ## Example
//! ```rust
//! use intakevisor::{FileHandle, RejectionReason, ValidationPolicy};
//!
//! let policy = ValidationPolicy::permissive()
//!     .allow(".pdf").unwrap()
//!     .with_max_file_size(10 * 1024 * 1024);
//!
//! let out = policy.validate(&[FileHandle::from_bytes("virus.exe", "", vec![0u8; 16])], 0);
//! assert!(out.accepted.is_empty());
//! assert_eq!(out.rejected[0].reason(), RejectionReason::UnsupportedType);
//! assert_eq!(out.rejected[0].file_name(), Some("virus.exe"));
//! ```

use std::fmt;
use std::sync::Arc;

use crate::policies::matcher::{MatcherParseError, TypeMatcher};
use crate::tasks::FileHandle;

/// Why a file (or a whole batch) was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectionReason {
    /// File type is not in the allow-list.
    UnsupportedType,
    /// File is larger than the size cap.
    TooLarge,
    /// Batch would exceed the per-selection or aggregate count cap.
    CountExceeded,
}

impl RejectionReason {
    /// Stable upper-case code (`UNSUPPORTED_TYPE`, `TOO_LARGE`, `COUNT_EXCEEDED`).
    pub fn code(self) -> &'static str {
        match self {
            RejectionReason::UnsupportedType => "UNSUPPORTED_TYPE",
            RejectionReason::TooLarge => "TOO_LARGE",
            RejectionReason::CountExceeded => "COUNT_EXCEEDED",
        }
    }
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A validation-time refusal. Never creates a task and never touches the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectionRecord {
    file_name: Option<Arc<str>>,
    reason: RejectionReason,
    message: String,
}

impl RejectionRecord {
    fn for_file(file: &FileHandle, reason: RejectionReason, message: String) -> Self {
        Self {
            file_name: Some(file.name_arc()),
            reason,
            message,
        }
    }

    fn aggregate(message: String) -> Self {
        Self {
            file_name: None,
            reason: RejectionReason::CountExceeded,
            message,
        }
    }

    /// Rejected file name; `None` for the batch-wide `CountExceeded` record.
    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    /// Rejection reason.
    pub fn reason(&self) -> RejectionReason {
        self.reason
    }

    /// Rendered, user-facing message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Outcome of classifying a single file against the per-file rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileVerdict {
    /// File passes every per-file rule.
    Allowed,
    /// File type is not in the allow-list.
    UnsupportedType,
    /// File exceeds the size cap.
    TooLarge,
}

/// Result of [`ValidationPolicy::validate`].
#[derive(Debug, Clone, Default)]
pub struct Validation {
    /// Files that passed, in input order.
    pub accepted: Vec<FileHandle>,
    /// Rejections, in input order (or a single batch-wide record).
    pub rejected: Vec<RejectionRecord>,
}

/// Allow-list, size cap and count caps for incoming batches.
///
/// ## Field semantics
/// - `allowed_types`: type matchers; empty = allow everything
/// - `max_file_size_bytes`: per-file cap (`0` = unlimited)
/// - `max_batch_count`: files per selection (`0` = unlimited)
/// - `max_aggregate_count`: non-terminal tasks + new batch (`0` = unlimited)
#[derive(Debug, Clone)]
pub struct ValidationPolicy {
    /// Allowed types (media types, media ranges, extensions).
    pub allowed_types: Vec<TypeMatcher>,
    /// Maximum size of a single file in bytes.
    pub max_file_size_bytes: u64,
    /// Maximum number of files in one selection.
    pub max_batch_count: usize,
    /// Ceiling on existing non-terminal tasks plus the new batch.
    pub max_aggregate_count: usize,
}

impl Default for ValidationPolicy {
    /// Document-oriented defaults:
    ///
    /// - PDF, images, plain text, CSV/Markdown and common office formats
    /// - `max_file_size_bytes = 10 MiB`
    /// - `max_batch_count = 20`, `max_aggregate_count = 20`
    fn default() -> Self {
        let mut allowed_types = vec![
            TypeMatcher::media_type("application/pdf"),
            TypeMatcher::media_range("image"),
            TypeMatcher::media_range("text"),
        ];
        allowed_types.extend(
            ["doc", "docx", "xls", "xlsx", "ppt", "pptx", "odt", "ods", "csv", "md"]
                .into_iter()
                .map(TypeMatcher::extension),
        );

        Self {
            allowed_types,
            max_file_size_bytes: 10 * 1024 * 1024,
            max_batch_count: 20,
            max_aggregate_count: 20,
        }
    }
}

impl ValidationPolicy {
    /// A policy with no rules at all (every sentinel set to "unlimited").
    pub fn permissive() -> Self {
        Self {
            allowed_types: Vec::new(),
            max_file_size_bytes: 0,
            max_batch_count: 0,
            max_aggregate_count: 0,
        }
    }

    /// Replaces the allow-list.
    pub fn with_allowed(mut self, matchers: impl IntoIterator<Item = TypeMatcher>) -> Self {
        self.allowed_types = matchers.into_iter().collect();
        self
    }

    /// Appends one allow-list entry parsed from `accept`-attribute syntax.
    pub fn allow(mut self, matcher: &str) -> Result<Self, MatcherParseError> {
        self.allowed_types.push(matcher.parse()?);
        Ok(self)
    }

    /// Sets the per-file size cap (`0` = unlimited).
    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size_bytes = bytes;
        self
    }

    /// Sets the per-selection count cap (`0` = unlimited).
    pub fn with_max_batch_count(mut self, n: usize) -> Self {
        self.max_batch_count = n;
        self
    }

    /// Sets the aggregate count cap (`0` = unlimited).
    pub fn with_max_aggregate_count(mut self, n: usize) -> Self {
        self.max_aggregate_count = n;
        self
    }

    /// Size cap as an `Option` (`None` = unlimited).
    #[inline]
    pub fn file_size_limit(&self) -> Option<u64> {
        (self.max_file_size_bytes > 0).then_some(self.max_file_size_bytes)
    }

    /// Per-selection cap as an `Option` (`None` = unlimited).
    #[inline]
    pub fn batch_limit(&self) -> Option<usize> {
        (self.max_batch_count > 0).then_some(self.max_batch_count)
    }

    /// Aggregate cap as an `Option` (`None` = unlimited).
    #[inline]
    pub fn aggregate_limit(&self) -> Option<usize> {
        (self.max_aggregate_count > 0).then_some(self.max_aggregate_count)
    }

    /// Classifies a single file against the per-file rules (type first, then size).
    pub fn classify(&self, file: &FileHandle) -> FileVerdict {
        let type_ok =
            self.allowed_types.is_empty() || self.allowed_types.iter().any(|m| m.matches(file));
        if !type_ok {
            return FileVerdict::UnsupportedType;
        }
        match self.file_size_limit() {
            Some(limit) if file.size() > limit => FileVerdict::TooLarge,
            _ => FileVerdict::Allowed,
        }
    }

    /// Splits `batch` into accepted files and rejections.
    ///
    /// `existing_non_terminal` is the number of tasks currently `Queued` or
    /// `Uploading` in the registry.
    pub fn validate(&self, batch: &[FileHandle], existing_non_terminal: usize) -> Validation {
        if let Some(max) = self.aggregate_limit() {
            if existing_non_terminal.saturating_add(batch.len()) > max {
                return Validation {
                    accepted: Vec::new(),
                    rejected: vec![RejectionRecord::aggregate(format!(
                        "Too many files: {} selected with {} already in progress, at most {} allowed",
                        batch.len(),
                        existing_non_terminal,
                        max
                    ))],
                };
            }
        }
        if let Some(max) = self.batch_limit() {
            if batch.len() > max {
                return Validation {
                    accepted: Vec::new(),
                    rejected: vec![RejectionRecord::aggregate(format!(
                        "Too many files: {} selected, at most {} per selection",
                        batch.len(),
                        max
                    ))],
                };
            }
        }

        let mut out = Validation::default();
        for file in batch {
            match self.classify(file) {
                FileVerdict::Allowed => out.accepted.push(file.clone()),
                FileVerdict::UnsupportedType => {
                    let shown = match file.media_type() {
                        "" => "unknown type".to_string(),
                        t => t.to_string(),
                    };
                    out.rejected.push(RejectionRecord::for_file(
                        file,
                        RejectionReason::UnsupportedType,
                        format!("{}: file type not supported ({shown})", file.name()),
                    ));
                }
                FileVerdict::TooLarge => {
                    let limit = self.max_file_size_bytes;
                    out.rejected.push(RejectionRecord::for_file(
                        file,
                        RejectionReason::TooLarge,
                        format!(
                            "{}: {} exceeds the {} limit",
                            file.name(),
                            format_bytes(file.size()),
                            format_bytes(limit)
                        ),
                    ));
                }
            }
        }
        out
    }
}

/// Formats a byte count with binary units (`1.5 MB` = 1.5 × 1024²).
fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}
