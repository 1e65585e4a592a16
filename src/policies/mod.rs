//! Intake policies.
//!
//! This module groups the knobs that decide **which** files become upload tasks
//! and **how many** of them are driven at once.
//!
//! ## Contents
//! - [`ValidationPolicy`] allow-list, size cap and count caps (pure, idempotent)
//! - [`TypeMatcher`] one allow-list entry (`application/pdf`, `image/*`, `.pdf`)
//! - [`DrivePolicy`] concurrency bound for driving a batch (sequential / pooled / unbounded)
//!
//! ## Quick wiring
//! ```text
//! IntakeConfig { policy: ValidationPolicy, drive: DrivePolicy, .. }
//!      └─► Orchestrator::accept uses:
//!           - policy.validate(batch, non_terminal) to split accepted/rejected
//!           - drive.limit() to bound in-flight uploads of the batch
//! ```
//!
//! ## Defaults
//! - `ValidationPolicy::default()` → documents and images, 10 MiB, 20 files.
//! - `DrivePolicy::Sequential`.

mod drive;
mod matcher;
mod validation;

pub use drive::DrivePolicy;
pub use matcher::{MatcherParseError, TypeMatcher};
pub use validation::{FileVerdict, RejectionReason, RejectionRecord, Validation, ValidationPolicy};
