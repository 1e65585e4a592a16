//! # Intake runtime configuration.
//!
//! Provides [`IntakeConfig`]: the settings used when building an
//! [`Orchestrator`](crate::Orchestrator) via [`OrchestratorBuilder`](crate::OrchestratorBuilder).
//!
//! ## Sentinel values
//! - `cleanup_delay = 0s` → auto-cleanup disabled (succeeded tasks stay until removed)
//! - `grace = 0s` → `shutdown()` does not wait for in-flight uploads
//! - `bus_capacity = 0` → clamped to 1 by [`Bus`](crate::events::Bus)
//!
//! Validation limits follow the same convention (`0` = unlimited), see
//! [`ValidationPolicy`].

use std::time::Duration;

use crate::policies::{DrivePolicy, ValidationPolicy};

/// Configuration for one intake instance.
///
/// ## Field semantics
/// - `policy`: what a batch must satisfy to be accepted
/// - `drive`: how many transport calls of one batch run at once
/// - `cleanup_delay`: time a succeeded task stays visible (`0s` = forever)
/// - `grace`: maximum wait for in-flight uploads on `shutdown()`
/// - `bus_capacity`: event bus ring buffer size (min 1)
/// - `enforce_gate`: refuse `accept()` while any task is uploading
///
/// ## Notes
/// All fields are public. Prefer the helper accessors over sentinel checks.
#[derive(Clone, Debug)]
pub struct IntakeConfig {
    /// Validation policy applied to every incoming batch.
    pub policy: ValidationPolicy,

    /// Concurrency bound for driving one batch.
    pub drive: DrivePolicy,

    /// Delay between `Succeeded` and automatic removal.
    ///
    /// - `Duration::ZERO` = auto-cleanup disabled
    pub cleanup_delay: Duration,

    /// Maximum time `shutdown()` waits for batch drivers.
    ///
    /// If exceeded, `shutdown()` returns `IntakeError::GraceExceeded` naming the
    /// tasks still uploading.
    pub grace: Duration,

    /// Capacity of the event bus broadcast channel.
    ///
    /// Receivers lagging more than `bus_capacity` events skip older items.
    pub bus_capacity: usize,

    /// When set, `accept()` returns `IntakeError::GateClosed` for a batch with
    /// files to enqueue while the gate is disabled. Rejections are reported first.
    ///
    /// Off by default: the selection surface greys out its control from the gate.
    pub enforce_gate: bool,
}

impl IntakeConfig {
    /// Returns the auto-cleanup delay as an `Option`.
    ///
    /// - `None` → succeeded tasks are never removed automatically
    /// - `Some(d)` → removal `d` after success
    #[inline]
    pub fn auto_cleanup(&self) -> Option<Duration> {
        if self.cleanup_delay == Duration::ZERO {
            None
        } else {
            Some(self.cleanup_delay)
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for IntakeConfig {
    /// Default configuration:
    ///
    /// - `policy = ValidationPolicy::default()` (documents, 10 MiB, 20 files)
    /// - `drive = DrivePolicy::Sequential`
    /// - `cleanup_delay = 3s`
    /// - `grace = 5s`
    /// - `bus_capacity = 1024`
    /// - `enforce_gate = false`
    fn default() -> Self {
        Self {
            policy: ValidationPolicy::default(),
            drive: DrivePolicy::default(),
            cleanup_delay: Duration::from_millis(3000),
            grace: Duration::from_secs(5),
            bus_capacity: 1024,
            enforce_gate: false,
        }
    }
}
