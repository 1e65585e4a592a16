//! # Core intake runtime.
//!
//! - [`IntakeConfig`] runtime configuration
//! - [`Orchestrator`] public entry point, built with [`OrchestratorBuilder`]
//! - [`TaskRegistry`] owner of task state
//! - [`CleanupScheduler`] delayed removal of succeeded tasks
//! - [`RejectionReporter`] the current rejection notice
//! - [`IntakeGate`] derived "uploads in flight" flag
//!
//! Internal: `BatchDriver` (drives one batch) and `upload_once` (one transport call).

mod builder;
mod cleanup;
mod config;
mod driver;
mod gate;
mod orchestrator;
mod registry;
mod rejection;
mod runner;

pub use builder::OrchestratorBuilder;
pub use cleanup::CleanupScheduler;
pub use config::IntakeConfig;
pub use gate::IntakeGate;
pub use orchestrator::{BatchHandle, Orchestrator};
pub use registry::{IntakeStats, TaskRegistry};
pub use rejection::{RejectionNotice, RejectionReporter};
