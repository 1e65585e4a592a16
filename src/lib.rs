//! # intakevisor
//!
//! **Intakevisor** is an in-memory upload intake pipeline for async Rust.
//!
//! It accepts batches of user-selected files, validates them against a policy,
//! tracks every accepted file as an independent upload task, drives each task
//! through a pluggable transport, and retires succeeded tasks after a delay.
//! The crate is the client-side piece behind an "attach files" control: the
//! surface renders snapshots, the intake owns the state.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!            selection surface (accept / remove / dismiss, reads snapshots)
//!                                   │
//!                                   ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Orchestrator                                                     │
//! │  - ValidationPolicy  (pure accept/reject split)                   │
//! │  - RejectionReporter (single user-facing notice, watch channel)   │
//! │  - TaskRegistry      (owner of UploadTask state, creation order)  │
//! │  - IntakeGate        (disabled while anything is Uploading)       │
//! │  - CleanupScheduler  (one cancellable timer per succeeded task)   │
//! │  - Bus + SubscriberSet (events to user subscribers)               │
//! └──────┬──────────────────┬──────────────────┬──────────────────────┘
//!        ▼                  ▼                  ▼
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │ BatchDriver  │   │ BatchDriver  │   │ BatchDriver  │
//!     │  (batch #1)  │   │  (batch #2)  │   │  (batch #3)  │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼                  ▼
//!      Transport::upload(file, Progress, CancellationToken)
//!
//!  Everything above publishes Events ──► Bus ──► subscriber_listener
//!                                                   └─► SubscriberSet ──► worker per subscriber
//! ```
//!
//! ### Lifecycle
//! ```text
//! accept(batch) ──► validate ──┬─► rejected ──► RejectionNotice (replaces previous)
//!                              └─► accepted ──► Queued
//!
//! Queued ──► Uploading ──┬─► Succeeded ──► (cleanup_delay) ──► removed
//!                        └─► Failed      (stays until removed, carries error text)
//!
//! remove(id): any status; cancels timer and signals the in-flight upload
//! ```
//!
//! ## Features
//! | Area              | Description                                                     | Key types / traits                              |
//! |-------------------|-----------------------------------------------------------------|-------------------------------------------------|
//! | **Intake**        | Accept batches, remove tasks, observe gate and rejections.      | [`Orchestrator`], [`BatchHandle`]               |
//! | **Policies**      | Type allow-list, size and count caps, drive concurrency.        | [`ValidationPolicy`], [`TypeMatcher`], [`DrivePolicy`] |
//! | **State**         | Task snapshots in creation order.                               | [`TaskRegistry`], [`UploadTask`], [`TaskStatus`] |
//! | **Transport**     | Plug in the actual upload.                                      | [`Transport`], [`TransportFn`], [`Progress`]    |
//! | **Subscriber API**| Hook into intake events (logging, metrics, UI refresh).          | [`Subscribe`]                                   |
//! | **Errors**        | Typed errors for the runtime and for transports.                | [`IntakeError`], [`TransportError`]             |
//! | **Configuration** | Centralize runtime settings.                                    | [`IntakeConfig`]                                |
//!
//! ## Optional features
//! - `logging`: exports [`LogWriter`], a subscriber rendering events through `tracing`.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//! use intakevisor::{
//!     FileHandle, IntakeConfig, Orchestrator, Progress, TransportError, TransportFn,
//! };
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     #[cfg(feature = "logging")]
//!     let subs: Vec<Arc<dyn intakevisor::Subscribe>> = vec![Arc::new(intakevisor::LogWriter::new())];
//!     #[cfg(not(feature = "logging"))]
//!     let subs: Vec<Arc<dyn intakevisor::Subscribe>> = Vec::new();
//!
//!     let intake = Orchestrator::builder(IntakeConfig::default())
//!         .with_subscribers(subs)
//!         .with_transport(TransportFn::arc(
//!             "noop",
//!             |_file: FileHandle, _progress: Progress, _ctx: CancellationToken| async {
//!                 Ok::<_, TransportError>(())
//!             },
//!         ))
//!         .build()?;
//!
//!     let batch = intake
//!         .accept(vec![
//!             FileHandle::from_bytes("report.pdf", "application/pdf", vec![0u8; 2048]),
//!             FileHandle::from_bytes("virus.exe", "application/x-msdownload", vec![0u8; 16]),
//!         ])
//!         .await?;
//!
//!     assert_eq!(batch.accepted().len(), 1);
//!     assert_eq!(batch.rejected().len(), 1);
//!     batch.settled().await;
//!
//!     intake.shutdown().await?;
//!     Ok(())
//! }
//! ```
mod core;
mod error;
mod events;
mod policies;
mod subscribers;
mod tasks;
mod transport;

// ---- Public re-exports ----

pub use crate::core::{
    BatchHandle, CleanupScheduler, IntakeConfig, IntakeGate, IntakeStats, Orchestrator,
    OrchestratorBuilder, RejectionNotice, RejectionReporter, TaskRegistry,
};
pub use crate::error::{GENERIC_FAILURE_MESSAGE, IntakeError, TransportError};
pub use crate::events::{Bus, Event, EventKind};
pub use crate::policies::{
    DrivePolicy, FileVerdict, MatcherParseError, RejectionReason, RejectionRecord, TypeMatcher,
    Validation, ValidationPolicy,
};
pub use crate::subscribers::{Subscribe, SubscriberSet};
pub use crate::tasks::{FileHandle, Payload, TaskId, TaskStatus, UploadTask};
pub use crate::transport::{Progress, Transport, TransportFn, TransportRef};

// Optional: expose the built-in tracing subscriber.
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use crate::subscribers::LogWriter;
