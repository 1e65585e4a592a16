//! Intake events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to events emitted while batches move through the intake.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Orchestrator`, `BatchDriver`, `Progress`, `CleanupScheduler`,
//!   `IntakeGate`, `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: the orchestrator's subscriber listener task (owns and fans out to `SubscriberSet`)
//!   and anyone holding [`Orchestrator::events`](crate::Orchestrator::events).

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
