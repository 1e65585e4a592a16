//! # Event subscribers for the intake runtime.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`] fan-out and
//! built-in implementations for handling events broadcast through the
//! [`Bus`](crate::events::Bus).
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   Orchestrator / BatchDriver ── publish(Event) ──► Bus ──► subscriber_listener
//!                                                               │
//!                                                               ▼
//!                                                         SubscriberSet::emit
//!                                                    ┌──────────┼──────────┐
//!                                                    ▼          ▼          ▼
//!                                                LogWriter   UI refresh  Custom
//! ```
//!
//! ## Subscriber types
//! - **Passive subscribers** - observe and react to events (logging, metrics, alerts)
//! - **UI bridges** - forward events to a rendering surface for repaint

#[cfg(feature = "logging")]
mod embedded;
mod set;
mod subscriber;

#[cfg(feature = "logging")]
pub use embedded::LogWriter;
pub(crate) use set::panic_info;
pub use set::SubscriberSet;
pub use subscriber::Subscribe;
