//! # Intake gate: derived "uploads in flight" flag.
//!
//! [`IntakeGate`] mirrors `registry.any_uploading()` into a `watch` channel the
//! selection surface can observe to disable its control.
//!
//! ```text
//! BatchDriver / Orchestrator::remove ──► refresh() ──► any_uploading()
//!                                             │
//!                                    value flipped? ── yes ──► watch::send + GateChanged
//! ```
//!
//! ## Rules
//! - `disabled == any task is Uploading`, recomputed on every `refresh()`.
//! - Refreshes are serialized so a stale read never overwrites a newer one.
//! - `GateChanged` is published only when the value actually flips.

use std::sync::Arc;

use tokio::sync::{Mutex, watch};

use crate::core::TaskRegistry;
use crate::events::{Bus, Event, EventKind};

/// Derived intake gate.
pub struct IntakeGate {
    registry: Arc<TaskRegistry>,
    tx: watch::Sender<bool>,
    refresh_lock: Mutex<()>,
    bus: Bus,
}

impl IntakeGate {
    /// Creates an open gate over `registry`.
    pub fn new(registry: Arc<TaskRegistry>, bus: Bus) -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            registry,
            tx,
            refresh_lock: Mutex::new(()),
            bus,
        }
    }

    /// Last computed gate value.
    pub fn is_disabled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Recomputes the gate from the registry and returns the new value.
    pub async fn refresh(&self) -> bool {
        let _guard = self.refresh_lock.lock().await;
        let disabled = self.registry.any_uploading().await;
        let flipped = self.tx.send_if_modified(|current| {
            if *current == disabled {
                return false;
            }
            *current = disabled;
            true
        });
        if flipped {
            tracing::debug!(disabled, "intake gate flipped");
            self.bus
                .publish(Event::new(EventKind::GateChanged).with_disabled(disabled));
        }
        disabled
    }

    /// Receiver observing the gate value.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}
