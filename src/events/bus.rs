//! # Event bus for broadcasting intake events.
//!
//! [`Bus`] is a thin wrapper around [`tokio::sync::broadcast`]. Everything that changes
//! intake state publishes here: the orchestrator, batch drivers, progress handles,
//! the cleanup scheduler and the gate.
//!
//! ## Architecture
//! ```text
//! Publishers (many):                       Consumer (one):
//!   Orchestrator ──┐
//!   BatchDriver  ──┤
//!   Progress     ──┼──► Bus ──► subscriber_listener ──► SubscriberSet
//!   Cleanup      ──┤  (broadcast)   (in Orchestrator)
//!   IntakeGate   ──┘
//! ```
//!
//! ## Rules
//! - `publish()` never blocks and never fails; with no receivers the event is dropped.
//! - A single ring buffer holds recent events for all receivers.
//! - Slow receivers get `RecvError::Lagged(n)` and skip the `n` oldest items.
//! - Events are observability only: intake state lives in the registry, never here.

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for intake events.
///
/// Cheap to clone (holds an `Arc`-backed sender).
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a new bus with the given channel capacity (clamped to at least 1).
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel::<Event>(capacity.max(1));
        Self { tx }
    }

    /// Publishes an event to all active receivers (fire-and-forget).
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Creates a new receiver that observes events published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;

    #[tokio::test]
    async fn test_publish_reaches_subscriber() {
        let bus = Bus::new(8);
        let mut rx = bus.subscribe();
        bus.publish(Event::new(EventKind::GateChanged).with_disabled(true));

        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::GateChanged);
        assert_eq!(ev.disabled, Some(true));
    }

    #[test]
    fn test_publish_without_receivers_is_silent() {
        let bus = Bus::new(0);
        bus.publish(Event::new(EventKind::TaskQueued));
    }
}
