//! # Progress reporting from inside a transport call.
//!
//! A [`Progress`] is created by the batch driver for every upload and handed to
//! [`Transport::upload`](crate::Transport::upload). It writes through to the
//! registry (`mark_progress`) and publishes `TaskProgress` when the value rose.
//!
//! ## Rules
//! - Values only rise and are clamped to 100; lower or equal values are ignored.
//! - Reports after the task settled or was removed are ignored.
//! - Cheap to clone; may be moved into spawned sub-tasks of the transport.

use std::sync::Arc;

use crate::core::TaskRegistry;
use crate::events::{Bus, Event, EventKind};
use crate::tasks::TaskId;

/// Progress reporter bound to one upload task.
#[derive(Clone)]
pub struct Progress {
    id: TaskId,
    registry: Arc<TaskRegistry>,
    bus: Bus,
}

impl Progress {
    pub(crate) fn new(id: TaskId, registry: Arc<TaskRegistry>, bus: Bus) -> Self {
        Self { id, registry, bus }
    }

    /// Id of the task this reporter belongs to.
    pub fn task(&self) -> &TaskId {
        &self.id
    }

    /// Reports progress in percent. Returns `true` if the stored value rose.
    pub async fn percent(&self, pct: u8) -> bool {
        let pct = pct.min(100);
        let changed = self.registry.mark_progress(&self.id, pct).await;
        if changed {
            self.bus.publish(
                Event::new(EventKind::TaskProgress)
                    .with_task(&self.id)
                    .with_progress(pct),
            );
        }
        changed
    }

    /// Reports progress as transferred bytes out of `total`.
    ///
    /// `total = 0` counts as complete.
    pub async fn bytes(&self, sent: u64, total: u64) -> bool {
        self.percent(percent_of(sent, total)).await
    }
}

impl std::fmt::Debug for Progress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Progress").field("task", &self.id).finish()
    }
}

fn percent_of(sent: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    let pct = u128::from(sent.min(total)) * 100 / u128::from(total);
    pct as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::FileHandle;

    #[test]
    fn test_percent_of() {
        assert_eq!(percent_of(0, 200), 0);
        assert_eq!(percent_of(50, 200), 25);
        assert_eq!(percent_of(500, 200), 100);
        assert_eq!(percent_of(0, 0), 100);
        assert_eq!(percent_of(u64::MAX - 1, u64::MAX), 99);
    }

    #[tokio::test]
    async fn test_reports_write_through_and_publish() {
        let reg = Arc::new(TaskRegistry::new());
        let bus = Bus::new(8);
        let mut rx = bus.subscribe();
        let id = reg
            .enqueue(vec![FileHandle::from_bytes("a.pdf", "application/pdf", vec![1u8; 4])])
            .await[0]
            .id()
            .clone();
        reg.mark_uploading(&id).await;

        let p = Progress::new(id.clone(), Arc::clone(&reg), bus);
        assert!(p.bytes(2, 4).await);
        assert!(!p.percent(10).await);

        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::TaskProgress);
        assert_eq!(ev.progress, Some(50));
        assert_eq!(reg.get(&id).await.unwrap().progress(), 50);
        assert!(rx.try_recv().is_err());
    }
}
