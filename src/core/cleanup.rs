//! # Auto-cleanup scheduler: retire succeeded tasks after a delay.
//!
//! [`CleanupScheduler`] owns one cancellable one-shot timer per succeeded task.
//! When a timer fires, the task is removed from the registry and `TaskRemoved`
//! (`reason = "auto_cleanup"`) is published.
//!
//! ```text
//! schedule(id) ──► child token of root ──► spawn: select! {
//!                                              token.cancelled() → nothing
//!                                              sleep(delay)      → registry.remove(id)
//!                                          }
//! cancel(id)   ──► token.cancel()            (manual removal)
//! shutdown()   ──► root.cancel()             (every timer at once; also on Drop)
//! ```
//!
//! ## Rules
//! - Re-scheduling an id replaces (cancels) its previous timer.
//! - Firing after manual removal, or cancelling an unknown id, is a silent no-op.
//! - A zero delay disables the scheduler: `schedule()` returns `false`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::core::TaskRegistry;
use crate::events::{Bus, Event, EventKind};
use crate::tasks::TaskId;

/// Armed timer: generation (to detect replacement) and its token.
type Timers = Arc<Mutex<HashMap<TaskId, (u64, CancellationToken)>>>;

/// Scheduler of delayed task removal.
pub struct CleanupScheduler {
    delay: Option<Duration>,
    timers: Timers,
    generation: AtomicU64,
    root: CancellationToken,
    registry: Arc<TaskRegistry>,
    bus: Bus,
}

impl CleanupScheduler {
    /// Creates a scheduler. `delay = 0` disables auto-cleanup.
    pub fn new(delay: Duration, registry: Arc<TaskRegistry>, bus: Bus) -> Self {
        Self {
            delay: (delay > Duration::ZERO).then_some(delay),
            timers: Arc::new(Mutex::new(HashMap::new())),
            generation: AtomicU64::new(0),
            root: CancellationToken::new(),
            registry,
            bus,
        }
    }

    /// Configured delay; `None` when auto-cleanup is disabled.
    pub fn delay(&self) -> Option<Duration> {
        self.delay
    }

    /// Arms (or re-arms) the removal timer for `id`.
    ///
    /// Returns `false` if auto-cleanup is disabled or the scheduler was shut down.
    /// Must be called inside a tokio runtime.
    pub fn schedule(&self, id: &TaskId) -> bool {
        let Some(delay) = self.delay else {
            return false;
        };
        if self.root.is_cancelled() {
            return false;
        }

        let token = self.root.child_token();
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        if let Some((_, prev)) = lock(&self.timers).insert(id.clone(), (generation, token.clone())) {
            prev.cancel();
        }

        let timers = Arc::clone(&self.timers);
        let registry = Arc::clone(&self.registry);
        let bus = self.bus.clone();
        let task_id = id.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    if !release(&timers, &task_id, generation) {
                        return;
                    }
                    match registry.remove(&task_id).await {
                        Some(task) => {
                            tracing::debug!(task = %task_id, "auto-cleanup removed task");
                            bus.publish(
                                Event::new(EventKind::TaskRemoved)
                                    .for_task(&task)
                                    .with_reason("auto_cleanup"),
                            );
                        }
                        None => {
                            tracing::trace!(task = %task_id, "auto-cleanup found task already gone");
                        }
                    }
                }
            }
        });

        self.bus.publish(
            Event::new(EventKind::CleanupScheduled)
                .with_task(id)
                .with_delay(delay),
        );
        true
    }

    /// Disarms the timer for `id`. Returns `true` if one was armed.
    pub fn cancel(&self, id: &TaskId) -> bool {
        let Some((_, token)) = lock(&self.timers).remove(id) else {
            return false;
        };
        token.cancel();
        self.bus
            .publish(Event::new(EventKind::CleanupCancelled).with_task(id));
        true
    }

    /// Number of armed timers.
    pub fn pending(&self) -> usize {
        lock(&self.timers).len()
    }

    /// Cancels every timer; later `schedule()` calls are refused.
    pub fn shutdown(&self) {
        self.root.cancel();
        lock(&self.timers).clear();
    }
}

impl Drop for CleanupScheduler {
    fn drop(&mut self) {
        self.root.cancel();
    }
}

/// Drops the map entry if it still belongs to `generation`.
fn release(timers: &Timers, id: &TaskId, generation: u64) -> bool {
    let mut map = lock(timers);
    match map.get(id) {
        Some((g, _)) if *g == generation => {
            map.remove(id);
            true
        }
        _ => false,
    }
}

fn lock(timers: &Timers) -> MutexGuard<'_, HashMap<TaskId, (u64, CancellationToken)>> {
    timers.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::FileHandle;

    async fn succeeded(reg: &TaskRegistry, name: &str) -> TaskId {
        let id = reg
            .enqueue(vec![FileHandle::from_bytes(name, "application/pdf", vec![0u8; 4])])
            .await[0]
            .id()
            .clone();
        reg.mark_uploading(&id).await;
        reg.mark_succeeded(&id).await;
        id
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_removes_task_after_delay() {
        let reg = Arc::new(TaskRegistry::new());
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let cleanup = CleanupScheduler::new(Duration::from_millis(3000), Arc::clone(&reg), bus);
        let id = succeeded(&reg, "a.pdf").await;

        assert!(cleanup.schedule(&id));
        assert_eq!(cleanup.pending(), 1);

        tokio::time::sleep(Duration::from_millis(2900)).await;
        assert!(reg.get(&id).await.is_some());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(reg.get(&id).await.is_none());
        assert_eq!(cleanup.pending(), 0);

        let kinds: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|e| (e.kind, e.reason.as_deref().map(str::to_string)))
            .collect();
        assert_eq!(
            kinds,
            [
                (EventKind::CleanupScheduled, None),
                (EventKind::TaskRemoved, Some("auto_cleanup".to_string())),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_disarms_and_unknown_is_noop() {
        let reg = Arc::new(TaskRegistry::new());
        let cleanup = CleanupScheduler::new(Duration::from_secs(1), Arc::clone(&reg), Bus::new(8));
        let id = succeeded(&reg, "a.pdf").await;

        cleanup.schedule(&id);
        assert!(cleanup.cancel(&id));
        assert!(!cleanup.cancel(&id));

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(reg.get(&id).await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reschedule_replaces_previous_timer() {
        let reg = Arc::new(TaskRegistry::new());
        let cleanup = CleanupScheduler::new(Duration::from_secs(1), Arc::clone(&reg), Bus::new(8));
        let id = succeeded(&reg, "a.pdf").await;

        cleanup.schedule(&id);
        tokio::time::sleep(Duration::from_millis(600)).await;
        cleanup.schedule(&id);
        assert_eq!(cleanup.pending(), 1);

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert!(reg.get(&id).await.is_some());

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert!(reg.get(&id).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fire_after_manual_removal_is_silent() {
        let reg = Arc::new(TaskRegistry::new());
        let cleanup = CleanupScheduler::new(Duration::from_secs(1), Arc::clone(&reg), Bus::new(8));
        let id = succeeded(&reg, "a.pdf").await;

        cleanup.schedule(&id);
        reg.remove(&id).await;
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(reg.is_empty().await);
        assert_eq!(cleanup.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_and_zero_delay() {
        let reg = Arc::new(TaskRegistry::new());
        let cleanup = CleanupScheduler::new(Duration::from_secs(1), Arc::clone(&reg), Bus::new(8));
        let a = succeeded(&reg, "a.pdf").await;
        let b = succeeded(&reg, "b.pdf").await;
        cleanup.schedule(&a);
        cleanup.schedule(&b);

        cleanup.shutdown();
        assert_eq!(cleanup.pending(), 0);
        assert!(!cleanup.schedule(&a));
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(reg.len().await, 2);

        let disabled = CleanupScheduler::new(Duration::ZERO, Arc::clone(&reg), Bus::new(8));
        assert_eq!(disabled.delay(), None);
        assert!(!disabled.schedule(&a));
    }
}
