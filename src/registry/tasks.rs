//! # Detached Tasks
//!
//! Side effects of record operations (durable reads and writes, broadcasts)
//! run as detached tokio tasks. The caller never observes their outcome:
//! errors are logged inside the task and a panic only ends that task.
//!
//! The tracker counts tasks in flight so [`DetachedTasks::settle`] can wait
//! for quiescence, which tests and short-lived processes need before they
//! inspect storage or exit.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::Notify;
use tracing::warn;

#[derive(Debug, Default)]
struct Inner {
    pending: AtomicUsize,
    idle: Notify,
}

/// Decrements the pending count when the task ends, panics included
struct PendingGuard(Arc<Inner>);

impl Drop for PendingGuard {
    fn drop(&mut self) {
        if self.0.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DetachedTasks {
    inner: Arc<Inner>,
}

impl DetachedTasks {
    /// Create an empty tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the calling thread is inside a tokio runtime
    pub fn has_runtime() -> bool {
        Handle::try_current().is_ok()
    }

    /// Spawn `fut` on the ambient runtime. Without a runtime the side effect
    /// is dropped.
    pub fn spawn<F>(&self, label: &'static str, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = match Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                warn!(task = label, "no async runtime, side effect dropped");
                return;
            }
        };

        self.inner.pending.fetch_add(1, Ordering::SeqCst);
        let guard = PendingGuard(Arc::clone(&self.inner));
        handle.spawn(async move {
            let _guard = guard;
            fut.await;
        });
    }

    /// Tasks spawned and not yet finished
    pub fn pending(&self) -> usize {
        self.inner.pending.load(Ordering::SeqCst)
    }

    /// Wait until no task is in flight
    pub async fn settle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.pending() == 0 {
                return;
            }
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_settle_waits_for_tasks() {
        let tasks = DetachedTasks::new();
        let done = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let done = Arc::clone(&done);
            tasks.spawn("test", async move {
                tokio::time::sleep(Duration::from_millis(5)).await;
                done.fetch_add(1, Ordering::SeqCst);
            });
        }

        tasks.settle().await;
        assert_eq!(done.load(Ordering::SeqCst), 3);
        assert_eq!(tasks.pending(), 0);
    }

    #[tokio::test]
    async fn test_panicking_task_still_settles() {
        let tasks = DetachedTasks::new();
        tasks.spawn("boom", async {
            panic!("side effect failed");
        });

        tasks.settle().await;
        assert_eq!(tasks.pending(), 0);
    }

    #[test]
    fn test_no_runtime_drops_task() {
        assert!(!DetachedTasks::has_runtime());
        let tasks = DetachedTasks::new();
        tasks.spawn("orphan", async {});
        assert_eq!(tasks.pending(), 0);
    }
}
