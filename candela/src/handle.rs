use std::sync::{Arc, Mutex, PoisonError};

use candela_core::task::drop_impl;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Backfill tasks spawned by the live loop, owned by the feed handle.
#[derive(Clone, Default)]
pub(crate) struct TaskSet(Arc<Mutex<Vec<JoinHandle<()>>>>);

impl TaskSet {
    pub(crate) fn push(&self, task: JoinHandle<()>) {
        let mut guard = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        guard.retain(|h| !h.is_finished());
        guard.push(task);
    }

    fn take(&self) -> Vec<JoinHandle<()>> {
        let mut guard = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::take(&mut *guard)
    }

    fn all_finished(&self) -> bool {
        let guard = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        guard.iter().all(JoinHandle::is_finished)
    }
}

/// Owns the tasks of a running feed.
///
/// `stop` requests a graceful shutdown and waits for the live loop and any
/// backfill to return. Dropping the handle sends the same request and aborts
/// whatever is still running.
pub struct FeedHandle {
    live: Option<JoinHandle<()>>,
    tasks: TaskSet,
    stop_tx: Option<watch::Sender<bool>>,
}

impl FeedHandle {
    pub(crate) fn new(
        live: JoinHandle<()>,
        tasks: TaskSet,
        stop_tx: watch::Sender<bool>,
    ) -> Self {
        Self {
            live: Some(live),
            tasks,
            stop_tx: Some(stop_tx),
        }
    }

    /// Stop every task and wait for them to finish.
    pub async fn stop(mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(true);
        }
        // the live loop is the only spawner, so join it first
        if let Some(live) = self.live.take() {
            let _ = live.await;
        }
        for task in self.tasks.take() {
            let _ = task.await;
        }
    }

    /// `true` once the live loop and every backfill task have returned.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.live.as_ref().is_none_or(JoinHandle::is_finished) && self.tasks.all_finished()
    }
}

impl Drop for FeedHandle {
    fn drop(&mut self) {
        let mut tasks: Vec<JoinHandle<()>> = self.live.take().into_iter().collect();
        tasks.extend(self.tasks.take());
        drop_impl(&mut tasks, &mut self.stop_tx);
    }
}

impl std::fmt::Debug for FeedHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedHandle")
            .field("finished", &self.is_finished())
            .finish_non_exhaustive()
    }
}
