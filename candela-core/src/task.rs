use tokio::task::JoinHandle;

/// Abstraction over a handle that can be queried for completion and aborted.
pub trait Abortable {
    /// Abort the underlying task if it is still running.
    fn abort(&mut self);
    /// Return `true` if the underlying task has completed.
    fn is_finished(&self) -> bool;
}

impl<T> Abortable for JoinHandle<T> {
    fn abort(&mut self) {
        // JoinHandle::abort takes &self
        Self::abort(self);
    }

    fn is_finished(&self) -> bool {
        Self::is_finished(self)
    }
}

/// Abstraction over a stop signal observed by feed tasks.
pub trait Stoppable {
    /// Send a best-effort stop signal to request graceful shutdown.
    fn send(self);
}

impl Stoppable for tokio::sync::watch::Sender<bool> {
    fn send(self) {
        // receivers may already be gone
        let _ = Self::send(&self, true);
    }
}

/// Drop-time logic for feed handles:
/// - send a best-effort stop signal if present
/// - abort every task that hasn't finished yet
pub fn drop_impl<H, S>(tasks: &mut Vec<H>, stop_tx: &mut Option<S>)
where
    H: Abortable,
    S: Stoppable,
{
    if let Some(tx) = stop_tx.take() {
        tx.send();
    }
    for mut h in tasks.drain(..) {
        if !h.is_finished() {
            h.abort();
        }
    }
}
