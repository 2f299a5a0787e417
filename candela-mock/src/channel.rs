use std::sync::Mutex as StdMutex;
use std::sync::PoisonError;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use candela_core::{CandlesError, PushChannel};
use serde_json::Value;
use tokio::sync::{Mutex, mpsc};

/// In-process push channel.
///
/// Payloads passed to `send` are recorded in an outbox; messages injected
/// with [`MockPushChannel::deliver`] are returned by `receive` in order.
pub struct MockPushChannel {
    outbox: StdMutex<Vec<Value>>,
    inbound_tx: StdMutex<Option<mpsc::UnboundedSender<Value>>>,
    inbound_rx: Mutex<mpsc::UnboundedReceiver<Value>>,
    fail_sends: AtomicBool,
    connected: AtomicBool,
}

impl Default for MockPushChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPushChannel {
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            outbox: StdMutex::new(Vec::new()),
            inbound_tx: StdMutex::new(Some(tx)),
            inbound_rx: Mutex::new(rx),
            fail_sends: AtomicBool::new(false),
            connected: AtomicBool::new(false),
        }
    }

    /// Queue a message for the next `receive`. Returns false once closed.
    pub fn deliver(&self, message: Value) -> bool {
        let guard = self.inbound_tx.lock().unwrap_or_else(PoisonError::into_inner);
        guard.as_ref().is_some_and(|tx| tx.send(message).is_ok())
    }

    /// Close the inbound side; pending messages are still delivered.
    pub fn close(&self) {
        self.inbound_tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    /// Make every subsequent `send` fail with a transport error.
    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    /// Payloads sent so far.
    #[must_use]
    pub fn sent(&self) -> Vec<Value> {
        self.outbox
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Whether `connect` has been called.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PushChannel for MockPushChannel {
    async fn connect(&self) -> Result<(), CandlesError> {
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn send(&self, payload: Value) -> Result<(), CandlesError> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(CandlesError::transport("mock-push", "send failed"));
        }
        self.outbox
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(payload);
        Ok(())
    }

    async fn receive(&self) -> Result<Option<Value>, CandlesError> {
        Ok(self.inbound_rx.lock().await.recv().await)
    }
}
