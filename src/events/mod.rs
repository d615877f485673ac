//! The event bus: a single fan-out point for `AgentEvent`s with a bounded
//! per-subscriber buffer. Filtering by pattern, self-exclusion, and
//! one-shot removal are the subscription service's job (see
//! `crate::subscription`) — the bus itself delivers every event to every
//! raw subscriber in emission order.
use crate::error::{CoreError, Result};
use crate::models::AgentEvent;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};

/// Raw event bus. `emit` suspends at a full subscriber channel until room
/// frees up, so it can never overflow; `try_emit` never blocks and
/// reports whether every current subscriber accepted the event.
pub struct EventBus {
    subscribers: Arc<RwLock<HashMap<String, mpsc::Sender<AgentEvent>>>>,
    buffer: usize,
}

impl EventBus {
    pub fn new(buffer: usize) -> Self {
        Self {
            subscribers: Arc::new(RwLock::new(HashMap::new())),
            buffer,
        }
    }

    /// Registers a raw subscriber (typically the subscription service's
    /// single consumer loop) and returns its receiving half.
    pub async fn subscribe_raw(&self, subscriber_id: impl Into<String>) -> mpsc::Receiver<AgentEvent> {
        let (tx, rx) = mpsc::channel(self.buffer);
        self.subscribers.write().await.insert(subscriber_id.into(), tx);
        rx
    }

    pub async fn unsubscribe_raw(&self, subscriber_id: &str) {
        self.subscribers.write().await.remove(subscriber_id);
    }

    /// Delivers `event` to every raw subscriber, suspending at each full
    /// channel until it drains. A subscriber whose receiver has been
    /// dropped is silently skipped rather than treated as an error.
    pub async fn emit(&self, event: AgentEvent) -> Result<()> {
        let senders: Vec<mpsc::Sender<AgentEvent>> =
            self.subscribers.read().await.values().cloned().collect();
        for sender in senders {
            let _ = sender.send(event.clone()).await;
        }
        Ok(())
    }

    /// Non-blocking delivery. Returns `true` only if every current
    /// subscriber had room to accept the event immediately.
    pub fn try_emit(&self, event: AgentEvent) -> bool {
        let Ok(guard) = self.subscribers.try_read() else {
            return false;
        };
        let mut accepted = true;
        for sender in guard.values() {
            if sender.try_send(event.clone()).is_err() {
                accepted = false;
            }
        }
        accepted
    }

    /// Convenience wrapper returning `BufferOverflow` when `try_emit`
    /// could not deliver to every subscriber; used by best-effort
    /// mirror/UI paths rather than the core coordination path.
    pub fn try_emit_or_overflow(&self, event: AgentEvent) -> Result<()> {
        if self.try_emit(event) {
            Ok(())
        } else {
            Err(CoreError::BufferOverflow)
        }
    }
}
