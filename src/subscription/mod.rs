//! Per-agent filtered subscriptions over the event bus: wildcard and exact
//! pattern matching, self-exclusion, one-shot removal, and a drainable
//! pending queue per subscriber. Runs as a single consumer over the raw
//! bus rather than a background loop per subscriber, per the design note
//! in spec.md §9 — an equivalent per-subscriber-channel design is also
//! conforming as long as ordering and drain semantics hold.
use crate::events::EventBus;
use crate::models::{AgentEvent, DeliveredEvent, EventSubscription};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

const RAW_CONSUMER_ID: &str = "subscription-service";

struct Inner {
    subscriptions: HashMap<String, EventSubscription>,
    pending: HashMap<String, Vec<DeliveredEvent>>,
}

pub struct SubscriptionService {
    bus: Arc<EventBus>,
    inner: Arc<RwLock<Inner>>,
    listener: RwLock<Option<JoinHandle<()>>>,
}

impl SubscriptionService {
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self {
            bus,
            inner: Arc::new(RwLock::new(Inner {
                subscriptions: HashMap::new(),
                pending: HashMap::new(),
            })),
            listener: RwLock::new(None),
        }
    }

    /// Spawns the single consumer task that drains the bus forever,
    /// fanning matched events into per-subscriber pending queues.
    pub async fn start_listening(&self) {
        let mut rx = self.bus.subscribe_raw(RAW_CONSUMER_ID).await;
        let inner = self.inner.clone();

        let handle = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                Self::dispatch(&inner, event).await;
            }
        });

        *self.listener.write().await = Some(handle);
    }

    pub async fn stop_listening(&self) {
        if let Some(handle) = self.listener.write().await.take() {
            handle.abort();
        }
        self.bus.unsubscribe_raw(RAW_CONSUMER_ID).await;
    }

    async fn dispatch(inner: &Arc<RwLock<Inner>>, event: AgentEvent) {
        let event_type = event.event_type_str();
        let actor = event.actor();

        let mut guard = inner.write().await;
        let mut to_remove = Vec::new();

        for sub in guard.subscriptions.values() {
            if !sub.matches_event_type(event_type) {
                continue;
            }
            if sub.exclude_self {
                if let Some(actor) = actor {
                    if actor == sub.agent_id {
                        continue;
                    }
                }
            }

            let delivered = DeliveredEvent {
                subscription_id: sub.id.clone(),
                event: event.clone(),
                delivered_at: chrono::Utc::now(),
            };
            guard
                .pending
                .entry(sub.agent_id.clone())
                .or_default()
                .push(delivered);

            if sub.one_shot {
                to_remove.push(sub.id.clone());
            }
        }

        for id in to_remove {
            guard.subscriptions.remove(&id);
        }
    }

    pub async fn subscribe(
        &self,
        agent_id: impl Into<String>,
        agent_name: impl Into<String>,
        event_types: Vec<String>,
        exclude_self: bool,
        one_shot: bool,
    ) -> String {
        let sub = EventSubscription::new(agent_id, agent_name, event_types, exclude_self, one_shot);
        let id = sub.id.clone();
        self.inner.write().await.subscriptions.insert(id.clone(), sub);
        id
    }

    /// One-shot, self-excluding subscription on the two event types that
    /// signal an agent finishing: `agent:completed` and
    /// `agent:status_changed`. The caller is expected to filter the
    /// drained events by the target agent id it cares about.
    pub async fn subscribe_to_agent_completion(
        &self,
        caller_id: impl Into<String>,
        caller_name: impl Into<String>,
    ) -> String {
        self.subscribe(
            caller_id,
            caller_name,
            vec!["agent:completed".to_string(), "agent:status_changed".to_string()],
            true,
            true,
        )
        .await
    }

    /// Returns `true` if a subscription with that id existed and was removed.
    pub async fn unsubscribe(&self, subscription_id: &str) -> bool {
        self.inner
            .write()
            .await
            .subscriptions
            .remove(subscription_id)
            .is_some()
    }

    pub async fn unsubscribe_all(&self, agent_id: &str) -> usize {
        let mut guard = self.inner.write().await;
        let before = guard.subscriptions.len();
        guard.subscriptions.retain(|_, sub| sub.agent_id != agent_id);
        before - guard.subscriptions.len()
    }

    pub async fn subscription_count(&self) -> usize {
        self.inner.read().await.subscriptions.len()
    }

    /// Atomically returns and clears the pending queue for `agent_id`.
    pub async fn drain_pending_events(&self, agent_id: &str) -> Vec<DeliveredEvent> {
        self.inner
            .write()
            .await
            .pending
            .remove(agent_id)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AgentStatus;
    use std::time::Duration;

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    #[tokio::test]
    async fn one_shot_subscription_is_removed_after_first_match() {
        let bus = Arc::new(EventBus::new(64));
        let service = SubscriptionService::new(bus.clone());
        service.start_listening().await;

        service
            .subscribe("a1", "agent-one", vec!["agent:completed".to_string()], false, true)
            .await;
        assert_eq!(service.subscription_count().await, 1);

        bus.emit(AgentEvent::AgentCompleted {
            agent_id: "a2".to_string(),
            parent_id: "a1".to_string(),
            report: crate::models::CompletionReport {
                agent_id: "a2".to_string(),
                task_id: "t1".to_string(),
                summary: "done".to_string(),
                files_modified: vec![],
                verification_results: Default::default(),
                success: true,
            },
        })
        .await
        .unwrap();
        settle().await;

        assert_eq!(service.subscription_count().await, 0);
        let drained = service.drain_pending_events("a1").await;
        assert_eq!(drained.len(), 1);

        // Second emit: no subscription left, nothing pending.
        bus.emit(AgentEvent::AgentCompleted {
            agent_id: "a3".to_string(),
            parent_id: "a1".to_string(),
            report: crate::models::CompletionReport {
                agent_id: "a3".to_string(),
                task_id: "t2".to_string(),
                summary: "done".to_string(),
                files_modified: vec![],
                verification_results: Default::default(),
                success: true,
            },
        })
        .await
        .unwrap();
        settle().await;
        assert!(service.drain_pending_events("a1").await.is_empty());

        service.stop_listening().await;
    }

    #[tokio::test]
    async fn self_exclusion_filters_own_actor() {
        let bus = Arc::new(EventBus::new(64));
        let service = SubscriptionService::new(bus.clone());
        service.start_listening().await;

        service
            .subscribe("a1", "agent-one", vec!["agent:*".to_string()], true, false)
            .await;

        bus.emit(AgentEvent::AgentStatusChanged {
            agent_id: "a1".to_string(),
            old: AgentStatus::Pending,
            new: AgentStatus::Active,
        })
        .await
        .unwrap();
        bus.emit(AgentEvent::AgentCreated {
            agent_id: "a2".to_string(),
            workspace_id: "ws1".to_string(),
            parent_id: Some("a1".to_string()),
        })
        .await
        .unwrap();
        settle().await;

        let drained = service.drain_pending_events("a1").await;
        assert_eq!(drained.len(), 1);
        assert!(matches!(drained[0].event, AgentEvent::AgentCreated { .. }));

        service.stop_listening().await;
    }

    #[tokio::test]
    async fn drain_is_idempotent() {
        let bus = Arc::new(EventBus::new(64));
        let service = SubscriptionService::new(bus.clone());
        service.start_listening().await;

        service
            .subscribe("a1", "agent-one", vec!["*".to_string()], false, false)
            .await;
        bus.emit(AgentEvent::TaskStatusChanged {
            task_id: "t1".to_string(),
            old: crate::models::TaskStatus::Pending,
            new: crate::models::TaskStatus::InProgress,
        })
        .await
        .unwrap();
        settle().await;

        assert_eq!(service.drain_pending_events("a1").await.len(), 1);
        assert!(service.drain_pending_events("a1").await.is_empty());

        service.stop_listening().await;
    }

    #[tokio::test]
    async fn subscribe_then_unsubscribe_leaves_count_unchanged() {
        let bus = Arc::new(EventBus::new(64));
        let service = SubscriptionService::new(bus);
        let before = service.subscription_count().await;

        let id = service
            .subscribe("a1", "agent-one", vec!["*".to_string()], false, false)
            .await;
        service.unsubscribe(&id).await;

        assert_eq!(service.subscription_count().await, before);
    }
}
