//! Thread-safe in-memory stores for agents, tasks, and conversations.
//!
//! Each store is a separate single-responsibility service, following the
//! same shape as a registry wrapping its own guarded map: reads take a
//! read lock, status transitions take the write lock (or a dedicated
//! mutex) across both the state change and whatever must be observed
//! atomically alongside it.
use crate::error::{CoreError, Result};
use crate::models::{Agent, AgentRole, AgentStatus, Message, Task, TaskStatus};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

mod agent_store;
mod conversation_store;
mod task_store;

pub use agent_store::InMemoryAgentStore;
pub use conversation_store::InMemoryConversationStore;
pub use task_store::InMemoryTaskStore;

#[async_trait]
pub trait AgentStore: Send + Sync {
    async fn save(&self, agent: Agent) -> Result<()>;
    async fn get(&self, id: &str) -> Result<Agent>;
    async fn list_by_workspace(&self, workspace_id: &str) -> Result<Vec<Agent>>;
    async fn list_by_parent(&self, parent_id: &str) -> Result<Vec<Agent>>;
    async fn list_by_role(&self, workspace_id: &str, role: AgentRole) -> Result<Vec<Agent>>;
    async fn list_by_status(&self, workspace_id: &str, status: AgentStatus) -> Result<Vec<Agent>>;
    /// Atomic compare-and-set: fails with `IllegalTransition` if `self.status`
    /// of the stored agent cannot legally move to `new_status`.
    async fn update_status(&self, id: &str, new_status: AgentStatus) -> Result<Agent>;
}

#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn save(&self, task: Task) -> Result<()>;
    async fn get(&self, id: &str) -> Result<Task>;
    async fn list_by_workspace(&self, workspace_id: &str) -> Result<Vec<Task>>;
    async fn list_by_assignee(&self, agent_id: &str) -> Result<Vec<Task>>;
    /// PENDING tasks whose every dependency is COMPLETED.
    async fn find_ready_tasks(&self, workspace_id: &str) -> Result<Vec<Task>>;
    async fn update_status(&self, id: &str, new_status: TaskStatus) -> Result<Task>;
    async fn update(&self, task: Task) -> Result<()>;
}

#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn append(&self, message: Message) -> Result<()>;
    async fn get_conversation(&self, agent_id: &str) -> Result<Vec<Message>>;
    async fn get_last_n(&self, agent_id: &str, n: usize) -> Result<Vec<Message>>;
    async fn get_by_turn_range(
        &self,
        agent_id: &str,
        start: u32,
        end: u32,
    ) -> Result<Vec<Message>>;
    async fn get_message_count(&self, agent_id: &str) -> Result<usize>;
    async fn delete_conversation(&self, agent_id: &str) -> Result<()>;
}

/// Generic helper shared by the three in-memory stores: look up an entry
/// under a read lock and clone it out, never returning a live reference.
pub(crate) async fn get_cloned<K, V>(
    map: &Arc<RwLock<HashMap<K, V>>>,
    key: &K,
    not_found: impl FnOnce() -> CoreError,
) -> Result<V>
where
    K: std::hash::Hash + Eq,
    V: Clone,
{
    let guard = map.read().await;
    guard.get(key).cloned().ok_or_else(not_found)
}
