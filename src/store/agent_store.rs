use super::{get_cloned, AgentStore};
use crate::error::{CoreError, Result};
use crate::models::{Agent, AgentRole, AgentStatus};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Concurrent map of agents plus a single mutex guarding status
/// transitions, so a transition and anything observed alongside it
/// (the caller's event emission) see a consistent snapshot.
#[derive(Default)]
pub struct InMemoryAgentStore {
    agents: Arc<RwLock<HashMap<String, Agent>>>,
    transition_lock: Arc<Mutex<()>>,
}

impl InMemoryAgentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AgentStore for InMemoryAgentStore {
    async fn save(&self, agent: Agent) -> Result<()> {
        self.agents.write().await.insert(agent.id.clone(), agent);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Agent> {
        get_cloned(&self.agents, &id.to_string(), || {
            CoreError::NotFound(format!("agent {id}"))
        })
        .await
    }

    async fn list_by_workspace(&self, workspace_id: &str) -> Result<Vec<Agent>> {
        let guard = self.agents.read().await;
        Ok(guard
            .values()
            .filter(|a| a.workspace_id == workspace_id)
            .cloned()
            .collect())
    }

    async fn list_by_parent(&self, parent_id: &str) -> Result<Vec<Agent>> {
        let guard = self.agents.read().await;
        Ok(guard
            .values()
            .filter(|a| a.parent_id.as_deref() == Some(parent_id))
            .cloned()
            .collect())
    }

    async fn list_by_role(&self, workspace_id: &str, role: AgentRole) -> Result<Vec<Agent>> {
        let guard = self.agents.read().await;
        Ok(guard
            .values()
            .filter(|a| a.workspace_id == workspace_id && a.role == role)
            .cloned()
            .collect())
    }

    async fn list_by_status(&self, workspace_id: &str, status: AgentStatus) -> Result<Vec<Agent>> {
        let guard = self.agents.read().await;
        Ok(guard
            .values()
            .filter(|a| a.workspace_id == workspace_id && a.status == status)
            .cloned()
            .collect())
    }

    async fn update_status(&self, id: &str, new_status: AgentStatus) -> Result<Agent> {
        let _guard = self.transition_lock.lock().await;
        let mut agents = self.agents.write().await;
        let agent = agents
            .get_mut(id)
            .ok_or_else(|| CoreError::NotFound(format!("agent {id}")))?;

        if !agent.status.can_transition_to(new_status) {
            return Err(CoreError::IllegalTransition {
                entity: format!("agent {id}"),
                message: format!("{:?} -> {:?}", agent.status, new_status),
            });
        }

        agent.status = new_status;
        agent.updated_at = chrono::Utc::now();
        Ok(agent.clone())
    }
}
