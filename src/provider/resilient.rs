use super::{Capabilities, Provider};
use crate::error::Result;
use crate::models::{AgentRole, Message, MessageRole};
use crate::store::ConversationStore;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Wraps a provider so its failures never reach the coordinator as errors.
/// A failed or timed-out run is recorded as a system message in the
/// agent's conversation and replaced with a synthetic
/// `"[provider error: ...]"` string, so the coordinator (and, for GATE,
/// the verdict parser) can still observe *something* and make progress.
pub struct ResilientAgentProvider {
    inner: Arc<dyn Provider>,
    conversations: Arc<dyn ConversationStore>,
    timeout: Duration,
}

impl ResilientAgentProvider {
    pub fn new(inner: Arc<dyn Provider>, conversations: Arc<dyn ConversationStore>, timeout_ms: u64) -> Self {
        Self {
            inner,
            conversations,
            timeout: Duration::from_millis(timeout_ms),
        }
    }

    async fn record_failure(&self, agent_id: &str, reason: &str) -> String {
        let synthetic = format!("[provider error: {reason}]");
        let message = Message {
            agent_id: agent_id.to_string(),
            turn: None,
            role: MessageRole::System,
            content: synthetic.clone(),
            from_agent_id: None,
            timestamp: chrono::Utc::now(),
        };
        if let Err(e) = self.conversations.append(message).await {
            tracing::warn!(%agent_id, error = %e, "failed to record provider failure transcript entry");
        }
        synthetic
    }
}

#[async_trait]
impl Provider for ResilientAgentProvider {
    async fn run(&self, role: AgentRole, agent_id: &str, prompt: &str) -> Result<String> {
        match tokio::time::timeout(self.timeout, self.inner.run(role, agent_id, prompt)).await {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(e)) => {
                tracing::warn!(%agent_id, ?role, error = %e, "provider run failed");
                Ok(self.record_failure(agent_id, &e.to_string()).await)
            }
            Err(_elapsed) => {
                tracing::warn!(%agent_id, ?role, "provider run timed out");
                Ok(self.record_failure(agent_id, "timed out").await)
            }
        }
    }

    async fn interrupt(&self, agent_id: &str) -> Result<()> {
        self.inner.interrupt(agent_id).await
    }

    fn capabilities(&self) -> Capabilities {
        self.inner.capabilities()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::store::InMemoryConversationStore;
    use async_trait::async_trait;

    struct AlwaysFails;

    #[async_trait]
    impl Provider for AlwaysFails {
        async fn run(&self, _role: AgentRole, _agent_id: &str, _prompt: &str) -> Result<String> {
            Err(CoreError::ProviderFailure("boom".to_string()))
        }

        fn capabilities(&self) -> Capabilities {
            Capabilities {
                name: "always-fails".to_string(),
                supports_streaming: false,
                supports_file_editing: false,
                supports_terminal: false,
                supports_tool_calling: true,
                priority: 1,
            }
        }
    }

    #[tokio::test]
    async fn failure_becomes_synthetic_ok_and_is_recorded() {
        let conversations: Arc<dyn ConversationStore> = Arc::new(InMemoryConversationStore::new());
        let resilient = ResilientAgentProvider::new(Arc::new(AlwaysFails), conversations.clone(), 5_000);

        let result = resilient.run(AgentRole::Gate, "g1", "verify").await.unwrap();
        assert!(result.contains("provider error"));

        let transcript = conversations.get_conversation("g1").await.unwrap();
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript[0].role, MessageRole::System);
    }
}
