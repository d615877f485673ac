use super::ConversationStore;
use crate::error::Result;
use crate::models::Message;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Per-agent append-only message logs. Appends are ordered by insertion,
/// not by wall-clock timestamp, so two messages appended in the same
/// microsecond never race on ordering.
#[derive(Default)]
pub struct InMemoryConversationStore {
    conversations: Arc<RwLock<HashMap<String, Vec<Message>>>>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn append(&self, message: Message) -> Result<()> {
        let mut guard = self.conversations.write().await;
        guard.entry(message.agent_id.clone()).or_default().push(message);
        Ok(())
    }

    async fn get_conversation(&self, agent_id: &str) -> Result<Vec<Message>> {
        let guard = self.conversations.read().await;
        Ok(guard.get(agent_id).cloned().unwrap_or_default())
    }

    async fn get_last_n(&self, agent_id: &str, n: usize) -> Result<Vec<Message>> {
        let guard = self.conversations.read().await;
        let messages = guard.get(agent_id).cloned().unwrap_or_default();
        let start = messages.len().saturating_sub(n);
        Ok(messages[start..].to_vec())
    }

    async fn get_by_turn_range(
        &self,
        agent_id: &str,
        start: u32,
        end: u32,
    ) -> Result<Vec<Message>> {
        let guard = self.conversations.read().await;
        let messages = guard.get(agent_id).cloned().unwrap_or_default();
        Ok(messages
            .into_iter()
            .filter(|m| m.turn.map(|t| t >= start && t <= end).unwrap_or(false))
            .collect())
    }

    async fn get_message_count(&self, agent_id: &str) -> Result<usize> {
        let guard = self.conversations.read().await;
        Ok(guard.get(agent_id).map(|m| m.len()).unwrap_or(0))
    }

    async fn delete_conversation(&self, agent_id: &str) -> Result<()> {
        self.conversations.write().await.remove(agent_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MessageRole;

    fn msg(agent_id: &str, turn: Option<u32>, content: &str) -> Message {
        Message {
            agent_id: agent_id.to_string(),
            turn,
            role: MessageRole::Agent,
            content: content.to_string(),
            from_agent_id: None,
            timestamp: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn append_preserves_insertion_order() {
        let store = InMemoryConversationStore::new();
        store.append(msg("a1", None, "first")).await.unwrap();
        store.append(msg("a1", None, "second")).await.unwrap();
        store.append(msg("a1", None, "third")).await.unwrap();

        let conversation = store.get_conversation("a1").await.unwrap();
        let contents: Vec<&str> = conversation.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn get_last_n_returns_tail() {
        let store = InMemoryConversationStore::new();
        for i in 0..25 {
            store.append(msg("a1", None, &format!("msg-{i}"))).await.unwrap();
        }

        let tail = store.get_last_n("a1", 20).await.unwrap();
        assert_eq!(tail.len(), 20);
        assert_eq!(tail[0].content, "msg-5");
        assert_eq!(tail[19].content, "msg-24");
    }

    #[tokio::test]
    async fn get_last_n_caps_at_available_messages() {
        let store = InMemoryConversationStore::new();
        store.append(msg("a1", None, "only one")).await.unwrap();

        let tail = store.get_last_n("a1", 20).await.unwrap();
        assert_eq!(tail.len(), 1);
    }

    #[tokio::test]
    async fn turn_range_filters_inclusive() {
        let store = InMemoryConversationStore::new();
        for turn in 1..=5u32 {
            store.append(msg("a1", Some(turn), &format!("turn {turn}"))).await.unwrap();
        }

        let range = store.get_by_turn_range("a1", 2, 4).await.unwrap();
        assert_eq!(range.len(), 3);
    }
}
