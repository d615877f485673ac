use super::{select_best, Provider};
use crate::error::Result;
use crate::models::AgentRole;
use async_trait::async_trait;
use std::sync::Arc;

/// Holds an ordered list of providers and, for each `run`, picks the
/// highest-priority one whose declared capabilities satisfy the role's
/// needs. Falls back to the first provider in the list if none match.
pub struct CapabilityBasedRouter {
    providers: Vec<Arc<dyn Provider>>,
}

impl CapabilityBasedRouter {
    pub fn new(providers: Vec<Arc<dyn Provider>>) -> Self {
        Self { providers }
    }

    pub fn provider_for(&self, role: AgentRole) -> Result<Arc<dyn Provider>> {
        select_best(&self.providers, role).map(Arc::clone)
    }
}

#[async_trait]
impl Provider for CapabilityBasedRouter {
    async fn run(&self, role: AgentRole, agent_id: &str, prompt: &str) -> Result<String> {
        let provider = self.provider_for(role)?;
        provider.run(role, agent_id, prompt).await
    }

    async fn interrupt(&self, agent_id: &str) -> Result<()> {
        for provider in &self.providers {
            provider.interrupt(agent_id).await?;
        }
        Ok(())
    }

    fn capabilities(&self) -> super::Capabilities {
        // The router itself has no fixed identity; report the first
        // provider's capabilities as a representative default.
        self.providers
            .first()
            .map(|p| p.capabilities())
            .unwrap_or(super::Capabilities {
                name: "empty-router".to_string(),
                supports_streaming: false,
                supports_file_editing: false,
                supports_terminal: false,
                supports_tool_calling: false,
                priority: 0,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MockProvider;

    fn named(name: &str, tool_calling: bool, file_editing: bool, terminal: bool, priority: u32) -> Arc<dyn Provider> {
        Arc::new(MockProvider::with_capabilities(
            name, tool_calling, file_editing, terminal, priority,
        ))
    }

    #[tokio::test]
    async fn picks_tool_calling_provider_for_routa() {
        let router = CapabilityBasedRouter::new(vec![
            named("no-tools", false, false, false, 5),
            named("has-tools", true, false, false, 1),
        ]);
        let chosen = router.provider_for(AgentRole::Routa).unwrap();
        assert_eq!(chosen.capabilities().name, "has-tools");
    }

    #[tokio::test]
    async fn picks_file_and_terminal_provider_for_crafter() {
        let router = CapabilityBasedRouter::new(vec![
            named("tools-only", true, false, false, 10),
            named("full-crafter", false, true, true, 1),
        ]);
        let chosen = router.provider_for(AgentRole::Crafter).unwrap();
        assert_eq!(chosen.capabilities().name, "full-crafter");
    }

    #[tokio::test]
    async fn falls_back_to_first_provider_when_none_match() {
        let router = CapabilityBasedRouter::new(vec![named("bare", false, false, false, 1)]);
        let chosen = router.provider_for(AgentRole::Crafter).unwrap();
        assert_eq!(chosen.capabilities().name, "bare");
    }

    #[tokio::test]
    async fn picks_highest_priority_among_equally_capable() {
        let router = CapabilityBasedRouter::new(vec![
            named("low", true, false, false, 1),
            named("high", true, false, false, 9),
        ]);
        let chosen = router.provider_for(AgentRole::Gate).unwrap();
        assert_eq!(chosen.capabilities().name, "high");
    }
}
