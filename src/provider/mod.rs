//! Provider abstraction and routing. A provider is any execution backend
//! capable of running a role's prompt to completion — a hosted model, a
//! subprocess-backed external agent, or (for tests) a deterministic mock.
//! Concrete model clients are explicitly out of scope for this crate; only
//! the trait, the capability router, the resilient wrapper, and a mock for
//! tests live here.
use crate::error::{CoreError, Result};
use crate::models::AgentRole;
use async_trait::async_trait;

mod mock;
mod resilient;
mod router;

pub use mock::MockProvider;
pub use resilient::ResilientAgentProvider;
pub use router::CapabilityBasedRouter;

/// A chunk of a streaming provider response.
#[derive(Debug, Clone)]
pub enum StreamChunk {
    Text(String),
    Thinking { content: String, phase: String },
    ToolCall { name: String, status: String, arguments: Option<String> },
    Error(String),
    Completed { stop_reason: String },
}

/// What an execution backend declares about itself, used by
/// `CapabilityBasedRouter` to pick the best match for a role.
#[derive(Debug, Clone)]
pub struct Capabilities {
    pub name: String,
    pub supports_streaming: bool,
    pub supports_file_editing: bool,
    pub supports_terminal: bool,
    pub supports_tool_calling: bool,
    pub priority: u32,
}

#[async_trait]
pub trait Provider: Send + Sync {
    async fn run(&self, role: AgentRole, agent_id: &str, prompt: &str) -> Result<String>;

    async fn run_streaming(
        &self,
        role: AgentRole,
        agent_id: &str,
        prompt: &str,
        on_chunk: &(dyn Fn(StreamChunk) + Send + Sync),
    ) -> Result<String> {
        // Default: run non-streaming and deliver the whole response as one
        // chunk, for providers that never implement streaming.
        let text = self.run(role, agent_id, prompt).await?;
        on_chunk(StreamChunk::Text(text.clone()));
        Ok(text)
    }

    async fn interrupt(&self, _agent_id: &str) -> Result<()> {
        Ok(())
    }

    fn capabilities(&self) -> Capabilities;
}

/// Minimum capability demand per role, used by the router to pick a match.
fn role_requirements(role: AgentRole) -> (bool, bool, bool) {
    // (needs_tool_calling, needs_file_editing, needs_terminal)
    match role {
        AgentRole::Routa => (true, false, false),
        AgentRole::Crafter => (false, true, true),
        AgentRole::Gate => (true, false, false),
    }
}

fn satisfies(role: AgentRole, caps: &Capabilities) -> bool {
    let (needs_tools, needs_files, needs_terminal) = role_requirements(role);
    (!needs_tools || caps.supports_tool_calling)
        && (!needs_files || caps.supports_file_editing)
        && (!needs_terminal || caps.supports_terminal)
}

pub(crate) fn select_best<'a>(
    providers: &'a [std::sync::Arc<dyn Provider>],
    role: AgentRole,
) -> Result<&'a std::sync::Arc<dyn Provider>> {
    if providers.is_empty() {
        return Err(CoreError::ProviderFailure("no providers configured".to_string()));
    }

    let mut best: Option<&std::sync::Arc<dyn Provider>> = None;
    for provider in providers {
        let caps = provider.capabilities();
        if satisfies(role, &caps) {
            match best {
                None => best = Some(provider),
                Some(current) if caps.priority > current.capabilities().priority => {
                    best = Some(provider)
                }
                _ => {}
            }
        }
    }

    Ok(best.unwrap_or(&providers[0]))
}
