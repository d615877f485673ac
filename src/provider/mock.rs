use super::{Capabilities, Provider};
use crate::error::Result;
use crate::models::AgentRole;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// A deterministic, scriptable provider for tests and for the CLI demo
/// harness: each call to `run` for a given role returns the next queued
/// response, falling back to a canned default once the queue is empty.
pub struct MockProvider {
    name: String,
    caps: Capabilities,
    routa_responses: Mutex<VecDeque<String>>,
    crafter_responses: Mutex<VecDeque<String>>,
    gate_responses: Mutex<VecDeque<String>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::with_capabilities("mock", true, true, true, 1)
    }

    pub fn with_capabilities(
        name: &str,
        supports_tool_calling: bool,
        supports_file_editing: bool,
        supports_terminal: bool,
        priority: u32,
    ) -> Self {
        Self {
            name: name.to_string(),
            caps: Capabilities {
                name: name.to_string(),
                supports_streaming: false,
                supports_file_editing,
                supports_terminal,
                supports_tool_calling,
                priority,
            },
            routa_responses: Mutex::new(VecDeque::new()),
            crafter_responses: Mutex::new(VecDeque::new()),
            gate_responses: Mutex::new(VecDeque::new()),
        }
    }

    pub fn queue_routa_response(&self, response: impl Into<String>) {
        self.routa_responses.lock().unwrap().push_back(response.into());
    }

    pub fn queue_crafter_response(&self, response: impl Into<String>) {
        self.crafter_responses.lock().unwrap().push_back(response.into());
    }

    pub fn queue_gate_response(&self, response: impl Into<String>) {
        self.gate_responses.lock().unwrap().push_back(response.into());
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn run(&self, role: AgentRole, _agent_id: &str, _prompt: &str) -> Result<String> {
        let queue = match role {
            AgentRole::Routa => &self.routa_responses,
            AgentRole::Crafter => &self.crafter_responses,
            AgentRole::Gate => &self.gate_responses,
        };

        let response = queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| match role {
                AgentRole::Routa => "No plan configured.".to_string(),
                AgentRole::Crafter => "done".to_string(),
                AgentRole::Gate => "APPROVED".to_string(),
            });

        Ok(response)
    }

    fn capabilities(&self) -> Capabilities {
        self.caps.clone()
    }
}
