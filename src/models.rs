use crate::constants::TITLE_SLUG_WORD_COUNT;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// The three roles in a coordination wave.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum AgentRole {
    /// Plans and issues `@@@task` blocks; never edits files.
    Routa,
    /// Executes one assigned task and reports back.
    Crafter,
    /// Approves or rejects a wave's completed work.
    Gate,
}

impl AgentRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentRole::Routa => "ROUTA",
            AgentRole::Crafter => "CRAFTER",
            AgentRole::Gate => "GATE",
        }
    }
}

/// Execution backend weight class a role is routed to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ModelTier {
    Smart,
    Fast,
}

/// Lifecycle status of an agent. Transitions only move forward:
/// PENDING -> ACTIVE -> {COMPLETED | ERROR | CANCELLED}.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AgentStatus {
    Pending,
    Active,
    Completed,
    Error,
    Cancelled,
}

impl AgentStatus {
    /// Whether `self -> next` is a legal forward move in the status lattice.
    pub fn can_transition_to(&self, next: AgentStatus) -> bool {
        use AgentStatus::*;
        matches!(
            (self, next),
            (Pending, Active)
                | (Active, Completed)
                | (Active, Error)
                | (Active, Cancelled)
        )
    }
}

/// A participant in the coordination session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: String,
    pub name: String,
    pub role: AgentRole,
    pub model_tier: ModelTier,
    pub workspace_id: String,
    pub parent_id: Option<String>,
    pub status: AgentStatus,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    pub metadata: HashMap<String, String>,
}

impl Agent {
    pub fn new(
        name: impl Into<String>,
        role: AgentRole,
        model_tier: ModelTier,
        workspace_id: impl Into<String>,
        parent_id: Option<String>,
    ) -> Self {
        let now = chrono::Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            role,
            model_tier,
            workspace_id: workspace_id.into(),
            parent_id,
            status: AgentStatus::Pending,
            created_at: now,
            updated_at: now,
            metadata: HashMap::new(),
        }
    }
}

/// Status of a task as it moves through a wave.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TaskStatus {
    Pending,
    InProgress,
    ReviewRequired,
    Completed,
    NeedsFix,
    Blocked,
    Cancelled,
}

/// Outcome recorded by the GATE for a reviewed task.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum VerificationVerdict {
    Approved,
    NotApproved,
    Blocked,
}

/// A unit of work extracted from a coordinator's plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub objective: String,
    pub scope: Vec<String>,
    pub acceptance_criteria: Vec<String>,
    pub verification_commands: Vec<String>,
    pub assigned_to: Option<String>,
    pub status: TaskStatus,
    pub dependencies: Vec<String>,
    pub parallel_group: Option<String>,
    pub workspace_id: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    pub completion_summary: Option<String>,
    pub verification_verdict: Option<VerificationVerdict>,
    pub verification_report: Option<String>,
}

impl Task {
    pub fn new(workspace_id: impl Into<String>, title: impl Into<String>) -> Self {
        let now = chrono::Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            objective: String::new(),
            scope: Vec::new(),
            acceptance_criteria: Vec::new(),
            verification_commands: Vec::new(),
            assigned_to: None,
            status: TaskStatus::Pending,
            dependencies: Vec::new(),
            parallel_group: None,
            workspace_id: workspace_id.into(),
            created_at: now,
            updated_at: now,
            completion_summary: None,
            verification_verdict: None,
            verification_report: None,
        }
    }

    /// Lowercase, hyphenated slug of the title, truncated for agent naming.
    pub fn title_slug(&self) -> String {
        self.title
            .to_lowercase()
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { '-' })
            .collect::<String>()
            .split('-')
            .filter(|s| !s.is_empty())
            .take(TITLE_SLUG_WORD_COUNT)
            .collect::<Vec<_>>()
            .join("-")
    }
}

/// Author of a single conversation turn.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum MessageRole {
    User,
    Agent,
    System,
}

/// A single append-only entry in an agent's conversation transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub agent_id: String,
    pub turn: Option<u32>,
    pub role: MessageRole,
    pub content: String,
    pub from_agent_id: Option<String>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// What a CRAFTER or GATE hands back when it finishes its assignment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionReport {
    pub agent_id: String,
    pub task_id: String,
    pub summary: String,
    pub files_modified: Vec<String>,
    pub verification_results: HashMap<String, String>,
    pub success: bool,
}

/// Tagged events emitted by the agent tool surface. The event-type string
/// used by the subscription service is derived by pattern match (see
/// `AgentEvent::event_type_str`), never by type name, so it stays stable
/// no matter how this enum is represented on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum AgentEvent {
    AgentCreated {
        agent_id: String,
        workspace_id: String,
        parent_id: Option<String>,
    },
    AgentStatusChanged {
        agent_id: String,
        old: AgentStatus,
        new: AgentStatus,
    },
    AgentCompleted {
        agent_id: String,
        parent_id: String,
        report: CompletionReport,
    },
    MessageReceived {
        from: String,
        to: String,
        message: String,
    },
    TaskStatusChanged {
        task_id: String,
        old: TaskStatus,
        new: TaskStatus,
    },
    TaskDelegated {
        task_id: String,
        agent_id: String,
        delegated_by: String,
    },
}

impl AgentEvent {
    /// Normative string form used for subscription pattern matching.
    pub fn event_type_str(&self) -> &'static str {
        match self {
            AgentEvent::AgentCreated { .. } => "agent:created",
            AgentEvent::AgentStatusChanged { .. } => "agent:status_changed",
            AgentEvent::AgentCompleted { .. } => "agent:completed",
            AgentEvent::MessageReceived { .. } => "agent:message",
            AgentEvent::TaskStatusChanged { .. } => "task:status_changed",
            AgentEvent::TaskDelegated { .. } => "task:delegated",
        }
    }

    /// The agent "responsible" for this event, used for self-exclusion.
    /// `TaskStatusChanged` has no actor.
    pub fn actor(&self) -> Option<&str> {
        match self {
            AgentEvent::AgentCreated { agent_id, .. } => Some(agent_id),
            AgentEvent::AgentStatusChanged { agent_id, .. } => Some(agent_id),
            AgentEvent::AgentCompleted { agent_id, .. } => Some(agent_id),
            AgentEvent::MessageReceived { from, .. } => Some(from),
            AgentEvent::TaskDelegated { delegated_by, .. } => Some(delegated_by),
            AgentEvent::TaskStatusChanged { .. } => None,
        }
    }
}

/// Phase of the coordinator state machine.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Planning,
    Ready,
    Executing,
    WaveComplete,
    Verifying,
    NeedsFix,
    Completed,
}

/// The coordinator's single observable state cell (spec.md §3, §9).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinationState {
    pub phase: Phase,
    pub workspace_id: String,
    pub routa_agent_id: String,
    pub current_wave: u32,
    pub active_crafter_ids: Vec<String>,
    pub active_gate_id: Option<String>,
}

impl CoordinationState {
    pub fn new(workspace_id: impl Into<String>, routa_agent_id: impl Into<String>) -> Self {
        Self {
            phase: Phase::Idle,
            workspace_id: workspace_id.into(),
            routa_agent_id: routa_agent_id.into(),
            current_wave: 1,
            active_crafter_ids: Vec::new(),
            active_gate_id: None,
        }
    }
}

/// A subscriber's registered interest in a set of event-type patterns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventSubscription {
    pub id: String,
    pub agent_id: String,
    pub agent_name: String,
    pub event_types: Vec<String>,
    pub exclude_self: bool,
    pub one_shot: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl EventSubscription {
    pub fn new(
        agent_id: impl Into<String>,
        agent_name: impl Into<String>,
        event_types: Vec<String>,
        exclude_self: bool,
        one_shot: bool,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            agent_id: agent_id.into(),
            agent_name: agent_name.into(),
            event_types,
            exclude_self,
            one_shot,
            created_at: chrono::Utc::now(),
        }
    }

    /// `"*"` matches all; `"prefix:*"` matches by prefix; else exact match.
    pub fn pattern_matches(pattern: &str, event_type: &str) -> bool {
        if pattern == "*" {
            return true;
        }
        if let Some(prefix) = pattern.strip_suffix(":*") {
            return event_type
                .strip_prefix(prefix)
                .map(|rest| rest.starts_with(':'))
                .unwrap_or(false);
        }
        pattern == event_type
    }

    pub fn matches_event_type(&self, event_type: &str) -> bool {
        self.event_types
            .iter()
            .any(|p| Self::pattern_matches(p, event_type))
    }
}

/// An event delivered into a subscriber's pending queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveredEvent {
    pub subscription_id: String,
    pub event: AgentEvent,
    pub delivered_at: chrono::DateTime<chrono::Utc>,
}
