//! The agent coordination tool surface: the only legitimate way to mutate
//! the stores from within an agent's execution. Every mutating tool holds
//! the surface's atomic lock across its store mutation and its event
//! emission, so observers never see one without the other — the same
//! "acquire the compound-mutation lock once, transition, then emit"
//! shape the reference coordinator's state manager uses internally.
use crate::constants::{VERDICT_APPROVED, VERDICT_NOT_APPROVED};
use crate::events::EventBus;
use crate::models::{
    Agent, AgentEvent, AgentRole, AgentStatus, CompletionReport, Message, MessageRole, ModelTier,
    Task, TaskStatus,
};
use crate::store::{AgentStore, ConversationStore, TaskStore};
use crate::subscription::SubscriptionService;
use crate::validation::ContentValidator;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Uniform result every tool returns: the spec's `{success, data, error?}`
/// shape, kept as a plain struct rather than a `Result` so tool failures
/// are values the coordinator inspects rather than exceptions it catches.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ToolResult {
    pub success: bool,
    pub data: Option<Value>,
    pub error: Option<String>,
}

impl ToolResult {
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn ok_empty() -> Self {
        Self {
            success: true,
            data: None,
            error: None,
        }
    }

    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

pub struct AgentToolSurface {
    agents: Arc<dyn AgentStore>,
    tasks: Arc<dyn TaskStore>,
    conversations: Arc<dyn ConversationStore>,
    bus: Arc<EventBus>,
    subscriptions: Arc<SubscriptionService>,
    validator: ContentValidator,
    atomic_lock: Mutex<()>,
}

impl AgentToolSurface {
    pub fn new(
        agents: Arc<dyn AgentStore>,
        tasks: Arc<dyn TaskStore>,
        conversations: Arc<dyn ConversationStore>,
        bus: Arc<EventBus>,
        subscriptions: Arc<SubscriptionService>,
    ) -> Self {
        Self {
            agents,
            tasks,
            conversations,
            bus,
            subscriptions,
            validator: ContentValidator::default(),
            atomic_lock: Mutex::new(()),
        }
    }

    pub async fn list_agents(&self, workspace_id: &str) -> ToolResult {
        match self.agents.list_by_workspace(workspace_id).await {
            Ok(agents) => {
                let rows: Vec<Value> = agents
                    .iter()
                    .map(|a| {
                        json!({
                            "id": a.id,
                            "name": a.name,
                            "role": a.role.as_str(),
                            "status": format!("{:?}", a.status),
                        })
                    })
                    .collect();
                ToolResult::ok(json!({ "agents": rows }))
            }
            Err(e) => ToolResult::fail(e.to_string()),
        }
    }

    pub async fn get_agent_status(&self, agent_id: &str) -> ToolResult {
        match self.agents.get(agent_id).await {
            Ok(agent) => ToolResult::ok(json!({
                "role": agent.role.as_str(),
                "status": format!("{:?}", agent.status),
            })),
            Err(e) => ToolResult::fail(e.to_string()),
        }
    }

    pub async fn get_agent_summary(&self, agent_id: &str) -> ToolResult {
        let agent = match self.agents.get(agent_id).await {
            Ok(a) => a,
            Err(e) => return ToolResult::fail(e.to_string()),
        };

        let assigned_title = match self.tasks.list_by_assignee(agent_id).await {
            Ok(tasks) => tasks.first().map(|t| t.title.clone()),
            Err(_) => None,
        };

        let recent = self
            .conversations
            .get_last_n(agent_id, 5)
            .await
            .unwrap_or_default();
        let digest: Vec<String> = recent.iter().map(|m| m.content.clone()).collect();

        ToolResult::ok(json!({
            "role": agent.role.as_str(),
            "status": format!("{:?}", agent.status),
            "assigned_task_title": assigned_title,
            "recent_messages": digest,
        }))
    }

    pub async fn read_agent_conversation(
        &self,
        agent_id: &str,
        turn_range: Option<(u32, u32)>,
    ) -> ToolResult {
        if self.agents.get(agent_id).await.is_err() {
            return ToolResult::fail(format!("agent {agent_id} not found"));
        }

        let messages = match turn_range {
            Some((start, end)) => self.conversations.get_by_turn_range(agent_id, start, end).await,
            None => self.conversations.get_conversation(agent_id).await,
        };

        match messages {
            Ok(messages) => {
                let text = messages
                    .iter()
                    .map(|m| format!("[{:?}] {}", m.role, m.content))
                    .collect::<Vec<_>>()
                    .join("\n");
                ToolResult::ok(json!({ "conversation": text }))
            }
            Err(e) => ToolResult::fail(e.to_string()),
        }
    }

    /// Renders the last `n` *messages* (not lines) of `agent_id`'s
    /// conversation. Used to build an agent's context tail, where a single
    /// message (e.g. a task delegation briefing) can itself span many
    /// lines and must not be sliced mid-body.
    pub async fn read_agent_conversation_tail(&self, agent_id: &str, n: usize) -> ToolResult {
        if self.agents.get(agent_id).await.is_err() {
            return ToolResult::fail(format!("agent {agent_id} not found"));
        }

        match self.conversations.get_last_n(agent_id, n).await {
            Ok(messages) => {
                let text = messages
                    .iter()
                    .map(|m| format!("[{:?}] {}", m.role, m.content))
                    .collect::<Vec<_>>()
                    .join("\n");
                ToolResult::ok(json!({ "conversation": text }))
            }
            Err(e) => ToolResult::fail(e.to_string()),
        }
    }

    pub async fn create_agent(
        &self,
        workspace_id: &str,
        role: AgentRole,
        name: Option<String>,
        parent_id: Option<String>,
        model_tier: Option<ModelTier>,
    ) -> ToolResult {
        let _guard = self.atomic_lock.lock().await;

        if role == AgentRole::Routa {
            let existing = self
                .agents
                .list_by_role(workspace_id, AgentRole::Routa)
                .await
                .unwrap_or_default();
            let still_live = existing
                .iter()
                .any(|a| matches!(a.status, AgentStatus::Pending | AgentStatus::Active));
            if still_live {
                return ToolResult::fail("workspace already has an active ROUTA agent".to_string());
            }
        }

        let name = name.unwrap_or_else(|| format!("{}-{}", role.as_str().to_lowercase(), uuid::Uuid::new_v4()));
        let tier = model_tier.unwrap_or(ModelTier::Smart);
        let mut agent = Agent::new(name, role, tier, workspace_id, parent_id.clone());
        let agent_id = agent.id.clone();

        if let Err(e) = self.agents.save(agent.clone()).await {
            return ToolResult::fail(e.to_string());
        }

        if let Err(e) = self
            .bus
            .emit(AgentEvent::AgentCreated {
                agent_id: agent_id.clone(),
                workspace_id: workspace_id.to_string(),
                parent_id: parent_id.clone(),
            })
            .await
        {
            return ToolResult::fail(e.to_string());
        }

        match self.agents.update_status(&agent_id, AgentStatus::Active).await {
            Ok(updated) => {
                agent = updated;
            }
            Err(e) => return ToolResult::fail(e.to_string()),
        }

        if let Err(e) = self
            .bus
            .emit(AgentEvent::AgentStatusChanged {
                agent_id: agent_id.clone(),
                old: AgentStatus::Pending,
                new: AgentStatus::Active,
            })
            .await
        {
            return ToolResult::fail(e.to_string());
        }

        ToolResult::ok(json!({ "agent_id": agent.id, "status": format!("{:?}", agent.status) }))
    }

    pub async fn delegate_task(&self, task_id: &str, agent_id: &str, delegated_by: &str) -> ToolResult {
        let _guard = self.atomic_lock.lock().await;

        let mut task = match self.tasks.get(task_id).await {
            Ok(t) => t,
            Err(e) => return ToolResult::fail(e.to_string()),
        };

        if task.status != TaskStatus::Pending {
            return ToolResult::fail(format!("task {task_id} is not PENDING"));
        }

        let deps_met = {
            let mut ok = true;
            for dep_id in &task.dependencies {
                match self.tasks.get(dep_id).await {
                    Ok(dep) if dep.status == TaskStatus::Completed => {}
                    _ => {
                        ok = false;
                        break;
                    }
                }
            }
            ok
        };
        if !deps_met {
            return ToolResult::fail(format!("task {task_id} is not ready: unmet dependencies"));
        }

        task.assigned_to = Some(agent_id.to_string());
        task.status = TaskStatus::InProgress;
        task.updated_at = chrono::Utc::now();
        if let Err(e) = self.tasks.update(task.clone()).await {
            return ToolResult::fail(e.to_string());
        }

        if let Err(e) = self
            .bus
            .emit(AgentEvent::TaskDelegated {
                task_id: task_id.to_string(),
                agent_id: agent_id.to_string(),
                delegated_by: delegated_by.to_string(),
            })
            .await
        {
            return ToolResult::fail(e.to_string());
        }
        if let Err(e) = self
            .bus
            .emit(AgentEvent::TaskStatusChanged {
                task_id: task_id.to_string(),
                old: TaskStatus::Pending,
                new: TaskStatus::InProgress,
            })
            .await
        {
            return ToolResult::fail(e.to_string());
        }

        let briefing = format!(
            "Objective: {}\n\nScope:\n{}\n\nDefinition of Done:\n{}\n\nVerification:\n{}",
            task.objective,
            bullet_list(&task.scope),
            bullet_list(&task.acceptance_criteria),
            bullet_list(&task.verification_commands),
        );
        let message = Message {
            agent_id: agent_id.to_string(),
            turn: None,
            role: MessageRole::System,
            content: briefing,
            from_agent_id: None,
            timestamp: chrono::Utc::now(),
        };
        if let Err(e) = self.conversations.append(message).await {
            return ToolResult::fail(e.to_string());
        }

        ToolResult::ok(json!({ "task_id": task.id, "assigned_to": agent_id }))
    }

    pub async fn send_message_to_agent(&self, from_id: &str, to_id: &str, content: &str) -> ToolResult {
        let _guard = self.atomic_lock.lock().await;

        if self.agents.get(from_id).await.is_err() {
            return ToolResult::fail(format!("unknown sender {from_id}"));
        }
        if self.agents.get(to_id).await.is_err() {
            return ToolResult::fail(format!("unknown recipient {to_id}"));
        }

        if let Err(e) = self.validator.validate_message_content(content) {
            return ToolResult::fail(e.to_string());
        }

        let message = Message {
            agent_id: to_id.to_string(),
            turn: None,
            role: MessageRole::Agent,
            content: content.to_string(),
            from_agent_id: Some(from_id.to_string()),
            timestamp: chrono::Utc::now(),
        };
        if let Err(e) = self.conversations.append(message).await {
            return ToolResult::fail(e.to_string());
        }

        if let Err(e) = self
            .bus
            .emit(AgentEvent::MessageReceived {
                from: from_id.to_string(),
                to: to_id.to_string(),
                message: content.to_string(),
            })
            .await
        {
            return ToolResult::fail(e.to_string());
        }

        ToolResult::ok_empty()
    }

    pub async fn subscribe_to_events(
        &self,
        caller_id: &str,
        caller_name: &str,
        event_types: Vec<String>,
        exclude_self: bool,
        one_shot: bool,
    ) -> ToolResult {
        let id = self
            .subscriptions
            .subscribe(caller_id, caller_name, event_types, exclude_self, one_shot)
            .await;
        ToolResult::ok(json!({ "subscription_id": id }))
    }

    pub async fn wait_for_agent(&self, caller_id: &str, caller_name: &str) -> ToolResult {
        let id = self
            .subscriptions
            .subscribe_to_agent_completion(caller_id, caller_name)
            .await;
        ToolResult::ok(json!({ "subscription_id": id }))
    }

    pub async fn unsubscribe_from_events(&self, subscription_id: &str) -> ToolResult {
        let removed = self.subscriptions.unsubscribe(subscription_id).await;
        ToolResult::ok(json!({ "removed": removed }))
    }

    pub async fn report_to_parent(&self, report: CompletionReport) -> ToolResult {
        let _guard = self.atomic_lock.lock().await;

        let reporter = match self.agents.get(&report.agent_id).await {
            Ok(a) => a,
            Err(e) => return ToolResult::fail(e.to_string()),
        };
        if reporter.status != AgentStatus::Active {
            return ToolResult::fail(format!("agent {} is not ACTIVE", report.agent_id));
        }

        let mut task = match self.tasks.get(&report.task_id).await {
            Ok(t) => t,
            Err(e) => return ToolResult::fail(e.to_string()),
        };
        if task.status != TaskStatus::InProgress {
            return ToolResult::fail(format!("task {} is not IN_PROGRESS", report.task_id));
        }

        if let Err(e) = self.agents.update_status(&report.agent_id, AgentStatus::Completed).await {
            return ToolResult::fail(e.to_string());
        }
        if let Err(e) = self
            .bus
            .emit(AgentEvent::AgentStatusChanged {
                agent_id: report.agent_id.clone(),
                old: AgentStatus::Active,
                new: AgentStatus::Completed,
            })
            .await
        {
            return ToolResult::fail(e.to_string());
        }

        if let Err(e) = self
            .bus
            .emit(AgentEvent::AgentCompleted {
                agent_id: report.agent_id.clone(),
                parent_id: reporter.parent_id.clone().unwrap_or_default(),
                report: report.clone(),
            })
            .await
        {
            return ToolResult::fail(e.to_string());
        }

        task.status = TaskStatus::ReviewRequired;
        task.completion_summary = Some(report.summary.clone());
        task.updated_at = chrono::Utc::now();
        if let Err(e) = self.tasks.update(task.clone()).await {
            return ToolResult::fail(e.to_string());
        }
        if let Err(e) = self
            .bus
            .emit(AgentEvent::TaskStatusChanged {
                task_id: task.id.clone(),
                old: TaskStatus::InProgress,
                new: TaskStatus::ReviewRequired,
            })
            .await
        {
            return ToolResult::fail(e.to_string());
        }

        if let Some(parent_id) = &reporter.parent_id {
            let message = Message {
                agent_id: parent_id.clone(),
                turn: None,
                role: MessageRole::Agent,
                content: format!("Completion Report: {}", report.summary),
                from_agent_id: Some(report.agent_id.clone()),
                timestamp: chrono::Utc::now(),
            };
            if let Err(e) = self.conversations.append(message).await {
                return ToolResult::fail(e.to_string());
            }
        }

        ToolResult::ok(json!({ "task_id": task.id, "agent_id": report.agent_id }))
    }

    /// Finds an existing ACTIVE CRAFTER already assigned to `task_id`;
    /// otherwise creates one and delegates. Idempotent. An existing
    /// CRAFTER in ERROR is treated as dead and a replacement is spawned
    /// rather than reused (spec.md §9, open question a).
    pub async fn wake_or_create_task_agent(
        &self,
        workspace_id: &str,
        task_id: &str,
        wave: u32,
        delegated_by: &str,
    ) -> ToolResult {
        let crafters = self
            .agents
            .list_by_role(workspace_id, AgentRole::Crafter)
            .await
            .unwrap_or_default();

        for crafter in &crafters {
            if crafter.status != AgentStatus::Active {
                continue;
            }
            let crafter_tasks = self.tasks.list_by_assignee(&crafter.id).await.unwrap_or_default();
            if crafter_tasks.iter().any(|t| t.id == task_id) {
                return ToolResult::ok(json!({ "agent_id": crafter.id, "created": false }));
            }
        }

        let task = match self.tasks.get(task_id).await {
            Ok(t) => t,
            Err(e) => return ToolResult::fail(e.to_string()),
        };
        let name = format!("crafter-{}-{}", task.title_slug(), wave);
        let create_result = self
            .create_agent(
                workspace_id,
                AgentRole::Crafter,
                Some(name),
                Some(delegated_by.to_string()),
                None,
            )
            .await;
        if !create_result.success {
            return create_result;
        }
        let agent_id = create_result
            .data
            .as_ref()
            .and_then(|d| d.get("agent_id"))
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();

        let delegate_result = self.delegate_task(task_id, &agent_id, delegated_by).await;
        if !delegate_result.success {
            return delegate_result;
        }

        ToolResult::ok(json!({ "agent_id": agent_id, "created": true }))
    }
}

fn bullet_list(items: &[String]) -> String {
    if items.is_empty() {
        "(none)".to_string()
    } else {
        items.iter().map(|i| format!("- {i}")).collect::<Vec<_>>().join("\n")
    }
}

/// Scans GATE output for verdict markers. `NOT APPROVED` wins over
/// `APPROVED` when both appear (spec.md §4.6, §9 open question b).
/// Absence of either marker yields `None` (treated as BLOCKED by callers).
pub fn parse_verdict(gate_output: &str) -> Option<crate::models::VerificationVerdict> {
    let upper = gate_output.to_uppercase();
    let has_not_approved = upper.contains(VERDICT_NOT_APPROVED);
    let has_approved = upper.contains(VERDICT_APPROVED);

    if has_not_approved && has_approved {
        tracing::warn!("gate output contains both APPROVED and NOT APPROVED; NOT APPROVED wins");
    }

    if has_not_approved {
        Some(crate::models::VerificationVerdict::NotApproved)
    } else if has_approved {
        Some(crate::models::VerificationVerdict::Approved)
    } else {
        None
    }
}

#[cfg(test)]
mod tests;
