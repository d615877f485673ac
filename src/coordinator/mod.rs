//! The coordinator state machine: owns the single `CoordinationState`
//! cell, advances it through PLANNING -> READY -> EXECUTING ->
//! WAVE_COMPLETE -> VERIFYING -> {NEEDS_FIX|COMPLETED}, and is the only
//! thing allowed to write to that cell. Callers read it, never mutate it
//! directly.
use crate::config::CoordinationConfig;
use crate::error::{CoreError, Result};
use crate::models::{AgentRole, CoordinationState, ModelTier, Phase, TaskStatus, VerificationVerdict};
use crate::parser::parse_tasks;
use crate::store::{AgentStore, TaskStore};
use crate::tools::{parse_verdict, AgentToolSurface};
use crate::validation::ContentValidator;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::Duration;

/// One CRAFTER/task pairing produced by a wave.
#[derive(Debug, Clone)]
pub struct Delegation {
    pub crafter_id: String,
    pub task_id: String,
}

pub struct Coordinator {
    state: RwLock<Option<CoordinationState>>,
    config: CoordinationConfig,
    agents: Arc<dyn AgentStore>,
    tasks: Arc<dyn TaskStore>,
    tools: Arc<AgentToolSurface>,
    validator: ContentValidator,
}

impl Coordinator {
    pub fn new(
        config: CoordinationConfig,
        agents: Arc<dyn AgentStore>,
        tasks: Arc<dyn TaskStore>,
        tools: Arc<AgentToolSurface>,
    ) -> Self {
        Self {
            state: RwLock::new(None),
            config,
            agents,
            tasks,
            tools,
            validator: ContentValidator::default(),
        }
    }

    pub async fn state(&self) -> Option<CoordinationState> {
        self.state.read().await.clone()
    }

    pub async fn phase(&self) -> Phase {
        self.state.read().await.as_ref().map(|s| s.phase).unwrap_or(Phase::Idle)
    }

    /// Creates the workspace's ROUTA agent and transitions IDLE -> PLANNING.
    pub async fn initialize(&self, workspace_id: &str) -> Result<String> {
        let result = self
            .tools
            .create_agent(workspace_id, AgentRole::Routa, None, None, Some(ModelTier::Smart))
            .await;
        if !result.success {
            return Err(CoreError::Agent {
                message: result.error.unwrap_or_else(|| "failed to create ROUTA agent".to_string()),
            });
        }
        let routa_id = result.data.unwrap()["agent_id"].as_str().unwrap().to_string();

        let mut guard = self.state.write().await;
        let mut new_state = CoordinationState::new(workspace_id, routa_id.clone());
        new_state.phase = Phase::Planning;
        *guard = Some(new_state);

        Ok(routa_id)
    }

    /// Parses `@@@task` blocks from `plan_text`, saves them, and
    /// transitions PLANNING -> READY if any were produced.
    pub async fn register_tasks(&self, plan_text: &str) -> Result<Vec<String>> {
        let workspace_id = self.require_workspace().await?;
        // Validation never blocks parsing — the `@@@task` parser must never
        // fail on a model's raw plan output — it only surfaces a warning so
        // an operator can see a ROUTA producing suspicious plan text.
        if let Err(e) = self.validator.validate_plan_text(plan_text) {
            tracing::warn!(workspace_id = %workspace_id, error = %e, "plan text failed content validation");
        }
        let parsed = parse_tasks(plan_text, &workspace_id);
        let ids: Vec<String> = parsed.iter().map(|t| t.id.clone()).collect();

        for task in parsed {
            self.tasks.save(task).await?;
        }

        if !ids.is_empty() {
            let mut guard = self.state.write().await;
            if let Some(state) = guard.as_mut() {
                state.phase = Phase::Ready;
            }
        }

        Ok(ids)
    }

    /// Creates a CRAFTER and delegates it for each ready task, then
    /// transitions to EXECUTING.
    pub async fn execute_next_wave(&self) -> Result<Vec<Delegation>> {
        let phase = self.phase().await;
        if !matches!(phase, Phase::Ready | Phase::NeedsFix) {
            return Err(CoreError::IllegalTransition {
                entity: "coordinator".to_string(),
                message: format!("executeNextWave requires READY or NEEDS_FIX, found {phase:?}"),
            });
        }

        let (workspace_id, routa_id, wave) = {
            let guard = self.state.read().await;
            let state = guard.as_ref().ok_or_else(|| CoreError::IllegalTransition {
                entity: "coordinator".to_string(),
                message: "not initialized".to_string(),
            })?;
            (state.workspace_id.clone(), state.routa_agent_id.clone(), state.current_wave)
        };

        let ready_tasks = self.tasks.find_ready_tasks(&workspace_id).await?;
        let mut delegations = Vec::new();
        let mut crafter_ids = Vec::new();

        for task in ready_tasks {
            let result = self
                .tools
                .wake_or_create_task_agent(&workspace_id, &task.id, wave, &routa_id)
                .await;
            if !result.success {
                tracing::warn!(task_id = %task.id, error = ?result.error, "failed to delegate task for wave");
                continue;
            }
            let crafter_id = result.data.unwrap()["agent_id"].as_str().unwrap().to_string();
            crafter_ids.push(crafter_id.clone());
            delegations.push(Delegation {
                crafter_id,
                task_id: task.id,
            });
        }

        let mut guard = self.state.write().await;
        if let Some(state) = guard.as_mut() {
            state.phase = Phase::Executing;
            state.active_crafter_ids = crafter_ids;
        }

        Ok(delegations)
    }

    /// Builds the prompt an agent should receive: role instructions, its
    /// current task snapshot if any, and a tail of its conversation.
    pub async fn build_agent_context(&self, agent_id: &str) -> Result<String> {
        let agent = self.agents.get(agent_id).await?;
        let role_text = role_system_prompt(agent.role);

        let task_snapshot = self
            .tasks
            .list_by_assignee(agent_id)
            .await
            .unwrap_or_default()
            .into_iter()
            .find(|t| {
                matches!(
                    t.status,
                    TaskStatus::InProgress | TaskStatus::ReviewRequired | TaskStatus::NeedsFix
                )
            });

        let task_text = match task_snapshot {
            Some(t) => format!(
                "\n\nCurrent task: {}\nObjective: {}\n",
                t.title, t.objective
            ),
            None => String::new(),
        };

        let tail_result = self
            .tools
            .read_agent_conversation_tail(agent_id, self.config.conversation_tail_messages)
            .await;
        let tail_text = if tail_result.success {
            tail_result
                .data
                .and_then(|d| d.get("conversation").and_then(|v| v.as_str().map(String::from)))
                .unwrap_or_default()
        } else {
            String::new()
        };

        Ok(format!("{role_text}{task_text}\n\nRecent conversation:\n{tail_text}"))
    }

    /// Blocks until every CRAFTER created for the current wave has
    /// reached COMPLETED, then transitions EXECUTING -> WAVE_COMPLETE.
    pub async fn observe_wave_completion(&self) -> Result<()> {
        let crafter_ids = {
            let guard = self.state.read().await;
            guard
                .as_ref()
                .map(|s| s.active_crafter_ids.clone())
                .unwrap_or_default()
        };

        loop {
            let mut all_done = true;
            for crafter_id in &crafter_ids {
                match self.agents.get(crafter_id).await {
                    Ok(agent) if agent.status == crate::models::AgentStatus::Completed => {}
                    _ => {
                        all_done = false;
                        break;
                    }
                }
            }
            if all_done {
                break;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }

        let mut guard = self.state.write().await;
        if let Some(state) = guard.as_mut() {
            state.phase = Phase::WaveComplete;
        }
        Ok(())
    }

    /// Creates a GATE agent and transitions WAVE_COMPLETE -> VERIFYING.
    pub async fn start_verification(&self) -> Result<String> {
        let (workspace_id, routa_id) = {
            let guard = self.state.read().await;
            let state = guard.as_ref().ok_or_else(|| CoreError::IllegalTransition {
                entity: "coordinator".to_string(),
                message: "not initialized".to_string(),
            })?;
            (state.workspace_id.clone(), state.routa_agent_id.clone())
        };

        let result = self
            .tools
            .create_agent(&workspace_id, AgentRole::Gate, None, Some(routa_id), Some(ModelTier::Smart))
            .await;
        if !result.success {
            return Err(CoreError::Agent {
                message: result.error.unwrap_or_else(|| "failed to create GATE agent".to_string()),
            });
        }
        let gate_id = result.data.unwrap()["agent_id"].as_str().unwrap().to_string();

        let mut guard = self.state.write().await;
        if let Some(state) = guard.as_mut() {
            state.active_gate_id = Some(gate_id.clone());
            state.phase = Phase::Verifying;
        }

        Ok(gate_id)
    }

    /// Parses the GATE's verdict and applies it to every REVIEW_REQUIRED
    /// task, then moves the phase to COMPLETED or back to NEEDS_FIX.
    pub async fn record_verdict(&self, gate_output: &str) -> Result<Phase> {
        let workspace_id = self.require_workspace().await?;
        let verdict = parse_verdict(gate_output);

        let review_tasks: Vec<_> = self
            .tasks
            .list_by_workspace(&workspace_id)
            .await?
            .into_iter()
            .filter(|t| t.status == TaskStatus::ReviewRequired)
            .collect();

        for task in review_tasks {
            match verdict {
                Some(VerificationVerdict::Approved) => {
                    self.tasks.update_status(&task.id, TaskStatus::Completed).await?;
                }
                Some(VerificationVerdict::NotApproved) => {
                    self.tasks.update_status(&task.id, TaskStatus::NeedsFix).await?;
                    self.tasks.update_status(&task.id, TaskStatus::Pending).await?;
                }
                Some(VerificationVerdict::Blocked) | None => {
                    let mut blocked = task.clone();
                    blocked.status = TaskStatus::Blocked;
                    blocked.updated_at = chrono::Utc::now();
                    self.tasks.update(blocked).await?;
                }
            }
        }

        let all_tasks = self.tasks.list_by_workspace(&workspace_id).await?;
        let all_resolved = all_tasks
            .iter()
            .all(|t| matches!(t.status, TaskStatus::Completed | TaskStatus::Blocked | TaskStatus::Cancelled));

        let next_phase = if all_resolved {
            Phase::Completed
        } else {
            Phase::NeedsFix
        };

        let mut guard = self.state.write().await;
        if let Some(state) = guard.as_mut() {
            state.phase = next_phase;
            state.active_gate_id = None;
            if next_phase == Phase::NeedsFix {
                state.current_wave += 1;
            }
        }

        Ok(next_phase)
    }

    pub fn max_waves(&self) -> u32 {
        self.config.max_waves
    }

    pub async fn current_wave(&self) -> u32 {
        self.state.read().await.as_ref().map(|s| s.current_wave).unwrap_or(1)
    }

    /// Cancels subscriptions and clears active ids; stores are retained.
    pub async fn reset(&self) {
        let mut guard = self.state.write().await;
        if let Some(state) = guard.as_mut() {
            state.active_crafter_ids.clear();
            state.active_gate_id = None;
            state.phase = Phase::Idle;
        }
    }

    pub async fn shutdown(&self) {
        self.reset().await;
    }

    async fn require_workspace(&self) -> Result<String> {
        self.state
            .read()
            .await
            .as_ref()
            .map(|s| s.workspace_id.clone())
            .ok_or_else(|| CoreError::IllegalTransition {
                entity: "coordinator".to_string(),
                message: "not initialized".to_string(),
            })
    }
}

fn role_system_prompt(role: AgentRole) -> String {
    match role {
        AgentRole::Routa => {
            "You are the coordinator. Plan the work as @@@task blocks. Never edit files directly."
                .to_string()
        }
        AgentRole::Crafter => {
            "You are an implementor. Execute your assigned task exactly within its scope, then call report_to_parent."
                .to_string()
        }
        AgentRole::Gate => {
            "You are the verifier. Review the completed work against its Definition of Done and Verification steps, then state APPROVED or NOT APPROVED."
                .to_string()
        }
    }
}
