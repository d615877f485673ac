//! Top-level driver: wires the coordinator, tool surface, stores, event
//! bus, and a provider together and runs the full plan -> execute ->
//! verify loop for one user request.
use crate::coordinator::Coordinator;
use crate::error::Result;
use crate::models::{AgentRole, CompletionReport, TaskStatus};
use crate::provider::Provider;
use crate::store::TaskStore;
use crate::tools::AgentToolSurface;
use futures::future::join_all;
use std::sync::Arc;

/// Progress callback payload, emitted at every state boundary named in
/// spec.md §4.8.
#[derive(Debug, Clone)]
pub enum OrchestratorPhase {
    Initializing,
    Planning,
    PlanReady,
    TasksRegistered { count: usize },
    WaveStarting { wave: u32 },
    CrafterRunning { agent_id: String, task_id: String },
    CrafterCompleted { agent_id: String, task_id: String },
    VerificationStarting { gate_id: String },
    VerificationCompleted,
    NeedsFix,
    Completed,
    MaxWavesReached,
}

#[derive(Debug, Clone)]
pub enum OrchestratorResult {
    Success { task_summaries: Vec<String> },
    NoTasks { plan_text: String },
    MaxWavesReached,
}

pub struct Orchestrator {
    coordinator: Arc<Coordinator>,
    tools: Arc<AgentToolSurface>,
    tasks: Arc<dyn TaskStore>,
    provider: Arc<dyn Provider>,
}

impl Orchestrator {
    pub fn new(
        coordinator: Arc<Coordinator>,
        tools: Arc<AgentToolSurface>,
        tasks: Arc<dyn TaskStore>,
        provider: Arc<dyn Provider>,
    ) -> Self {
        Self {
            coordinator,
            tools,
            tasks,
            provider,
        }
    }

    pub async fn run(
        &self,
        workspace_id: &str,
        user_request: &str,
        on_phase: impl Fn(OrchestratorPhase) + Send + Sync,
    ) -> Result<OrchestratorResult> {
        on_phase(OrchestratorPhase::Initializing);
        let routa_id = self.coordinator.initialize(workspace_id).await?;

        on_phase(OrchestratorPhase::Planning);
        let plan_text = self.provider.run(AgentRole::Routa, &routa_id, user_request).await?;

        on_phase(OrchestratorPhase::PlanReady);
        let task_ids = self.coordinator.register_tasks(&plan_text).await?;
        if task_ids.is_empty() {
            return Ok(OrchestratorResult::NoTasks { plan_text });
        }
        on_phase(OrchestratorPhase::TasksRegistered { count: task_ids.len() });

        let max_waves = self.coordinator.max_waves();
        for _wave in 1..=max_waves {
            let wave = self.coordinator.current_wave().await;
            on_phase(OrchestratorPhase::WaveStarting { wave });

            let delegations = self.coordinator.execute_next_wave().await?;

            let on_phase = &on_phase;
            let runs = delegations.iter().map(|d| {
                let crafter_id = d.crafter_id.clone();
                let task_id = d.task_id.clone();
                async move {
                    on_phase(OrchestratorPhase::CrafterRunning {
                        agent_id: crafter_id.clone(),
                        task_id: task_id.clone(),
                    });
                    let ctx = self.coordinator.build_agent_context(&crafter_id).await?;
                    let output = self.provider.run(AgentRole::Crafter, &crafter_id, &ctx).await?;
                    self.ensure_reported(&crafter_id, &task_id, &output).await?;
                    Ok::<_, crate::error::CoreError>((crafter_id, task_id))
                }
            });

            for result in join_all(runs).await {
                if let Ok((agent_id, task_id)) = result {
                    on_phase(OrchestratorPhase::CrafterCompleted { agent_id, task_id });
                }
            }

            self.coordinator.observe_wave_completion().await?;

            let gate_id = self.coordinator.start_verification().await?;
            on_phase(OrchestratorPhase::VerificationStarting { gate_id: gate_id.clone() });

            let gate_ctx = self.coordinator.build_agent_context(&gate_id).await?;
            let verdict_text = self.provider.run(AgentRole::Gate, &gate_id, &gate_ctx).await?;
            let phase = self.coordinator.record_verdict(&verdict_text).await?;
            on_phase(OrchestratorPhase::VerificationCompleted);

            if phase == crate::models::Phase::Completed {
                on_phase(OrchestratorPhase::Completed);
                let summaries = self.collect_summaries(workspace_id).await?;
                return Ok(OrchestratorResult::Success { task_summaries: summaries });
            }

            on_phase(OrchestratorPhase::NeedsFix);
        }

        on_phase(OrchestratorPhase::MaxWavesReached);
        Ok(OrchestratorResult::MaxWavesReached)
    }

    /// If the CRAFTER's run never produced a `report_to_parent` call (the
    /// task is still IN_PROGRESS), synthesize a failing completion report
    /// so the wave can still converge.
    async fn ensure_reported(&self, crafter_id: &str, task_id: &str, output: &str) -> Result<()> {
        let task = self.tasks.get(task_id).await?;
        if task.status != TaskStatus::InProgress {
            return Ok(());
        }

        let report = CompletionReport {
            agent_id: crafter_id.to_string(),
            task_id: task_id.to_string(),
            summary: format!("No report submitted; raw output: {}", truncate(output, 200)),
            files_modified: Vec::new(),
            verification_results: Default::default(),
            success: false,
        };
        let result = self.tools.report_to_parent(report).await;
        if !result.success {
            tracing::warn!(%crafter_id, %task_id, error = ?result.error, "failed to synthesize completion report");
        }
        Ok(())
    }

    async fn collect_summaries(&self, workspace_id: &str) -> Result<Vec<String>> {
        let tasks = self.tasks.list_by_workspace(workspace_id).await?;
        Ok(tasks
            .into_iter()
            .filter(|t| t.status == TaskStatus::Completed)
            .map(|t| t.completion_summary.unwrap_or_else(|| format!("{} (no summary)", t.title)))
            .collect())
    }
}

fn truncate(text: &str, max_len: usize) -> String {
    if text.len() <= max_len {
        text.to_string()
    } else {
        format!("{}...", &text[..max_len])
    }
}
