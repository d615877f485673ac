use super::{get_cloned, TaskStore};
use crate::error::{CoreError, Result};
use crate::models::{Task, TaskStatus};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

#[derive(Default)]
pub struct InMemoryTaskStore {
    tasks: Arc<RwLock<HashMap<String, Task>>>,
    transition_lock: Arc<Mutex<()>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn legal_transition(from: TaskStatus, to: TaskStatus) -> bool {
        use TaskStatus::*;
        matches!(
            (from, to),
            (Pending, InProgress)
                | (InProgress, ReviewRequired)
                | (ReviewRequired, Completed)
                | (ReviewRequired, NeedsFix)
                | (NeedsFix, Pending)
                | (Pending, Cancelled)
                | (InProgress, Cancelled)
                | (ReviewRequired, Blocked)
        )
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn save(&self, task: Task) -> Result<()> {
        self.tasks.write().await.insert(task.id.clone(), task);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Task> {
        get_cloned(&self.tasks, &id.to_string(), || {
            CoreError::NotFound(format!("task {id}"))
        })
        .await
    }

    async fn list_by_workspace(&self, workspace_id: &str) -> Result<Vec<Task>> {
        let guard = self.tasks.read().await;
        Ok(guard
            .values()
            .filter(|t| t.workspace_id == workspace_id)
            .cloned()
            .collect())
    }

    async fn list_by_assignee(&self, agent_id: &str) -> Result<Vec<Task>> {
        let guard = self.tasks.read().await;
        Ok(guard
            .values()
            .filter(|t| t.assigned_to.as_deref() == Some(agent_id))
            .cloned()
            .collect())
    }

    async fn find_ready_tasks(&self, workspace_id: &str) -> Result<Vec<Task>> {
        let guard = self.tasks.read().await;
        let ready: Vec<Task> = guard
            .values()
            .filter(|t| t.workspace_id == workspace_id && t.status == TaskStatus::Pending)
            .filter(|t| {
                t.dependencies.iter().all(|dep_id| {
                    guard
                        .get(dep_id)
                        .map(|dep| dep.status == TaskStatus::Completed)
                        .unwrap_or(false)
                })
            })
            .cloned()
            .collect();
        Ok(ready)
    }

    async fn update_status(&self, id: &str, new_status: TaskStatus) -> Result<Task> {
        let _guard = self.transition_lock.lock().await;
        let mut tasks = self.tasks.write().await;
        let task = tasks
            .get_mut(id)
            .ok_or_else(|| CoreError::NotFound(format!("task {id}")))?;

        if !Self::legal_transition(task.status, new_status) {
            return Err(CoreError::IllegalTransition {
                entity: format!("task {id}"),
                message: format!("{:?} -> {:?}", task.status, new_status),
            });
        }

        task.status = new_status;
        task.updated_at = chrono::Utc::now();

        task.assigned_to = match new_status {
            TaskStatus::InProgress | TaskStatus::ReviewRequired | TaskStatus::NeedsFix => {
                task.assigned_to.clone()
            }
            _ => None,
        };

        Ok(task.clone())
    }

    async fn update(&self, task: Task) -> Result<()> {
        let _guard = self.transition_lock.lock().await;
        let mut tasks = self.tasks.write().await;
        tasks.insert(task.id.clone(), task);
        Ok(())
    }
}
