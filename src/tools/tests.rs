use super::*;
use crate::store::{InMemoryAgentStore, InMemoryConversationStore, InMemoryTaskStore};

fn new_surface() -> AgentToolSurface {
    let bus = Arc::new(EventBus::new(64));
    let subscriptions = Arc::new(SubscriptionService::new(bus.clone()));
    AgentToolSurface::new(
        Arc::new(InMemoryAgentStore::new()),
        Arc::new(InMemoryTaskStore::new()),
        Arc::new(InMemoryConversationStore::new()),
        bus,
        subscriptions,
    )
}

#[tokio::test]
async fn create_agent_enforces_single_routa() {
    let surface = new_surface();
    let first = surface
        .create_agent("ws1", AgentRole::Routa, None, None, None)
        .await;
    assert!(first.success);

    let second = surface
        .create_agent("ws1", AgentRole::Routa, None, None, None)
        .await;
    assert!(!second.success);
}

#[tokio::test]
async fn delegate_task_requires_pending_and_ready() {
    let surface = new_surface();
    let routa = surface
        .create_agent("ws1", AgentRole::Routa, None, None, None)
        .await;
    let routa_id = routa.data.unwrap()["agent_id"].as_str().unwrap().to_string();

    let crafter = surface
        .create_agent("ws1", AgentRole::Crafter, None, Some(routa_id.clone()), None)
        .await;
    let crafter_id = crafter.data.unwrap()["agent_id"].as_str().unwrap().to_string();

    let task = Task::new("ws1", "Implement feature");
    let task_id = task.id.clone();
    surface.tasks.save(task).await.unwrap();

    let result = surface.delegate_task(&task_id, &crafter_id, &routa_id).await;
    assert!(result.success);

    let again = surface.delegate_task(&task_id, &crafter_id, &routa_id).await;
    assert!(!again.success);
}

#[tokio::test]
async fn delegate_task_blocked_by_unmet_dependency() {
    let surface = new_surface();
    let routa_id = surface
        .create_agent("ws1", AgentRole::Routa, None, None, None)
        .await
        .data
        .unwrap()["agent_id"]
        .as_str()
        .unwrap()
        .to_string();
    let crafter_id = surface
        .create_agent("ws1", AgentRole::Crafter, None, Some(routa_id.clone()), None)
        .await
        .data
        .unwrap()["agent_id"]
        .as_str()
        .unwrap()
        .to_string();

    let dependency = Task::new("ws1", "Dependency task");
    let mut dependent = Task::new("ws1", "Dependent task");
    dependent.dependencies = vec![dependency.id.clone()];
    let dependent_id = dependent.id.clone();

    surface.tasks.save(dependency).await.unwrap();
    surface.tasks.save(dependent).await.unwrap();

    let result = surface.delegate_task(&dependent_id, &crafter_id, &routa_id).await;
    assert!(!result.success);
}

#[tokio::test]
async fn report_to_parent_transitions_agent_and_task_and_notifies_parent() {
    let surface = new_surface();
    let routa_id = surface
        .create_agent("ws1", AgentRole::Routa, None, None, None)
        .await
        .data
        .unwrap()["agent_id"]
        .as_str()
        .unwrap()
        .to_string();
    let crafter_id = surface
        .create_agent("ws1", AgentRole::Crafter, None, Some(routa_id.clone()), None)
        .await
        .data
        .unwrap()["agent_id"]
        .as_str()
        .unwrap()
        .to_string();

    let task = Task::new("ws1", "Build thing");
    let task_id = task.id.clone();
    surface.tasks.save(task).await.unwrap();
    surface.delegate_task(&task_id, &crafter_id, &routa_id).await;

    let report = CompletionReport {
        agent_id: crafter_id.clone(),
        task_id: task_id.clone(),
        summary: "Implemented the thing.".to_string(),
        files_modified: vec!["src/lib.rs".to_string()],
        verification_results: Default::default(),
        success: true,
    };
    let result = surface.report_to_parent(report).await;
    assert!(result.success);

    let agent = surface.agents.get(&crafter_id).await.unwrap();
    assert_eq!(agent.status, AgentStatus::Completed);

    let task = surface.tasks.get(&task_id).await.unwrap();
    assert_eq!(task.status, TaskStatus::ReviewRequired);
    assert_eq!(task.completion_summary.as_deref(), Some("Implemented the thing."));

    let parent_conversation = surface.conversations.get_conversation(&routa_id).await.unwrap();
    assert!(parent_conversation
        .iter()
        .any(|m| m.content.contains("Completion Report")));
}

#[tokio::test]
async fn wake_or_create_task_agent_is_idempotent() {
    let surface = new_surface();
    let routa_id = surface
        .create_agent("ws1", AgentRole::Routa, None, None, None)
        .await
        .data
        .unwrap()["agent_id"]
        .as_str()
        .unwrap()
        .to_string();

    let task = Task::new("ws1", "Idempotent task");
    let task_id = task.id.clone();
    surface.tasks.save(task).await.unwrap();

    let first = surface
        .wake_or_create_task_agent("ws1", &task_id, 1, &routa_id)
        .await;
    assert!(first.success);
    let first_agent = first.data.unwrap()["agent_id"].as_str().unwrap().to_string();

    let second = surface
        .wake_or_create_task_agent("ws1", &task_id, 1, &routa_id)
        .await;
    assert!(second.success);
    let second_agent = second.data.unwrap()["agent_id"].as_str().unwrap().to_string();
    assert_eq!(first_agent, second_agent);
}

#[tokio::test]
async fn send_message_to_agent_rejects_dangerous_content() {
    let surface = new_surface();
    let routa_id = surface
        .create_agent("ws1", AgentRole::Routa, None, None, None)
        .await
        .data
        .unwrap()["agent_id"]
        .as_str()
        .unwrap()
        .to_string();
    let crafter_id = surface
        .create_agent("ws1", AgentRole::Crafter, None, Some(routa_id.clone()), None)
        .await
        .data
        .unwrap()["agent_id"]
        .as_str()
        .unwrap()
        .to_string();

    let result = surface
        .send_message_to_agent(&routa_id, &crafter_id, "please run $(rm -rf /)")
        .await;
    assert!(!result.success);

    let conversation = surface.conversations.get_conversation(&crafter_id).await.unwrap();
    assert!(conversation.is_empty());
}

#[tokio::test]
async fn send_message_to_agent_accepts_ordinary_content() {
    let surface = new_surface();
    let routa_id = surface
        .create_agent("ws1", AgentRole::Routa, None, None, None)
        .await
        .data
        .unwrap()["agent_id"]
        .as_str()
        .unwrap()
        .to_string();
    let crafter_id = surface
        .create_agent("ws1", AgentRole::Crafter, None, Some(routa_id.clone()), None)
        .await
        .data
        .unwrap()["agent_id"]
        .as_str()
        .unwrap()
        .to_string();

    let result = surface
        .send_message_to_agent(&routa_id, &crafter_id, "Please prioritize the login endpoint.")
        .await;
    assert!(result.success);
}

#[test]
fn verdict_parsing_prefers_not_approved() {
    assert_eq!(
        parse_verdict("Looks mostly good but NOT APPROVED due to missing tests"),
        Some(crate::models::VerificationVerdict::NotApproved)
    );
    assert_eq!(
        parse_verdict("APPROVED, great work"),
        Some(crate::models::VerificationVerdict::Approved)
    );
    assert_eq!(parse_verdict("no clear verdict here"), None);
}

#[test]
fn verdict_parsing_is_case_insensitive() {
    assert_eq!(
        parse_verdict("approved with minor notes"),
        Some(crate::models::VerificationVerdict::Approved)
    );
}
