use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::{info, Level};
use wavecore::config::Config;
use wavecore::coordinator::Coordinator;
use wavecore::events::EventBus;
use wavecore::orchestrator::{Orchestrator, OrchestratorPhase, OrchestratorResult};
use wavecore::provider::MockProvider;
use wavecore::store::{InMemoryAgentStore, InMemoryConversationStore, InMemoryTaskStore};
use wavecore::subscription::SubscriptionService;
use wavecore::tools::AgentToolSurface;

/// Drives one coordination run against a deterministic mock provider.
/// Demonstrates library wiring; this binary is not a product surface.
#[derive(Parser, Debug)]
#[command(name = "wavecore", version, about = "Multi-agent coordination core demo")]
struct Cli {
    /// The user request handed to the coordinator (ROUTA).
    #[arg(default_value = "Build a small feature with two independent pieces of work.")]
    request: String,

    /// Plan text the mock ROUTA provider should return. When absent, a
    /// built-in two-task demo plan is used.
    #[arg(long)]
    plan: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let cli = Cli::parse();
    let config = Config::load()?;
    info!(?config, "loaded configuration");

    let bus = Arc::new(EventBus::new(config.event_bus.buffer));
    let subscriptions = Arc::new(SubscriptionService::new(bus.clone()));
    subscriptions.start_listening().await;

    let agents = Arc::new(InMemoryAgentStore::new());
    let tasks = Arc::new(InMemoryTaskStore::new());
    let conversations = Arc::new(InMemoryConversationStore::new());

    let tools = Arc::new(AgentToolSurface::new(
        agents.clone(),
        tasks.clone(),
        conversations,
        bus,
        subscriptions,
    ));

    let coordinator = Arc::new(Coordinator::new(
        config.coordination.clone(),
        agents,
        tasks.clone(),
        tools.clone(),
    ));

    let provider = Arc::new(MockProvider::new());
    let plan = cli.plan.unwrap_or_else(default_demo_plan);
    provider.queue_routa_response(plan);
    provider.queue_crafter_response("done");
    provider.queue_crafter_response("done");
    provider.queue_gate_response("APPROVED");

    let orchestrator = Orchestrator::new(coordinator, tools, tasks, provider);

    let result = orchestrator
        .run("demo-workspace", &cli.request, |phase| log_phase(&phase))
        .await?;

    match result {
        OrchestratorResult::Success { task_summaries } => {
            info!("orchestration succeeded");
            for summary in task_summaries {
                println!("- {summary}");
            }
        }
        OrchestratorResult::NoTasks { plan_text } => {
            info!("coordinator produced no tasks");
            println!("{plan_text}");
        }
        OrchestratorResult::MaxWavesReached => {
            info!("maximum verification waves reached without full approval");
        }
    }

    Ok(())
}

fn log_phase(phase: &OrchestratorPhase) {
    info!(?phase, "orchestrator phase transition");
}

fn default_demo_plan() -> String {
    r#"
@@@task
# Implement Login API

## Objective
Add a POST /login endpoint that issues a session token.

## Scope
- Add route handler
- Validate credentials against the user store

## Definition of Done
- Endpoint returns 200 with a token on success

## Verification
- cargo test login
@@@

@@@task
# Add User Registration

## Objective
Allow new users to sign up.

## Scope
- Add registration route

## Definition of Done
- New user can sign up and then log in

## Verification
- cargo test registration
@@@
"#
    .to_string()
}
