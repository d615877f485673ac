//! # Wavecore
//!
//! Wavecore drives a three-role multi-agent coordination pipeline: a
//! coordinator (ROUTA) plans work as `@@@task` blocks, one or more
//! implementors (CRAFTER) execute tasks in parallel, and a verifier
//! (GATE) approves or rejects a wave's completed work before the next
//! round begins.
//!
//! ## Architecture
//!
//! - **Stores**: thread-safe in-memory records for agents, tasks, and
//!   per-agent conversations, behind pluggable traits.
//! - **Event bus**: bounded fan-out of typed `AgentEvent`s.
//! - **Subscription service**: per-agent filtered, wildcard, one-shot
//!   subscriptions over the bus.
//! - **Task parser**: extracts `@@@task` blocks from free-text plans.
//! - **Agent tool surface**: the only legitimate way to mutate stores
//!   from within an agent's execution.
//! - **Coordinator**: the state machine tying stores, bus, and tools
//!   together across a session.
//! - **Provider router**: capability-based selection of an execution
//!   backend per role, with resilient fallback.
//! - **Orchestrator**: the top-level driver for one user request.

/// Crate-wide configuration, environment-driven with spec-mandated defaults.
pub mod config;
/// Coordination state machine.
pub mod coordinator;
/// System-wide constants.
pub mod constants;
/// Error types and the crate's `Result` alias.
pub mod error;
/// Bounded fan-out event bus.
pub mod events;
/// Core data models.
pub mod models;
/// `@@@task` block parser.
pub mod parser;
/// Top-level orchestration driver.
pub mod orchestrator;
/// Execution backend abstraction and capability-based routing.
pub mod provider;
/// Thread-safe in-memory stores.
pub mod store;
/// Per-agent event subscriptions.
pub mod subscription;
/// Agent coordination tool surface.
pub mod tools;
/// Content validation for externally supplied text.
pub mod validation;

pub use error::{CoreError, Result};
