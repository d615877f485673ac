use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::env;

#[cfg(test)]
mod tests;

/// Bounds on the coordination loop: wave retries, per-role iteration caps,
/// provider timeout, and how much conversation history an agent is shown.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CoordinationConfig {
    pub max_waves: u32,
    pub max_iterations_routa: u32,
    pub max_iterations_crafter: u32,
    pub max_iterations_gate: u32,
    pub provider_timeout_ms: u64,
    pub conversation_tail_messages: usize,
}

impl Default for CoordinationConfig {
    fn default() -> Self {
        Self {
            max_waves: 5,
            max_iterations_routa: 20,
            max_iterations_crafter: 20,
            max_iterations_gate: 30,
            provider_timeout_ms: 300_000,
            conversation_tail_messages: 20,
        }
    }
}

/// Sizing for the in-process event bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventBusConfig {
    pub buffer: usize,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self { buffer: 256 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    pub coordination: CoordinationConfig,
    pub event_bus: EventBusConfig,
}

/// Parse an env var with a fallback, silently keeping the default on a
/// missing or unparsable value rather than failing construction.
fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Loads configuration from the environment, falling back to
    /// spec-mandated defaults for anything unset. Unlike the teacher's
    /// config loader, this never fails on a bare environment: there are no
    /// required secrets here, since the crate takes no provider credentials
    /// itself.
    pub fn load() -> Result<Self> {
        match dotenvy::dotenv() {
            Ok(path) => tracing::info!(?path, "loaded .env file"),
            Err(e) => tracing::debug!("no .env file loaded: {e}"),
        }

        let defaults = CoordinationConfig::default();
        let coordination = CoordinationConfig {
            max_waves: env_or("COORD_MAX_WAVES", defaults.max_waves),
            max_iterations_routa: env_or(
                "COORD_MAX_ITERATIONS_ROUTA",
                defaults.max_iterations_routa,
            ),
            max_iterations_crafter: env_or(
                "COORD_MAX_ITERATIONS_CRAFTER",
                defaults.max_iterations_crafter,
            ),
            max_iterations_gate: env_or(
                "COORD_MAX_ITERATIONS_GATE",
                defaults.max_iterations_gate,
            ),
            provider_timeout_ms: env_or("COORD_PROVIDER_TIMEOUT_MS", defaults.provider_timeout_ms),
            conversation_tail_messages: env_or(
                "COORD_CONVERSATION_TAIL_MESSAGES",
                defaults.conversation_tail_messages,
            ),
        };

        let event_bus = EventBusConfig {
            buffer: env_or("EVENT_BUS_BUFFER", EventBusConfig::default().buffer),
        };

        tracing::debug!(?coordination, ?event_bus, "configuration loaded");

        Ok(Config {
            coordination,
            event_bus,
        })
    }
}
