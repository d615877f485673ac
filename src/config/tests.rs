use super::*;
use serial_test::serial;
use std::env;

fn cleanup_test_env() {
    env::remove_var("COORD_MAX_WAVES");
    env::remove_var("COORD_MAX_ITERATIONS_ROUTA");
    env::remove_var("COORD_MAX_ITERATIONS_CRAFTER");
    env::remove_var("COORD_MAX_ITERATIONS_GATE");
    env::remove_var("COORD_PROVIDER_TIMEOUT_MS");
    env::remove_var("COORD_CONVERSATION_TAIL_MESSAGES");
    env::remove_var("EVENT_BUS_BUFFER");
}

#[test]
#[serial]
fn load_never_fails_on_bare_environment() {
    cleanup_test_env();
    let result = Config::load();
    assert!(result.is_ok());
    cleanup_test_env();
}

#[test]
#[serial]
fn defaults_match_spec_values() {
    cleanup_test_env();
    let config = Config::load().unwrap();
    assert_eq!(config.coordination.max_waves, 5);
    assert_eq!(config.coordination.max_iterations_routa, 20);
    assert_eq!(config.coordination.max_iterations_crafter, 20);
    assert_eq!(config.coordination.max_iterations_gate, 30);
    assert_eq!(config.coordination.provider_timeout_ms, 300_000);
    assert_eq!(config.coordination.conversation_tail_messages, 20);
    assert_eq!(config.event_bus.buffer, 256);
    cleanup_test_env();
}

#[test]
#[serial]
fn env_overrides_take_precedence() {
    cleanup_test_env();
    env::set_var("COORD_MAX_WAVES", "9");
    env::set_var("EVENT_BUS_BUFFER", "64");

    let config = Config::load().unwrap();
    assert_eq!(config.coordination.max_waves, 9);
    assert_eq!(config.event_bus.buffer, 64);

    cleanup_test_env();
}

#[test]
#[serial]
fn unparsable_env_value_falls_back_to_default() {
    cleanup_test_env();
    env::set_var("COORD_MAX_WAVES", "not-a-number");

    let config = Config::load().unwrap();
    assert_eq!(config.coordination.max_waves, 5);

    cleanup_test_env();
}
