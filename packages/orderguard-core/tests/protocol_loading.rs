//! Protocol loading tests
//!
//! YAML/JSON protocol files, order expressions and the registry, checked
//! end to end against small programs.

mod common;

use common::*;
use orderguard_core::features::typestate::{ParseError, ProtocolBuilder, ProtocolParser};
use orderguard_core::{
    Confidence, OrderguardError, Program, ProtocolRegistry, State, TypestateAnalyzer,
    TypestateResult, VerifierConfig, ViolationKind,
};
use pretty_assertions::assert_eq;

const LOCK_YAML: &str = r#"
protocol: Lock
initial_state: Unlocked
final_states: [Unlocked]
transitions:
  - { from: Unlocked, action: acquire, to: Locked }
  - { from: Locked, action: release, to: Unlocked }
aliases:
  lock: acquire
  unlock: release
"#;

const PROTOCOL_LIST_YAML: &str = r#"
- protocol: Socket
  initial_state: Closed
  final_states: [Closed]
  transitions:
    - { from: Closed, action: connect, to: Open }
    - { from: Open, action: send, to: Open }
    - { from: Open, action: close, to: Closed }
- protocol: Digest
  order: "update*, final"
  aliases:
    doFinal: final
"#;

fn analyze_in(registry: &ProtocolRegistry, program: &Program) -> TypestateResult {
    TypestateAnalyzer::new(registry, VerifierConfig::default()).analyze(program)
}

#[test]
fn yaml_protocol_checks_programs() {
    let mut registry = ProtocolRegistry::with_builtin();
    assert_eq!(registry.load_yaml(LOCK_YAML).unwrap(), 1);

    let program = main_program(
        BodyBuilder::new()
            .create("m", "Lock")
            .op("m", "lock")
            .op("m", "release")
            .op("m", "unlock"),
    );

    let result = analyze_in(&registry, &program);
    let violation = assert_single(&result);

    assert_violation(violation, Confidence::Definite, "release", 4);
    assert_eq!(violation.state_at_call.to_string(), "Unlocked");
    assert_eq!(violation.expected, vec!["acquire".to_string()]);
}

#[test]
fn yaml_list_registers_every_protocol() {
    let mut registry = ProtocolRegistry::with_builtin();

    let count = registry.load_yaml(PROTOCOL_LIST_YAML).unwrap();

    assert_eq!(count, 2);
    assert_eq!(registry.names(), vec!["Cipher", "Digest", "Socket"]);
}

#[test]
fn order_protocol_from_yaml_uses_aliases() {
    let mut registry = ProtocolRegistry::new();
    registry.load_yaml(PROTOCOL_LIST_YAML).unwrap();

    let program = main_program(
        BodyBuilder::new()
            .create("d", "Digest")
            .ops("d", &["update", "update", "doFinal", "update"]),
    );

    let result = analyze_in(&registry, &program);
    let violation = assert_single(&result);

    assert_violation(violation, Confidence::Definite, "update", 5);
    assert!(violation.expected.is_empty());
    assert!(violation.message.contains("no further calls"));
}

#[test]
fn order_rule_matches_table_protocol_on_branches() {
    let mut registry = ProtocolRegistry::with_builtin();
    registry
        .register_order("Lifecycle", "init, (start, process*, finish)+, reset?")
        .unwrap();

    let program = main_program(
        BodyBuilder::new()
            .create("c", "Lifecycle")
            .op("c", "init")
            .if_then(|b| b.op("c", "start"))
            .op("c", "finish"),
    );

    let result = analyze_in(&registry, &program);

    assert_violation(assert_single(&result), Confidence::Potential, "finish", 5);
}

#[test]
fn forbidden_method_is_reported_in_every_state() {
    let yaml = r#"
protocol: Digest
order: "update*, final"
aliases:
  doFinal: final
forbidden:
  - reuse_context
"#;
    let mut registry = ProtocolRegistry::new();
    registry.load_yaml(yaml).unwrap();

    let program = main_program(
        BodyBuilder::new()
            .create("d", "Digest")
            .op("d", "reuse_context")
            .if_then(|b| b.op("d", "update"))
            .op("d", "doFinal")
            .op("d", "reuse_context"),
    );

    let result = analyze_in(&registry, &program);

    assert_eq!(result.violations.len(), 2);
    for (violation, line) in result.violations.iter().zip([2, 6]) {
        assert_violation(violation, Confidence::Definite, "reuse_context", line);
        assert_eq!(violation.kind, ViolationKind::ForbiddenCall);
        assert!(violation.message.contains("must never be called"));
    }
}

#[test]
fn json_protocol_definition() {
    let json = r#"{
        "protocol": "File",
        "initial_state": "Closed",
        "final_states": ["Closed"],
        "transitions": [
            {"from": "Closed", "action": "open", "to": "Open"},
            {"from": "Open", "action": "read", "to": "Open"},
            {"from": "Open", "action": "close", "to": "Closed"}
        ]
    }"#;

    let protocol = ProtocolParser::from_json(json).unwrap();

    assert_eq!(protocol.name, "File");
    assert!(protocol.is_final_state(&State::new("Closed")));
    assert_eq!(protocol.transitions.len(), 3);
}

#[test]
fn builder_protocol_registers() {
    let protocol = ProtocolBuilder::new("Mac")
        .initial_state("Created")
        .add_transition("Created", "set_key", "Keyed")
        .add_transition("Keyed", "update", "Keyed")
        .add_transition("Keyed", "final", "Keyed")
        .final_state("Keyed")
        .build();
    let mut registry = ProtocolRegistry::new();
    registry.register(protocol).unwrap();

    let program = main_program(
        BodyBuilder::new()
            .create("mac", "Mac")
            .op("mac", "update")
            .op("mac", "set_key")
            .op("mac", "final"),
    );

    let result = analyze_in(&registry, &program);

    assert_violation(assert_single(&result), Confidence::Definite, "update", 2);
}

// ============================================================================
// Rejected definitions
// ============================================================================

#[test]
fn duplicate_protocol_is_rejected() {
    let mut registry = ProtocolRegistry::with_builtin();

    let err = registry
        .register_order("Cipher", "init, start, finish")
        .unwrap_err();

    assert!(matches!(err, OrderguardError::Protocol(_)));
    assert!(err.to_string().contains("already registered"));
}

#[test]
fn order_and_transitions_together_are_rejected() {
    let yaml = r#"
protocol: Broken
initial_state: A
order: "a, b"
transitions:
  - { from: A, action: a, to: B }
"#;

    let err = ProtocolRegistry::new().load_yaml(yaml).unwrap_err();

    assert!(matches!(
        err,
        OrderguardError::Parse(ParseError::SemanticError(_))
    ));
}

#[test]
fn unreachable_final_state_is_rejected() {
    let yaml = r#"
protocol: Stuck
initial_state: A
final_states: [C]
transitions:
  - { from: A, action: go, to: B }
  - { from: C, action: back, to: A }
"#;

    let err = ProtocolParser::from_yaml(yaml).unwrap_err();

    assert!(matches!(err, ParseError::SemanticError(ref msg) if msg.contains("unreachable")));
}

#[test]
fn alias_to_unknown_action_is_rejected() {
    let yaml = r#"
protocol: Lock
initial_state: Unlocked
transitions:
  - { from: Unlocked, action: acquire, to: Locked }
aliases:
  unlock: release
"#;

    let err = ProtocolParser::from_yaml(yaml).unwrap_err();

    assert!(matches!(err, ParseError::ValidationError(_)));
}

#[test]
fn malformed_inputs_are_syntax_errors() {
    let mut registry = ProtocolRegistry::new();

    assert!(matches!(
        registry.load_yaml("protocol: [unclosed"),
        Err(OrderguardError::Parse(ParseError::SyntaxError(_)))
    ));
    assert!(matches!(
        registry.register_order("Half", "init, (start"),
        Err(OrderguardError::Parse(ParseError::SyntaxError(_)))
    ));
    assert!(registry.is_empty());
}
