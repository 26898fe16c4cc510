//! Batch verification tests
//!
//! Independent units, host verdicts under each potential policy, timeouts
//! and the JSON program/report formats.

mod common;

use std::time::Instant;

use common::*;
use orderguard_core::{
    verify_batch, Confidence, PotentialPolicy, Program, ProtocolRegistry, TypestateAnalyzer,
    Verdict, VerifierConfig,
};
use pretty_assertions::assert_eq;

/// Unit whose `main` either completes the lifecycle or finishes an unstarted cipher
fn unit(name: &str, broken: bool) -> Program {
    let body = BodyBuilder::new().cipher("c").op("c", "init");
    let body = if broken {
        body.op("c", "finish")
    } else {
        body.ops("c", &["start", "finish"])
    };
    Program::new(name).with_function(function("main", body))
}

/// Unit with a single potential violation
fn potential_unit(name: &str) -> Program {
    Program::new(name).with_function(function(
        "main",
        BodyBuilder::new()
            .cipher("c")
            .op("c", "init")
            .if_then(|b| b.op("c", "start"))
            .op("c", "finish"),
    ))
}

#[test]
fn units_are_reported_in_input_order() {
    let units: Vec<Program> = (0..24)
        .map(|i| unit(&format!("unit_{:02}", i), i % 3 == 0))
        .collect();
    let registry = ProtocolRegistry::with_builtin();

    let report = verify_batch(&units, &registry, &VerifierConfig::default());

    let names: Vec<&str> = report.reports.iter().map(|r| r.unit.as_str()).collect();
    let expected: Vec<String> = (0..24).map(|i| format!("unit_{:02}", i)).collect();
    assert_eq!(names, expected.iter().map(String::as_str).collect::<Vec<_>>());

    assert_eq!(report.summary.units, 24);
    assert_eq!(report.summary.definite, 8);
    assert_eq!(report.summary.failed_units, 8);
    assert_eq!(report.verdict(), Verdict::Fail);
    for (i, r) in report.reports.iter().enumerate() {
        assert_eq!(r.verdict.is_pass(), i % 3 != 0, "{}", r.unit);
    }
}

#[test]
fn units_do_not_share_state() {
    let units = vec![unit("broken", true), unit("clean", false)];
    let registry = ProtocolRegistry::with_builtin();

    let report = verify_batch(&units, &registry, &VerifierConfig::default());

    assert_eq!(report.reports[0].result.violations.len(), 1);
    assert_clean(&report.reports[1].result);
}

#[test]
fn potential_policy_decides_verdict() {
    let units = vec![potential_unit("maybe")];
    let registry = ProtocolRegistry::with_builtin();
    let run = |policy| {
        verify_batch(
            &units,
            &registry,
            &VerifierConfig::default().with_potential_policy(policy),
        )
    };

    let warn = run(PotentialPolicy::Warn);
    assert_eq!(warn.verdict(), Verdict::Pass);
    assert_eq!(warn.summary.potential, 1);
    assert_eq!(
        warn.reports[0].result.violations[0].confidence,
        Confidence::Potential
    );

    let fail = run(PotentialPolicy::Fail);
    assert_eq!(fail.verdict(), Verdict::Fail);
    assert_eq!(fail.summary.failed_units, 1);

    let ignore = run(PotentialPolicy::Ignore);
    assert_eq!(ignore.verdict(), Verdict::Pass);
    assert_eq!(ignore.summary.potential, 0);
    assert!(ignore.reports[0].result.violations.is_empty());
}

#[test]
fn definite_violation_fails_under_every_policy() {
    let units = vec![unit("broken", true)];
    let registry = ProtocolRegistry::with_builtin();

    for policy in [
        PotentialPolicy::Fail,
        PotentialPolicy::Warn,
        PotentialPolicy::Ignore,
    ] {
        let config = VerifierConfig::default().with_potential_policy(policy);
        let report = verify_batch(&units, &registry, &config);
        assert_eq!(report.verdict(), Verdict::Fail, "{:?}", policy);
    }
}

// ============================================================================
// Timeouts
// ============================================================================

#[test]
fn expired_budget_marks_unit_incomplete() {
    let units = vec![unit("slow", true), unit("other", false)];
    let registry = ProtocolRegistry::with_builtin();
    // zero budget: the deadline has passed before the first statement
    let config = VerifierConfig::default().with_timeout_ms(0);

    let report = verify_batch(&units, &registry, &config);

    assert_eq!(report.summary.incomplete_units, vec!["slow", "other"]);
    assert!(report.reports.iter().all(|r| r.result.incomplete));
    assert_eq!(report.verdict(), Verdict::Pass);
}

#[test]
fn deadline_stops_analysis_with_partial_result() {
    let program = unit("big", true);
    let registry = ProtocolRegistry::with_builtin();
    let analyzer = TypestateAnalyzer::new(&registry, VerifierConfig::default());

    let partial = analyzer.analyze_until(&program, Instant::now());
    let full = analyzer.analyze(&program);

    assert!(partial.incomplete);
    assert!(partial.violations.is_empty());
    assert!(!full.incomplete);
    assert_eq!(full.violations.len(), 1);
}

#[test]
fn generous_budget_completes() {
    let units = vec![unit("quick", true)];
    let registry = ProtocolRegistry::with_builtin();
    let config = VerifierConfig::default().with_timeout_ms(60_000);

    let report = verify_batch(&units, &registry, &config);

    assert!(report.summary.incomplete_units.is_empty());
    assert_eq!(report.summary.definite, 1);
}

// ============================================================================
// JSON formats
// ============================================================================

#[test]
fn json_program_is_verified() {
    let json = r#"{
  "name": "gcm_encrypt",
  "functions": [
    {
      "name": "encrypt",
      "body": [
        {"kind": "let", "var": "enc", "value": {"kind": "new", "protocol": "Cipher"}, "loc": {"line": 10, "column": 5}},
        {"kind": "method_call", "receiver": "enc", "method": "set_key", "loc": {"line": 11, "column": 5}},
        {"kind": "if", "then_branch": [
          {"kind": "method_call", "receiver": "enc", "method": "start_msg", "loc": {"line": 13, "column": 9}}
        ], "loc": {"line": 12, "column": 5}},
        {"kind": "method_call", "receiver": "enc", "method": "finish", "loc": {"line": 15, "column": 5}}
      ]
    }
  ]
}"#;
    let program = Program::from_json(json).unwrap();
    let registry = ProtocolRegistry::with_builtin();

    let report = verify_batch(&[program], &registry, &VerifierConfig::default());

    let result = &report.reports[0].result;
    assert_violation(assert_single(result), Confidence::Potential, "finish", 15);
    assert_eq!(result.violations[0].location.column, 5);
    assert_eq!(result.violations[0].function, "encrypt");
}

#[test]
fn report_serializes_verdicts() {
    let units = vec![unit("broken", true)];
    let registry = ProtocolRegistry::with_builtin();

    let report = verify_batch(&units, &registry, &VerifierConfig::default());
    let value = serde_json::to_value(&report).unwrap();

    assert_eq!(value["reports"][0]["verdict"], "fail");
    assert_eq!(value["reports"][0]["unit"], "broken");
    assert_eq!(value["summary"]["definite"], 1);
    assert_eq!(
        value["reports"][0]["result"]["violations"][0]["confidence"],
        serde_json::to_value(Confidence::Definite).unwrap()
    );
}
