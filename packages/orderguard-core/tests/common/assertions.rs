//! Custom assertions for violation checks

use orderguard_core::{Confidence, TypestateResult, Violation};

/// Assert that the analysis found nothing
pub fn assert_clean(result: &TypestateResult) {
    assert!(
        result.violations.is_empty(),
        "Expected no violations, got: {:#?}",
        result
            .violations
            .iter()
            .map(|v| v.format_message())
            .collect::<Vec<_>>()
    );
    assert!(!result.incomplete, "Analysis unexpectedly incomplete");
}

/// Assert exactly one violation and return it
pub fn assert_single(result: &TypestateResult) -> &Violation {
    assert_eq!(
        result.violations.len(),
        1,
        "Expected exactly one violation, got: {:#?}",
        result
            .violations
            .iter()
            .map(|v| v.format_message())
            .collect::<Vec<_>>()
    );
    &result.violations[0]
}

/// Assert a violation's confidence, operation and line
pub fn assert_violation(violation: &Violation, confidence: Confidence, operation: &str, line: u32) {
    assert_eq!(violation.confidence, confidence, "{}", violation);
    assert_eq!(violation.operation.method_name, operation, "{}", violation);
    assert_eq!(violation.location.line, line, "{}", violation);
}
