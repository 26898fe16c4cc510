/*
 * Protocol Violations
 *
 * A violation is created at detection time and kept until the run reports.
 * It never interrupts the analysis.
 */

use super::{AbstractState, Action, HandleId};
use crate::shared::models::Location;
use serde::{Deserialize, Serialize};

/// Protocol violation kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ViolationKind {
    /// Operation not allowed from the handle's current state
    InvalidTransition,

    /// Handle left its creating function outside an accepting state
    NonAcceptingTermination,

    /// Method the protocol never allows, in any state
    ForbiddenCall,
}

impl std::fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ViolationKind::InvalidTransition => write!(f, "Invalid Transition"),
            ViolationKind::NonAcceptingTermination => write!(f, "Non-Accepting Termination"),
            ViolationKind::ForbiddenCall => write!(f, "Forbidden Call"),
        }
    }
}

/// Certainty of a violation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    /// Illegal on every path reaching the call
    Definite,

    /// Illegal on some paths only
    Potential,
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Confidence::Definite => write!(f, "definite"),
            Confidence::Potential => write!(f, "potential"),
        }
    }
}

/// Identity used to de-duplicate violations
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ViolationKey {
    pub handle_id: HandleId,
    pub operation: String,
    pub location: Location,
    pub kind: ViolationKind,
    pub confidence: Confidence,
}

/// Protocol violation
///
/// # Example
/// ```ignore
/// let violation = Violation::new(
///     HandleId(0),
///     Action::new("finish"),
///     AbstractState::Definite(State::new("Initialized")),
///     Location::new(12, 5),
///     Confidence::Definite,
/// )
/// .with_variable("enc")
/// .with_expected(vec!["start".to_string()]);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    /// Offending handle
    pub handle_id: HandleId,

    /// Operation attempted (for terminations: the missing follow-up)
    pub operation: Action,

    /// Abstract state at the time of the call
    pub state_at_call: AbstractState,

    pub location: Location,

    pub confidence: Confidence,

    pub kind: ViolationKind,

    /// Binding name used at the call site
    pub variable: String,

    /// Function containing the call
    pub function: String,

    /// Operations that would have been legal here
    pub expected: Vec<String>,

    /// Human-readable message
    pub message: String,
}

impl Violation {
    /// Create an invalid-transition violation
    pub fn new(
        handle_id: HandleId,
        operation: Action,
        state_at_call: AbstractState,
        location: Location,
        confidence: Confidence,
    ) -> Self {
        Self {
            handle_id,
            operation,
            state_at_call,
            location,
            confidence,
            kind: ViolationKind::InvalidTransition,
            variable: String::new(),
            function: String::new(),
            expected: Vec::new(),
            message: String::new(),
        }
    }

    pub fn with_kind(mut self, kind: ViolationKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_variable(mut self, variable: impl Into<String>) -> Self {
        self.variable = variable.into();
        self
    }

    pub fn with_function(mut self, function: impl Into<String>) -> Self {
        self.function = function.into();
        self
    }

    pub fn with_expected(mut self, expected: Vec<String>) -> Self {
        self.expected = expected;
        self
    }

    /// Fill `message` from the other fields
    pub fn with_default_message(mut self) -> Self {
        let expected = if self.expected.is_empty() {
            "no further calls are allowed on this handle".to_string()
        } else {
            format!("Expected one of: {}", self.expected.join(", "))
        };
        self.message = match self.kind {
            ViolationKind::InvalidTransition => format!(
                "Op \"{}\" is not allowed on '{}' in state {}. {}",
                self.operation.method_name, self.variable, self.state_at_call, expected
            ),
            ViolationKind::NonAcceptingTermination => format!(
                "'{}' is not correctly terminated (state {}). {}",
                self.variable, self.state_at_call, expected
            ),
            ViolationKind::ForbiddenCall => format!(
                "Op \"{}\" must never be called on '{}' (state {})",
                self.operation.method_name, self.variable, self.state_at_call
            ),
        };
        self
    }

    pub fn is_definite(&self) -> bool {
        self.confidence == Confidence::Definite
    }

    pub fn key(&self) -> ViolationKey {
        ViolationKey {
            handle_id: self.handle_id,
            operation: self.operation.method_name.clone(),
            location: self.location,
            kind: self.kind,
            confidence: self.confidence,
        }
    }

    /// Format for display
    pub fn format_message(&self) -> String {
        format!(
            "Line {}: [{}] {} in '{}' - {}",
            self.location.line, self.confidence, self.kind, self.function, self.message
        )
    }
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.format_message())
    }
}
