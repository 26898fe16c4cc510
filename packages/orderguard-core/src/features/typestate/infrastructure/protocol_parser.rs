/*
 * Protocol Definition Language Parser
 *
 * Parse protocol definitions from YAML/JSON for custom handle types.
 *
 * # Schema (explicit transitions)
 * ```yaml
 * protocol: Digest
 * initial_state: Created
 * final_states:
 *   - Finalized
 * transitions:
 *   - from: Created
 *     action: init
 *     to: Ready
 *   - from: Ready
 *     action: update
 *     to: Ready
 *   - from: Ready
 *     action: final
 *     to: Finalized
 * aliases:
 *   EVP_DigestInit_ex: init
 *   EVP_DigestUpdate: update
 * forbidden:
 *   - EVP_DigestReuse
 * ```
 *
 * # Schema (order expression)
 * ```yaml
 * protocol: CipherOrder
 * order: "init, (start, process*, finish)+, reset?"
 * aliases:
 *   set_key: init
 * ```
 *
 * # Validation
 * - All states in transitions must be declared
 * - Initial state must exist
 * - Final states must be reachable from the initial state
 * - `order` and explicit transitions are mutually exclusive
 * - Forbidden methods may not be actions or aliases
 *
 * # Time Complexity
 * O(states + transitions) - reachability is a BFS over transitions
 */

use crate::features::typestate::domain::{Action, Protocol, State};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet, VecDeque};
use thiserror::Error;

use super::OrderExpression;

/// Protocol configuration (YAML/JSON schema)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// Protocol name
    pub protocol: String,

    /// Initial state (required with explicit transitions)
    #[serde(default)]
    pub initial_state: Option<String>,

    /// Final states (accepting)
    #[serde(default)]
    pub final_states: Vec<String>,

    /// State transitions
    #[serde(default)]
    pub transitions: Vec<TransitionConfig>,

    /// Order expression (alternative to explicit transitions)
    #[serde(default)]
    pub order: Option<String>,

    /// Method name → action
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,

    /// Methods never allowed on the handle
    #[serde(default)]
    pub forbidden: Vec<String>,
}

/// Transition configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionConfig {
    /// Source state
    pub from: String,

    /// Action (method name)
    pub action: String,

    /// Target state
    pub to: String,
}

/// Protocol parser
pub struct ProtocolParser;

/// Parse error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// YAML/JSON/order-expression syntax error
    #[error("Syntax error: {0}")]
    SyntaxError(String),

    /// Schema validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Semantic error (unreachable states, conflicting fields)
    #[error("Semantic error: {0}")]
    SemanticError(String),
}

impl ProtocolParser {
    /// Parse protocol from YAML
    pub fn from_yaml(yaml: &str) -> Result<Protocol, ParseError> {
        let config: ProtocolConfig = serde_yaml::from_str(yaml)
            .map_err(|e| ParseError::SyntaxError(format!("YAML parse error: {}", e)))?;

        Self::build_protocol(config)
    }

    /// Parse several protocols from one YAML sequence document
    pub fn from_yaml_list(yaml: &str) -> Result<Vec<Protocol>, ParseError> {
        let configs: Vec<ProtocolConfig> = serde_yaml::from_str(yaml)
            .map_err(|e| ParseError::SyntaxError(format!("YAML parse error: {}", e)))?;

        configs.into_iter().map(Self::build_protocol).collect()
    }

    /// Parse protocol from JSON
    pub fn from_json(json: &str) -> Result<Protocol, ParseError> {
        let config: ProtocolConfig = serde_json::from_str(json)
            .map_err(|e| ParseError::SyntaxError(format!("JSON parse error: {}", e)))?;

        Self::build_protocol(config)
    }

    /// Build protocol from configuration
    pub fn build_protocol(config: ProtocolConfig) -> Result<Protocol, ParseError> {
        let mut protocol = match &config.order {
            Some(order) => {
                if !config.transitions.is_empty() || config.initial_state.is_some() {
                    return Err(ParseError::SemanticError(format!(
                        "Protocol '{}' defines both 'order' and explicit transitions",
                        config.protocol
                    )));
                }
                OrderExpression::compile_str(&config.protocol, order)?
            }
            None => Self::build_explicit(&config)?,
        };

        for (method, action) in &config.aliases {
            protocol.add_alias(method.clone(), action.clone());
        }
        for method in &config.forbidden {
            protocol.add_forbidden(method.clone());
        }

        protocol.validate().map_err(ParseError::ValidationError)?;

        Ok(protocol)
    }

    fn build_explicit(config: &ProtocolConfig) -> Result<Protocol, ParseError> {
        let initial = config.initial_state.as_ref().ok_or_else(|| {
            ParseError::ValidationError(format!(
                "Protocol '{}' needs 'initial_state' or 'order'",
                config.protocol
            ))
        })?;

        let mut protocol = Protocol::new(&config.protocol);
        protocol.set_initial_state(State::new(initial));

        for final_state in &config.final_states {
            protocol.add_final_state(State::new(final_state));
        }

        for transition in &config.transitions {
            protocol.add_transition(
                State::new(&transition.from),
                Action::new(&transition.action),
                State::new(&transition.to),
            );
        }

        protocol.validate().map_err(ParseError::ValidationError)?;
        Self::validate_semantics(config, initial)?;

        Ok(protocol)
    }

    /// Validate semantic correctness
    ///
    /// Checks:
    /// - Initial state appears in some transition
    /// - Final states are reachable from the initial state
    fn validate_semantics(config: &ProtocolConfig, initial: &str) -> Result<(), ParseError> {
        let mut all_states: HashSet<&str> = HashSet::new();
        for t in &config.transitions {
            all_states.insert(&t.from);
            all_states.insert(&t.to);
        }

        if !all_states.contains(initial) {
            return Err(ParseError::SemanticError(format!(
                "Initial state '{}' not found in transitions",
                initial
            )));
        }

        let mut reachable: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<&str> = VecDeque::new();
        reachable.insert(initial);
        queue.push_back(initial);
        while let Some(state) = queue.pop_front() {
            for t in config.transitions.iter().filter(|t| t.from == state) {
                if reachable.insert(&t.to) {
                    queue.push_back(&t.to);
                }
            }
        }

        for final_state in &config.final_states {
            if !reachable.contains(final_state.as_str()) {
                return Err(ParseError::SemanticError(format!(
                    "Final state '{}' is unreachable from initial state '{}'",
                    final_state, initial
                )));
            }
        }

        Ok(())
    }
}

/// Protocol builder (fluent API)
///
/// # Example
/// ```rust
/// use orderguard_core::features::typestate::infrastructure::ProtocolBuilder;
///
/// let protocol = ProtocolBuilder::new("Mac")
///     .initial_state("Created")
///     .add_transition("Created", "set_key", "Keyed")
///     .add_transition("Keyed", "update", "Keyed")
///     .add_transition("Keyed", "final", "Keyed")
///     .final_state("Keyed")
///     .build();
/// ```
pub struct ProtocolBuilder {
    protocol: Protocol,
}

impl ProtocolBuilder {
    /// Create new protocol builder
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            protocol: Protocol::new(name),
        }
    }

    /// Set initial state
    pub fn initial_state(mut self, state: impl Into<String>) -> Self {
        self.protocol.set_initial_state(State::new(state.into()));
        self
    }

    /// Add state transition
    pub fn add_transition(
        mut self,
        from: impl Into<String>,
        action: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        self.protocol.add_transition(
            State::new(from.into()),
            Action::new(action.into()),
            State::new(to.into()),
        );
        self
    }

    /// Add final state
    pub fn final_state(mut self, state: impl Into<String>) -> Self {
        self.protocol.add_final_state(State::new(state.into()));
        self
    }

    /// Add method alias
    pub fn alias(mut self, method: impl Into<String>, action: impl Into<String>) -> Self {
        self.protocol.add_alias(method, action);
        self
    }

    /// Forbid a method on the handle
    pub fn forbid(mut self, method: impl Into<String>) -> Self {
        self.protocol.add_forbidden(method);
        self
    }

    /// Build protocol
    pub fn build(self) -> Protocol {
        self.protocol
    }
}
