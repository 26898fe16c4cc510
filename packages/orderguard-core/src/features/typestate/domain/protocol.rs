/*
 * Protocol Definition
 *
 * Defines valid state transitions for a handle lifecycle.
 *
 * # Example: Cipher Protocol
 * ```
 * States: {Created, Initialized, Started, Finished}
 * Transitions:
 *   Created     --init()-->    Initialized
 *   Initialized --start()-->   Started
 *   Started     --process()--> Started
 *   Started     --finish()-->  Finished
 *   Finished    --start()-->   Started
 *   Finished    --reset()-->   Created
 * ```
 *
 * Front-end method names map onto actions through aliases
 * (e.g. `set_key` → `init`). Forbidden methods must never be called on
 * the handle, whatever its state. A method that is none of these is
 * unmodeled and never affects state.
 *
 * # Time Complexity
 * - add_transition: O(1)
 * - next_state: O(1) (hash lookup)
 * - available_actions / targets_of: O(transitions)
 */

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

/// State in typestate protocol
///
/// Represents the current state of a handle (e.g., "Started", "Finished").
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct State {
    pub name: String,
}

impl State {
    /// Create new state
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Action that triggers state transition
///
/// A modeled operation on a handle (e.g., "init", "start", "finish").
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Action {
    pub method_name: String,
}

impl Action {
    /// Create new action
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method_name: method.into(),
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}()", self.method_name)
    }
}

/// Typestate protocol definition
///
/// # Example
/// ```ignore
/// let mut protocol = Protocol::new("Digest");
///
/// let created = State::new("Created");
/// let open = State::new("Open");
///
/// protocol.set_initial_state(created.clone());
/// protocol.add_final_state(created.clone());
///
/// protocol.add_transition(created.clone(), Action::new("init"), open.clone());
/// protocol.add_transition(open.clone(), Action::new("final"), created.clone());
/// protocol.add_alias("DigestInit_ex", "init");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Protocol {
    /// Protocol name (e.g., "Cipher", "Digest")
    pub name: String,

    /// All possible states
    pub states: HashSet<State>,

    /// State of a freshly created handle
    pub initial_state: State,

    /// Accepting states (a handle may be dropped here)
    pub final_states: HashSet<State>,

    /// State transitions: (from_state, action) → to_state
    pub transitions: FxHashMap<(State, Action), State>,

    /// Method name → modeled action
    pub aliases: FxHashMap<String, Action>,

    /// Methods never allowed on this handle
    #[serde(default)]
    pub forbidden: BTreeSet<String>,
}

impl Protocol {
    /// Create new protocol
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            states: HashSet::new(),
            initial_state: State::new("Initial"),
            final_states: HashSet::new(),
            transitions: FxHashMap::default(),
            aliases: FxHashMap::default(),
            forbidden: BTreeSet::new(),
        }
    }

    /// Add state to protocol
    pub fn add_state(&mut self, state: State) {
        self.states.insert(state);
    }

    /// Add state transition
    pub fn add_transition(&mut self, from: State, action: Action, to: State) {
        self.transitions.insert((from.clone(), action), to.clone());
        self.states.insert(from);
        self.states.insert(to);
    }

    /// Map a front-end method name onto an action
    pub fn add_alias(&mut self, method: impl Into<String>, action: impl Into<String>) {
        self.aliases.insert(method.into(), Action::new(action));
    }

    /// Mark a method as never allowed
    pub fn add_forbidden(&mut self, method: impl Into<String>) {
        self.forbidden.insert(method.into());
    }

    pub fn is_forbidden(&self, method: &str) -> bool {
        self.forbidden.contains(method)
    }

    /// Check if transition is valid
    pub fn can_transition(&self, from: &State, action: &Action, to: &State) -> bool {
        self.transitions.get(&(from.clone(), action.clone())) == Some(to)
    }

    /// Get next state after action (if valid)
    ///
    /// # Returns
    /// - Some(state) if transition is valid
    /// - None if transition is invalid
    pub fn next_state(&self, from: &State, action: &Action) -> Option<State> {
        self.transitions
            .get(&(from.clone(), action.clone()))
            .cloned()
    }

    /// Whether `action` labels at least one transition
    pub fn has_action(&self, action: &Action) -> bool {
        self.transitions.keys().any(|(_, a)| a == action)
    }

    /// Resolve a method name to a modeled action
    ///
    /// Aliases win over direct names. `None` means the call is unmodeled.
    pub fn resolve_action(&self, method: &str) -> Option<Action> {
        if let Some(action) = self.aliases.get(method) {
            return Some(action.clone());
        }
        let action = Action::new(method);
        if self.has_action(&action) {
            Some(action)
        } else {
            None
        }
    }

    /// Every state some `action` transition can lead to
    ///
    /// Used to re-establish a definite state after the handle became unknown.
    pub fn targets_of(&self, action: &Action) -> BTreeSet<State> {
        self.transitions
            .iter()
            .filter(|((_, a), _)| a == action)
            .map(|(_, to)| to.clone())
            .collect()
    }

    /// Check if state is an accepting state
    pub fn is_final_state(&self, state: &State) -> bool {
        self.final_states.contains(state)
    }

    /// Get initial state
    pub fn initial_state(&self) -> State {
        self.initial_state.clone()
    }

    /// Add final state
    pub fn add_final_state(&mut self, state: State) {
        self.states.insert(state.clone());
        self.final_states.insert(state);
    }

    /// Set initial state
    pub fn set_initial_state(&mut self, state: State) {
        self.states.insert(state.clone());
        self.initial_state = state;
    }

    /// All actions allowed from a state, sorted by name
    pub fn available_actions(&self, from: &State) -> Vec<Action> {
        let actions: BTreeSet<Action> = self
            .transitions
            .keys()
            .filter(|(state, _)| state == from)
            .map(|(_, action)| action.clone())
            .collect();
        actions.into_iter().collect()
    }

    /// Validate protocol definition
    ///
    /// Checks:
    /// - Initial state exists in states
    /// - All final states exist in states
    /// - All transitions reference valid states
    /// - Aliases point at actions that label a transition
    /// - Forbidden methods are neither actions nor aliases
    pub fn validate(&self) -> Result<(), String> {
        if !self.states.contains(&self.initial_state) {
            return Err(format!(
                "Initial state '{}' not in states",
                self.initial_state
            ));
        }

        for state in &self.final_states {
            if !self.states.contains(state) {
                return Err(format!("Final state '{}' not in states", state));
            }
        }

        for ((from, _action), to) in &self.transitions {
            if !self.states.contains(from) {
                return Err(format!("Transition from state '{}' not in states", from));
            }
            if !self.states.contains(to) {
                return Err(format!("Transition to state '{}' not in states", to));
            }
        }

        for (method, action) in &self.aliases {
            if !self.has_action(action) {
                return Err(format!(
                    "Alias '{}' refers to unknown action '{}'",
                    method, action.method_name
                ));
            }
        }

        for method in &self.forbidden {
            if self.resolve_action(method).is_some() {
                return Err(format!(
                    "Forbidden method '{}' is also a modeled operation",
                    method
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_basic() {
        let protocol = Protocol::new("TestProtocol");
        assert_eq!(protocol.name, "TestProtocol");
        assert_eq!(protocol.initial_state.name, "Initial");
    }

    #[test]
    fn test_add_transition() {
        let mut protocol = Protocol::new("Test");

        let s1 = State::new("S1");
        let s2 = State::new("S2");
        let action = Action::new("transition");

        protocol.add_transition(s1.clone(), action.clone(), s2.clone());

        assert!(protocol.can_transition(&s1, &action, &s2));
        assert!(!protocol.can_transition(&s2, &action, &s1));
        assert_eq!(protocol.next_state(&s1, &action), Some(s2.clone()));
        assert_eq!(protocol.next_state(&s2, &action), None);
    }

    #[test]
    fn test_resolve_action_and_aliases() {
        let mut protocol = Protocol::new("Test");
        protocol.add_transition(State::new("A"), Action::new("init"), State::new("B"));
        protocol.add_alias("set_key", "init");

        assert_eq!(protocol.resolve_action("init"), Some(Action::new("init")));
        assert_eq!(protocol.resolve_action("set_key"), Some(Action::new("init")));
        assert_eq!(protocol.resolve_action("name"), None);
    }

    #[test]
    fn test_forbidden_methods() {
        let mut protocol = Protocol::new("Test");
        protocol.add_transition(State::new("A"), Action::new("init"), State::new("B"));
        protocol.add_forbidden("set_iv_reuse");

        assert!(protocol.is_forbidden("set_iv_reuse"));
        assert!(!protocol.is_forbidden("init"));
        assert_eq!(protocol.resolve_action("set_iv_reuse"), None);
        assert!(protocol.validate().is_ok());

        protocol.add_forbidden("init");
        let err = protocol.validate().unwrap_err();
        assert!(err.contains("also a modeled operation"));
    }

    #[test]
    fn test_targets_of() {
        let mut protocol = Protocol::new("Test");
        protocol.add_transition(State::new("A"), Action::new("go"), State::new("B"));
        protocol.add_transition(State::new("C"), Action::new("go"), State::new("B"));
        protocol.add_transition(State::new("B"), Action::new("back"), State::new("A"));

        let targets = protocol.targets_of(&Action::new("go"));
        assert_eq!(targets.len(), 1);
        assert!(targets.contains(&State::new("B")));
        assert!(protocol.targets_of(&Action::new("missing")).is_empty());
    }

    #[test]
    fn test_available_actions_sorted() {
        let mut protocol = Protocol::new("Test");

        let s1 = State::new("S1");
        let s2 = State::new("S2");

        protocol.add_transition(s1.clone(), Action::new("zeta"), s2.clone());
        protocol.add_transition(s1.clone(), Action::new("alpha"), s2.clone());

        let actions = protocol.available_actions(&s1);
        assert_eq!(actions, vec![Action::new("alpha"), Action::new("zeta")]);
        assert!(protocol.available_actions(&s2).is_empty());
    }

    #[test]
    fn test_validate_protocol() {
        let mut protocol = Protocol::new("Test");

        let s1 = State::new("S1");
        let s2 = State::new("S2");

        protocol.set_initial_state(s1.clone());
        protocol.add_final_state(s2.clone());
        protocol.add_transition(s1.clone(), Action::new("go"), s2.clone());

        assert!(protocol.validate().is_ok());

        protocol.add_alias("run", "fly");
        let err = protocol.validate().unwrap_err();
        assert!(err.contains("Alias 'run'"));
    }

    #[test]
    fn test_validate_missing_initial_state() {
        let mut protocol = Protocol::new("Test");
        protocol.add_transition(State::new("A"), Action::new("go"), State::new("B"));

        let err = protocol.validate().unwrap_err();
        assert!(err.contains("Initial state 'Initial'"));
    }
}
