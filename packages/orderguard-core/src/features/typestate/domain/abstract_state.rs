/*
 * Abstract Handle State
 *
 * The value tracked per handle class on one analysis path:
 * - Definite(s): every path reaching this point agrees on `s`
 * - Possible({s1, s2, ..}): incoming paths disagree (joined by set union)
 * - Unknown: aliasing could not be resolved; no accusations until a
 *   recognized operation re-establishes the state
 *
 * `step` applies one action and classifies the outcome:
 * - legal from every possible state → Allowed
 * - illegal from every possible state → definite violation
 * - illegal from some states only → potential violation
 */

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::{Action, Confidence, Protocol, State};

/// Abstract state of a handle class
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AbstractState {
    /// All paths agree on the same state
    Definite(State),

    /// Paths have different states (at least two)
    Possible(BTreeSet<State>),

    /// State could not be determined statically
    Unknown,
}

/// Outcome of applying one action to an abstract state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// Legal on every path; carries the successor state
    Allowed(AbstractState),

    /// Illegal on some or all paths; `next` is the state the analysis continues with
    Violation {
        confidence: Confidence,
        next: AbstractState,
    },
}

impl AbstractState {
    /// Build from a set of states, collapsing singletons
    ///
    /// An empty set yields `Unknown`.
    pub fn from_states(states: BTreeSet<State>) -> Self {
        match states.len() {
            0 => AbstractState::Unknown,
            1 => match states.into_iter().next() {
                Some(state) => AbstractState::Definite(state),
                None => AbstractState::Unknown,
            },
            _ => AbstractState::Possible(states),
        }
    }

    pub fn is_definite(&self) -> bool {
        matches!(self, AbstractState::Definite(_))
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, AbstractState::Unknown)
    }

    /// All possible states (empty for `Unknown`)
    pub fn states(&self) -> BTreeSet<State> {
        match self {
            AbstractState::Definite(state) => std::iter::once(state.clone()).collect(),
            AbstractState::Possible(states) => states.clone(),
            AbstractState::Unknown => BTreeSet::new(),
        }
    }

    /// Control-flow join (set union; `Unknown` absorbs)
    pub fn join(&self, other: &AbstractState) -> AbstractState {
        match (self, other) {
            (AbstractState::Unknown, _) | (_, AbstractState::Unknown) => AbstractState::Unknown,
            (AbstractState::Definite(a), AbstractState::Definite(b)) if a == b => self.clone(),
            _ => {
                let mut states = self.states();
                states.extend(other.states());
                AbstractState::from_states(states)
            }
        }
    }

    /// Apply `action` under `protocol`
    pub fn step(&self, protocol: &Protocol, action: &Action) -> StepOutcome {
        match self {
            AbstractState::Unknown => {
                let targets = protocol.targets_of(action);
                StepOutcome::Allowed(AbstractState::from_states(targets))
            }
            _ => {
                let current = self.states();
                let legal: BTreeSet<State> = current
                    .iter()
                    .filter_map(|s| protocol.next_state(s, action))
                    .collect();
                let legal_sources = current
                    .iter()
                    .filter(|s| protocol.next_state(s, action).is_some())
                    .count();

                if legal_sources == current.len() {
                    StepOutcome::Allowed(AbstractState::from_states(legal))
                } else if legal_sources == 0 {
                    StepOutcome::Violation {
                        confidence: Confidence::Definite,
                        next: self.clone(),
                    }
                } else {
                    // continue along the paths where the call was legal
                    StepOutcome::Violation {
                        confidence: Confidence::Potential,
                        next: AbstractState::from_states(legal),
                    }
                }
            }
        }
    }

    /// Operations legal from at least one possible state, sorted
    pub fn expected_actions(&self, protocol: &Protocol) -> Vec<String> {
        let names: BTreeSet<String> = self
            .states()
            .iter()
            .flat_map(|s| protocol.available_actions(s))
            .map(|a| a.method_name)
            .collect();
        names.into_iter().collect()
    }
}

impl std::fmt::Display for AbstractState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AbstractState::Definite(state) => write!(f, "{}", state),
            AbstractState::Possible(states) => {
                let names: Vec<&str> = states.iter().map(|s| s.name.as_str()).collect();
                write!(f, "{{{}}}", names.join(" | "))
            }
            AbstractState::Unknown => write!(f, "<unknown>"),
        }
    }
}
