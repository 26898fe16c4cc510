/*
 * Path-Sensitive State
 *
 * Everything the tracker knows on one path: bindings, alias classes, and
 * the abstract state of every live class.
 *
 * # Algorithm
 * - Branch splitting: each branch runs on its own clone
 * - State merging: `join` at control-flow joins
 *   - alias classes of both paths are merged
 *   - a variable bound to different handles on the two paths unifies them
 *   - per-class states are joined by set union (Definite → Possible)
 * - Unreachable paths (after `return`) are neutral elements of the join
 *
 * # Example
 * ```ignore
 * c.init();
 * if cond {
 *     c.start();   // Started
 * }                // else: Initialized
 * // join: Possible({Initialized, Started})
 * c.finish();      // potential violation
 * ```
 */

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;
use tracing::debug;

use super::alias::AliasResolver;
use crate::features::typestate::domain::{AbstractState, HandleId};

#[derive(Debug, Clone)]
pub struct PathState {
    pub aliases: AliasResolver,

    /// Class root → state
    states: FxHashMap<HandleId, AbstractState>,

    /// False once the path has returned
    pub reachable: bool,
}

impl Default for PathState {
    fn default() -> Self {
        Self::new()
    }
}

/// Union-order independent view of a path (for fixed-point checks)
#[derive(Debug, PartialEq, Eq)]
struct CanonicalForm {
    reachable: bool,
    bindings: Vec<BTreeMap<String, Option<HandleId>>>,
    classes: BTreeMap<HandleId, HandleId>,
    states: BTreeMap<HandleId, AbstractState>,
}

impl PathState {
    pub fn new() -> Self {
        Self {
            aliases: AliasResolver::new(),
            states: FxHashMap::default(),
            reachable: true,
        }
    }

    /// Track a (new or re-created) handle with its starting state
    pub fn register(&mut self, id: HandleId, state: AbstractState) {
        self.aliases.register(id);
        self.set_state(id, state);
    }

    pub fn root(&self, id: HandleId) -> HandleId {
        self.aliases.root(id)
    }

    pub fn state_of(&self, id: HandleId) -> Option<&AbstractState> {
        self.states.get(&self.aliases.root(id))
    }

    /// Strong update of the whole class
    pub fn set_state(&mut self, id: HandleId, state: AbstractState) {
        let root = self.aliases.root(id);
        self.states.insert(root, state);
    }

    /// Merge two alias classes; the merged class gets the joined state
    pub fn unify(&mut self, a: HandleId, b: HandleId) {
        let (ra, rb) = (self.aliases.root(a), self.aliases.root(b));
        if ra == rb {
            return;
        }
        let sa = self.states.remove(&ra);
        let sb = self.states.remove(&rb);
        let root = self.aliases.unify(ra, rb);
        let merged = match (sa, sb) {
            (Some(x), Some(y)) => Some(x.join(&y)),
            (Some(x), None) | (None, Some(x)) => Some(x),
            (None, None) => None,
        };
        if let Some(state) = merged {
            self.states.insert(root, state);
        }
    }

    /// Number of tracked classes
    pub fn class_count(&self) -> usize {
        self.states.len()
    }

    /// Control-flow join of two paths
    pub fn join(&self, other: &PathState) -> PathState {
        if !self.reachable {
            return other.clone();
        }
        if !other.reachable {
            return self.clone();
        }

        let mut aliases = self.aliases.clone();
        let conflicts = aliases.merge_from(&other.aliases);
        for (a, b) in &conflicts {
            debug!(left = %a, right = %b, "binding differs across paths, unifying handles");
            aliases.unify(*a, *b);
        }

        let mut states: FxHashMap<HandleId, AbstractState> = FxHashMap::default();
        for (id, state) in self.states.iter().chain(other.states.iter()) {
            let root = aliases.root(*id);
            match states.get_mut(&root) {
                Some(existing) => *existing = existing.join(state),
                None => {
                    states.insert(root, state.clone());
                }
            }
        }

        PathState {
            aliases,
            states,
            reachable: true,
        }
    }

    fn canonical_form(&self) -> CanonicalForm {
        let name = |id: HandleId| self.aliases.canonical(id);
        CanonicalForm {
            reachable: self.reachable,
            bindings: self
                .aliases
                .scopes()
                .iter()
                .map(|scope| {
                    scope
                        .iter()
                        .map(|(var, binding)| (var.clone(), binding.map(name)))
                        .collect()
                })
                .collect(),
            classes: self.aliases.class_names().collect(),
            states: self
                .states
                .iter()
                .map(|(root, state)| (name(*root), state.clone()))
                .collect(),
        }
    }

    /// Same bindings, classes and states up to union order
    pub fn equivalent(&self, other: &PathState) -> bool {
        self.canonical_form() == other.canonical_form()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::typestate::domain::State;

    fn definite(name: &str) -> AbstractState {
        AbstractState::Definite(State::new(name))
    }

    #[test]
    fn test_join_diverging_states() {
        let mut base = PathState::new();
        base.register(HandleId(0), definite("Initialized"));
        base.aliases.declare("c", Some(HandleId(0)));

        let mut then_path = base.clone();
        then_path.set_state(HandleId(0), definite("Started"));

        let joined = then_path.join(&base);
        assert_eq!(
            joined.state_of(HandleId(0)),
            Some(&AbstractState::from_states(
                [State::new("Initialized"), State::new("Started")]
                    .into_iter()
                    .collect()
            ))
        );
    }

    #[test]
    fn test_join_with_unreachable_path() {
        let mut live = PathState::new();
        live.register(HandleId(0), definite("Started"));

        let mut returned = live.clone();
        returned.set_state(HandleId(0), definite("Finished"));
        returned.reachable = false;

        let joined = returned.join(&live);
        assert_eq!(joined.state_of(HandleId(0)), Some(&definite("Started")));
        assert!(joined.reachable);
    }

    #[test]
    fn test_join_unifies_divergent_bindings() {
        let mut base = PathState::new();
        base.register(HandleId(0), definite("Started"));
        base.register(HandleId(1), definite("Initialized"));
        base.aliases.declare("x", None);

        let mut left = base.clone();
        left.aliases.assign("x", Some(HandleId(0)));
        let mut right = base.clone();
        right.aliases.assign("x", Some(HandleId(1)));

        let joined = left.join(&right);
        assert!(joined.aliases.same_class(HandleId(0), HandleId(1)));
        assert_eq!(joined.class_count(), 1);
        assert!(!joined.state_of(HandleId(1)).unwrap().is_definite());
    }

    #[test]
    fn test_handle_created_on_one_path() {
        let base = PathState::new();
        let mut left = base.clone();
        left.register(HandleId(4), definite("Created"));

        let joined = left.join(&base);
        assert_eq!(joined.state_of(HandleId(4)), Some(&definite("Created")));
    }

    #[test]
    fn test_unify_joins_states() {
        let mut state = PathState::new();
        state.register(HandleId(0), definite("Started"));
        state.register(HandleId(1), AbstractState::Unknown);

        state.unify(HandleId(0), HandleId(1));
        assert!(state.state_of(HandleId(0)).unwrap().is_unknown());
        assert_eq!(state.class_count(), 1);
    }

    #[test]
    fn test_equivalent_ignores_union_order() {
        let mut a = PathState::new();
        a.register(HandleId(0), definite("Started"));
        a.register(HandleId(1), definite("Started"));
        let mut b = a.clone();

        a.unify(HandleId(0), HandleId(1));
        b.unify(HandleId(1), HandleId(0));

        assert!(a.equivalent(&b));
        b.set_state(HandleId(0), definite("Finished"));
        assert!(!a.equivalent(&b));
    }
}
