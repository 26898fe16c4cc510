/*
 * Alias Resolver
 *
 * Variable → handle bindings for one function activation, plus the alias
 * classes those handles fall into.
 *
 * - `p2 = p1` binds `p2` to p1's handle id (shared identity, not a copy)
 * - Passing `p` to `f(x)` binds `x` to the same id inside `f`
 * - Block-local declarations vanish at scope exit; the handle and its
 *   state outlive them
 * - Classes only grow: joins and opaque expressions merge them, nothing
 *   splits them
 */

use rustc_hash::FxHashMap;

use crate::features::typestate::domain::HandleId;
use crate::features::typestate::infrastructure::UnionFind;

/// `None` binding = variable known but holding no handle
type Scope = FxHashMap<String, Option<HandleId>>;

#[derive(Debug, Clone)]
pub struct AliasResolver {
    /// Innermost scope last; scope 0 is the function scope
    scopes: Vec<Scope>,

    classes: UnionFind,
}

impl Default for AliasResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl AliasResolver {
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::default()],
            classes: UnionFind::new(),
        }
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(Scope::default());
    }

    /// Drop the innermost block scope (the function scope is never dropped)
    pub fn pop_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Block-scoped declaration (shadows outer bindings)
    pub fn declare(&mut self, var: &str, handle: Option<HandleId>) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(var.to_string(), handle);
        }
    }

    /// Rebind an existing variable, or create it at function scope
    pub fn assign(&mut self, var: &str, handle: Option<HandleId>) {
        let scope = match self.scopes.iter().rposition(|s| s.contains_key(var)) {
            Some(idx) => idx,
            None => 0,
        };
        self.scopes[scope].insert(var.to_string(), handle);
    }

    /// Handle bound to `var`, innermost scope first
    pub fn lookup(&self, var: &str) -> Option<HandleId> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(var))
            .copied()
            .flatten()
    }

    pub fn register(&mut self, id: HandleId) {
        self.classes.make_set(id);
    }

    /// Alias class representative
    pub fn root(&self, id: HandleId) -> HandleId {
        self.classes.find_readonly(id)
    }

    /// Stable class name (smallest member)
    pub fn canonical(&self, id: HandleId) -> HandleId {
        self.classes.canonical(id)
    }

    /// Merge two classes; returns the new representative
    pub fn unify(&mut self, a: HandleId, b: HandleId) -> HandleId {
        self.classes.union(a, b)
    }

    pub fn same_class(&self, a: HandleId, b: HandleId) -> bool {
        self.root(a) == self.root(b)
    }

    /// (member, class name) for every handle sharing a class with another
    pub(crate) fn class_names(&self) -> impl Iterator<Item = (HandleId, HandleId)> + '_ {
        self.classes
            .pairs()
            .map(|(member, _)| (member, self.classes.canonical(member)))
            .filter(|(member, name)| member != name)
    }

    pub(crate) fn scopes(&self) -> &[Scope] {
        &self.scopes
    }

    /// Take over the other path's classes and bindings
    ///
    /// Returns handle pairs bound to the same variable on the two paths;
    /// the caller unifies them (merging their states).
    pub(crate) fn merge_from(&mut self, other: &AliasResolver) -> Vec<(HandleId, HandleId)> {
        for (member, root) in other.classes.pairs() {
            self.classes.union(member, root);
        }

        let mut conflicts = Vec::new();
        for (mine, theirs) in self.scopes.iter_mut().zip(other.scopes.iter()) {
            for (var, their_binding) in theirs {
                match mine.get_mut(var) {
                    Some(my_binding) => match (*my_binding, *their_binding) {
                        (Some(a), Some(b)) if a != b => conflicts.push((a, b)),
                        (None, Some(b)) => *my_binding = Some(b),
                        _ => {}
                    },
                    None => {
                        mine.insert(var.clone(), *their_binding);
                    }
                }
            }
        }
        conflicts
    }
}
