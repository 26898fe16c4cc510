/*
 * Interprocedural Propagator
 *
 * A call `f(a, b)` runs `f` with its parameters bound to the caller's
 * handles (same ids, so aliasing carries over) and the caller's states as
 * entry states. The callee's exit states flow back to the arguments; a
 * returned handle flows into the receiving expression.
 *
 * Results are memoized as `FunctionSummary` values keyed by
 * (function, entry state of each parameter). Summaries speak in parameter
 * positions, not handle ids, so one summary serves every call site.
 *
 * Termination:
 * - calls deeper than `max_call_depth`, and recursive calls without a
 *   cached summary, degrade their handle arguments to the unknown state
 * - summaries computed after the deadline passed are never cached
 *
 * # Time Complexity
 * O(functions × distinct entry states) analyses, each linear in the body
 * (times the loop bound)
 */

use std::num::NonZeroUsize;

use lru::LruCache;
use tracing::debug;

use super::path_sensitive::PathState;
use super::session::{AnalysisSession, Frame, FunctionRun, SiteKey};
use crate::features::typestate::domain::{AbstractState, HandleId, Violation};
use crate::shared::models::{Expr, Function, Location};

/// Entry description of one handle parameter
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct ParamEntry {
    /// Earlier parameter in the same alias class
    pub alias_of: Option<usize>,

    pub protocol: String,

    pub state: AbstractState,
}

/// (function, entry state) cache key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct SummaryKey {
    pub function: String,

    /// One entry per formal parameter; `None` = not a handle
    pub params: Vec<Option<ParamEntry>>,
}

/// What a function returns, relative to its parameters
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ReturnSummary {
    None,

    /// The handle passed as parameter `i`
    Param(usize),

    /// A handle created inside the callee (or deeper)
    Fresh { origin: HandleId, state: AbstractState },
}

/// Which handle a callee violation is about
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum ViolationTarget {
    Param(usize),
    Returned,
    /// Handle that never leaves the callee
    Local,
}

/// Effect of one call on its arguments
#[derive(Debug, Clone)]
pub(crate) struct FunctionSummary {
    /// Exit state of each handle parameter's class
    pub param_exit: Vec<Option<AbstractState>>,

    /// Parameter pairs merged into one class by the callee
    pub param_unions: Vec<(usize, usize)>,

    pub returns: ReturnSummary,

    pub violations: Vec<(ViolationTarget, Violation)>,
}

/// LRU cache for function summaries
pub(crate) struct SummaryCache {
    cache: LruCache<SummaryKey, FunctionSummary>,

    hits: usize,

    misses: usize,
}

impl SummaryCache {
    pub fn new(max_size: usize) -> Self {
        let capacity = NonZeroUsize::new(max_size).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: LruCache::new(capacity),
            hits: 0,
            misses: 0,
        }
    }

    /// Look up a summary, counting hits and misses
    pub fn get(&mut self, key: &SummaryKey) -> Option<FunctionSummary> {
        match self.cache.get(key) {
            Some(summary) => {
                self.hits += 1;
                Some(summary.clone())
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    pub fn put(&mut self, key: SummaryKey, summary: FunctionSummary) {
        self.cache.put(key, summary);
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn misses(&self) -> usize {
        self.misses
    }
}

impl<'p> AnalysisSession<'p> {
    /// Evaluate a call; returns the handle it yields, if any
    pub(crate) fn invoke(
        &mut self,
        frame: &mut Frame<'p>,
        state: &mut PathState,
        callee: &str,
        args: &'p [Expr],
        loc: Location,
    ) -> Option<HandleId> {
        let actuals: Vec<Option<HandleId>> = args
            .iter()
            .map(|arg| self.eval_expr(frame, arg, state, None, loc))
            .collect();
        let site = frame.next_site();

        // not part of the program: unmodeled
        let function = self.functions.get(callee).copied()?;

        for id in actuals.iter().flatten() {
            self.touch(*id);
        }

        let key = self.summary_key(function, &actuals, state);
        let summary = match self.summaries.get(&key) {
            Some(summary) => {
                debug!(callee, caller = frame.name(), "summary cache hit");
                summary
            }
            None => {
                let depth = self.call_stack.len();
                let recursive = self.call_stack.iter().any(|name| *name == callee);
                if depth > self.config.max_call_depth || recursive {
                    debug!(
                        callee,
                        depth,
                        recursive,
                        "call not followed, arguments degraded to unknown"
                    );
                    for id in actuals.iter().flatten() {
                        state.set_state(*id, AbstractState::Unknown);
                    }
                    return None;
                }
                let summary = self.analyze_callee(function, &actuals, state);
                if !self.timed_out() {
                    self.summaries.put(key, summary.clone());
                }
                summary
            }
        };

        self.apply_summary(frame, state, &summary, &actuals, site)
    }

    fn summary_key(
        &self,
        function: &Function,
        actuals: &[Option<HandleId>],
        state: &PathState,
    ) -> SummaryKey {
        let params = (0..function.params.len())
            .map(|i| {
                let id = actuals.get(i).copied().flatten()?;
                let root = state.root(id);
                let alias_of = (0..i).find(|&j| {
                    actuals
                        .get(j)
                        .copied()
                        .flatten()
                        .map_or(false, |other| state.root(other) == root)
                });
                Some(ParamEntry {
                    alias_of,
                    protocol: self.handle(id).protocol.clone(),
                    state: state.state_of(id).cloned().unwrap_or(AbstractState::Unknown),
                })
            })
            .collect();
        SummaryKey {
            function: function.name.clone(),
            params,
        }
    }

    /// Run the callee with the caller's handles as parameters
    fn analyze_callee(
        &mut self,
        function: &'p Function,
        actuals: &[Option<HandleId>],
        caller: &PathState,
    ) -> FunctionSummary {
        let mut entry = PathState::new();
        let mut bound: Vec<Option<HandleId>> = Vec::with_capacity(function.params.len());
        for (i, param) in function.params.iter().enumerate() {
            let handle = actuals.get(i).copied().flatten();
            if let Some(id) = handle {
                let state = caller.state_of(id).cloned().unwrap_or(AbstractState::Unknown);
                entry.register(id, state);
                for earlier in bound.iter().flatten() {
                    if caller.root(*earlier) == caller.root(id) {
                        entry.unify(*earlier, id);
                    }
                }
            }
            entry.aliases.declare(&param.name, handle);
            bound.push(handle);
        }

        self.call_stack.push(&function.name);
        self.stats.functions_analyzed += 1;
        let run = self.run_function(function, entry, &bound);
        self.call_stack.pop();

        summarize(&bound, run)
    }

    /// Reflect a callee's effect into the caller's path
    fn apply_summary(
        &mut self,
        frame: &mut Frame<'p>,
        state: &mut PathState,
        summary: &FunctionSummary,
        actuals: &[Option<HandleId>],
        site: SiteKey,
    ) -> Option<HandleId> {
        let actual = |i: usize| actuals.get(i).copied().flatten();

        for (i, exit) in summary.param_exit.iter().enumerate() {
            if let (Some(id), Some(exit)) = (actual(i), exit) {
                state.set_state(id, exit.clone());
            }
        }
        for (i, j) in &summary.param_unions {
            if let (Some(a), Some(b)) = (actual(*i), actual(*j)) {
                state.unify(a, b);
            }
        }

        let returned = match &summary.returns {
            ReturnSummary::None => None,
            ReturnSummary::Param(i) => actual(*i),
            ReturnSummary::Fresh {
                origin,
                state: exit,
            } => {
                let origin = *origin;
                let id = self.site_handle(frame, site, |session| session.allocate_copy(origin));
                state.register(id, exit.clone());
                Some(id)
            }
        };

        for (target, violation) in &summary.violations {
            let handle_id = match target {
                ViolationTarget::Param(i) => actual(*i),
                ViolationTarget::Returned => returned,
                ViolationTarget::Local => None,
            };
            let mut violation = violation.clone();
            if let Some(id) = handle_id {
                violation.handle_id = id;
            }
            frame.record(violation);
        }

        returned
    }
}

/// Express a callee run in parameter positions
fn summarize(bound: &[Option<HandleId>], run: FunctionRun) -> FunctionSummary {
    let FunctionRun {
        exit,
        returned,
        violations,
    } = run;

    let param_of = |root: HandleId| {
        bound
            .iter()
            .position(|h| h.map_or(false, |id| exit.root(id) == root))
    };

    let param_exit = bound
        .iter()
        .map(|h| h.map(|id| exit.state_of(id).cloned().unwrap_or(AbstractState::Unknown)))
        .collect();

    let mut param_unions = Vec::new();
    for (i, handle) in bound.iter().enumerate() {
        if let Some(id) = handle {
            if let Some(first) = param_of(exit.root(*id)) {
                if first < i {
                    param_unions.push((first, i));
                }
            }
        }
    }

    let returned_root = returned.map(|id| exit.root(id));
    let returns = match returned {
        None => ReturnSummary::None,
        Some(id) => match param_of(exit.root(id)) {
            Some(i) => ReturnSummary::Param(i),
            None => ReturnSummary::Fresh {
                origin: id,
                state: exit.state_of(id).cloned().unwrap_or(AbstractState::Unknown),
            },
        },
    };

    let violations = violations
        .into_iter()
        .map(|violation| {
            let root = exit.root(violation.handle_id);
            let target = match param_of(root) {
                Some(i) => ViolationTarget::Param(i),
                None if Some(root) == returned_root => ViolationTarget::Returned,
                None => ViolationTarget::Local,
            };
            (target, violation)
        })
        .collect();

    FunctionSummary {
        param_exit,
        param_unions,
        returns,
        violations,
    }
}
