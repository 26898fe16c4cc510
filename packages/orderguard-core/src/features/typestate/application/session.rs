/*
 * Analysis Session
 *
 * Private state of one analysis run over one program:
 * - handle arena (metadata; states live in `PathState`)
 * - summary cache keyed by (function, entry state)
 * - call stack for the depth cap and recursion detection
 * - wall clock deadline
 *
 * Nothing here is shared between runs, so batch workers each build their own.
 * Statement execution lives in `intraprocedural.rs`, calls in
 * `interprocedural.rs`.
 */

use std::time::Instant;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, warn};

use super::analyzer::AnalysisStats;
use super::interprocedural::SummaryCache;
use super::path_sensitive::PathState;
use crate::config::VerifierConfig;
use crate::features::typestate::domain::{
    AbstractState, Action, Confidence, Handle, HandleId, Violation, ViolationKey, ViolationKind,
};
use crate::features::typestate::infrastructure::ProtocolRegistry;
use crate::shared::models::{Function, Location, Program, Stmt};

/// Allocation site inside a function body
///
/// `stmt` is the address of the statement in the borrowed program, so two
/// statements never share a site even when their locations coincide.
/// `slot` numbers the handle-producing expressions of that statement, so
/// re-running a loop body hands out the same ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct SiteKey {
    pub stmt: usize,
    pub slot: u32,
}

/// One function activation
pub(crate) struct Frame<'p> {
    pub function: &'p Function,

    /// >0 while iterating a loop towards its fixed point
    pub muted: usize,

    /// (path state, returned handle) for each `return` reached
    pub returns: Vec<(PathState, Option<HandleId>)>,

    /// Handles allocated by this activation
    pub created: Vec<HandleId>,

    stmt: usize,

    slot: u32,

    violations: Vec<Violation>,

    seen: FxHashSet<ViolationKey>,
}

impl<'p> Frame<'p> {
    pub fn new(function: &'p Function) -> Self {
        Self {
            function,
            muted: 0,
            returns: Vec::new(),
            created: Vec::new(),
            stmt: 0,
            slot: 0,
            violations: Vec::new(),
            seen: FxHashSet::default(),
        }
    }

    pub fn name(&self) -> &'p str {
        &self.function.name
    }

    /// Start numbering allocation slots for `stmt`
    pub fn enter_stmt(&mut self, stmt: &'p Stmt) {
        self.stmt = stmt as *const Stmt as usize;
        self.slot = 0;
    }

    pub fn next_site(&mut self) -> SiteKey {
        let key = SiteKey {
            stmt: self.stmt,
            slot: self.slot,
        };
        self.slot += 1;
        key
    }

    fn mark_created(&mut self, id: HandleId) {
        if !self.created.contains(&id) {
            self.created.push(id);
        }
    }

    /// Keep a violation unless muted or already seen
    pub fn record(&mut self, violation: Violation) {
        if self.muted > 0 {
            return;
        }
        if self.seen.insert(violation.key()) {
            self.violations.push(violation);
        }
    }

    pub fn into_violations(self) -> Vec<Violation> {
        self.violations
    }
}

/// Outcome of running one function body
pub(crate) struct FunctionRun {
    /// Join of every return path and the fall-through path
    pub exit: PathState,

    /// Returned handle (all returned handles are unified into its class)
    pub returned: Option<HandleId>,

    pub violations: Vec<Violation>,
}

pub(crate) struct AnalysisSession<'p> {
    pub registry: &'p ProtocolRegistry,

    pub config: &'p VerifierConfig,

    pub functions: FxHashMap<&'p str, &'p Function>,

    handles: Vec<Handle>,

    /// Handle saw at least one modeled operation
    touched: Vec<bool>,

    /// (function, site) → handle; a site keeps its id across loop rounds
    /// and across analyses of the function under other entry states
    sites: FxHashMap<(&'p str, SiteKey), HandleId>,

    pub summaries: SummaryCache,

    pub call_stack: Vec<&'p str>,

    deadline: Option<Instant>,

    timed_out: bool,

    pub stats: AnalysisStats,
}

impl<'p> AnalysisSession<'p> {
    pub fn new(
        program: &'p Program,
        registry: &'p ProtocolRegistry,
        config: &'p VerifierConfig,
        deadline: Option<Instant>,
    ) -> Self {
        let functions = program
            .functions
            .iter()
            .map(|f| (f.name.as_str(), f))
            .collect();
        Self {
            registry,
            config,
            functions,
            handles: Vec::new(),
            touched: Vec::new(),
            sites: FxHashMap::default(),
            summaries: SummaryCache::new(config.summary_cache_size),
            call_stack: Vec::new(),
            deadline,
            timed_out: false,
            stats: AnalysisStats::default(),
        }
    }

    pub fn handle(&self, id: HandleId) -> &Handle {
        &self.handles[id.index()]
    }

    pub fn handle_count(&self) -> usize {
        self.handles.len()
    }

    /// Add a handle to the arena
    pub fn allocate(
        &mut self,
        protocol: &str,
        created_at: Location,
        function: &str,
        binding: Option<&str>,
    ) -> HandleId {
        let id = HandleId(self.handles.len() as u32);
        self.handles.push(Handle {
            id,
            protocol: protocol.to_string(),
            created_at,
            function: function.to_string(),
            binding: binding.map(str::to_string),
        });
        self.touched.push(false);
        self.stats.handles_created += 1;
        id
    }

    /// Copy of an existing handle's metadata under a new id
    pub fn allocate_copy(&mut self, origin: HandleId) -> HandleId {
        let handle = self.handles[origin.index()].clone();
        let id = self.allocate(
            &handle.protocol,
            handle.created_at,
            &handle.function,
            handle.binding.as_deref(),
        );
        self.touched[id.index()] = self.touched[origin.index()];
        id
    }

    /// Handle allocated at `site` of the running function
    pub fn site_handle(
        &mut self,
        frame: &mut Frame<'p>,
        site: SiteKey,
        allocate: impl FnOnce(&mut Self) -> HandleId,
    ) -> HandleId {
        let key = (frame.name(), site);
        let id = match self.sites.get(&key) {
            Some(&id) => id,
            None => {
                let id = allocate(self);
                self.sites.insert(key, id);
                id
            }
        };
        frame.mark_created(id);
        id
    }

    pub fn touch(&mut self, id: HandleId) {
        if let Some(flag) = self.touched.get_mut(id.index()) {
            *flag = true;
        }
    }

    pub fn is_touched(&self, id: HandleId) -> bool {
        self.touched.get(id.index()).copied().unwrap_or(false)
    }

    pub fn timed_out(&self) -> bool {
        self.timed_out
    }

    /// True once the unit's deadline has passed
    pub fn deadline_reached(&mut self) -> bool {
        if self.timed_out {
            return true;
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                warn!(
                    function = self.call_stack.last().copied().unwrap_or(""),
                    "analysis timed out; reporting partial results"
                );
                self.timed_out = true;
            }
        }
        self.timed_out
    }

    /// Run a function body from `entry`
    ///
    /// `params` are the handles bound to the formal parameters; together
    /// with the returned handle they decide which created handles escape.
    pub fn run_function(
        &mut self,
        function: &'p Function,
        entry: PathState,
        params: &[Option<HandleId>],
    ) -> FunctionRun {
        let mut frame = Frame::new(function);
        let mut state = entry;
        self.exec_stmts(&mut frame, &function.body, &mut state);

        let returns = std::mem::take(&mut frame.returns);
        let mut exit = state;
        let mut returned_ids = Vec::new();
        for (path, value) in &returns {
            exit = exit.join(path);
            if let Some(id) = value {
                returned_ids.push(*id);
            }
        }
        let returned = returned_ids.first().copied();
        if let Some(first) = returned {
            for other in &returned_ids[1..] {
                exit.unify(first, *other);
            }
        }

        if self.config.check_termination {
            self.check_termination(&mut frame, &exit, params, returned);
        }

        FunctionRun {
            exit,
            returned,
            violations: frame.into_violations(),
        }
    }

    /// Report created, non-escaping handles left outside an accepting state
    fn check_termination(
        &mut self,
        frame: &mut Frame<'p>,
        exit: &PathState,
        params: &[Option<HandleId>],
        returned: Option<HandleId>,
    ) {
        let escaping: FxHashSet<HandleId> = params
            .iter()
            .flatten()
            .chain(returned.iter())
            .map(|id| exit.root(*id))
            .collect();
        let mut reported: FxHashSet<HandleId> = FxHashSet::default();

        for id in frame.created.clone() {
            let root = exit.root(id);
            if !self.is_touched(id) || escaping.contains(&root) || !reported.insert(root) {
                continue;
            }
            let state = match exit.state_of(id) {
                Some(state) if !state.is_unknown() => state.clone(),
                _ => continue,
            };
            let handle = self.handle(id);
            let protocol = match self.registry.get(&handle.protocol) {
                Some(protocol) => protocol,
                None => continue,
            };

            let states = state.states();
            let accepting = states.iter().filter(|s| protocol.is_final_state(s)).count();
            if accepting == states.len() {
                continue;
            }
            let confidence = if accepting == 0 {
                Confidence::Definite
            } else {
                Confidence::Potential
            };
            let expected = state.expected_actions(protocol);
            let operation = expected.first().cloned().unwrap_or_else(|| "exit".to_string());

            debug!(handle = %id, state = %state, function = frame.name(), "handle not terminated");
            let violation = Violation::new(
                id,
                Action::new(operation),
                state,
                handle.created_at,
                confidence,
            )
            .with_kind(ViolationKind::NonAcceptingTermination)
            .with_variable(handle.display_name())
            .with_function(frame.name())
            .with_expected(expected)
            .with_default_message();
            frame.record(violation);
        }
    }

    /// Fresh handles for a root function's protocol-typed parameters
    ///
    /// Their history is unknown, so they start in the unknown state.
    pub fn bind_root_params(&mut self, function: &'p Function) -> (PathState, Vec<Option<HandleId>>) {
        let mut state = PathState::new();
        let mut params = Vec::with_capacity(function.params.len());
        for param in &function.params {
            let handle = match &param.protocol {
                Some(protocol) if self.registry.contains(protocol) => {
                    let id = self.allocate(
                        protocol,
                        Location::default(),
                        &function.name,
                        Some(&param.name),
                    );
                    state.register(id, AbstractState::Unknown);
                    Some(id)
                }
                Some(protocol) => {
                    warn!(param = %param.name, protocol = %protocol, "unknown protocol on parameter");
                    None
                }
                None => None,
            };
            state.aliases.declare(&param.name, handle);
            params.push(handle);
        }
        (state, params)
    }
}
