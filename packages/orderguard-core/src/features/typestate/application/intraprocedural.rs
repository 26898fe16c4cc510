/*
 * Intraprocedural Tracker
 *
 * Walks a function body in program order on one `PathState`:
 * - `Let` / `Assign` bind variables (through the alias resolver)
 * - `MethodCall` applies a modeled operation to the receiver's class,
 *   or reports a forbidden one without changing state
 * - `If` splits the path and joins the branches
 * - `Loop` iterates to a fixed point (muted), then replays once to report
 * - `Return` hands the path to the frame and ends it
 *
 * Unmodeled method calls never change state and never report.
 */

use tracing::{debug, trace, warn};

use super::path_sensitive::PathState;
use super::session::{AnalysisSession, Frame};
use crate::features::typestate::domain::{
    AbstractState, Action, Confidence, HandleId, StepOutcome, Violation, ViolationKind,
};
use crate::shared::models::{Expr, Location, Stmt};

impl<'p> AnalysisSession<'p> {
    pub(crate) fn exec_stmts(&mut self, frame: &mut Frame<'p>, stmts: &'p [Stmt], state: &mut PathState) {
        for stmt in stmts {
            if !state.reachable || self.deadline_reached() {
                break;
            }
            self.exec_stmt(frame, stmt, state);
        }
    }

    fn exec_stmt(&mut self, frame: &mut Frame<'p>, stmt: &'p Stmt, state: &mut PathState) {
        self.stats.statements_visited += 1;
        frame.enter_stmt(stmt);

        match stmt {
            Stmt::Let { var, value, loc } => {
                let handle = match value {
                    Some(expr) => self.eval_expr(frame, expr, state, Some(var.as_str()), *loc),
                    None => None,
                };
                state.aliases.declare(var, handle);
            }
            Stmt::Assign { target, value, loc } => {
                let handle = self.eval_expr(frame, value, state, Some(target.as_str()), *loc);
                state.aliases.assign(target, handle);
            }
            Stmt::MethodCall {
                receiver,
                method,
                loc,
            } => self.apply_operation(frame, state, receiver, method, *loc),
            Stmt::Call {
                function,
                args,
                loc,
            } => {
                self.invoke(frame, state, function, args, *loc);
            }
            Stmt::If {
                then_branch,
                else_branch,
                ..
            } => {
                let mut then_state = state.clone();
                self.exec_block(frame, then_branch, &mut then_state);
                let mut else_state = std::mem::take(state);
                self.exec_block(frame, else_branch, &mut else_state);
                *state = then_state.join(&else_state);
            }
            Stmt::Loop { body, loc } => self.exec_loop(frame, body, state, *loc),
            Stmt::Block { body } => self.exec_block(frame, body, state),
            Stmt::Return { value, loc } => {
                let handle = match value {
                    Some(expr) => self.eval_expr(frame, expr, state, None, *loc),
                    None => None,
                };
                if frame.muted == 0 {
                    frame.returns.push((state.clone(), handle));
                }
                state.reachable = false;
            }
        }
    }

    fn exec_block(&mut self, frame: &mut Frame<'p>, body: &'p [Stmt], state: &mut PathState) {
        state.aliases.push_scope();
        self.exec_stmts(frame, body, state);
        state.aliases.pop_scope();
    }

    /// Zero or more iterations of `body`
    ///
    /// Rounds run muted until the loop-head state stops changing (or the
    /// iteration bound is hit); one final round from the stable head
    /// records violations and returns.
    fn exec_loop(&mut self, frame: &mut Frame<'p>, body: &'p [Stmt], state: &mut PathState, loc: Location) {
        let mut head = state.clone();
        let mut converged = false;

        frame.muted += 1;
        for _ in 0..self.config.max_loop_iterations {
            self.stats.loop_iterations += 1;
            let mut round = head.clone();
            self.exec_block(frame, body, &mut round);
            let next = head.join(&round);
            if next.equivalent(&head) {
                converged = true;
                break;
            }
            head = next;
        }
        frame.muted -= 1;

        if !converged {
            debug!(
                function = frame.name(),
                line = loc.line,
                bound = self.config.max_loop_iterations,
                "loop did not converge within bound"
            );
        }

        let mut last = head.clone();
        self.exec_block(frame, body, &mut last);
        *state = head.join(&last);
    }

    /// Apply `receiver.method()` to the receiver's alias class
    pub(crate) fn apply_operation(
        &mut self,
        frame: &mut Frame<'p>,
        state: &mut PathState,
        receiver: &str,
        method: &str,
        loc: Location,
    ) {
        let id = match state.aliases.lookup(receiver) {
            Some(id) => id,
            None => return,
        };
        let registry = self.registry;
        let protocol = match registry.get(&self.handle(id).protocol) {
            Some(protocol) => protocol,
            None => return,
        };
        if protocol.is_forbidden(method) {
            self.touch(id);
            let current = state
                .state_of(id)
                .cloned()
                .unwrap_or(AbstractState::Unknown);
            let violation =
                Violation::new(id, Action::new(method), current, loc, Confidence::Definite)
                    .with_kind(ViolationKind::ForbiddenCall)
                    .with_variable(receiver)
                    .with_function(frame.name())
                    .with_default_message();
            debug!(violation = %violation, "forbidden call");
            frame.record(violation);
            return;
        }
        let action = match protocol.resolve_action(method) {
            Some(action) => action,
            None => {
                trace!(receiver, method, "unmodeled call ignored");
                return;
            }
        };

        self.touch(id);
        let current = state
            .state_of(id)
            .cloned()
            .unwrap_or(AbstractState::Unknown);

        match current.step(protocol, &action) {
            StepOutcome::Allowed(next) => state.set_state(id, next),
            StepOutcome::Violation { confidence, next } => {
                let expected = current.expected_actions(protocol);
                let violation = Violation::new(id, action, current, loc, confidence)
                    .with_variable(receiver)
                    .with_function(frame.name())
                    .with_expected(expected)
                    .with_default_message();
                debug!(violation = %violation, "protocol violation");
                frame.record(violation);
                state.set_state(id, next);
            }
        }
    }

    /// Evaluate an expression to the handle it denotes, if any
    ///
    /// `binding` names the variable receiving the value (used in messages).
    pub(crate) fn eval_expr(
        &mut self,
        frame: &mut Frame<'p>,
        expr: &'p Expr,
        state: &mut PathState,
        binding: Option<&str>,
        loc: Location,
    ) -> Option<HandleId> {
        match expr {
            Expr::New { protocol } => {
                let registry = self.registry;
                let definition = match registry.get(protocol) {
                    Some(definition) => definition,
                    None => {
                        warn!(protocol = %protocol, line = loc.line, "unknown protocol, handle not tracked");
                        return None;
                    }
                };
                let site = frame.next_site();
                let function = frame.name();
                let id = self.site_handle(frame, site, |session| {
                    session.allocate(protocol, loc, function, binding)
                });
                state.register(id, AbstractState::Definite(definition.initial_state()));
                Some(id)
            }
            Expr::Var { name } => state.aliases.lookup(name),
            Expr::Call { function, args } => self.invoke(frame, state, function, args, loc),
            Expr::Opaque { operands } => {
                let ids: Vec<HandleId> = operands
                    .iter()
                    .filter_map(|name| state.aliases.lookup(name))
                    .collect();
                let first = ids.first().copied()?;
                for other in &ids[1..] {
                    state.unify(first, *other);
                }
                debug!(handle = %first, line = loc.line, "aliasing lost, state degraded to unknown");
                state.set_state(first, AbstractState::Unknown);
                Some(first)
            }
            Expr::Literal => None,
        }
    }
}
