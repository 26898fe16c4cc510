/*
 * Typestate Analyzer
 *
 * Entry point for one analysis unit (program).
 *
 * # Algorithm
 * 1. Pick roots: explicit entry points, else call graph roots, else every
 *    function (all of them are mutually recursive)
 * 2. Bind each root's protocol-typed parameters to unknown-state handles
 * 3. Track each root body (intraprocedural), following calls
 *    (interprocedural, memoized per entry state)
 * 4. De-duplicate and order the collected violations
 *
 * Analysis never fails: rule breaches are data, and an expired deadline
 * only marks the result incomplete.
 *
 * # Example
 * ```ignore
 * let registry = ProtocolRegistry::with_builtin();
 * let analyzer = TypestateAnalyzer::new(&registry, VerifierConfig::default());
 *
 * let result = analyzer.analyze(&program);
 * for violation in &result.violations {
 *     println!("{}", violation);
 * }
 * ```
 */

use std::time::Instant;

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::call_graph::CallGraph;
use super::session::AnalysisSession;
use crate::config::VerifierConfig;
use crate::features::typestate::domain::{Confidence, Violation};
use crate::features::typestate::infrastructure::ProtocolRegistry;
use crate::shared::models::Program;

/// Typestate analysis result
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypestateResult {
    /// Violations ordered by location, then handle id
    pub violations: Vec<Violation>,

    /// Deadline expired; `violations` holds what was found until then
    pub incomplete: bool,

    pub stats: AnalysisStats,
}

impl TypestateResult {
    pub fn definite_count(&self) -> usize {
        self.count(Confidence::Definite)
    }

    pub fn potential_count(&self) -> usize {
        self.count(Confidence::Potential)
    }

    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }

    fn count(&self, confidence: Confidence) -> usize {
        self.violations
            .iter()
            .filter(|v| v.confidence == confidence)
            .count()
    }
}

/// Analysis statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisStats {
    pub statements_visited: usize,

    pub handles_created: usize,

    /// Function bodies analyzed (roots + cache misses)
    pub functions_analyzed: usize,

    pub summary_cache_hits: usize,

    pub summary_cache_misses: usize,

    /// Fixed-point rounds over all loops
    pub loop_iterations: usize,

    /// Analysis time (milliseconds)
    pub analysis_time_ms: u64,
}

/// Typestate analyzer
///
/// Stateless between runs; every `analyze` call builds a private session.
pub struct TypestateAnalyzer<'r> {
    registry: &'r ProtocolRegistry,

    config: VerifierConfig,
}

impl<'r> TypestateAnalyzer<'r> {
    pub fn new(registry: &'r ProtocolRegistry, config: VerifierConfig) -> Self {
        Self { registry, config }
    }

    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    /// Analyze one unit under the configured timeout
    pub fn analyze(&self, program: &Program) -> TypestateResult {
        let deadline = self.config.timeout().map(|budget| Instant::now() + budget);
        self.run(program, deadline)
    }

    /// Analyze one unit, stopping at `deadline`
    pub fn analyze_until(&self, program: &Program, deadline: Instant) -> TypestateResult {
        self.run(program, Some(deadline))
    }

    fn run(&self, program: &Program, deadline: Option<Instant>) -> TypestateResult {
        let started = Instant::now();
        let mut session = AnalysisSession::new(program, self.registry, &self.config, deadline);

        let mut violations: Vec<Violation> = Vec::new();
        let mut seen = FxHashSet::default();

        for name in entry_points(program) {
            if session.deadline_reached() {
                break;
            }
            let function = match program.function(name) {
                Some(function) => function,
                None => {
                    warn!(unit = %program.name, entry = name, "entry point not found");
                    continue;
                }
            };

            let (entry, params) = session.bind_root_params(function);
            session.call_stack.push(&function.name);
            session.stats.functions_analyzed += 1;
            let run = session.run_function(function, entry, &params);
            session.call_stack.pop();

            for violation in run.violations {
                if seen.insert(violation.key()) {
                    violations.push(violation);
                }
            }
        }

        violations.sort_by(|a, b| {
            a.location
                .cmp(&b.location)
                .then(a.handle_id.cmp(&b.handle_id))
        });

        let incomplete = session.timed_out();
        let mut stats = std::mem::take(&mut session.stats);
        stats.summary_cache_hits = session.summaries.hits();
        stats.summary_cache_misses = session.summaries.misses();
        stats.analysis_time_ms = started.elapsed().as_millis() as u64;

        debug!(
            unit = %program.name,
            violations = violations.len(),
            incomplete,
            statements = stats.statements_visited,
            handles = session.handle_count(),
            summaries = session.summaries.len(),
            "analysis finished"
        );

        TypestateResult {
            violations,
            incomplete,
            stats,
        }
    }
}

/// Root functions to analyze, in program order
fn entry_points(program: &Program) -> Vec<&str> {
    if !program.entry_points.is_empty() {
        return program.entry_points.iter().map(String::as_str).collect();
    }

    let graph = CallGraph::build(program);
    for group in graph.recursive_groups() {
        debug!(unit = %program.name, functions = ?group, "recursive functions");
    }
    let roots = graph.roots();
    if roots.is_empty() {
        program.functions.iter().map(|f| f.name.as_str()).collect()
    } else {
        roots
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::{Expr, Function, Param, Stmt};

    fn analyze(program: &Program, config: VerifierConfig) -> TypestateResult {
        let registry = ProtocolRegistry::with_builtin();
        TypestateAnalyzer::new(&registry, config).analyze(program)
    }

    #[test]
    fn test_entry_point_selection() {
        let program = Program::new("unit")
            .with_function(Function::new("helper", vec![], vec![]))
            .with_function(Function::new(
                "main",
                vec![],
                vec![Stmt::call("helper", vec![], 1)],
            ));

        assert_eq!(entry_points(&program), vec!["main"]);
        assert_eq!(
            entry_points(&program.clone().with_entry_point("helper")),
            vec!["helper"]
        );
    }

    #[test]
    fn test_root_param_starts_unknown() {
        let program = Program::new("unit").with_function(Function::new(
            "encrypt_block",
            vec![Param::handle("enc", "Cipher")],
            vec![
                Stmt::method_call("enc", "finish", 2),
                Stmt::method_call("enc", "finish", 3),
            ],
        ));

        let result = analyze(&program, VerifierConfig::default());

        assert_eq!(result.violations.len(), 1);
        assert_eq!(result.violations[0].location.line, 3);
        assert_eq!(result.definite_count(), 1);
    }

    #[test]
    fn test_termination_check() {
        let program = Program::new("unit").with_function(Function::new(
            "main",
            vec![],
            vec![
                Stmt::let_("c", Expr::new_handle("Cipher"), 1),
                Stmt::method_call("c", "init", 2),
                Stmt::method_call("c", "start", 3),
            ],
        ));

        assert!(analyze(&program, VerifierConfig::default()).is_clean());

        let result = analyze(&program, VerifierConfig::default().with_termination_check(true));
        assert_eq!(result.violations.len(), 1);
        let violation = &result.violations[0];
        assert_eq!(
            violation.kind,
            crate::features::typestate::domain::ViolationKind::NonAcceptingTermination
        );
        assert_eq!(violation.location.line, 1);
        assert_eq!(violation.expected, vec!["finish", "process"]);
    }

    #[test]
    fn test_expired_deadline_is_incomplete() {
        let program = Program::new("unit").with_function(Function::new(
            "main",
            vec![],
            vec![Stmt::let_("c", Expr::new_handle("Cipher"), 1)],
        ));
        let registry = ProtocolRegistry::with_builtin();
        let analyzer = TypestateAnalyzer::new(&registry, VerifierConfig::default());

        let result = analyzer.analyze_until(&program, Instant::now());

        assert!(result.incomplete);
        assert_eq!(result.stats.statements_visited, 0);
    }
}
