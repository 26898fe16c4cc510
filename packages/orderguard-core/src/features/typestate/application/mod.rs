/*
 * Typestate Application Layer
 *
 * - alias / path_sensitive: per-path bindings, alias classes, states
 * - session + intraprocedural + interprocedural: the tracking engine
 * - call_graph: root selection
 * - analyzer: public entry point
 */

mod alias;
mod analyzer;
mod call_graph;
mod interprocedural;
mod intraprocedural;
mod path_sensitive;
mod session;

pub use alias::AliasResolver;
pub use analyzer::{AnalysisStats, TypestateAnalyzer, TypestateResult};
pub use call_graph::CallGraph;
pub use path_sensitive::PathState;
