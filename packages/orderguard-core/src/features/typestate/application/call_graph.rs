//! Call graph over program functions (petgraph)
//!
//! Used to choose analysis roots: functions no other function calls.
//! Calls to names outside the program are not edges.

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use rustc_hash::FxHashMap;

use crate::shared::models::{Expr, Program, Stmt};

pub struct CallGraph<'p> {
    /// caller → callee
    graph: DiGraph<&'p str, ()>,

    index: FxHashMap<&'p str, NodeIndex>,
}

impl<'p> CallGraph<'p> {
    pub fn build(program: &'p Program) -> Self {
        let mut graph = DiGraph::new();
        let mut index = FxHashMap::default();
        for function in &program.functions {
            index
                .entry(function.name.as_str())
                .or_insert_with(|| graph.add_node(function.name.as_str()));
        }

        for function in &program.functions {
            let from = index[function.name.as_str()];
            let mut callees = Vec::new();
            collect_stmt_calls(&function.body, &mut callees);
            for callee in callees {
                if let Some(&to) = index.get(callee) {
                    if !graph.contains_edge(from, to) {
                        graph.add_edge(from, to, ());
                    }
                }
            }
        }

        Self { graph, index }
    }

    /// Functions without callers (self-recursion does not count), in program order
    pub fn roots(&self) -> Vec<&'p str> {
        self.graph
            .node_indices()
            .filter(|&node| {
                self.graph
                    .neighbors_directed(node, Direction::Incoming)
                    .all(|caller| caller == node)
            })
            .map(|node| self.graph[node])
            .collect()
    }

    /// Groups of mutually recursive functions (including self-recursion)
    pub fn recursive_groups(&self) -> Vec<Vec<&'p str>> {
        tarjan_scc(&self.graph)
            .into_iter()
            .filter(|scc| scc.len() > 1 || self.graph.contains_edge(scc[0], scc[0]))
            .map(|scc| scc.into_iter().map(|node| self.graph[node]).collect())
            .collect()
    }

    pub fn callees(&self, function: &str) -> Vec<&'p str> {
        match self.index.get(function) {
            Some(&node) => self
                .graph
                .neighbors_directed(node, Direction::Outgoing)
                .map(|callee| self.graph[callee])
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn function_count(&self) -> usize {
        self.graph.node_count()
    }
}

fn collect_stmt_calls<'p>(stmts: &'p [Stmt], out: &mut Vec<&'p str>) {
    for stmt in stmts {
        match stmt {
            Stmt::Let { value, .. } => {
                if let Some(expr) = value {
                    collect_expr_calls(expr, out);
                }
            }
            Stmt::Assign { value, .. } => collect_expr_calls(value, out),
            Stmt::Return { value, .. } => {
                if let Some(expr) = value {
                    collect_expr_calls(expr, out);
                }
            }
            Stmt::Call { function, args, .. } => {
                out.push(function);
                for arg in args {
                    collect_expr_calls(arg, out);
                }
            }
            Stmt::If {
                then_branch,
                else_branch,
                ..
            } => {
                collect_stmt_calls(then_branch, out);
                collect_stmt_calls(else_branch, out);
            }
            Stmt::Loop { body, .. } | Stmt::Block { body } => collect_stmt_calls(body, out),
            Stmt::MethodCall { .. } => {}
        }
    }
}

fn collect_expr_calls<'p>(expr: &'p Expr, out: &mut Vec<&'p str>) {
    if let Expr::Call { function, args } = expr {
        out.push(function);
        for arg in args {
            collect_expr_calls(arg, out);
        }
    }
}
