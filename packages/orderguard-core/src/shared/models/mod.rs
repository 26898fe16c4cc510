//! Input IR consumed by the verifier
//!
//! The front-end (parser, CFG builder) is external; it hands over a fully
//! materialized `Program` before analysis starts.

mod program;
mod span;

pub use program::{Expr, Function, Param, Program, Stmt};
pub use span::Location;
