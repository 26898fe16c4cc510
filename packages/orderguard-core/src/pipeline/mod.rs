//! Batch orchestration
//!
//! - `batch`: independent units on the rayon pool, one private analyzer
//!   session per unit
//! - `verdict`: host pass/fail policy over a unit's result

mod batch;
mod verdict;

pub use batch::{verify_batch, BatchReport, BatchSummary, UnitReport};
pub use verdict::Verdict;
