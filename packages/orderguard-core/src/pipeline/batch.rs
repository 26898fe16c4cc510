//! Batch verification
//!
//! Each unit (typically one translation unit) is analyzed on its own: the
//! registry is shared read-only, every other table belongs to the unit's
//! session. With the `parallel` feature the units run on the rayon pool.

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{info, warn};

use super::Verdict;
use crate::config::{PotentialPolicy, VerifierConfig};
use crate::features::typestate::{ProtocolRegistry, TypestateAnalyzer, TypestateResult, Violation};
use crate::shared::models::Program;

/// Result for one unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitReport {
    /// Unit name (`Program::name`)
    pub unit: String,

    pub result: TypestateResult,

    pub verdict: Verdict,
}

/// Totals over a batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub units: usize,

    pub definite: usize,

    pub potential: usize,

    /// Units whose deadline expired
    pub incomplete_units: Vec<String>,

    pub failed_units: usize,

    /// Wall clock time for the whole batch (milliseconds)
    pub elapsed_ms: u64,
}

/// Reports in input order plus totals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub reports: Vec<UnitReport>,

    pub summary: BatchSummary,
}

impl BatchReport {
    /// Batch verdict: fails if any unit fails
    pub fn verdict(&self) -> Verdict {
        if self.reports.iter().any(|r| r.verdict == Verdict::Fail) {
            Verdict::Fail
        } else {
            Verdict::Pass
        }
    }
}

/// Analyze independent units
pub fn verify_batch(
    units: &[Program],
    registry: &ProtocolRegistry,
    config: &VerifierConfig,
) -> BatchReport {
    let started = Instant::now();

    let analyze = |program: &Program| {
        let analyzer = TypestateAnalyzer::new(registry, config.clone());
        let mut result = analyzer.analyze(program);
        if config.potential_policy == PotentialPolicy::Ignore {
            result.violations.retain(Violation::is_definite);
        }
        if result.incomplete {
            warn!(unit = %program.name, "unit incompletely analyzed (timeout)");
        }
        let verdict = Verdict::from_result(&result, config.potential_policy);
        UnitReport {
            unit: program.name.clone(),
            result,
            verdict,
        }
    };

    #[cfg(feature = "parallel")]
    let reports: Vec<UnitReport> = units.par_iter().map(analyze).collect();
    #[cfg(not(feature = "parallel"))]
    let reports: Vec<UnitReport> = units.iter().map(analyze).collect();

    let mut summary = BatchSummary {
        units: reports.len(),
        ..BatchSummary::default()
    };
    for report in &reports {
        summary.definite += report.result.definite_count();
        summary.potential += report.result.potential_count();
        if report.result.incomplete {
            summary.incomplete_units.push(report.unit.clone());
        }
        if report.verdict == Verdict::Fail {
            summary.failed_units += 1;
        }
    }
    summary.elapsed_ms = started.elapsed().as_millis() as u64;

    info!(
        units = summary.units,
        definite = summary.definite,
        potential = summary.potential,
        incomplete = summary.incomplete_units.len(),
        elapsed_ms = summary.elapsed_ms,
        "batch verified"
    );

    BatchReport { reports, summary }
}
