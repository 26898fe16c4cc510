//! Host verdict
//!
//! Definite violations always fail a unit. Potential violations fail it
//! only under `PotentialPolicy::Fail`; `Warn` reports them and passes,
//! `Ignore` passes and batch reports leave them out.

use serde::{Deserialize, Serialize};

use crate::config::PotentialPolicy;
use crate::features::typestate::TypestateResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Pass,
    Fail,
}

impl Verdict {
    pub fn from_result(result: &TypestateResult, policy: PotentialPolicy) -> Self {
        if result.definite_count() > 0 {
            return Verdict::Fail;
        }
        match policy {
            PotentialPolicy::Fail if result.potential_count() > 0 => Verdict::Fail,
            _ => Verdict::Pass,
        }
    }

    pub fn is_pass(self) -> bool {
        self == Verdict::Pass
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::Pass => write!(f, "PASS"),
            Verdict::Fail => write!(f, "FAIL"),
        }
    }
}
