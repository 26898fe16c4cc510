//! Verifier configuration
//!
//! Every field has a default, so a YAML file only needs the keys it changes.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::{ConfigError, ConfigResult};

/// How the host treats potential (some-paths) violations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PotentialPolicy {
    /// Potential violations fail the unit like definite ones
    Fail,

    /// Reported, but the unit still passes
    #[default]
    Warn,

    /// Dropped from reports
    Ignore,
}

/// Configuration presets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    /// Shallow call depth, small cache, short loops
    Fast,
    /// Defaults
    Balanced,
    /// Deep call chains, termination checking, strict policy
    Thorough,
}

impl FromStr for Preset {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fast" => Ok(Preset::Fast),
            "balanced" => Ok(Preset::Balanced),
            "thorough" => Ok(Preset::Thorough),
            _ => Err(ConfigError::UnknownPreset(s.to_string())),
        }
    }
}

/// Typestate verifier configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifierConfig {
    /// Maximum interprocedural call depth, counted in callee frames below
    /// the root (0 follows no calls); deeper calls degrade their arguments
    /// to the unknown state
    pub max_call_depth: usize,

    /// LRU capacity for (function, entry-state) summaries
    pub summary_cache_size: usize,

    /// Fixed-point iteration bound per loop
    pub max_loop_iterations: usize,

    /// Per-unit wall clock budget; partial results are reported on expiry
    pub timeout_ms: Option<u64>,

    /// Report handles that leave their creating function in a non-accepting state
    pub check_termination: bool,

    /// Host policy for potential violations
    pub potential_policy: PotentialPolicy,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            max_call_depth: 8,
            summary_cache_size: 1024,
            max_loop_iterations: 32,
            timeout_ms: None,
            check_termination: false,
            potential_policy: PotentialPolicy::Warn,
        }
    }
}

impl VerifierConfig {
    pub fn preset(preset: Preset) -> Self {
        match preset {
            Preset::Fast => Self {
                max_call_depth: 3,
                summary_cache_size: 256,
                max_loop_iterations: 8,
                timeout_ms: Some(1_000),
                ..Self::default()
            },
            Preset::Balanced => Self::default(),
            Preset::Thorough => Self {
                max_call_depth: 32,
                summary_cache_size: 16_384,
                max_loop_iterations: 128,
                timeout_ms: None,
                check_termination: true,
                potential_policy: PotentialPolicy::Fail,
            },
        }
    }

    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    pub fn with_termination_check(mut self, enabled: bool) -> Self {
        self.check_termination = enabled;
        self
    }

    pub fn with_potential_policy(mut self, policy: PotentialPolicy) -> Self {
        self.potential_policy = policy;
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Range checks
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_call_depth == 0 || self.max_call_depth > 256 {
            return Err(ConfigError::range(
                "max_call_depth",
                self.max_call_depth,
                1,
                256,
                "Depth 0 would skip every callee.",
            ));
        }
        if self.summary_cache_size == 0 || self.summary_cache_size > 1_000_000 {
            return Err(ConfigError::range(
                "summary_cache_size",
                self.summary_cache_size,
                1,
                1_000_000,
                "The LRU cache needs at least one slot.",
            ));
        }
        if self.max_loop_iterations == 0 || self.max_loop_iterations > 10_000 {
            return Err(ConfigError::range(
                "max_loop_iterations",
                self.max_loop_iterations,
                1,
                10_000,
                "Loops need at least one fixed-point round.",
            ));
        }
        if self.timeout_ms == Some(0) {
            return Err(ConfigError::range(
                "timeout_ms",
                0,
                1,
                u64::MAX,
                "Omit the field to disable the timeout.",
            ));
        }
        Ok(())
    }

    pub fn from_yaml(yaml: &str) -> ConfigResult<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }

    pub fn to_yaml(&self) -> ConfigResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}
