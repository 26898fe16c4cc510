//! Verifier configuration
//!
//! # Examples
//!
//! ```rust,ignore
//! use orderguard_core::config::{Preset, VerifierConfig};
//!
//! // Preset
//! let config = VerifierConfig::preset(Preset::Thorough);
//!
//! // YAML file (missing fields fall back to defaults)
//! let config = VerifierConfig::from_yaml_file("orderguard.yaml")?;
//! ```

pub mod error;
pub mod verifier_config;

pub use error::{ConfigError, ConfigResult};
pub use verifier_config::{PotentialPolicy, Preset, VerifierConfig};
