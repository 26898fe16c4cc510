/*
 * Orderguard Core - Typestate Verification Engine
 *
 * Feature-First Hexagonal Architecture:
 * - shared/      : Input IR (Program, Function, Stmt, Expr, Location)
 * - features/    : Typestate checking (protocols → aliasing → tracking → propagation)
 * - pipeline/    : Batch orchestration + host verdict
 * - config/      : Verifier configuration (YAML/JSON)
 *
 * The engine never aborts on a rule breach: every violation is collected and
 * handed back to the host tool, which decides pass/fail.
 */

#![allow(clippy::too_many_arguments)] // Session helpers thread frame + path state
#![allow(clippy::type_complexity)] // Summary tables
#![allow(clippy::new_without_default)] // Default impl not always needed
#![allow(clippy::module_inception)] // Module naming intentional

// ═══════════════════════════════════════════════════════════════════════════
// Module Exports - Feature-First Architecture
// ═══════════════════════════════════════════════════════════════════════════

/// Shared models (input IR)
pub mod shared;

/// Feature modules
pub mod features;

/// Batch orchestration
pub mod pipeline;

/// Configuration system
pub mod config;

/// Error types
pub mod errors;

// ═══════════════════════════════════════════════════════════════════════════
// Re-exports for Public API
// ═══════════════════════════════════════════════════════════════════════════

pub use config::{PotentialPolicy, VerifierConfig};
pub use errors::{OrderguardError, Result};
pub use features::typestate::{
    AbstractState, Action, Confidence, HandleId, Protocol, ProtocolRegistry, State,
    TypestateAnalyzer, TypestateResult, Violation, ViolationKind,
};
pub use pipeline::{verify_batch, BatchReport, BatchSummary, UnitReport, Verdict};
pub use shared::models::{Expr, Function, Location, Param, Program, Stmt};
