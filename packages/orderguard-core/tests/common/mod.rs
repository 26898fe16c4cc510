//! Common test utilities for orderguard-core
//!
//! Shared IR builders, analysis shortcuts and assertions for the
//! integration tests.

#![allow(dead_code)]

mod assertions;
mod builders;

pub use assertions::*;
pub use builders::*;
