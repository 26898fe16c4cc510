/*
 * Typestate Domain Models
 *
 * Core domain types for typestate protocol analysis.
 */

mod abstract_state;
mod handle;
mod protocol;
mod violations;

pub use abstract_state::{AbstractState, StepOutcome};
pub use handle::{Handle, HandleId};
pub use protocol::{Action, Protocol, State};
pub use violations::{Confidence, Violation, ViolationKey, ViolationKind};
