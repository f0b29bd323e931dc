//! Value Objects
//!
//! Immutable objects defined by their attributes rather than identity.

mod call_status;
mod delivery_status;
mod instruction;
mod validation_rule;

pub use call_status::*;
pub use delivery_status::*;
pub use instruction::*;
pub use validation_rule::*;
