//! Domain Services
//!
//! Stateless domain logic spanning several entities.

mod call_flow;

pub use call_flow::*;
