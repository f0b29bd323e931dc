//! Callflow API Data Models
//!
//! - Script: saved call flows
//! - Call: sessions, audit events, statistics
//! - Delivery: outbound notification tasks

mod call;
mod delivery;
mod script;

pub use call::*;
pub use delivery::*;
pub use script::*;
