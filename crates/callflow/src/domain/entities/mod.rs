//! Domain Entities
//!
//! Pure domain models without infrastructure dependencies.
//! - Script: Declarative prompt/keypad flow
//! - CallSession: Durable per-call state
//! - CallEvent: Per-call audit trail
//! - DeliveryTask: Outbound notification with retry bookkeeping

mod call_event;
mod call_session;
mod delivery_task;
mod script;

pub use call_event::*;
pub use call_session::*;
pub use delivery_task::*;
pub use script::*;
