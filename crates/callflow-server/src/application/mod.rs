//! Application Layer (Use Cases)
//!
//! Orchestrates domain operations and coordinates between
//! repositories and external services.

mod call_flow_service;
mod call_locks;
mod delivery_queue;
mod script_service;

#[cfg(test)]
pub mod testing;

pub use call_flow_service::{CallFlowService, InitiateCall};
pub use delivery_queue::DeliveryQueue;
pub use script_service::ScriptService;
