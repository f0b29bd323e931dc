//! Repository Ports
//!
//! Abstract interfaces for data persistence operations.

mod call_session_repository;
mod delivery_task_repository;
mod script_repository;

pub use call_session_repository::*;
pub use delivery_task_repository::*;
pub use script_repository::*;
