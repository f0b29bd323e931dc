//! Service Ports
//!
//! Abstract interfaces for outbound integrations.

mod delivery_transport;
mod event_publisher;
mod telephony;

pub use delivery_transport::*;
pub use event_publisher::*;
pub use telephony::*;
