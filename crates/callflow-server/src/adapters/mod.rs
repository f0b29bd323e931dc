//! Infrastructure Adapters
//!
//! Implementations of domain ports for external systems.

pub mod broadcast;
pub mod delivery;
pub mod formatters;
pub mod postgres;
pub mod vonage;

// Re-exports
pub use broadcast::{BroadcastPublisher, LiveEvent};
pub use delivery::HttpDelivery;
pub use postgres::{PgCallSessionRepository, PgDeliveryTaskRepository, PgScriptRepository};
pub use vonage::VonageClient;
