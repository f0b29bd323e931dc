//! PostgreSQL Repository Implementations

mod call_session_repository;
mod delivery_repository;
mod script_repository;

pub use call_session_repository::PgCallSessionRepository;
pub use delivery_repository::PgDeliveryTaskRepository;
pub use script_repository::PgScriptRepository;
