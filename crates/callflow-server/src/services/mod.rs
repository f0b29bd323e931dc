//! Background Services

pub mod scheduler;

pub use scheduler::RetryScheduler;
