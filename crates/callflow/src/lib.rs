//! Callflow Domain Library
//!
//! Core domain types and interfaces for scripted outbound voice calls.
//!
//! # Architecture
//!
//! This crate follows Clean Architecture / Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain/`): Pure business entities and logic
//!   - `entities/`: Core domain models (Script, CallSession, DeliveryTask, CallEvent)
//!   - `value_objects/`: Immutable value types (CallStatus, ValidationRule, Instruction)
//!   - `services/`: The call-flow state machine
//!   - `errors/`: Domain-specific error types
//!
//! - **Ports** (`ports/`): Abstract interfaces (traits)
//!   - `repositories/`: Durable storage interfaces
//!   - `services/`: Telephony provider, delivery transport, live event publisher
//!
//! # Usage
//!
//! ```rust,ignore
//! use callflow::domain::{CallFlow, CallSession, Script};
//! use callflow::ports::{CallSessionRepository, DeliveryTaskRepository};
//! ```

pub mod domain;
pub mod ports;

// Re-export commonly used types
pub use domain::{
    backoff_delay, CallEvent, CallEventKind, CallFlow, CallSession, CallStatus, CollectedInput,
    DeliveryStatus, DeliveryTask, DomainError, FlowMessages, FlowSettings, Instruction,
    InvalidPrompt, ProviderStatus, Script, ScriptFlow, ScriptStep, Transition, ValidationRule,
    WebhookUrls, DEFAULT_LANGUAGE, DEFAULT_MAX_RETRIES, DEFAULT_VOICE,
};
pub use ports::{
    // Repositories
    CallSessionRepository,
    CallStats,
    // Services
    DeliveryOutcome,
    DeliveryTaskRepository,
    DeliveryTransport,
    EventPublisher,
    NoopPublisher,
    OutboundCall,
    ScriptRepository,
    TelephonyProvider,
};
