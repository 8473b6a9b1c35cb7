//! Domain layer for the taskmend execution-and-repair engine
//!
//! Pure data model, error taxonomy and the port traits for every external
//! collaborator the engine talks to.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{AgentCallError, DomainError, DomainResult, PlanError};
