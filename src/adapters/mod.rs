//! Concrete implementations of the domain ports.

pub mod agents;
pub mod cache;
pub mod memory;
