//! Port trait definitions (Hexagonal Architecture)
//!
//! - AgentCall: the external capability that performs a task
//! - MemoryStore: append-only lesson persistence
//! - SessionCache: injected result cache with expiry

pub mod agent;
pub mod cache;
pub mod memory;
pub mod null_memory;

pub use agent::{AgentCall, AgentReply, AgentRequest};
pub use cache::SessionCache;
pub use memory::MemoryStore;
pub use null_memory::NullMemoryStore;
