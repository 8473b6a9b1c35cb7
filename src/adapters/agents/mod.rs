//! `AgentCall` implementations.

pub mod process;
pub mod scripted;

pub use process::ProcessAgent;
pub use scripted::{ScriptedAgent, ScriptedResponse};
