//! Lesson stores backing the `MemoryStore` port.

pub mod in_memory;
pub mod jsonl;

pub use in_memory::InMemoryMemoryStore;
pub use jsonl::JsonlMemoryStore;
