//! In-memory caching layer for executor results.
//!
//! Uses `moka` for TTL-based concurrent caching.

pub mod in_memory;

pub use in_memory::InMemorySessionCache;
