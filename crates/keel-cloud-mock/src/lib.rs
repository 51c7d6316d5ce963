//! Test doubles for Keel
//!
//! [`MemoryBackend`] stands in for a cloud API; [`MockProvider`] manages
//! storage buckets whose operations fail on demand through [`MockOptions`].

pub mod bucket;
pub mod memory;
pub mod options;
pub mod provider;

pub use bucket::MockBucket;
pub use memory::{DEFAULT_PAGE_SIZE, MemoryBackend, Operation};
pub use options::MockOptions;
pub use provider::MockProvider;
