//! # Adapters Layer (Hexagonal Architecture)
//!
//! In-process implementations of the outbound ports.

mod memory_store;
mod registry;

pub use memory_store::{MemoryBlobStore, MemoryStore};
pub use registry::StoreRegistry;
