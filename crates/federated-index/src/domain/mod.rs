//! # Domain Module
//!
//! Core types for the federated index: entries, typed index values,
//! enriched results, errors and invariants. No I/O.

pub mod entities;
pub mod errors;
pub mod invariants;
pub mod value_objects;

pub use entities::*;
pub use errors::*;
pub use invariants::*;
pub use value_objects::*;
