//! # Application Module
//!
//! Services orchestrating the domain, the algorithms and the outbound ports.

pub mod federated_reader;
pub mod hydrator;
pub mod service;

pub use federated_reader::{FanOut, FederatedIndexReader};
pub use hydrator::NotificationHydrator;
pub use service::FederatedFeedService;
