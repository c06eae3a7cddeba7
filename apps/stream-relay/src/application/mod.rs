//! Application layer.
//!
//! Port definitions and services sitting between the domain types and
//! the infrastructure adapters.

/// Port interfaces implemented by infrastructure adapters.
pub mod ports;

/// Long-running services (shared counters, health monitoring).
pub mod services;
