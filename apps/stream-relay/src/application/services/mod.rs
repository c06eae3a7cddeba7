//! Application services.

/// Shared worker counters (single writer: the ingestion path).
pub mod counters;

/// Periodic health monitor reading the shared counters.
pub mod health;
