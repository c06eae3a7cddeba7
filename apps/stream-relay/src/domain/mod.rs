//! Domain layer.
//!
//! Core types for the relay with no I/O dependencies:
//! normalized stream messages and the symbol watchlist.

/// Normalized market data messages published to the broker.
pub mod streaming;

/// Symbol watchlist (fixed for the process lifetime).
pub mod watchlist;
