//! Application Layer - Use cases and port definitions.
//!
//! Holds the relay loop and the port interfaces it drives.

/// Port interfaces for the market data source and the broker.
pub mod ports;

/// Relay loop and status tracking.
pub mod services;
