//! Domain Layer - Quote types and normalization.
//!
//! Pure types with no I/O. Serialization support only.

/// Tickers, raw bars, quote records, and the normalizer.
pub mod quote;
