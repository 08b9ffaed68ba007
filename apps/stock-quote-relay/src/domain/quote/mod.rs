//! Quote Records
//!
//! Domain types for intraday bars and the flat quote record published to the
//! broker, plus the normalization step between them.
//!
//! # Wire Shape
//!
//! ```json
//! {"ticker":"MSFT","timestamp":1704067200,"open":"10.0","high":"11.0",
//!  "low":"9.5","close":"10.5","volume":"1000"}
//! ```
//!
//! Price and volume values are carried verbatim: whatever JSON scalar the
//! provider sent is what goes out.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Ticker
// =============================================================================

/// Equity symbol, normalized to upper case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ticker(String);

impl Ticker {
    /// Parse a ticker, trimming whitespace and upper-casing it.
    ///
    /// # Errors
    ///
    /// Returns `TickerError` if the symbol is empty or contains characters
    /// outside `A-Z`, `0-9`, `.` and `-`.
    pub fn parse(raw: &str) -> Result<Self, TickerError> {
        let symbol = raw.trim().to_uppercase();
        if symbol.is_empty() {
            return Err(TickerError::Empty);
        }
        if let Some(c) = symbol
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '.' || *c == '-'))
        {
            return Err(TickerError::InvalidCharacter { symbol, found: c });
        }
        Ok(Self(symbol))
    }

    /// Get the symbol as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Invalid ticker symbol.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TickerError {
    /// Symbol was empty after trimming.
    #[error("ticker symbol cannot be empty")]
    Empty,
    /// Symbol contains an unsupported character.
    #[error("ticker symbol {symbol:?} contains invalid character {found:?}")]
    InvalidCharacter {
        /// The offending symbol.
        symbol: String,
        /// First invalid character.
        found: char,
    },
}

// =============================================================================
// Raw Bars
// =============================================================================

/// A scalar bar value exactly as the provider sent it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BarValue {
    /// Textual value, e.g. `"10.0"`.
    Text(String),
    /// Numeric value.
    Number(serde_json::Number),
}

impl From<&str> for BarValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<i64> for BarValue {
    fn from(value: i64) -> Self {
        Self::Number(value.into())
    }
}

/// One intraday OHLCV bar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawBar {
    /// Bar start time.
    pub datetime: DateTime<Utc>,
    /// Open price.
    pub open: BarValue,
    /// High price.
    pub high: BarValue,
    /// Low price.
    pub low: BarValue,
    /// Close price.
    pub close: BarValue,
    /// Traded volume.
    pub volume: BarValue,
}

/// Bars for a single ticker in provider order (newest first).
pub type RawBars = Vec<RawBar>;

// =============================================================================
// Quote Record
// =============================================================================

/// The flat record published for one ticker per cycle.
///
/// Field declaration order is the serialized order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteRecord {
    /// Equity symbol.
    pub ticker: Ticker,
    /// Whole seconds since the Unix epoch.
    pub timestamp: i64,
    /// Open price.
    pub open: BarValue,
    /// High price.
    pub high: BarValue,
    /// Low price.
    pub low: BarValue,
    /// Close price.
    pub close: BarValue,
    /// Traded volume.
    pub volume: BarValue,
}

impl QuoteRecord {
    /// Field names in wire order.
    pub const FIELDS: [&'static str; 7] =
        ["ticker", "timestamp", "open", "high", "low", "close", "volume"];

    /// Serialize to UTF-8 JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

/// Normalization failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NormalizeError {
    /// The provider returned no bars for the ticker.
    #[error("no bars returned for {0}")]
    NoBars(Ticker),
}

/// Reduce a bar table to the record for its newest bar.
///
/// Only the first row is kept; older bars are dropped.
///
/// # Errors
///
/// Returns `NormalizeError::NoBars` if `bars` is empty.
pub fn normalize(ticker: &Ticker, bars: RawBars) -> Result<QuoteRecord, NormalizeError> {
    let bar = bars
        .into_iter()
        .next()
        .ok_or_else(|| NormalizeError::NoBars(ticker.clone()))?;

    Ok(QuoteRecord {
        ticker: ticker.clone(),
        timestamp: epoch_seconds(&bar.datetime),
        open: bar.open,
        high: bar.high,
        low: bar.low,
        close: bar.close,
        volume: bar.volume,
    })
}

/// Whole seconds elapsed since 1970-01-01T00:00:00Z, rounded toward negative
/// infinity.
#[must_use]
pub fn epoch_seconds(datetime: &DateTime<Utc>) -> i64 {
    datetime.timestamp()
}

// =============================================================================
// Tests
// =============================================================================
