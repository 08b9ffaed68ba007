//! Alpha Vantage Response Types
//!
//! Wire format of `TIME_SERIES_INTRADAY`:
//!
//! ```json
//! {
//!   "Meta Data": {"2. Symbol": "MSFT", "3. Last Refreshed": "2024-01-02 19:59:00", ...},
//!   "Time Series (1min)": {
//!     "2024-01-02 19:59:00": {"1. open": "370.6", "2. high": "370.7",
//!                             "3. low": "370.5", "4. close": "370.6", "5. volume": "2187"},
//!     ...
//!   }
//! }
//! ```
//!
//! Failures come back with HTTP 200 and one of `"Error Message"`, `"Note"` or
//! `"Information"` instead of the series.

use chrono::{DateTime, NaiveDateTime, Utc};
use indexmap::IndexMap;
use serde::Deserialize;

use crate::application::ports::QuoteSourceError;
use crate::domain::quote::{BarValue, RawBar, RawBars};

/// Datetime format of series keys.
const BAR_KEY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Response metadata block.
#[derive(Debug, Clone, Deserialize)]
pub struct MetaData {
    /// Echoed symbol.
    #[serde(rename = "2. Symbol")]
    pub symbol: Option<String>,
    /// Time of the newest bar.
    #[serde(rename = "3. Last Refreshed")]
    pub last_refreshed: Option<String>,
    /// Time zone of the series keys.
    #[serde(rename = "6. Time Zone")]
    pub time_zone: Option<String>,
}

/// One bar as keyed by the provider.
#[derive(Debug, Clone, Deserialize)]
pub struct AlphaVantageBar {
    /// Open price.
    #[serde(rename = "1. open")]
    pub open: BarValue,
    /// High price.
    #[serde(rename = "2. high")]
    pub high: BarValue,
    /// Low price.
    #[serde(rename = "3. low")]
    pub low: BarValue,
    /// Close price.
    #[serde(rename = "4. close")]
    pub close: BarValue,
    /// Volume.
    #[serde(rename = "5. volume")]
    pub volume: BarValue,
}

/// `TIME_SERIES_INTRADAY` body.
#[derive(Debug, Clone, Deserialize)]
pub struct IntradayResponse {
    /// Metadata, absent on errors.
    #[serde(rename = "Meta Data")]
    pub meta_data: Option<MetaData>,

    /// Bars keyed by datetime, in provider order.
    #[serde(
        rename = "Time Series (1min)",
        alias = "Time Series (5min)",
        alias = "Time Series (15min)",
        alias = "Time Series (30min)",
        alias = "Time Series (60min)"
    )]
    pub time_series: Option<IndexMap<String, AlphaVantageBar>>,

    /// Invalid call (bad key, unknown symbol).
    #[serde(rename = "Error Message")]
    pub error_message: Option<String>,

    /// Throttling notice.
    #[serde(rename = "Note")]
    pub note: Option<String>,

    /// Informational notice (rate limits, premium endpoints).
    #[serde(rename = "Information")]
    pub information: Option<String>,
}

impl IntradayResponse {
    /// Convert into raw bars, surfacing provider-reported errors.
    ///
    /// # Errors
    ///
    /// Returns `QuoteSourceError` if the body carries an error notice, lacks
    /// the series section, or has an unparseable bar key.
    pub fn into_bars(self, series_key: &str) -> Result<RawBars, QuoteSourceError> {
        if let Some(message) = self.error_message {
            return Err(QuoteSourceError::Api { message });
        }
        if let Some(message) = self.note {
            return Err(QuoteSourceError::RateLimited { message });
        }
        if let Some(message) = self.information {
            let lowered = message.to_lowercase();
            return Err(
                if lowered.contains("rate limit") || lowered.contains("call frequency") {
                    QuoteSourceError::RateLimited { message }
                } else {
                    QuoteSourceError::Api { message }
                },
            );
        }

        let series = self
            .time_series
            .ok_or_else(|| QuoteSourceError::MissingSeries {
                key: series_key.to_string(),
            })?;

        series
            .into_iter()
            .map(|(key, bar)| {
                Ok(RawBar {
                    datetime: parse_bar_key(&key)?,
                    open: bar.open,
                    high: bar.high,
                    low: bar.low,
                    close: bar.close,
                    volume: bar.volume,
                })
            })
            .collect()
    }
}

/// Parse a series key into a UTC datetime.
///
/// Keys carry no offset; they are read as UTC wall-clock time. RFC 3339 keys
/// are accepted as well.
///
/// # Errors
///
/// Returns `QuoteSourceError::InvalidTimestamp` if neither format matches.
pub fn parse_bar_key(key: &str) -> Result<DateTime<Utc>, QuoteSourceError> {
    NaiveDateTime::parse_from_str(key, BAR_KEY_FORMAT)
        .map(|naive| naive.and_utc())
        .or_else(|_| DateTime::parse_from_rfc3339(key).map(|dt| dt.with_timezone(&Utc)))
        .map_err(|_| QuoteSourceError::InvalidTimestamp {
            value: key.to_string(),
        })
}
