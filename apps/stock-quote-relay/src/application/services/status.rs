//! Relay Status
//!
//! Shared, lock-protected view of what the relay has done so far. Written by
//! the relay loop, read by the health endpoint.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::Serialize;

use crate::domain::quote::{QuoteRecord, Ticker};

/// Per-ticker counters and last observations.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TickerStatus {
    /// Records published for this ticker.
    pub published: u64,
    /// Pipeline failures for this ticker.
    pub errors: u64,
    /// When the last record was handed to the broker.
    pub last_published_at: Option<DateTime<Utc>>,
    /// Bar timestamp (epoch seconds) of the last published record.
    pub last_bar_timestamp: Option<i64>,
    /// Most recent error message.
    pub last_error: Option<String>,
}

/// Serializable snapshot of `RelayStatus`.
#[derive(Debug, Clone, Serialize)]
pub struct RelayStatusSnapshot {
    /// Seconds since the status was created.
    pub uptime_secs: u64,
    /// Completed cycles.
    pub cycles_completed: u64,
    /// End time of the most recent cycle.
    pub last_cycle_at: Option<DateTime<Utc>>,
    /// Per-ticker status, in configured order.
    pub tickers: IndexMap<String, TickerStatus>,
}

/// Live relay status.
#[derive(Debug)]
pub struct RelayStatus {
    started_at: Instant,
    cycles_completed: AtomicU64,
    last_cycle_at: RwLock<Option<DateTime<Utc>>>,
    tickers: RwLock<IndexMap<String, TickerStatus>>,
}

impl RelayStatus {
    /// Create status tracking for the given tickers.
    #[must_use]
    pub fn new(tickers: &[Ticker]) -> Self {
        let tickers = tickers
            .iter()
            .map(|t| (t.as_str().to_string(), TickerStatus::default()))
            .collect();
        Self {
            started_at: Instant::now(),
            cycles_completed: AtomicU64::new(0),
            last_cycle_at: RwLock::new(None),
            tickers: RwLock::new(tickers),
        }
    }

    /// Record a successful publish.
    pub fn record_published(&self, record: &QuoteRecord) {
        let mut tickers = self.tickers.write();
        let entry = tickers
            .entry(record.ticker.as_str().to_string())
            .or_default();
        entry.published += 1;
        entry.last_published_at = Some(Utc::now());
        entry.last_bar_timestamp = Some(record.timestamp);
        entry.last_error = None;
    }

    /// Record a pipeline failure for `ticker`.
    pub fn record_error(&self, ticker: &Ticker, message: String) {
        let mut tickers = self.tickers.write();
        let entry = tickers.entry(ticker.as_str().to_string()).or_default();
        entry.errors += 1;
        entry.last_error = Some(message);
    }

    /// Record the end of a cycle.
    pub fn record_cycle_completed(&self) {
        self.cycles_completed.fetch_add(1, Ordering::Relaxed);
        *self.last_cycle_at.write() = Some(Utc::now());
    }

    /// Completed cycles.
    #[must_use]
    pub fn cycles_completed(&self) -> u64 {
        self.cycles_completed.load(Ordering::Relaxed)
    }

    /// Take a serializable snapshot.
    #[must_use]
    pub fn snapshot(&self) -> RelayStatusSnapshot {
        RelayStatusSnapshot {
            uptime_secs: self.started_at.elapsed().as_secs(),
            cycles_completed: self.cycles_completed(),
            last_cycle_at: *self.last_cycle_at.read(),
            tickers: self.tickers.read().clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::quote::BarValue;

    fn record(symbol: &str, timestamp: i64) -> QuoteRecord {
        QuoteRecord {
            ticker: Ticker::parse(symbol).unwrap(),
            timestamp,
            open: BarValue::from("1.0"),
            high: BarValue::from("1.0"),
            low: BarValue::from("1.0"),
            close: BarValue::from("1.0"),
            volume: BarValue::from(10),
        }
    }

    #[test]
    fn snapshot_keeps_configured_order() {
        let tickers = ["CTSH", "MSFT", "GOOGL"].map(|s| Ticker::parse(s).unwrap());
        let status = RelayStatus::new(&tickers);

        let keys: Vec<String> = status.snapshot().tickers.keys().cloned().collect();
        assert_eq!(keys, vec!["CTSH", "MSFT", "GOOGL"]);
    }

    #[test]
    fn publish_clears_last_error() {
        let msft = Ticker::parse("MSFT").unwrap();
        let status = RelayStatus::new(std::slice::from_ref(&msft));

        status.record_error(&msft, "boom".to_string());
        status.record_published(&record("MSFT", 42));

        let snapshot = status.snapshot();
        let entry = &snapshot.tickers["MSFT"];
        assert_eq!(entry.errors, 1);
        assert_eq!(entry.published, 1);
        assert_eq!(entry.last_bar_timestamp, Some(42));
        assert!(entry.last_error.is_none());
    }

    #[test]
    fn cycles_are_counted() {
        let status = RelayStatus::new(&[]);
        assert!(status.snapshot().last_cycle_at.is_none());

        status.record_cycle_completed();
        status.record_cycle_completed();

        assert_eq!(status.cycles_completed(), 2);
        assert!(status.snapshot().last_cycle_at.is_some());
    }
}
