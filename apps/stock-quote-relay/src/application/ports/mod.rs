//! Port Interfaces
//!
//! Contracts between the relay service and the outside world.
//!
//! ## Driven Ports (Outbound)
//!
//! - `QuoteSourcePort`: intraday bars from a market data provider
//! - `QuotePublisherPort`: record delivery to a message broker
//!
//! In-memory implementations live here too so tests and local runs can wire
//! the service without network access.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::domain::quote::{QuoteRecord, RawBars, Ticker};

// =============================================================================
// Quote Source Port
// =============================================================================

/// Errors returned by a quote source.
#[derive(Debug, thiserror::Error)]
pub enum QuoteSourceError {
    /// Transport failure (DNS, connect, timeout, TLS).
    #[error("provider request failed: {message}")]
    Network {
        /// Underlying error description.
        message: String,
    },

    /// Provider answered with a non-success HTTP status.
    #[error("provider returned HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, if any.
        body: String,
    },

    /// Provider rejected the call (bad key, unknown symbol).
    #[error("provider error: {message}")]
    Api {
        /// Provider error message.
        message: String,
    },

    /// Provider throttled the call.
    #[error("provider rate limit: {message}")]
    RateLimited {
        /// Provider notice.
        message: String,
    },

    /// Response body could not be decoded.
    #[error("failed to decode provider response: {message}")]
    Decode {
        /// Decoder error description.
        message: String,
    },

    /// Response had no time series section.
    #[error("provider response has no \"{key}\" section")]
    MissingSeries {
        /// Expected section key.
        key: String,
    },

    /// A bar key was not a valid datetime.
    #[error("invalid bar timestamp {value:?}")]
    InvalidTimestamp {
        /// The raw key.
        value: String,
    },
}

impl QuoteSourceError {
    /// Short label used for metrics and logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Network { .. } => "network",
            Self::Status { .. } => "status",
            Self::Api { .. } => "api",
            Self::RateLimited { .. } => "rate_limited",
            Self::Decode { .. } => "decode",
            Self::MissingSeries { .. } => "missing_series",
            Self::InvalidTimestamp { .. } => "invalid_timestamp",
        }
    }
}

/// Port for fetching recent intraday bars.
#[async_trait]
pub trait QuoteSourcePort: Send + Sync {
    /// Fetch the recent bars for `ticker`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `QuoteSourceError` if the provider cannot be reached or its
    /// answer cannot be used.
    async fn fetch_intraday(&self, ticker: &Ticker) -> Result<RawBars, QuoteSourceError>;
}

/// Quote source serving canned bars, for tests and dry runs.
#[derive(Debug, Default)]
pub struct StaticQuoteSource {
    bars: HashMap<Ticker, RawBars>,
}

impl StaticQuoteSource {
    /// Create an empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `bars` for `ticker`.
    #[must_use]
    pub fn with_bars(mut self, ticker: Ticker, bars: RawBars) -> Self {
        self.bars.insert(ticker, bars);
        self
    }
}

#[async_trait]
impl QuoteSourcePort for StaticQuoteSource {
    async fn fetch_intraday(&self, ticker: &Ticker) -> Result<RawBars, QuoteSourceError> {
        self.bars
            .get(ticker)
            .cloned()
            .ok_or_else(|| QuoteSourceError::Api {
                message: format!("Invalid API call for symbol {ticker}"),
            })
    }
}

// =============================================================================
// Quote Publisher Port
// =============================================================================

/// Errors returned by a quote publisher.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    /// Record could not be serialized.
    #[error("failed to serialize record: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Broker client refused to enqueue the message.
    #[error("failed to enqueue message on {topic}: {message}")]
    Enqueue {
        /// Destination topic.
        topic: String,
        /// Client error description.
        message: String,
    },

    /// Broker client could not be created or flushed.
    #[error("broker client error: {message}")]
    Client {
        /// Client error description.
        message: String,
    },
}

/// Port for handing records to a message broker.
///
/// `publish` only enqueues; it does not wait for broker acknowledgment.
#[async_trait]
pub trait QuotePublisherPort: Send + Sync {
    /// Enqueue `record` for delivery to `topic`.
    ///
    /// # Errors
    ///
    /// Returns `PublishError` if the record cannot be serialized or enqueued.
    async fn publish(&self, topic: &str, record: &QuoteRecord) -> Result<(), PublishError>;

    /// Wait for queued messages to be delivered, then release resources.
    ///
    /// # Errors
    ///
    /// Returns `PublishError::Client` if outstanding messages could not be
    /// flushed.
    async fn shutdown(&self) -> Result<(), PublishError> {
        Ok(())
    }
}

/// A message captured by `InMemoryQuotePublisher`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedMessage {
    /// Destination topic.
    pub topic: String,
    /// Serialized message value.
    pub payload: Vec<u8>,
}

impl PublishedMessage {
    /// Parse the payload as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is not valid JSON.
    pub fn json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::from_slice(&self.payload)
    }
}

/// Publisher that keeps messages in memory.
#[derive(Debug, Default)]
pub struct InMemoryQuotePublisher {
    messages: Mutex<Vec<PublishedMessage>>,
    shut_down: Mutex<bool>,
}

impl InMemoryQuotePublisher {
    /// Create an empty publisher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything published so far.
    #[must_use]
    pub fn messages(&self) -> Vec<PublishedMessage> {
        self.messages.lock().clone()
    }

    /// Number of messages published so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.lock().len()
    }

    /// Whether nothing has been published.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.lock().is_empty()
    }

    /// Whether `shutdown` has been called.
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        *self.shut_down.lock()
    }
}

#[async_trait]
impl QuotePublisherPort for InMemoryQuotePublisher {
    async fn publish(&self, topic: &str, record: &QuoteRecord) -> Result<(), PublishError> {
        let payload = record.to_json_bytes()?;
        self.messages.lock().push(PublishedMessage {
            topic: topic.to_string(),
            payload,
        });
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), PublishError> {
        *self.shut_down.lock() = true;
        Ok(())
    }
}
