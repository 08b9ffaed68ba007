#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::items_after_statements
    )
)]

//! Stock Quote Relay - Intraday Quote Poller
//!
//! A long-running service that polls Alpha Vantage for intraday bars of a
//! fixed ticker list and publishes the newest bar of each ticker as a JSON
//! record to a Kafka topic, then sleeps and repeats until interrupted.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: Quote types and normalization
//!   - `quote`: tickers, raw bars, `QuoteRecord`, `normalize`
//!
//! - **Application**: Ports and the relay loop
//!   - `ports`: quote source and publisher interfaces, in-memory adapters
//!   - `services`: `RelayService` driver, shared `RelayStatus`
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `alpha_vantage`: `TIME_SERIES_INTRADAY` HTTP client
//!   - `kafka`: rdkafka producer
//!   - `config`: CLI parsing and validation
//!   - `health`, `metrics`, `telemetry`: operational surface
//!
//! # Data Flow
//!
//! ```text
//!                  ┌──────────────┐   RawBars   ┌────────────┐  QuoteRecord  ┌─────────────┐
//! Alpha Vantage ──►│ Quote Source │────────────►│ normalize  │──────────────►│  Publisher  │──► Kafka topic
//!    (HTTPS)       └──────────────┘             └────────────┘   JSON bytes  └─────────────┘
//!                          ▲                                                        │
//!                          └──────────── RelayService: per ticker, then sleep ◄─────┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Quote types with no I/O.
pub mod domain;

/// Application layer - Ports and services.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::quote::{
    BarValue, NormalizeError, QuoteRecord, RawBar, RawBars, Ticker, TickerError, epoch_seconds,
    normalize,
};

// Ports and in-memory adapters (for integration tests)
pub use application::ports::{
    InMemoryQuotePublisher, PublishError, PublishedMessage, QuotePublisherPort, QuoteSourceError,
    QuoteSourcePort, StaticQuoteSource,
};

// Relay service
pub use application::services::{
    CycleReport, ErrorPolicy, RelayError, RelayService, RelaySettings, RelayStatus,
    RelayStatusSnapshot, RunOutcome, TickerStatus,
};

// Infrastructure config
pub use infrastructure::config::{
    Cli, ConfigError, Credentials, DriverSettings, KafkaSettings, ProviderSettings, RelayConfig,
    ServerSettings,
};

// Adapters
pub use infrastructure::alpha_vantage::{AlphaVantageClient, AlphaVantageError, BarInterval, OutputSize};
pub use infrastructure::kafka::KafkaQuotePublisher;

// Health server
pub use infrastructure::health::{HealthServer, HealthServerError, HealthServerState};

// Metrics
pub use infrastructure::metrics::init_metrics;

// Telemetry
pub use infrastructure::telemetry::{TelemetryConfig, TelemetryGuard, init as init_telemetry};
