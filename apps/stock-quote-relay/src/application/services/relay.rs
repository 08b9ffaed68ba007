//! Relay Service
//!
//! The polling loop: for every configured ticker, fetch intraday bars,
//! normalize the newest one, and publish it; then sleep and repeat until the
//! cancellation token fires.
//!
//! # States
//!
//! ```text
//! RUNNING ──(cycle + sleep)──► RUNNING
//!    │
//!    └──(cancelled)──► TERMINATED (RunOutcome::Interrupted)
//! ```
//!
//! Pipeline failures either end the run (`ErrorPolicy::FailFast`) or are
//! logged and skipped (`ErrorPolicy::Isolate`).

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use super::status::RelayStatus;
use crate::application::ports::{
    PublishError, QuotePublisherPort, QuoteSourceError, QuoteSourcePort,
};
use crate::domain::quote::{NormalizeError, Ticker, normalize};
use crate::infrastructure::metrics;

// =============================================================================
// Error Policy
// =============================================================================

/// What to do when one ticker's pipeline fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// Stop the relay on the first failure.
    #[default]
    FailFast,
    /// Log the failure and continue with the next ticker.
    Isolate,
}

impl ErrorPolicy {
    /// Get the policy name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::FailFast => "fail-fast",
            Self::Isolate => "isolate",
        }
    }
}

impl fmt::Display for ErrorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ErrorPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fail-fast" | "failfast" | "fail_fast" => Ok(Self::FailFast),
            "isolate" | "continue" => Ok(Self::Isolate),
            other => Err(format!(
                "unknown error policy {other:?} (expected fail-fast or isolate)"
            )),
        }
    }
}

// =============================================================================
// Errors
// =============================================================================

/// A failure in one ticker's fetch → normalize → publish pipeline.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Fetching bars failed.
    #[error("fetch failed for {ticker}: {source}")]
    Fetch {
        /// Affected ticker.
        ticker: Ticker,
        /// Underlying error.
        #[source]
        source: QuoteSourceError,
    },

    /// The bar table could not be normalized.
    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    /// Publishing the record failed.
    #[error("publish failed for {ticker}: {source}")]
    Publish {
        /// Affected ticker.
        ticker: Ticker,
        /// Underlying error.
        #[source]
        source: PublishError,
    },
}

impl RelayError {
    /// Pipeline stage that failed.
    #[must_use]
    pub const fn stage(&self) -> &'static str {
        match self {
            Self::Fetch { .. } => "fetch",
            Self::Normalize(_) => "normalize",
            Self::Publish { .. } => "publish",
        }
    }

    /// Ticker the failure belongs to.
    #[must_use]
    pub fn ticker(&self) -> &Ticker {
        match self {
            Self::Fetch { ticker, .. } | Self::Publish { ticker, .. } => ticker,
            Self::Normalize(NormalizeError::NoBars(ticker)) => ticker,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Fetch { source, .. } => source.kind(),
            Self::Normalize(_) => "no_bars",
            Self::Publish { source, .. } => match source {
                PublishError::Serialization(_) => "serialization",
                PublishError::Enqueue { .. } => "enqueue",
                PublishError::Client { .. } => "client",
            },
        }
    }
}

// =============================================================================
// Settings and Outcomes
// =============================================================================

/// Relay loop settings.
#[derive(Debug, Clone)]
pub struct RelaySettings {
    /// Tickers polled every cycle, in order.
    pub tickers: Vec<Ticker>,
    /// Destination topic.
    pub topic: String,
    /// Sleep between cycles.
    pub interval: Duration,
    /// Failure handling.
    pub error_policy: ErrorPolicy,
}

/// How a run ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The cancellation token fired.
    Interrupted,
}

/// Result of one pass over the ticker list.
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    /// Records handed to the publisher.
    pub published: usize,
    /// Tickers skipped under `ErrorPolicy::Isolate`, with the error message.
    pub failed: Vec<(Ticker, String)>,
    /// Cancellation fired before the cycle finished.
    pub interrupted: bool,
}

enum TickerOutcome {
    Published,
    Interrupted,
}

// =============================================================================
// Relay Service
// =============================================================================

/// Drives the fetch → normalize → publish loop.
pub struct RelayService {
    source: Arc<dyn QuoteSourcePort>,
    publisher: Arc<dyn QuotePublisherPort>,
    settings: RelaySettings,
    status: Arc<RelayStatus>,
    cancel: CancellationToken,
}

impl fmt::Debug for RelayService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayService")
            .field("settings", &self.settings)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl RelayService {
    /// Create a new relay service.
    #[must_use]
    pub fn new(
        source: Arc<dyn QuoteSourcePort>,
        publisher: Arc<dyn QuotePublisherPort>,
        settings: RelaySettings,
        cancel: CancellationToken,
    ) -> Self {
        let status = Arc::new(RelayStatus::new(&settings.tickers));
        Self {
            source,
            publisher,
            settings,
            status,
            cancel,
        }
    }

    /// Shared status, for the health endpoint.
    #[must_use]
    pub fn status(&self) -> Arc<RelayStatus> {
        Arc::clone(&self.status)
    }

    /// Run cycles until cancelled.
    ///
    /// # Errors
    ///
    /// Under `ErrorPolicy::FailFast`, returns the first pipeline failure.
    pub async fn run(&self) -> Result<RunOutcome, RelayError> {
        tracing::info!(
            tickers = ?self.tickers_display(),
            topic = %self.settings.topic,
            interval_secs = self.settings.interval.as_secs(),
            error_policy = %self.settings.error_policy,
            "Relay started"
        );

        loop {
            if self.cancel.is_cancelled() {
                return Ok(RunOutcome::Interrupted);
            }

            let report = self.run_cycle().await?;
            if report.interrupted {
                return Ok(RunOutcome::Interrupted);
            }

            tracing::info!(
                interval_secs = self.settings.interval.as_secs(),
                "Going to sleep until next cycle"
            );

            tokio::select! {
                () = self.cancel.cancelled() => return Ok(RunOutcome::Interrupted),
                () = tokio::time::sleep(self.settings.interval) => {}
            }
        }
    }

    /// Run a single pass over the ticker list.
    ///
    /// # Errors
    ///
    /// Under `ErrorPolicy::FailFast`, returns the first pipeline failure.
    pub async fn run_cycle(&self) -> Result<CycleReport, RelayError> {
        let cycle_id = Uuid::new_v4();
        let span = tracing::info_span!("cycle", %cycle_id);
        self.run_cycle_inner().instrument(span).await
    }

    async fn run_cycle_inner(&self) -> Result<CycleReport, RelayError> {
        let started = Instant::now();
        let mut report = CycleReport::default();

        tracing::info!("Retrieving stock information");

        for ticker in &self.settings.tickers {
            if self.cancel.is_cancelled() {
                report.interrupted = true;
                return Ok(report);
            }

            let span = tracing::info_span!("ticker", %ticker);
            match self.relay_ticker(ticker).instrument(span).await {
                Ok(TickerOutcome::Published) => report.published += 1,
                Ok(TickerOutcome::Interrupted) => {
                    report.interrupted = true;
                    return Ok(report);
                }
                Err(e) => {
                    metrics::record_pipeline_error(e.stage(), e.kind());
                    self.status.record_error(e.ticker(), e.to_string());

                    match self.settings.error_policy {
                        ErrorPolicy::FailFast => {
                            tracing::error!(
                                ticker = %e.ticker(),
                                stage = e.stage(),
                                error = %e,
                                "Ticker pipeline failed, stopping relay"
                            );
                            return Err(e);
                        }
                        ErrorPolicy::Isolate => {
                            tracing::warn!(
                                ticker = %e.ticker(),
                                stage = e.stage(),
                                error = %e,
                                "Ticker pipeline failed, continuing with next ticker"
                            );
                            report.failed.push((e.ticker().clone(), e.to_string()));
                        }
                    }
                }
            }
        }

        self.status.record_cycle_completed();
        metrics::record_cycle(started.elapsed());
        tracing::info!(
            published = report.published,
            failed = report.failed.len(),
            elapsed_ms = started.elapsed().as_millis(),
            "Cycle complete"
        );

        Ok(report)
    }

    async fn relay_ticker(&self, ticker: &Ticker) -> Result<TickerOutcome, RelayError> {
        let bars = tokio::select! {
            () = self.cancel.cancelled() => return Ok(TickerOutcome::Interrupted),
            result = self.source.fetch_intraday(ticker) => result.map_err(|source| {
                RelayError::Fetch {
                    ticker: ticker.clone(),
                    source,
                }
            })?,
        };

        tracing::info!(bars = bars.len(), "Data fetched for ticker");
        metrics::record_bars_fetched(ticker.as_str(), bars.len());

        let record = normalize(ticker, bars)?;

        self.publisher
            .publish(&self.settings.topic, &record)
            .await
            .map_err(|source| RelayError::Publish {
                ticker: ticker.clone(),
                source,
            })?;

        tracing::debug!(timestamp = record.timestamp, "Record enqueued");
        metrics::record_published(ticker.as_str());
        self.status.record_published(&record);

        Ok(TickerOutcome::Published)
    }

    fn tickers_display(&self) -> Vec<&str> {
        self.settings.tickers.iter().map(Ticker::as_str).collect()
    }
}
