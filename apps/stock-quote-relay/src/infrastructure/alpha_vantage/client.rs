//! HTTP client for the `TIME_SERIES_INTRADAY` endpoint.

use async_trait::async_trait;
use reqwest::Client;

use super::params::{BarInterval, OutputSize};
use super::response::IntradayResponse;
use crate::application::ports::{QuoteSourceError, QuoteSourcePort};
use crate::domain::quote::{RawBars, Ticker};
use crate::infrastructure::config::{Credentials, ProviderSettings};

/// Longest response body excerpt carried in a status error.
const MAX_ERROR_BODY: usize = 512;

/// Errors building the client.
#[derive(Debug, thiserror::Error)]
pub enum AlphaVantageError {
    /// API key is empty.
    #[error("Alpha Vantage API key is empty")]
    MissingApiKey,

    /// HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(String),
}

/// Alpha Vantage intraday quote source.
///
/// One `reqwest::Client` is built up front and reused for every request.
#[derive(Clone)]
pub struct AlphaVantageClient {
    client: Client,
    base_url: String,
    api_key: String,
    bar_interval: BarInterval,
    output_size: OutputSize,
}

impl std::fmt::Debug for AlphaVantageClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlphaVantageClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .field("bar_interval", &self.bar_interval)
            .field("output_size", &self.output_size)
            .finish_non_exhaustive()
    }
}

impl AlphaVantageClient {
    /// Create a client from provider settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is empty or the HTTP client cannot be
    /// built.
    pub fn new(
        settings: &ProviderSettings,
        credentials: &Credentials,
    ) -> Result<Self, AlphaVantageError> {
        if credentials.api_key().is_empty() {
            return Err(AlphaVantageError::MissingApiKey);
        }

        let client = Client::builder()
            .timeout(settings.request_timeout)
            .user_agent(concat!("stock-quote-relay/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AlphaVantageError::ClientBuild(e.to_string()))?;

        Ok(Self {
            client,
            base_url: settings.base_url.clone(),
            api_key: credentials.api_key().to_string(),
            bar_interval: settings.bar_interval,
            output_size: settings.output_size,
        })
    }

    /// Fetch and decode the intraday response for `ticker`.
    ///
    /// # Errors
    ///
    /// Returns `QuoteSourceError` on transport failure, non-success status,
    /// or an undecodable body.
    pub async fn fetch_response(&self, ticker: &Ticker) -> Result<IntradayResponse, QuoteSourceError> {
        let query = [
            ("function", "TIME_SERIES_INTRADAY"),
            ("symbol", ticker.as_str()),
            ("interval", self.bar_interval.as_str()),
            ("outputsize", self.output_size.as_str()),
            ("apikey", self.api_key.as_str()),
        ];

        let response = self
            .client
            .get(&self.base_url)
            .query(&query)
            .send()
            .await
            .map_err(network_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(QuoteSourceError::Status {
                status: status.as_u16(),
                body: truncate(&body, MAX_ERROR_BODY),
            });
        }

        let bytes = response.bytes().await.map_err(network_error)?;
        serde_json::from_slice(&bytes).map_err(|e| QuoteSourceError::Decode {
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl QuoteSourcePort for AlphaVantageClient {
    async fn fetch_intraday(&self, ticker: &Ticker) -> Result<RawBars, QuoteSourceError> {
        tracing::debug!(%ticker, interval = %self.bar_interval, "Requesting intraday series");

        let response = self.fetch_response(ticker).await?;
        if let Some(meta) = &response.meta_data {
            tracing::trace!(
                symbol = meta.symbol.as_deref(),
                last_refreshed = meta.last_refreshed.as_deref(),
                time_zone = meta.time_zone.as_deref(),
                "Intraday metadata"
            );
        }

        response.into_bars(&self.bar_interval.series_key())
    }
}

/// Strip the request URL (it carries the API key) before reporting.
fn network_error(e: reqwest::Error) -> QuoteSourceError {
    QuoteSourceError::Network {
        message: e.without_url().to_string(),
    }
}

fn truncate(body: &str, max: usize) -> String {
    if body.len() <= max {
        return body.to_string();
    }
    let mut end = max;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn settings() -> ProviderSettings {
        ProviderSettings {
            base_url: "http://127.0.0.1:9/query".to_string(),
            request_timeout: Duration::from_secs(1),
            ..ProviderSettings::default()
        }
    }

    #[test]
    fn empty_api_key_is_rejected() {
        let result = AlphaVantageClient::new(&settings(), &Credentials::new(String::new()));
        assert!(matches!(result, Err(AlphaVantageError::MissingApiKey)));
    }

    #[test]
    fn debug_redacts_api_key() {
        let client =
            AlphaVantageClient::new(&settings(), &Credentials::new("hunter2".to_string())).unwrap();
        let debug = format!("{client:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdef", 3), "abc...");
        assert_eq!(truncate("ééé", 3), "é...");
    }

    #[tokio::test]
    async fn unreachable_provider_is_network_error_without_key() {
        let client =
            AlphaVantageClient::new(&settings(), &Credentials::new("hunter2".to_string())).unwrap();

        let err = client
            .fetch_intraday(&Ticker::parse("MSFT").unwrap())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "network");
        assert!(!err.to_string().contains("hunter2"));
    }
}
