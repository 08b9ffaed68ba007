//! Relay Configuration Settings
//!
//! Validated configuration built from the parsed command line.

use std::time::Duration;

use crate::application::services::{ErrorPolicy, RelaySettings};
use crate::domain::quote::{Ticker, TickerError};
use crate::infrastructure::alpha_vantage::{BarInterval, OutputSize};

use super::cli::Cli;

/// Alpha Vantage API credentials.
#[derive(Clone)]
pub struct Credentials {
    api_key: String,
}

impl Credentials {
    /// Create new credentials.
    #[must_use]
    pub const fn new(api_key: String) -> Self {
        Self { api_key }
    }

    /// Get the API key.
    #[must_use]
    pub fn api_key(&self) -> &str {
        &self.api_key
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

/// Quote provider settings.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    /// Query endpoint.
    pub base_url: String,
    /// Bar resolution.
    pub bar_interval: BarInterval,
    /// Compact or full history.
    pub output_size: OutputSize,
    /// HTTP request timeout.
    pub request_timeout: Duration,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            base_url: super::cli::DEFAULT_PROVIDER_URL.to_string(),
            bar_interval: BarInterval::default(),
            output_size: OutputSize::default(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Kafka producer settings.
#[derive(Debug, Clone)]
pub struct KafkaSettings {
    /// Bootstrap server list.
    pub bootstrap_servers: String,
    /// Destination topic.
    pub topic: String,
    /// Client id reported to the brokers.
    pub client_id: String,
    /// Delivery timeout per message.
    pub message_timeout: Duration,
    /// Time allowed for outstanding deliveries at shutdown.
    pub flush_timeout: Duration,
}

impl Default for KafkaSettings {
    fn default() -> Self {
        Self {
            bootstrap_servers: "localhost:9092".to_string(),
            topic: "stocks".to_string(),
            client_id: "stock-quote-relay".to_string(),
            message_timeout: Duration::from_millis(5000),
            flush_timeout: Duration::from_secs(10),
        }
    }
}

/// Polling loop settings.
#[derive(Debug, Clone)]
pub struct DriverSettings {
    /// Tickers polled each cycle, in order, without duplicates.
    pub tickers: Vec<Ticker>,
    /// Sleep between cycles.
    pub interval: Duration,
    /// Failure handling.
    pub error_policy: ErrorPolicy,
}

/// Server port settings.
#[derive(Debug, Clone, Default)]
pub struct ServerSettings {
    /// Health check HTTP port (0 = disabled).
    pub health_port: u16,
}

impl ServerSettings {
    /// Whether the health server should be started.
    #[must_use]
    pub const fn health_enabled(&self) -> bool {
        self.health_port != 0
    }
}

/// Complete relay configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// API credentials.
    pub credentials: Credentials,
    /// Quote provider settings.
    pub provider: ProviderSettings,
    /// Kafka producer settings.
    pub kafka: KafkaSettings,
    /// Polling loop settings.
    pub driver: DriverSettings,
    /// Server port settings.
    pub server: ServerSettings,
}

impl RelayConfig {
    /// Validate parsed arguments into a configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a required value is empty, a ticker is malformed,
    /// no tickers remain, or a duration is zero.
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        let api_key = cli.api_key.trim();
        if api_key.is_empty() {
            return Err(ConfigError::EmptyValue("apikey".to_string()));
        }

        let provider_url = non_empty("provider-url", &cli.provider_url)?;
        reqwest::Url::parse(&provider_url).map_err(|e| ConfigError::InvalidUrl {
            url: provider_url.clone(),
            message: e.to_string(),
        })?;

        let kafka = KafkaSettings {
            bootstrap_servers: non_empty("kafkabootstrapserver", &cli.kafka_bootstrap_servers)?,
            topic: non_empty("kafkatopic", &cli.kafka_topic)?,
            client_id: non_empty("kafka-client-id", &cli.kafka_client_id)?,
            message_timeout: non_zero(
                "kafka-message-timeout-ms",
                Duration::from_millis(cli.kafka_message_timeout_ms),
            )?,
            flush_timeout: Duration::from_secs(cli.flush_timeout_secs),
        };

        let provider = ProviderSettings {
            base_url: provider_url,
            bar_interval: cli.bar_interval,
            output_size: cli.output_size,
            request_timeout: non_zero(
                "request-timeout-secs",
                Duration::from_secs(cli.request_timeout_secs),
            )?,
        };

        let driver = DriverSettings {
            tickers: parse_tickers(&cli.tickers)?,
            interval: non_zero("interval", Duration::from_secs(cli.interval))?,
            error_policy: cli.error_policy,
        };

        Ok(Self {
            credentials: Credentials::new(api_key.to_string()),
            provider,
            kafka,
            driver,
            server: ServerSettings {
                health_port: cli.health_port,
            },
        })
    }

    /// Settings for the relay loop.
    #[must_use]
    pub fn relay_settings(&self) -> RelaySettings {
        RelaySettings {
            tickers: self.driver.tickers.clone(),
            topic: self.kafka.topic.clone(),
            interval: self.driver.interval,
            error_policy: self.driver.error_policy,
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required value is empty.
    #[error("{0} cannot be empty")]
    EmptyValue(String),

    /// A duration that must be positive is zero.
    #[error("{0} must be greater than zero")]
    ZeroDuration(String),

    /// A ticker symbol is malformed.
    #[error("invalid ticker: {0}")]
    InvalidTicker(#[from] TickerError),

    /// The ticker list is empty after trimming.
    #[error("at least one ticker is required")]
    NoTickers,

    /// The provider URL does not parse.
    #[error("invalid provider url {url}: {message}")]
    InvalidUrl {
        /// Offending URL.
        url: String,
        /// Parser message.
        message: String,
    },
}

fn non_empty(name: &str, value: &str) -> Result<String, ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::EmptyValue(name.to_string()));
    }
    Ok(trimmed.to_string())
}

fn non_zero(name: &str, value: Duration) -> Result<Duration, ConfigError> {
    if value.is_zero() {
        return Err(ConfigError::ZeroDuration(name.to_string()));
    }
    Ok(value)
}

/// Parse, normalize and deduplicate tickers, keeping first occurrences.
/// Blank entries are skipped.
fn parse_tickers(raw: &[String]) -> Result<Vec<Ticker>, ConfigError> {
    let mut tickers: Vec<Ticker> = Vec::with_capacity(raw.len());
    for entry in raw.iter().filter(|s| !s.trim().is_empty()) {
        let ticker = Ticker::parse(entry)?;
        if !tickers.contains(&ticker) {
            tickers.push(ticker);
        }
    }

    if tickers.is_empty() {
        return Err(ConfigError::NoTickers);
    }
    Ok(tickers)
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["stock-quote-relay", "--apikey", "secret-key"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn defaults_validate() {
        let config = RelayConfig::from_cli(&cli(&[])).unwrap();

        let symbols: Vec<&str> = config.driver.tickers.iter().map(Ticker::as_str).collect();
        assert_eq!(symbols, vec!["CTSH", "MSFT", "GOOGL"]);
        assert_eq!(config.driver.interval, Duration::from_secs(100));
        assert_eq!(config.kafka.topic, "stocks");
        assert_eq!(config.kafka.message_timeout, Duration::from_millis(5000));
        assert_eq!(config.provider.request_timeout, Duration::from_secs(30));
        assert!(!config.server.health_enabled());
    }

    #[test]
    fn tickers_are_normalized_and_deduplicated() {
        let config = RelayConfig::from_cli(&cli(&["--tickers", " msft,GOOGL,,MSFT ,ctsh"])).unwrap();

        let symbols: Vec<&str> = config.driver.tickers.iter().map(Ticker::as_str).collect();
        assert_eq!(symbols, vec!["MSFT", "GOOGL", "CTSH"]);
    }

    #[test]
    fn blank_api_key_is_rejected() {
        let parsed = Cli::try_parse_from(["stock-quote-relay", "--apikey", "  "]).unwrap();
        let err = RelayConfig::from_cli(&parsed).unwrap_err();
        assert!(matches!(err, ConfigError::EmptyValue(ref name) if name == "apikey"));
    }

    #[test]
    fn zero_interval_is_rejected() {
        let err = RelayConfig::from_cli(&cli(&["--interval", "0"])).unwrap_err();
        assert!(matches!(err, ConfigError::ZeroDuration(ref name) if name == "interval"));
    }

    #[test]
    fn empty_ticker_list_is_rejected() {
        let err = RelayConfig::from_cli(&cli(&["--tickers", " , "])).unwrap_err();
        assert!(matches!(err, ConfigError::NoTickers));
    }

    #[test]
    fn malformed_ticker_is_rejected() {
        let err = RelayConfig::from_cli(&cli(&["--tickers", "MS FT"])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidTicker(_)));
    }

    #[test]
    fn invalid_provider_url_is_rejected() {
        let err = RelayConfig::from_cli(&cli(&["--provider-url", "not a url"])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidUrl { .. }));
    }

    #[test]
    fn relay_settings_carry_topic_and_policy() {
        let config =
            RelayConfig::from_cli(&cli(&["--kafkatopic", "quotes", "--error-policy", "isolate"]))
                .unwrap();

        let settings = config.relay_settings();
        assert_eq!(settings.topic, "quotes");
        assert_eq!(settings.error_policy, ErrorPolicy::Isolate);
        assert_eq!(settings.tickers.len(), 3);
    }

    #[test]
    fn credentials_redacted_debug() {
        let config = RelayConfig::from_cli(&cli(&[])).unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("secret-key"));
        assert!(debug.contains("[REDACTED]"));
        assert_eq!(config.credentials.api_key(), "secret-key");
    }
}
