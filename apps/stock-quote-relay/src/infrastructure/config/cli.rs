//! Command-line arguments.
//!
//! Every flag falls back to an environment variable, so the relay can be
//! configured entirely from `.env` in containers.

use clap::Parser;

use crate::application::services::ErrorPolicy;
use crate::infrastructure::alpha_vantage::{BarInterval, OutputSize};

/// Default provider endpoint.
pub const DEFAULT_PROVIDER_URL: &str = "https://www.alphavantage.co/query";

/// Poll Alpha Vantage intraday quotes and publish the newest bar per ticker to Kafka.
#[derive(Debug, Clone, Parser)]
#[command(name = "stock-quote-relay", author, version, about)]
pub struct Cli {
    /// Alpha Vantage API key
    #[arg(long = "apikey", env = "ALPHAVANTAGE_API_KEY", hide_env_values = true)]
    pub api_key: String,

    /// Seconds to sleep between polling cycles
    #[arg(long, env = "RELAY_INTERVAL_SECS", default_value_t = 100)]
    pub interval: u64,

    /// Kafka bootstrap servers (host:port[,host:port...])
    #[arg(
        long = "kafkabootstrapserver",
        env = "KAFKA_BOOTSTRAP_SERVERS",
        default_value = "localhost:9092"
    )]
    pub kafka_bootstrap_servers: String,

    /// Kafka topic receiving quote records
    #[arg(long = "kafkatopic", env = "KAFKA_TOPIC", default_value = "stocks")]
    pub kafka_topic: String,

    /// Comma-separated tickers polled each cycle, in order
    #[arg(
        long,
        env = "RELAY_TICKERS",
        value_delimiter = ',',
        default_value = "CTSH,MSFT,GOOGL"
    )]
    pub tickers: Vec<String>,

    /// What to do when one ticker fails: fail-fast or isolate
    #[arg(long, env = "RELAY_ERROR_POLICY", default_value = "fail-fast")]
    pub error_policy: ErrorPolicy,

    /// Bar resolution: 1min, 5min, 15min, 30min or 60min
    #[arg(long, env = "ALPHAVANTAGE_BAR_INTERVAL", default_value = "1min")]
    pub bar_interval: BarInterval,

    /// Provider output size: compact or full
    #[arg(long, env = "ALPHAVANTAGE_OUTPUT_SIZE", default_value = "compact")]
    pub output_size: OutputSize,

    /// Provider query endpoint
    #[arg(long, env = "ALPHAVANTAGE_BASE_URL", default_value = DEFAULT_PROVIDER_URL)]
    pub provider_url: String,

    /// Provider HTTP request timeout in seconds
    #[arg(long, env = "ALPHAVANTAGE_TIMEOUT_SECS", default_value_t = 30)]
    pub request_timeout_secs: u64,

    /// Kafka message delivery timeout in milliseconds
    #[arg(long, env = "KAFKA_MESSAGE_TIMEOUT_MS", default_value_t = 5000)]
    pub kafka_message_timeout_ms: u64,

    /// Kafka client id
    #[arg(long, env = "KAFKA_CLIENT_ID", default_value = "stock-quote-relay")]
    pub kafka_client_id: String,

    /// Seconds to wait for outstanding deliveries at shutdown
    #[arg(long, env = "KAFKA_FLUSH_TIMEOUT_SECS", default_value_t = 10)]
    pub flush_timeout_secs: u64,

    /// Health and metrics HTTP port (0 disables the server)
    #[arg(long, env = "RELAY_HEALTH_PORT", default_value_t = 0)]
    pub health_port: u16,
}
