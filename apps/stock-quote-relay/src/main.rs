//! Stock Quote Relay Binary
//!
//! Polls Alpha Vantage and publishes the newest intraday bar per ticker to Kafka.
//!
//! # Usage
//!
//! ```bash
//! stock-quote-relay --apikey <KEY> --interval 100 \
//!     --kafkabootstrapserver localhost:9092 --kafkatopic stocks
//! ```
//!
//! # Environment Variables
//!
//! Every flag has an environment fallback (see `--help`). Telemetry:
//! - `OTEL_ENABLED`: Export spans over OTLP (default: false)
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP endpoint (default: <http://localhost:4317>)
//! - `OTEL_SERVICE_NAME`: Service name (default: stock-quote-relay)
//! - `RUST_LOG`: Log level (default: info)

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use stock_quote_relay::infrastructure::config::load_dotenv;
use stock_quote_relay::infrastructure::health::{HealthServer, HealthServerState};
use stock_quote_relay::infrastructure::telemetry;
use stock_quote_relay::{
    AlphaVantageClient, Cli, KafkaQuotePublisher, QuotePublisherPort, RelayConfig, RelayError,
    RelayService, RunOutcome, Ticker, init_metrics,
};
use tokio::signal;
use tokio_util::sync::CancellationToken;

const BANNER: &str = r"
  ____  _             _       ___              _         ____      _
 / ___|| |_ ___   ___| | __  / _ \ _   _  ___ | |_ ___  |  _ \ ___| | __ _ _   _
 \___ \| __/ _ \ / __| |/ / | | | | | | |/ _ \| __/ _ \ | |_) / _ \ |/ _` | | | |
  ___) | || (_) | (__|   <  | |_| | |_| | (_) | ||  __/ |  _ <  __/ | (_| | |_| |
 |____/ \__\___/ \___|_|\_\  \__\_\\__,_|\___/ \__\___| |_| \_\___|_|\__,_|\__, |
                                                                           |___/";

const FAREWELL: &str = "Program execution interrupted. Good Bye and have a nice day";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let dotenv_path = load_dotenv();
    let cli = Cli::parse();

    let _telemetry_guard = telemetry::init();

    let shutdown_token = CancellationToken::new();
    tokio::spawn(await_shutdown(shutdown_token.clone()));

    tracing::info!("{BANNER}");
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting Stock Quote Relay");
    if let Some(path) = dotenv_path {
        tracing::debug!(path = %path.display(), "Loaded .env");
    }

    let _metrics_handle = init_metrics().context("failed to install metrics recorder")?;

    let config = RelayConfig::from_cli(&cli).context("invalid configuration")?;
    log_config(&config);

    let source = Arc::new(
        AlphaVantageClient::new(&config.provider, &config.credentials)
            .context("failed to create Alpha Vantage client")?,
    );
    let publisher = Arc::new(
        KafkaQuotePublisher::new(config.kafka.clone()).context("failed to create Kafka producer")?,
    );

    let relay = RelayService::new(
        source,
        Arc::clone(&publisher) as Arc<dyn QuotePublisherPort>,
        config.relay_settings(),
        shutdown_token.clone(),
    );

    if config.server.health_enabled() {
        let health_state = Arc::new(HealthServerState::new(
            env!("CARGO_PKG_VERSION").to_string(),
            relay.status(),
        ));
        let health_server = HealthServer::new(
            config.server.health_port,
            health_state,
            shutdown_token.clone(),
        );
        tokio::spawn(async move {
            if let Err(e) = health_server.run().await {
                tracing::error!(error = %e, "Health server error");
            }
        });
    }

    let outcome = relay.run().await;

    // Stops the health server and the signal listener.
    shutdown_token.cancel();

    if let Err(e) = publisher.shutdown().await {
        tracing::warn!(error = %e, "Kafka producer did not flush cleanly");
    }

    finish(outcome)
}

/// Map the run outcome to the process result: an interrupt exits 0, a
/// pipeline error exits non-zero.
fn finish(outcome: Result<RunOutcome, RelayError>) -> anyhow::Result<()> {
    match outcome {
        Ok(RunOutcome::Interrupted) => {
            tracing::info!("{FAREWELL}");
            Ok(())
        }
        Err(e) => {
            tracing::error!(error = %e, ticker = %e.ticker(), stage = e.stage(), "Relay stopped");
            Err::<(), _>(e).context("relay stopped on pipeline error")
        }
    }
}

/// Log the validated configuration.
fn log_config(config: &RelayConfig) {
    let tickers: Vec<&str> = config.driver.tickers.iter().map(Ticker::as_str).collect();
    tracing::info!(
        tickers = ?tickers,
        interval_secs = config.driver.interval.as_secs(),
        error_policy = %config.driver.error_policy,
        bootstrap_servers = %config.kafka.bootstrap_servers,
        topic = %config.kafka.topic,
        health_port = config.server.health_port,
        "Configuration loaded"
    );
    tracing::debug!(
        provider_url = %config.provider.base_url,
        bar_interval = %config.provider.bar_interval,
        output_size = %config.provider.output_size,
        request_timeout_secs = config.provider.request_timeout.as_secs(),
        credentials = ?config.credentials,
        "Provider settings"
    );
}

/// Wait for a shutdown signal (SIGTERM or SIGINT), or for the token to be
/// cancelled elsewhere.
async fn await_shutdown(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
        () = shutdown_token.cancelled() => return,
    }

    shutdown_token.cancel();
}
