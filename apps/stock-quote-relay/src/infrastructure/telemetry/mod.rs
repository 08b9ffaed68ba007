//! OpenTelemetry Tracing Integration
//!
//! Console logging through `tracing-subscriber`, with optional OTLP span
//! export. Export is off by default for this command-line tool.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Log filter, replacing the defaults when set (default:
//!   `stock_quote_relay=info` with `warn` for rdkafka, reqwest, h2 and hyper)
//! - `OTEL_ENABLED`: Set to "true" to export spans (default: false)
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP endpoint (default: http://localhost:4317)
//! - `OTEL_SERVICE_NAME`: Service name for traces (default: stock-quote-relay)
//!
//! # Usage
//!
//! ```ignore
//! use stock_quote_relay::infrastructure::telemetry;
//!
//! // Initialize at startup (returns guard that must be kept alive)
//! let _guard = telemetry::init();
//! ```

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Service name for OpenTelemetry traces.
const DEFAULT_SERVICE_NAME: &str = "stock-quote-relay";

/// Filter used when `RUST_LOG` is not set.
const DEFAULT_DIRECTIVES: &str = "stock_quote_relay=info,rdkafka=warn,reqwest=warn,h2=warn,hyper=warn";

/// Default OTLP endpoint.
const DEFAULT_OTLP_ENDPOINT: &str = "http://localhost:4317";

/// Guard that shuts down OpenTelemetry when dropped.
pub struct TelemetryGuard {
    tracer_provider: Option<SdkTracerProvider>,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.tracer_provider.take()
            && let Err(e) = provider.shutdown()
        {
            eprintln!("Failed to shutdown OpenTelemetry tracer provider: {e}");
        }
    }
}

/// Telemetry configuration.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Whether OpenTelemetry is enabled.
    pub enabled: bool,
    /// OTLP exporter endpoint.
    pub otlp_endpoint: String,
    /// Service name for traces.
    pub service_name: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            otlp_endpoint: DEFAULT_OTLP_ENDPOINT.to_string(),
            service_name: DEFAULT_SERVICE_NAME.to_string(),
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let enabled = std::env::var("OTEL_ENABLED")
            .map(|v| parse_enabled(&v))
            .unwrap_or(false);

        let otlp_endpoint = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
            .unwrap_or_else(|_| DEFAULT_OTLP_ENDPOINT.to_string());

        let service_name =
            std::env::var("OTEL_SERVICE_NAME").unwrap_or_else(|_| DEFAULT_SERVICE_NAME.to_string());

        Self {
            enabled,
            otlp_endpoint,
            service_name,
        }
    }
}

fn parse_enabled(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

/// Initialize telemetry with default configuration from environment.
///
/// Returns a guard that must be kept alive for the duration of the program.
/// When the guard is dropped, OpenTelemetry will be properly shut down.
#[must_use]
pub fn init() -> TelemetryGuard {
    init_with_config(TelemetryConfig::from_env())
}

/// Initialize telemetry with custom configuration.
///
/// Falls back to console-only logging if the OTLP exporter cannot be built.
#[must_use]
pub fn init_with_config(config: TelemetryConfig) -> TelemetryGuard {
    let filter = env_filter(std::env::var(EnvFilter::DEFAULT_ENV).ok().as_deref());

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    let mut export_error = None;
    let tracer_provider = if config.enabled {
        match opentelemetry_otlp::SpanExporter::builder()
            .with_tonic()
            .with_endpoint(&config.otlp_endpoint)
            .build()
        {
            Ok(exporter) => Some(
                SdkTracerProvider::builder()
                    .with_batch_exporter(exporter)
                    .with_resource(
                        opentelemetry_sdk::Resource::builder()
                            .with_service_name(config.service_name.clone())
                            .build(),
                    )
                    .build(),
            ),
            Err(e) => {
                export_error = Some(e.to_string());
                None
            }
        }
    } else {
        None
    };

    let otel_layer = tracer_provider.as_ref().map(|provider| {
        tracing_opentelemetry::layer().with_tracer(provider.tracer(config.service_name.clone()))
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .with(otel_layer)
        .init();

    if let Some(error) = export_error {
        tracing::warn!(
            %error,
            endpoint = %config.otlp_endpoint,
            "OTLP exporter unavailable, span export disabled"
        );
    }

    TelemetryGuard { tracer_provider }
}

/// Build the log filter from a `RUST_LOG` value.
///
/// Unset, blank or unparseable values fall back to [`DEFAULT_DIRECTIVES`].
fn env_filter(rust_log: Option<&str>) -> EnvFilter {
    rust_log
        .filter(|value| !value.trim().is_empty())
        .and_then(|value| EnvFilter::try_new(value).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_DIRECTIVES))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use test_case::test_case;
    use tracing::Level;
    use tracing_subscriber::Registry;

    use super::*;

    fn enabled_under(filter: EnvFilter, check: impl FnOnce() -> bool) -> bool {
        tracing::subscriber::with_default(Registry::default().with(filter), check)
    }

    fn crate_info() -> bool {
        tracing::enabled!(target: "stock_quote_relay::application::services", Level::INFO)
    }

    fn crate_debug() -> bool {
        tracing::enabled!(target: "stock_quote_relay::application::services", Level::DEBUG)
    }

    fn crate_trace() -> bool {
        tracing::enabled!(target: "stock_quote_relay::infrastructure::alpha_vantage", Level::TRACE)
    }

    fn hyper_info() -> bool {
        tracing::enabled!(target: "hyper::proto", Level::INFO)
    }

    #[test]
    fn defaults_log_crate_at_info() {
        assert!(enabled_under(env_filter(None), crate_info));
        assert!(!enabled_under(env_filter(None), crate_debug));
        assert!(!enabled_under(env_filter(None), hyper_info));
    }

    #[test]
    fn rust_log_raises_crate_level() {
        assert!(enabled_under(env_filter(Some("stock_quote_relay=debug")), crate_debug));
        assert!(enabled_under(env_filter(Some("trace")), crate_trace));
        assert!(enabled_under(env_filter(Some("debug")), hyper_info));
    }

    #[test]
    fn rust_log_can_lower_crate_level() {
        assert!(!enabled_under(env_filter(Some("stock_quote_relay=warn")), crate_info));
    }

    #[test_case(Some("") ; "blank")]
    #[test_case(Some("stock_quote_relay=loud") ; "unparseable")]
    fn bad_rust_log_falls_back_to_defaults(value: Option<&str>) {
        assert!(enabled_under(env_filter(value), crate_info));
        assert!(!enabled_under(env_filter(value), crate_debug));
    }

    #[test_case("true", true)]
    #[test_case("TRUE", true)]
    #[test_case("1", true)]
    #[test_case(" on ", true)]
    #[test_case("false", false)]
    #[test_case("0", false)]
    #[test_case("", false)]
    fn otel_enabled_parsing(value: &str, expected: bool) {
        assert_eq!(parse_enabled(value), expected);
    }
}
