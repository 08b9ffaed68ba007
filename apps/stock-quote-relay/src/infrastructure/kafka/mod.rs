//! Kafka Publisher
//!
//! `QuotePublisherPort` backed by an rdkafka `FutureProducer`.
//!
//! `publish` enqueues the message in librdkafka's local queue and returns.
//! Each delivery report is awaited on a detached task that logs and counts
//! failures, so the relay loop never blocks on broker acknowledgment.
//! `shutdown` flushes the queue with the configured timeout.

use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::error::KafkaError;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};

use crate::application::ports::{PublishError, QuotePublisherPort};
use crate::domain::quote::QuoteRecord;
use crate::infrastructure::config::KafkaSettings;
use crate::infrastructure::metrics;

/// Kafka-backed quote publisher.
///
/// The producer is created once and shared for the lifetime of the relay.
#[derive(Clone)]
pub struct KafkaQuotePublisher {
    producer: FutureProducer,
    settings: KafkaSettings,
}

impl std::fmt::Debug for KafkaQuotePublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KafkaQuotePublisher")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl KafkaQuotePublisher {
    /// Create the producer.
    ///
    /// No broker connection is made here; librdkafka connects lazily.
    ///
    /// # Errors
    ///
    /// Returns `PublishError::Client` if librdkafka rejects the configuration.
    pub fn new(settings: KafkaSettings) -> Result<Self, PublishError> {
        let producer: FutureProducer = client_config(&settings)
            .create()
            .map_err(|e| client_error(&e))?;

        tracing::info!(
            bootstrap_servers = %settings.bootstrap_servers,
            client_id = %settings.client_id,
            "Kafka producer created"
        );

        Ok(Self { producer, settings })
    }

    /// Producer settings.
    #[must_use]
    pub const fn settings(&self) -> &KafkaSettings {
        &self.settings
    }
}

fn client_config(settings: &KafkaSettings) -> ClientConfig {
    let mut config = ClientConfig::new();
    config
        .set("bootstrap.servers", &settings.bootstrap_servers)
        .set("client.id", &settings.client_id)
        .set(
            "message.timeout.ms",
            settings.message_timeout.as_millis().to_string(),
        );
    config
}

fn client_error(e: &KafkaError) -> PublishError {
    PublishError::Client {
        message: e.to_string(),
    }
}

#[async_trait]
impl QuotePublisherPort for KafkaQuotePublisher {
    async fn publish(&self, topic: &str, record: &QuoteRecord) -> Result<(), PublishError> {
        let payload = record.to_json_bytes()?;
        let message = FutureRecord::<(), [u8]>::to(topic).payload(payload.as_slice());

        let delivery = self
            .producer
            .send_result(message)
            .map_err(|(e, _)| PublishError::Enqueue {
                topic: topic.to_string(),
                message: e.to_string(),
            })?;

        let topic = topic.to_string();
        let ticker = record.ticker.clone();
        tokio::spawn(async move {
            match delivery.await {
                Ok(Ok(_)) => tracing::trace!(%topic, %ticker, "Delivery confirmed"),
                Ok(Err((e, _))) => {
                    metrics::record_delivery_failure(&topic);
                    tracing::warn!(%topic, %ticker, error = %e, "Delivery failed");
                }
                Err(_) => {
                    metrics::record_delivery_failure(&topic);
                    tracing::warn!(%topic, %ticker, "Delivery report dropped");
                }
            }
        });

        Ok(())
    }

    async fn shutdown(&self) -> Result<(), PublishError> {
        let producer = self.producer.clone();
        let timeout = self.settings.flush_timeout;
        let in_flight = producer.in_flight_count();

        tracing::info!(in_flight, timeout_secs = timeout.as_secs(), "Flushing Kafka producer");

        tokio::task::spawn_blocking(move || producer.flush(timeout))
            .await
            .map_err(|e| PublishError::Client {
                message: format!("flush task failed: {e}"),
            })?
            .map_err(|e| {
                tracing::warn!(error = %e, "Kafka flush did not complete");
                client_error(&e)
            })
    }
}
