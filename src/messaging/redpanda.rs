use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use rdkafka::{
    config::ClientConfig,
    producer::{FutureProducer, FutureRecord},
};

use super::{CommandDispatcher, CommandEnvelope};
use crate::domain::registration::RegistrationCommand;

/// Publishes command envelopes to a Redpanda (Kafka API) topic.
///
/// Messages are keyed by order id, so commands for one order keep their
/// relative order within a partition. Delivery retries are left to the
/// producer (`message.timeout.ms`); a batch stops at the first failure and
/// the commands already published stay published.
pub struct RedpandaCommandBus {
    producer: FutureProducer,
    topic: String,
    send_timeout: Duration,
}

impl RedpandaCommandBus {
    pub fn new(brokers: &str, topic: &str) -> Result<Self> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("message.timeout.ms", "5000")
            .set("enable.idempotence", "true")
            .create()
            .context("Failed to create Redpanda producer")?;

        tracing::info!(brokers = %brokers, topic = %topic, "Redpanda command bus ready");

        Ok(Self {
            producer,
            topic: topic.to_string(),
            send_timeout: Duration::from_secs(5),
        })
    }

    async fn publish(&self, envelope: &CommandEnvelope) -> Result<()> {
        let key = envelope.partition_key();
        let payload = serde_json::to_string(envelope)?;

        let record = FutureRecord::to(&self.topic).key(&key).payload(&payload);

        self.producer
            .send(record, rdkafka::util::Timeout::After(self.send_timeout))
            .await
            .map_err(|(e, _)| anyhow::anyhow!("Kafka send error: {}", e))?;

        tracing::info!(
            topic = %self.topic,
            key = %key,
            command_type = %envelope.command_type,
            command_id = %envelope.command_id,
            correlation_id = %envelope.correlation_id,
            "Published command to Redpanda"
        );

        Ok(())
    }
}

#[async_trait]
impl CommandDispatcher for RedpandaCommandBus {
    async fn send_batch(&self, commands: Vec<RegistrationCommand>) -> Result<()> {
        for envelope in CommandEnvelope::wrap_batch(commands) {
            if let Err(e) = self.publish(&envelope).await {
                tracing::error!(
                    error = %e,
                    topic = %self.topic,
                    command_type = %envelope.command_type,
                    sequence = envelope.sequence,
                    "Failed to publish command to Redpanda"
                );
                return Err(e);
            }
        }
        Ok(())
    }
}
