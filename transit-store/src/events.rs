use async_trait::async_trait;
use transit_core::repository::SeatEventPublisher;
use transit_shared::models::events::SeatEvent;

#[cfg(feature = "kafka")]
pub use kafka::EventProducer;

/// Stand-in for the event bus when no broker is configured: every event
/// becomes a structured log line.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingPublisher;

#[async_trait]
impl SeatEventPublisher for LoggingPublisher {
    async fn publish(&self, event: &SeatEvent) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        tracing::info!(
            topic = event.kind.topic(),
            assignment_id = %event.assignment_id,
            booking_id = %event.booking_id,
            seats = ?event.seats,
            "seat event"
        );
        Ok(())
    }
}

#[cfg(feature = "kafka")]
mod kafka {
    use super::*;
    use rdkafka::config::ClientConfig;
    use rdkafka::producer::{FutureProducer, FutureRecord};
    use rdkafka::util::Timeout;
    use std::time::Duration;
    use tracing::{error, info};

    #[derive(Clone)]
    pub struct EventProducer {
        producer: FutureProducer,
    }

    impl EventProducer {
        pub fn new(brokers: &str) -> Result<Self, rdkafka::error::KafkaError> {
            let producer: FutureProducer = ClientConfig::new()
                .set("bootstrap.servers", brokers)
                .set("message.timeout.ms", "5000")
                .create()?;

            Ok(Self { producer })
        }

        pub async fn send(&self, topic: &str, key: &str, payload: &str) -> Result<(), rdkafka::error::KafkaError> {
            let record = FutureRecord::to(topic).key(key).payload(payload);

            match self.producer.send(record, Timeout::After(Duration::from_secs(0))).await {
                Ok(delivery) => {
                    info!(
                        "Sent message to {}/{}: partition {} offset {}",
                        topic, key, delivery.partition, delivery.offset
                    );
                    Ok(())
                }
                Err((e, _msg)) => {
                    error!("Failed to send message to {}: {}", topic, e);
                    Err(e)
                }
            }
        }
    }

    /// Keyed by assignment so one departure's events stay ordered.
    #[async_trait]
    impl SeatEventPublisher for EventProducer {
        async fn publish(&self, event: &SeatEvent) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
            let payload = serde_json::to_string(event)?;
            self.send(event.kind.topic(), &event.assignment_id.to_string(), &payload)
                .await?;
            Ok(())
        }
    }
}
