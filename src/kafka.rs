use crate::config::AppConfig;
use crate::db::DbPool;
use crate::processor::event_processor;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::message::Message;
use std::time::Duration;
use tracing::{error, info, warn};

/// Counts consecutive failures (broker errors and storage errors alike) and
/// trips once `max_failures` is reached.
#[derive(Debug)]
struct CircuitBreaker {
    consecutive_failures: u32,
    max_failures: u32,
}

impl CircuitBreaker {
    fn new(max_failures: u32) -> Self {
        Self {
            consecutive_failures: 0,
            max_failures,
        }
    }

    fn record_success(&mut self) {
        self.consecutive_failures = 0;
    }

    fn record_failure(&mut self) -> u32 {
        self.consecutive_failures += 1;
        self.consecutive_failures
    }

    fn is_open(&self) -> bool {
        self.consecutive_failures >= self.max_failures
    }
}

fn client_config(config: &AppConfig) -> ClientConfig {
    let mut client_config = ClientConfig::new();
    client_config
        .set("bootstrap.servers", &config.kafka_bootstrap_servers)
        .set("group.id", &config.kafka_group_id)
        .set("auto.offset.reset", &config.kafka_auto_offset_reset)
        .set("security.protocol", &config.kafka_security_protocol)
        .set("sasl.mechanism", &config.kafka_sasl_mechanism)
        .set("sasl.username", &config.kafka_username)
        .set("sasl.password", &config.kafka_password);
    client_config
}

/// Consumes trip and fuel events until the process is stopped.
///
/// Messages are applied one at a time, in partition order, so the points of a
/// trip reach the distance accumulator in the order they were produced.
pub async fn start_kafka_consumer(config: &AppConfig, pool: DbPool) -> anyhow::Result<()> {
    info!("Initializing Kafka consumer for topic: {}", config.kafka_topic);

    let consumer: StreamConsumer = client_config(config).create()?;
    consumer.subscribe(&[&config.kafka_topic])?;
    info!("Subscribed to topic: {}", config.kafka_topic);

    let mut breaker = CircuitBreaker::new(config.kafka_max_retries);
    let cooldown = Duration::from_secs(config.kafka_circuit_breaker_cooldown);

    loop {
        if breaker.is_open() {
            warn!(
                "Circuit breaker tripped ({} consecutive failures)! Sleeping for {} seconds...",
                breaker.consecutive_failures, config.kafka_circuit_breaker_cooldown
            );
            tokio::time::sleep(cooldown).await;
            breaker.record_success();
            info!("Circuit breaker reset. Resuming consumption.");
        }

        let message = match consumer.recv().await {
            Ok(m) => m,
            Err(e) => {
                let failures = breaker.record_failure();
                error!("Kafka error: {} ({} / {})", e, failures, breaker.max_failures);
                tokio::time::sleep(Duration::from_millis(500)).await;
                continue;
            }
        };

        let Some(payload) = message.payload() else {
            warn!(
                partition = message.partition(),
                offset = message.offset(),
                "Received empty payload from Kafka"
            );
            breaker.record_success();
            continue;
        };

        match event_processor::process_message(&pool, payload, config.stats_trip_window).await {
            Ok(()) => breaker.record_success(),
            Err(e) => {
                let failures = breaker.record_failure();
                error!(
                    partition = message.partition(),
                    offset = message.offset(),
                    "Error processing message: {} ({} / {})",
                    e,
                    failures,
                    breaker.max_failures
                );
            }
        }
    }
}
