use crate::pipeline::ingestion::{EventProcessor, MessageState, ProcessingOutcome};
use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::message::Message;
use rdkafka::{Offset, TopicPartitionList};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;

/// Errors raised by an event source
#[derive(Debug, Error)]
pub enum ConsumerError {
    #[error("Kafka error: {0}")]
    KafkaError(#[from] rdkafka::error::KafkaError),

    #[error("Rewind failed: {0}")]
    Rewind(String),
}

/// One message taken off the bus
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub payload: Option<Vec<u8>>,
}

/// At-least-once message source
///
/// A delivery that is neither acked nor nacked is redelivered after a
/// restart or rebalance. `nack` asks for redelivery right away.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Next delivery; `Ok(None)` once the source is exhausted
    async fn recv(&self) -> Result<Option<Delivery>, ConsumerError>;

    async fn ack(&self, delivery: &Delivery) -> Result<(), ConsumerError>;

    async fn nack(&self, delivery: &Delivery) -> Result<(), ConsumerError>;
}

/// Kafka settings for one consumer
#[derive(Debug, Clone)]
pub struct KafkaSourceConfig {
    pub brokers: String,
    pub group_id: String,
    pub topic: String,
    pub auto_offset_reset: String,
    pub session_timeout_ms: u64,
}

/// Kafka consumer with manual offset commits
pub struct KafkaEventSource {
    consumer: Arc<StreamConsumer>,
    seek_timeout: Duration,
}

impl KafkaEventSource {
    pub fn new(config: &KafkaSourceConfig) -> Result<Self, ConsumerError> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", &config.brokers)
            .set("group.id", &config.group_id)
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", &config.auto_offset_reset)
            .set("enable.partition.eof", "false")
            .set("session.timeout.ms", config.session_timeout_ms.to_string())
            .set("max.poll.interval.ms", "300000")
            .create()?;

        consumer.subscribe(&[config.topic.as_str()])?;

        tracing::info!(
            topic = %config.topic,
            group_id = %config.group_id,
            "Kafka consumer subscribed"
        );

        Ok(Self {
            consumer: Arc::new(consumer),
            seek_timeout: Duration::from_secs(5),
        })
    }
}

#[async_trait]
impl EventSource for KafkaEventSource {
    async fn recv(&self) -> Result<Option<Delivery>, ConsumerError> {
        let message = self.consumer.recv().await?;

        Ok(Some(Delivery {
            topic: message.topic().to_string(),
            partition: message.partition(),
            offset: message.offset(),
            payload: message.payload().map(<[u8]>::to_vec),
        }))
    }

    async fn ack(&self, delivery: &Delivery) -> Result<(), ConsumerError> {
        let mut offsets = TopicPartitionList::new();
        offsets.add_partition_offset(
            &delivery.topic,
            delivery.partition,
            Offset::Offset(delivery.offset + 1),
        )?;
        self.consumer.commit(&offsets, CommitMode::Async)?;
        Ok(())
    }

    async fn nack(&self, delivery: &Delivery) -> Result<(), ConsumerError> {
        let consumer = self.consumer.clone();
        let topic = delivery.topic.clone();
        let partition = delivery.partition;
        let offset = delivery.offset;
        let timeout = self.seek_timeout;

        // seek blocks until the broker answers
        tokio::task::spawn_blocking(move || consumer.seek(&topic, partition, Offset::Offset(offset), timeout))
            .await
            .map_err(|e| ConsumerError::Rewind(e.to_string()))??;
        Ok(())
    }
}

/// In-memory event source
///
/// Nacked deliveries go back to the front of the queue, which mimics a
/// Kafka seek to the failed offset. Deliveries received but never settled
/// come back on [`restart`](Self::restart), like a consumer rejoining its
/// group at the last committed offset.
#[derive(Default)]
pub struct MemoryEventSource {
    pending: Mutex<VecDeque<Delivery>>,
    in_flight: Mutex<Vec<Delivery>>,
    acked: Mutex<Vec<Delivery>>,
    nacked: Mutex<Vec<Delivery>>,
    next_offset: Mutex<i64>,
}

impl MemoryEventSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a payload to the topic
    pub fn publish(&self, payload: impl Into<Vec<u8>>) -> i64 {
        let mut next = self.next_offset.lock().unwrap_or_else(|p| p.into_inner());
        let offset = *next;
        *next += 1;

        self.pending
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push_back(Delivery {
                topic: "job-post-events".to_string(),
                partition: 0,
                offset,
                payload: Some(payload.into()),
            });
        offset
    }

    pub fn acked(&self) -> Vec<Delivery> {
        self.acked.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    pub fn nacked(&self) -> Vec<Delivery> {
        self.nacked.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    pub fn pending(&self) -> usize {
        self.pending.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    /// Requeue every unsettled delivery in offset order
    pub fn restart(&self) {
        let mut unsettled = std::mem::take(&mut *self.in_flight.lock().unwrap_or_else(|p| p.into_inner()));
        unsettled.sort_by_key(|d| d.offset);

        let mut pending = self.pending.lock().unwrap_or_else(|p| p.into_inner());
        for delivery in unsettled.into_iter().rev() {
            pending.push_front(delivery);
        }
    }

    fn settle(&self, delivery: &Delivery) {
        self.in_flight
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .retain(|d| d.offset != delivery.offset);
    }
}

#[async_trait]
impl EventSource for MemoryEventSource {
    async fn recv(&self) -> Result<Option<Delivery>, ConsumerError> {
        let next = self
            .pending
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .pop_front();

        if let Some(delivery) = &next {
            self.in_flight
                .lock()
                .unwrap_or_else(|p| p.into_inner())
                .push(delivery.clone());
        }
        Ok(next)
    }

    async fn ack(&self, delivery: &Delivery) -> Result<(), ConsumerError> {
        self.settle(delivery);
        self.acked
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(delivery.clone());
        Ok(())
    }

    async fn nack(&self, delivery: &Delivery) -> Result<(), ConsumerError> {
        self.settle(delivery);
        self.nacked
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(delivery.clone());
        self.pending
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push_front(delivery.clone());
        Ok(())
    }
}

/// Per-consumer counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumerStats {
    pub received: u64,
    pub acknowledged: u64,
    pub discarded: u64,
    pub failed: u64,
}

impl ConsumerStats {
    pub fn merge(&mut self, other: &ConsumerStats) {
        self.received += other.received;
        self.acknowledged += other.acknowledged;
        self.discarded += other.discarded;
        self.failed += other.failed;
    }
}

/// Process one delivery and settle it with the source
///
/// Returns `Ok(true)` if the delivery was acknowledged. `Err` means a failed
/// delivery could not be rewound: acknowledging anything after it on the
/// same partition would commit past it, so the caller must stop consuming.
pub async fn handle_delivery(
    source: &dyn EventSource,
    processor: &EventProcessor,
    delivery: &Delivery,
    stats: &mut ConsumerStats,
) -> Result<bool, ConsumerError> {
    stats.received += 1;
    tracing::trace!(
        partition = delivery.partition,
        offset = delivery.offset,
        state = ?MessageState::Received,
        "Message received"
    );

    let result = match delivery.payload.as_deref() {
        Some(payload) => processor.process(payload).await,
        None => {
            tracing::warn!(offset = delivery.offset, "Discarding message with empty payload");
            Ok(ProcessingOutcome::Discarded {
                reason: "empty payload".to_string(),
            })
        }
    };

    match result {
        Ok(outcome) => {
            if outcome.state() == MessageState::Discarded {
                stats.discarded += 1;
            }
            if let Err(e) = source.ack(delivery).await {
                tracing::warn!(offset = delivery.offset, error = %e, "Failed to commit offset");
                return Ok(false);
            }
            stats.acknowledged += 1;
            tracing::debug!(
                partition = delivery.partition,
                offset = delivery.offset,
                state = ?MessageState::Acknowledged,
                "Message acknowledged"
            );
            Ok(true)
        }
        Err(e) => {
            stats.failed += 1;
            tracing::warn!(
                partition = delivery.partition,
                offset = delivery.offset,
                error = %e,
                "Processing failed, message will be redelivered"
            );
            if let Err(e) = source.nack(delivery).await {
                tracing::error!(
                    partition = delivery.partition,
                    offset = delivery.offset,
                    error = %e,
                    "Failed to rewind consumer"
                );
                return Err(e);
            }
            Ok(false)
        }
    }
}

/// Consume until shutdown is signalled or the source is exhausted
///
/// Shutdown only interrupts waiting: a message that has been received is
/// processed and settled before the loop exits. A failed rewind stops the
/// loop with an error and nothing after the failed offset is acknowledged.
pub async fn run_consumer(
    source: Arc<dyn EventSource>,
    processor: Arc<EventProcessor>,
    mut shutdown: watch::Receiver<bool>,
    retry_backoff: Duration,
) -> Result<ConsumerStats, ConsumerError> {
    let mut stats = ConsumerStats::default();

    loop {
        if *shutdown.borrow() {
            break;
        }

        let next = tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            next = source.recv() => next,
        };

        let delivery = match next {
            Ok(Some(delivery)) => delivery,
            Ok(None) => {
                tracing::info!("Event source exhausted");
                break;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to receive message");
                tokio::select! {
                    _ = shutdown.changed() => break,
                    _ = tokio::time::sleep(retry_backoff) => continue,
                }
            }
        };

        if !handle_delivery(source.as_ref(), &processor, &delivery, &mut stats).await? {
            tokio::select! {
                _ = shutdown.changed() => break,
                _ = tokio::time::sleep(retry_backoff) => {}
            }
        }
    }

    tracing::info!(
        received = stats.received,
        acknowledged = stats.acknowledged,
        discarded = stats.discarded,
        failed = stats.failed,
        "Consumer stopped"
    );

    Ok(stats)
}

/// Run a Kafka consumer until shutdown, rejoining the group after a failed
/// rewind
///
/// The replacement consumer resumes from the last committed offset, which
/// is at or before the message that could not be rewound.
pub async fn run_kafka_consumer(
    source: KafkaEventSource,
    config: KafkaSourceConfig,
    processor: Arc<EventProcessor>,
    mut shutdown: watch::Receiver<bool>,
    retry_backoff: Duration,
) -> ConsumerStats {
    let mut total = ConsumerStats::default();
    let mut source = Some(source);

    loop {
        let current = match source.take() {
            Some(current) => current,
            None => match KafkaEventSource::new(&config) {
                Ok(current) => current,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to recreate Kafka consumer");
                    tokio::select! {
                        _ = shutdown.changed() => break,
                        _ = tokio::time::sleep(retry_backoff) => continue,
                    }
                }
            },
        };

        match run_consumer(Arc::new(current), processor.clone(), shutdown.clone(), retry_backoff).await {
            Ok(stats) => {
                total.merge(&stats);
                break;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Restarting Kafka consumer from last committed offset");
                if *shutdown.borrow() {
                    break;
                }
                tokio::select! {
                    _ = shutdown.changed() => break,
                    _ = tokio::time::sleep(retry_backoff) => {}
                }
            }
        }
    }

    total
}
