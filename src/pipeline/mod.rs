// Pipeline exports
pub mod consumer;
pub mod dispatcher;
pub mod ingestion;

pub use consumer::{
    handle_delivery, run_consumer, run_kafka_consumer, ConsumerError, ConsumerStats, Delivery, EventSource, KafkaEventSource,
    KafkaSourceConfig, MemoryEventSource,
};
pub use dispatcher::{DispatchError, DispatchOutcome, NotificationDispatcher};
pub use ingestion::{EventProcessor, IngestError, IngestionOptions, MatchSummary, MessageState, ProcessingOutcome};
