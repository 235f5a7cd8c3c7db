// Service exports
pub mod cache;
pub mod memory;
pub mod postgres;
pub mod push;
pub mod stores;
pub mod subscription;

pub use cache::{CacheStats, CachedSubscriptionGateway};
pub use memory::{InMemoryDedupStore, InMemoryNotificationStore, InMemoryProfileStore, StaticSubscriptionGateway};
pub use postgres::PostgresClient;
pub use push::{
    channel_for, spawn_push_worker, PushError, PushQueue, PushStats, PushTransport, PushWorker,
    RedisPushTransport, SessionHandle, SessionRegistry,
};
pub use stores::{DedupStore, NotificationStore, SearchProfileStore, StoreError};
pub use subscription::{SubscriptionClient, SubscriptionError, SubscriptionGateway};
