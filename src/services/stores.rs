use crate::core::Region;
use crate::models::{MatchedJobPost, Notification, SearchProfile};
use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

/// Errors raised by the durable stores
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// Idempotency ledger for matches
///
/// Keyed by `(profile_id, job_id)`. A claim both reserves the pair and
/// persists the [`MatchedJobPost`] in a single atomic write, so a successful
/// claim always leaves a durable match behind.
#[async_trait]
pub trait DedupStore: Send + Sync {
    /// Insert the match if its key is new
    ///
    /// Returns `Ok(true)` for the first claim of a pair and `Ok(false)` for
    /// every later one, including concurrent claims from other consumers.
    /// Uniqueness must be enforced by the storage layer.
    async fn claim(&self, matched: &MatchedJobPost) -> Result<bool, StoreError>;
}

/// Candidate index over the search profiles owned by the profile module
#[async_trait]
pub trait SearchProfileStore: Send + Sync {
    /// Profiles with a wildcard country, the same country, or a country in
    /// the same region as the posting
    async fn candidates_for(
        &self,
        region: Region,
        country_code: &str,
    ) -> Result<Vec<SearchProfile>, StoreError>;
}

/// Durable notification rows
///
/// Only `insert` is used by the pipeline; the rest back the retrieval API.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Insert a notification; `Ok(false)` if one already exists for the
    /// same source match
    async fn insert(&self, notification: &Notification) -> Result<bool, StoreError>;

    /// Unread notifications for a user, newest first
    async fn list_unread(&self, user_id: &str, limit: u32) -> Result<Vec<Notification>, StoreError>;

    /// Mark one of the user's notifications read; `Ok(false)` if not found
    async fn mark_read(&self, user_id: &str, notification_id: Uuid) -> Result<bool, StoreError>;

    /// Delete one of the user's notifications; `Ok(false)` if not found
    async fn delete(&self, user_id: &str, notification_id: Uuid) -> Result<bool, StoreError>;

    async fn health_check(&self) -> Result<bool, StoreError> {
        Ok(true)
    }
}
