use crate::models::PushPayload;
use async_trait::async_trait;
use futures::StreamExt;
use redis::aio::ConnectionManager;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Errors that can occur while pushing to live sessions
#[derive(Debug, Error)]
pub enum PushError {
    #[error("Redis error: {0}")]
    RedisError(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Push queue closed")]
    QueueClosed,
}

/// Channel name for a user's realtime notifications
pub fn channel_for(user_id: &str) -> String {
    format!("notifications:{}", user_id)
}

/// Receiving end of one live session
pub struct SessionHandle {
    user_id: String,
    receiver: mpsc::Receiver<PushPayload>,
}

impl SessionHandle {
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Wait for the next payload; `None` once the transport drops the session
    pub async fn recv(&mut self) -> Option<PushPayload> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Option<PushPayload> {
        self.receiver.try_recv().ok()
    }
}

/// Realtime delivery to a user's live sessions
#[async_trait]
pub trait PushTransport: Send + Sync {
    /// Open a session that receives everything pushed to `user_id`
    async fn register_session(&self, user_id: &str) -> Result<SessionHandle, PushError>;

    /// Push a payload; returns how many sessions it reached
    async fn push(&self, user_id: &str, payload: &PushPayload) -> Result<usize, PushError>;
}

/// In-process session registry
///
/// Each session gets a bounded channel. Pushing never waits on a slow
/// session: a full channel drops the payload for that session, and closed
/// sessions are pruned on the next push.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Vec<mpsc::Sender<PushPayload>>>>,
    session_buffer: usize,
}

impl SessionRegistry {
    pub fn new(session_buffer: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            session_buffer: session_buffer.max(1),
        }
    }

    /// Number of open sessions for a user
    pub fn session_count(&self, user_id: &str) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(user_id)
            .map(|senders| senders.iter().filter(|s| !s.is_closed()).count())
            .unwrap_or(0)
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(32)
    }
}

#[async_trait]
impl PushTransport for SessionRegistry {
    async fn register_session(&self, user_id: &str) -> Result<SessionHandle, PushError> {
        let (sender, receiver) = mpsc::channel(self.session_buffer);

        self.sessions
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .entry(user_id.to_string())
            .or_default()
            .push(sender);

        tracing::debug!(user_id = %user_id, "Session registered");

        Ok(SessionHandle {
            user_id: user_id.to_string(),
            receiver,
        })
    }

    async fn push(&self, user_id: &str, payload: &PushPayload) -> Result<usize, PushError> {
        let mut sessions = self
            .sessions
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let Some(senders) = sessions.get_mut(user_id) else {
            return Ok(0);
        };

        senders.retain(|s| !s.is_closed());

        let mut delivered = 0;
        for sender in senders.iter() {
            match sender.try_send(payload.clone()) {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::warn!(user_id = %user_id, "Session buffer full, dropping push");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {}
            }
        }

        if senders.is_empty() {
            sessions.remove(user_id);
        }

        Ok(delivered)
    }
}

/// Redis pub/sub transport
///
/// Publishes to `notifications:{userId}` so that whichever instance holds
/// the user's connection can forward it.
pub struct RedisPushTransport {
    client: redis::Client,
    conn: Arc<tokio::sync::Mutex<ConnectionManager>>,
    session_buffer: usize,
}

impl RedisPushTransport {
    pub async fn new(redis_url: &str, session_buffer: usize) -> Result<Self, PushError> {
        let client = redis::Client::open(redis_url)?;
        let conn = ConnectionManager::new(client.clone()).await?;

        Ok(Self {
            client,
            conn: Arc::new(tokio::sync::Mutex::new(conn)),
            session_buffer: session_buffer.max(1),
        })
    }
}

#[async_trait]
impl PushTransport for RedisPushTransport {
    async fn register_session(&self, user_id: &str) -> Result<SessionHandle, PushError> {
        let channel = channel_for(user_id);
        let mut pubsub = self.client.get_async_pubsub().await?;
        pubsub.subscribe(&channel).await?;

        let (sender, receiver) = mpsc::channel(self.session_buffer);

        tokio::spawn(async move {
            let mut messages = pubsub.into_on_message();
            while let Some(msg) = messages.next().await {
                let payload: PushPayload = match msg
                    .get_payload::<String>()
                    .map_err(PushError::from)
                    .and_then(|raw| serde_json::from_str(&raw).map_err(PushError::from))
                {
                    Ok(p) => p,
                    Err(e) => {
                        tracing::warn!(channel = %channel, error = %e, "Ignoring unreadable push message");
                        continue;
                    }
                };

                match sender.try_send(payload) {
                    Ok(()) => {}
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        tracing::warn!(channel = %channel, "Session buffer full, dropping push");
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => break,
                }
            }
            tracing::debug!(channel = %channel, "Session subscription closed");
        });

        Ok(SessionHandle {
            user_id: user_id.to_string(),
            receiver,
        })
    }

    async fn push(&self, user_id: &str, payload: &PushPayload) -> Result<usize, PushError> {
        let json = serde_json::to_string(payload)?;

        let mut conn = self.conn.lock().await;
        let receivers: i64 = redis::cmd("PUBLISH")
            .arg(channel_for(user_id))
            .arg(json)
            .query_async(&mut *conn)
            .await?;

        Ok(receivers.max(0) as usize)
    }
}

struct PushJob {
    user_id: String,
    payload: PushPayload,
}

/// Producer side of the bounded push queue
#[derive(Clone)]
pub struct PushQueue {
    sender: mpsc::Sender<PushJob>,
}

impl PushQueue {
    /// Queue a payload for delivery; returns false if it was dropped
    pub fn enqueue(&self, user_id: &str, payload: PushPayload) -> bool {
        let job = PushJob {
            user_id: user_id.to_string(),
            payload,
        };

        match self.sender.try_send(job) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(job)) => {
                tracing::warn!(
                    user_id = %job.user_id,
                    notification_id = %job.payload.id,
                    "Push queue full, dropping realtime push"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(job)) => {
                tracing::warn!(
                    user_id = %job.user_id,
                    error = %PushError::QueueClosed,
                    "Dropping realtime push"
                );
                false
            }
        }
    }
}

/// Delivery counters reported when the worker stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PushStats {
    pub delivered: u64,
    pub no_session: u64,
    pub failed: u64,
}

/// Background task draining the push queue
pub struct PushWorker {
    handle: JoinHandle<PushStats>,
}

impl PushWorker {
    /// Wait for the queue to drain
    ///
    /// Returns once every [`PushQueue`] clone has been dropped and the
    /// remaining jobs were attempted.
    pub async fn join(self) -> PushStats {
        match self.handle.await {
            Ok(stats) => stats,
            Err(e) => {
                tracing::error!(error = %e, "Push worker terminated abnormally");
                PushStats::default()
            }
        }
    }
}

/// Start the push worker with a queue of `capacity` jobs
pub fn spawn_push_worker(
    transport: Arc<dyn PushTransport>,
    capacity: usize,
) -> (PushQueue, PushWorker) {
    let (sender, mut receiver) = mpsc::channel::<PushJob>(capacity.max(1));

    let handle = tokio::spawn(async move {
        let mut stats = PushStats::default();

        while let Some(job) = receiver.recv().await {
            match transport.push(&job.user_id, &job.payload).await {
                Ok(0) => {
                    stats.no_session += 1;
                    tracing::debug!(user_id = %job.user_id, "No live session for push");
                }
                Ok(sessions) => {
                    stats.delivered += 1;
                    tracing::debug!(user_id = %job.user_id, sessions, "Realtime push delivered");
                }
                Err(e) => {
                    stats.failed += 1;
                    tracing::warn!(user_id = %job.user_id, error = %e, "Realtime push failed");
                }
            }
        }

        tracing::info!(
            delivered = stats.delivered,
            no_session = stats.no_session,
            failed = stats.failed,
            "Push worker drained"
        );
        stats
    });

    (PushQueue { sender }, PushWorker { handle })
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn payload(title: &str) -> PushPayload {
        PushPayload {
            id: Uuid::new_v4(),
            title: title.to_string(),
            content: "content".to_string(),
            timestamp: 1_700_000_000_000,
            kind: PushPayload::JOB_MATCH.to_string(),
        }
    }

    #[test]
    fn test_channel_for() {
        assert_eq!(channel_for("user-42"), "notifications:user-42");
    }

    #[tokio::test]
    async fn test_registry_delivers_to_every_session() {
        let registry = SessionRegistry::new(4);
        let mut first = registry.register_session("u1").await.unwrap();
        let mut second = registry.register_session("u1").await.unwrap();

        let sent = payload("Rust Engineer");
        assert_eq!(registry.push("u1", &sent).await.unwrap(), 2);
        assert_eq!(registry.push("u2", &sent).await.unwrap(), 0);

        assert_eq!(first.recv().await, Some(sent.clone()));
        assert_eq!(second.recv().await, Some(sent));
    }

    #[tokio::test]
    async fn test_closed_sessions_are_pruned() {
        let registry = SessionRegistry::new(4);
        let session = registry.register_session("u1").await.unwrap();
        assert_eq!(registry.session_count("u1"), 1);

        drop(session);
        assert_eq!(registry.push("u1", &payload("x")).await.unwrap(), 0);
        assert_eq!(registry.session_count("u1"), 0);
    }

    #[tokio::test]
    async fn test_full_session_drops_instead_of_blocking() {
        let registry = SessionRegistry::new(1);
        let mut session = registry.register_session("u1").await.unwrap();

        assert_eq!(registry.push("u1", &payload("first")).await.unwrap(), 1);
        assert_eq!(registry.push("u1", &payload("second")).await.unwrap(), 0);

        assert_eq!(session.try_recv().map(|p| p.title), Some("first".to_string()));
        assert!(session.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_queue_drops_on_overflow_and_drains() {
        let registry = Arc::new(SessionRegistry::new(8));
        let mut session = registry.register_session("u1").await.unwrap();

        let (queue, worker) = spawn_push_worker(registry.clone(), 1);

        // The worker cannot run until this task yields
        assert!(queue.enqueue("u1", payload("kept")));
        assert!(!queue.enqueue("u1", payload("dropped")));

        drop(queue);
        let stats = worker.join().await;

        assert_eq!(stats.delivered, 1);
        assert_eq!(session.recv().await.map(|p| p.title), Some("kept".to_string()));
    }
}
