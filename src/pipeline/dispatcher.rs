use crate::models::{MatchedJobPost, Notification, PushPayload};
use crate::services::{NotificationStore, PushQueue, StoreError, SubscriptionError, SubscriptionGateway};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur while dispatching a match
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Subscription lookup failed: {0}")]
    Subscription(#[from] SubscriptionError),

    #[error("Notification persistence failed: {0}")]
    Persistence(#[from] StoreError),
}

/// What happened to a claimed match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Freemium user; no notification is created
    NotPremium,
    /// Notification stored; `pushed` reports whether a realtime push was queued
    Notified { notification_id: Uuid, pushed: bool },
    /// A notification for this match already exists
    AlreadyNotified,
}

/// Turns claimed matches into durable notifications plus a best-effort push
pub struct NotificationDispatcher {
    gateway: Arc<dyn SubscriptionGateway>,
    notifications: Arc<dyn NotificationStore>,
    push: PushQueue,
}

impl NotificationDispatcher {
    pub fn new(
        gateway: Arc<dyn SubscriptionGateway>,
        notifications: Arc<dyn NotificationStore>,
        push: PushQueue,
    ) -> Self {
        Self {
            gateway,
            notifications,
            push,
        }
    }

    /// Notify the owner of a claimed match if they are premium
    ///
    /// Success means the notification row is durable. The realtime push is
    /// only queued; a full queue or a user with no live session is not an
    /// error.
    pub async fn dispatch(&self, matched: &MatchedJobPost) -> Result<DispatchOutcome, DispatchError> {
        let premium = self.gateway.is_premium(&matched.user_id).await?;
        self.dispatch_resolved(matched, premium).await
    }

    /// Same as [`dispatch`](Self::dispatch) with premium status already known
    pub async fn dispatch_resolved(
        &self,
        matched: &MatchedJobPost,
        premium: bool,
    ) -> Result<DispatchOutcome, DispatchError> {
        if !premium {
            tracing::debug!(
                user_id = %matched.user_id,
                job_id = %matched.job_id,
                "Skipping notification for non-premium user"
            );
            return Ok(DispatchOutcome::NotPremium);
        }

        let notification = Notification::for_match(matched);

        if !self.notifications.insert(&notification).await? {
            tracing::debug!(match_id = %matched.id, "Notification already exists for match");
            return Ok(DispatchOutcome::AlreadyNotified);
        }

        let pushed = self
            .push
            .enqueue(&notification.user_id, PushPayload::from(&notification));

        tracing::info!(
            user_id = %notification.user_id,
            job_id = %matched.job_id,
            notification_id = %notification.id,
            pushed,
            "Notification dispatched"
        );

        Ok(DispatchOutcome::Notified {
            notification_id: notification.id,
            pushed,
        })
    }
}
