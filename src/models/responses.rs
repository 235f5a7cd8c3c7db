use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::models::domain::Notification;
use crate::services::CacheStats;

/// Payload pushed to a live session on `notifications:{userId}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushPayload {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub timestamp: i64,
    #[serde(rename = "type")]
    pub kind: String,
}

impl PushPayload {
    pub const JOB_MATCH: &'static str = "JOB_MATCH";
}

impl From<&Notification> for PushPayload {
    fn from(notification: &Notification) -> Self {
        Self {
            id: notification.id,
            title: notification.title.clone(),
            content: notification.content.clone(),
            timestamp: notification.timestamp.timestamp_millis(),
            kind: Self::JOB_MATCH.to_string(),
        }
    }
}

/// Unread notification listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnreadNotificationsResponse {
    pub notifications: Vec<Notification>,
    pub total_results: usize,
}

/// Result of a mark-as-read or delete call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationActionResponse {
    pub success: bool,
    pub notification_id: Uuid,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub subscription_cache: Option<CacheStats>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}
