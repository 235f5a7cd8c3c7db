use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when asking the subscription service
#[derive(Debug, Error)]
pub enum SubscriptionError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    ApiError(String),

    #[error("Unauthorized: invalid API key")]
    Unauthorized,

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

/// Premium-status lookup owned by the payments module
#[async_trait]
pub trait SubscriptionGateway: Send + Sync {
    async fn is_premium(&self, user_id: &str) -> Result<bool, SubscriptionError>;
}

#[derive(Debug, Deserialize)]
struct SubscriptionStatus {
    #[serde(alias = "isPremium")]
    premium: bool,
}

/// HTTP client for the subscription service
///
/// `GET {base_url}/users/{userId}/subscription` answers
/// `{"premium": true|false}`. A 404 means the user never subscribed and is
/// reported as not premium; any other failure is an error the caller treats
/// as transient.
pub struct SubscriptionClient {
    base_url: String,
    api_key: String,
    client: Client,
}

impl SubscriptionClient {
    /// Create a new subscription client
    pub fn new(base_url: String, api_key: String, timeout: Duration) -> Result<Self, SubscriptionError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url,
            api_key,
            client,
        })
    }

    fn status_url(&self, user_id: &str) -> String {
        format!(
            "{}/users/{}/subscription",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(user_id)
        )
    }
}

#[async_trait]
impl SubscriptionGateway for SubscriptionClient {
    async fn is_premium(&self, user_id: &str) -> Result<bool, SubscriptionError> {
        let url = self.status_url(user_id);

        tracing::debug!("Fetching subscription status from: {}", url);

        let response = self
            .client
            .get(&url)
            .header("X-Api-Key", &self.api_key)
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => return Ok(false),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(SubscriptionError::Unauthorized)
            }
            status if !status.is_success() => {
                return Err(SubscriptionError::ApiError(format!(
                    "Failed to fetch subscription status: {}",
                    status
                )));
            }
            _ => {}
        }

        let status: SubscriptionStatus = response.json().await.map_err(|e| {
            SubscriptionError::InvalidResponse(format!("Failed to parse subscription status: {}", e))
        })?;

        Ok(status.premium)
    }
}
