//! In-process store implementations
//!
//! Same contracts as the Postgres stores, backed by mutex-guarded
//! collections. Each store can be switched into an unavailable state to
//! exercise the pipeline's transient-failure paths.

use crate::core::{Region, ShardRouter};
use crate::models::{MatchedJobPost, Notification, SearchProfile};
use crate::services::stores::{DedupStore, NotificationStore, SearchProfileStore, StoreError};
use crate::services::subscription::{SubscriptionError, SubscriptionGateway};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, RwLock};
use uuid::Uuid;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // A poisoned lock only means another test thread panicked mid-update
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Dedup ledger keyed by `(profile_id, job_id)`
#[derive(Default)]
pub struct InMemoryDedupStore {
    matches: Mutex<HashMap<(String, String), MatchedJobPost>>,
    unavailable: AtomicBool,
    fail_once: Mutex<HashSet<String>>,
}

impl InMemoryDedupStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Fail the next claim for one profile; other profiles are unaffected
    pub fn fail_next_claim_for(&self, profile_id: &str) {
        lock(&self.fail_once).insert(profile_id.to_string());
    }

    pub fn len(&self) -> usize {
        lock(&self.matches).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn matches(&self) -> Vec<MatchedJobPost> {
        lock(&self.matches).values().cloned().collect()
    }

    pub fn get(&self, profile_id: &str, job_id: &str) -> Option<MatchedJobPost> {
        lock(&self.matches)
            .get(&(profile_id.to_string(), job_id.to_string()))
            .cloned()
    }
}

#[async_trait]
impl DedupStore for InMemoryDedupStore {
    async fn claim(&self, matched: &MatchedJobPost) -> Result<bool, StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("dedup store offline".to_string()));
        }
        if lock(&self.fail_once).remove(&matched.profile_id) {
            return Err(StoreError::Unavailable(format!(
                "claim for profile {} failed",
                matched.profile_id
            )));
        }

        let key = (matched.profile_id.clone(), matched.job_id.clone());
        let mut matches = lock(&self.matches);
        if matches.contains_key(&key) {
            return Ok(false);
        }
        matches.insert(key, matched.clone());
        Ok(true)
    }
}

/// Candidate index over a fixed list of profiles
pub struct InMemoryProfileStore {
    profiles: RwLock<Vec<SearchProfile>>,
    router: ShardRouter,
    unavailable: AtomicBool,
}

impl InMemoryProfileStore {
    pub fn new(router: ShardRouter) -> Self {
        Self {
            profiles: RwLock::new(Vec::new()),
            router,
            unavailable: AtomicBool::new(false),
        }
    }

    pub fn with_profiles(router: ShardRouter, profiles: Vec<SearchProfile>) -> Self {
        Self {
            profiles: RwLock::new(profiles),
            router,
            unavailable: AtomicBool::new(false),
        }
    }

    pub fn add(&self, profile: SearchProfile) {
        self.profiles
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(profile);
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn is_candidate(&self, profile: &SearchProfile, region: Region, country_code: &str) -> bool {
        if profile.is_location_wildcard() {
            return true;
        }
        let desired = profile.desired_country.as_deref().unwrap_or_default().trim();
        desired.eq_ignore_ascii_case(country_code.trim()) || self.router.region_for(desired) == region
    }
}

#[async_trait]
impl SearchProfileStore for InMemoryProfileStore {
    async fn candidates_for(
        &self,
        region: Region,
        country_code: &str,
    ) -> Result<Vec<SearchProfile>, StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("profile store offline".to_string()));
        }

        let profiles = self
            .profiles
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        Ok(profiles
            .iter()
            .filter(|p| self.is_candidate(p, region, country_code))
            .cloned()
            .collect())
    }
}

/// Notification rows, unique per source match
#[derive(Default)]
pub struct InMemoryNotificationStore {
    notifications: Mutex<Vec<Notification>>,
    unavailable: AtomicBool,
}

impl InMemoryNotificationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn all(&self) -> Vec<Notification> {
        lock(&self.notifications).clone()
    }

    pub fn count_for(&self, user_id: &str) -> usize {
        lock(&self.notifications)
            .iter()
            .filter(|n| n.user_id == user_id)
            .count()
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("notification store offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl NotificationStore for InMemoryNotificationStore {
    async fn insert(&self, notification: &Notification) -> Result<bool, StoreError> {
        self.check_available()?;

        let mut notifications = lock(&self.notifications);
        if notifications
            .iter()
            .any(|n| n.source_match_id == notification.source_match_id)
        {
            return Ok(false);
        }
        notifications.push(notification.clone());
        Ok(true)
    }

    async fn list_unread(&self, user_id: &str, limit: u32) -> Result<Vec<Notification>, StoreError> {
        self.check_available()?;

        let mut unread: Vec<Notification> = lock(&self.notifications)
            .iter()
            .filter(|n| n.user_id == user_id && !n.read)
            .cloned()
            .collect();
        unread.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        unread.truncate(limit as usize);
        Ok(unread)
    }

    async fn mark_read(&self, user_id: &str, notification_id: Uuid) -> Result<bool, StoreError> {
        self.check_available()?;

        let mut notifications = lock(&self.notifications);
        match notifications
            .iter_mut()
            .find(|n| n.id == notification_id && n.user_id == user_id)
        {
            Some(n) => {
                n.read = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, user_id: &str, notification_id: Uuid) -> Result<bool, StoreError> {
        self.check_available()?;

        let mut notifications = lock(&self.notifications);
        let before = notifications.len();
        notifications.retain(|n| !(n.id == notification_id && n.user_id == user_id));
        Ok(notifications.len() < before)
    }

    async fn health_check(&self) -> Result<bool, StoreError> {
        Ok(!self.unavailable.load(Ordering::SeqCst))
    }
}

/// Subscription gateway answering from a fixed set of premium users
#[derive(Default)]
pub struct StaticSubscriptionGateway {
    premium: RwLock<HashSet<String>>,
    unavailable: AtomicBool,
    calls: AtomicUsize,
}

impl StaticSubscriptionGateway {
    pub fn new<I, S>(premium_users: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            premium: RwLock::new(premium_users.into_iter().map(Into::into).collect()),
            unavailable: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set_premium(&self, user_id: &str, premium: bool) {
        let mut users = self
            .premium
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if premium {
            users.insert(user_id.to_string());
        } else {
            users.remove(user_id);
        }
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of lookups served so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SubscriptionGateway for StaticSubscriptionGateway {
    async fn is_premium(&self, user_id: &str) -> Result<bool, SubscriptionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.unavailable.load(Ordering::SeqCst) {
            return Err(SubscriptionError::ApiError("subscription service offline".to_string()));
        }

        Ok(self
            .premium
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains(user_id))
    }
}
