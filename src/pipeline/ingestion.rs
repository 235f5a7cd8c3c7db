use crate::core::{Matcher, Region, ScoredProfile};
use crate::models::{JobPostingEvent, MatchedJobPost};
use crate::pipeline::dispatcher::{DispatchOutcome, NotificationDispatcher};
use crate::services::{DedupStore, SearchProfileStore, StoreError, SubscriptionError, SubscriptionGateway};
use futures::future::{BoxFuture, FutureExt};
use futures::stream::{self, StreamExt};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use thiserror::Error;
use validator::Validate;

/// Failures that leave a message unacknowledged
///
/// Every variant is transient: the bus redelivers the message and the
/// dedup ledger absorbs whatever part of it already succeeded.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Candidate lookup failed: {0}")]
    CandidateLookup(#[source] StoreError),

    #[error("Subscription lookup failed: {0}")]
    Subscription(#[from] SubscriptionError),

    #[error("Match persistence failed: {0}")]
    Persistence(#[source] StoreError),
}

/// Lifecycle of a single bus message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageState {
    Received,
    Parsed,
    MatchedAndPersisted,
    Discarded,
    Acknowledged,
}

/// Counters for one processed posting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchSummary {
    pub job_id: String,
    pub region: Region,
    pub candidates: usize,
    pub matched: usize,
    pub claimed: usize,
    pub duplicates: usize,
    pub notified: usize,
}

/// Result of a message that can be acknowledged
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessingOutcome {
    /// Payload could not be decoded or failed validation
    Discarded { reason: String },
    /// Posting is inactive and inactive postings are skipped
    SkippedInactive { job_id: String },
    Processed(MatchSummary),
}

impl ProcessingOutcome {
    /// State the message reached before acknowledgement
    pub fn state(&self) -> MessageState {
        match self {
            ProcessingOutcome::Discarded { .. } => MessageState::Discarded,
            ProcessingOutcome::SkippedInactive { .. } => MessageState::Parsed,
            ProcessingOutcome::Processed(_) => MessageState::MatchedAndPersisted,
        }
    }
}

/// Ingestion policy knobs
#[derive(Debug, Clone, Copy)]
pub struct IngestionOptions {
    pub skip_inactive: bool,
    pub max_concurrency: usize,
}

impl Default for IngestionOptions {
    fn default() -> Self {
        Self {
            skip_inactive: true,
            max_concurrency: 16,
        }
    }
}

enum ClaimResult {
    Duplicate,
    Claimed { notified: bool },
}

/// Drives one job-posting payload through routing, matching, claiming and
/// dispatch
pub struct EventProcessor {
    matcher: Matcher,
    profiles: Arc<dyn SearchProfileStore>,
    dedup: Arc<dyn DedupStore>,
    gateway: Arc<dyn SubscriptionGateway>,
    dispatcher: Arc<NotificationDispatcher>,
    options: IngestionOptions,
}

impl EventProcessor {
    pub fn new(
        matcher: Matcher,
        profiles: Arc<dyn SearchProfileStore>,
        dedup: Arc<dyn DedupStore>,
        gateway: Arc<dyn SubscriptionGateway>,
        dispatcher: Arc<NotificationDispatcher>,
        options: IngestionOptions,
    ) -> Self {
        Self {
            matcher,
            profiles,
            dedup,
            gateway,
            dispatcher,
            options,
        }
    }

    /// Process one raw payload
    ///
    /// `Ok` means the message may be acknowledged. `Err` means it must not
    /// be: some candidate could not be looked up or claimed.
    pub async fn process(&self, payload: &[u8]) -> Result<ProcessingOutcome, IngestError> {
        let event = match parse_event(payload) {
            Ok(event) => event,
            Err(reason) => {
                tracing::warn!(reason = %reason, bytes = payload.len(), "Discarding malformed job posting event");
                return Ok(ProcessingOutcome::Discarded { reason });
            }
        };

        tracing::debug!(job_id = %event.job_id, state = ?MessageState::Parsed, "Job posting parsed");

        if self.options.skip_inactive && !event.is_active {
            tracing::info!(job_id = %event.job_id, "Skipping inactive job posting");
            return Ok(ProcessingOutcome::SkippedInactive { job_id: event.job_id });
        }

        let region = self.matcher.router().region_for(&event.country_code);

        let candidates = self
            .profiles
            .candidates_for(region, &event.country_code)
            .await
            .map_err(IngestError::CandidateLookup)?;
        let candidate_count = candidates.len();

        let matched = self.matcher.evaluate_all(&event, candidates);
        let matched_count = matched.len();

        let premium = self.prefetch_premium(&matched).await?;

        let event_ref = &event;
        let premium_ref = &premium;
        let results: Vec<Result<ClaimResult, StoreError>> = stream::iter(matched)
            .map(|scored| {
                let is_premium = premium_ref.get(&scored.profile.user_id).copied().unwrap_or(false);
                self.claim_and_dispatch(event_ref, scored, is_premium)
            })
            .buffer_unordered(self.options.max_concurrency.max(1))
            .collect()
            .await;

        let mut summary = MatchSummary {
            job_id: event.job_id.clone(),
            region,
            candidates: candidate_count,
            matched: matched_count,
            claimed: 0,
            duplicates: 0,
            notified: 0,
        };
        let mut first_error = None;

        for result in results {
            match result {
                Ok(ClaimResult::Duplicate) => summary.duplicates += 1,
                Ok(ClaimResult::Claimed { notified }) => {
                    summary.claimed += 1;
                    if notified {
                        summary.notified += 1;
                    }
                }
                Err(e) => {
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }

        if let Some(e) = first_error {
            tracing::warn!(
                job_id = %summary.job_id,
                claimed = summary.claimed,
                error = %e,
                "Match persistence failed, leaving message for redelivery"
            );
            return Err(IngestError::Persistence(e));
        }

        tracing::info!(
            job_id = %summary.job_id,
            region = %summary.region,
            candidates = summary.candidates,
            matched = summary.matched,
            claimed = summary.claimed,
            duplicates = summary.duplicates,
            notified = summary.notified,
            "Job posting processed"
        );

        Ok(ProcessingOutcome::Processed(summary))
    }

    /// Resolve premium status for every matched user before any write
    ///
    /// The returned statuses are handed to the dispatcher, so a posting sees
    /// one consistent answer per user.
    async fn prefetch_premium(&self, matched: &[ScoredProfile]) -> Result<HashMap<String, bool>, IngestError> {
        let users: BTreeSet<String> = matched.iter().map(|s| s.profile.user_id.clone()).collect();

        let results: Vec<Result<(String, bool), SubscriptionError>> = stream::iter(users)
            .map(|user_id| {
                let gateway = self.gateway.clone();
                async move {
                    let premium = gateway.is_premium(&user_id).await?;
                    Ok::<_, SubscriptionError>((user_id, premium))
                }
            })
            .buffer_unordered(self.options.max_concurrency.max(1))
            .collect()
            .await;

        let mut premium = HashMap::with_capacity(results.len());
        for result in results {
            let (user_id, is_premium) = result?;
            premium.insert(user_id, is_premium);
        }
        Ok(premium)
    }

    fn claim_and_dispatch<'a>(
        &'a self,
        event: &'a JobPostingEvent,
        scored: ScoredProfile,
        is_premium: bool,
    ) -> BoxFuture<'a, Result<ClaimResult, StoreError>> {
        async move {
            let matched = MatchedJobPost::new(&scored.profile, event, scored.score);

            if !self.dedup.claim(&matched).await? {
                tracing::debug!(
                    profile_id = %matched.profile_id,
                    job_id = %matched.job_id,
                    "Match already claimed"
                );
                return Ok(ClaimResult::Duplicate);
            }

            // The match is durable from here on; dispatch failures are not retried
            let notified = match self.dispatcher.dispatch_resolved(&matched, is_premium).await {
                Ok(DispatchOutcome::Notified { .. }) => true,
                Ok(_) => false,
                Err(e) => {
                    tracing::error!(
                        match_id = %matched.id,
                        user_id = %matched.user_id,
                        error = %e,
                        "Failed to dispatch notification for claimed match"
                    );
                    false
                }
            };

            Ok(ClaimResult::Claimed { notified })
        }
        .boxed()
    }
}

fn parse_event(payload: &[u8]) -> Result<JobPostingEvent, String> {
    let event: JobPostingEvent =
        serde_json::from_slice(payload).map_err(|e| format!("invalid JSON: {}", e))?;
    event
        .validate()
        .map_err(|e| format!("validation failed: {}", e))?;
    Ok(event)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_event_accepts_minimal_payload() {
        let event = parse_event(br#"{"jobId":"j1","title":"Engineer"}"#).unwrap();
        assert_eq!(event.job_id, "j1");
        assert!(event.is_active);
        assert!(event.skills.is_empty());
    }

    #[test]
    fn test_parse_event_rejects_bad_payloads() {
        assert!(parse_event(b"not json").is_err());
        assert!(parse_event(br#"{"jobId":"","title":"Engineer"}"#).is_err());
        assert!(parse_event(br#"{"jobId":"j1","title":"Engineer","minSalary":9,"maxSalary":1}"#).is_err());
        assert!(parse_event(br#"{"jobId":"j1","title":"Engineer","employmentTypes":["SOMETIMES"]}"#).is_err());
    }

    #[test]
    fn test_outcome_state() {
        let discarded = ProcessingOutcome::Discarded { reason: "x".to_string() };
        assert_eq!(discarded.state(), MessageState::Discarded);

        let skipped = ProcessingOutcome::SkippedInactive { job_id: "j".to_string() };
        assert_eq!(skipped.state(), MessageState::Parsed);
    }
}
