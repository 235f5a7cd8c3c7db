//! Job Alerts - event-driven job posting matcher
//!
//! Consumes job-posting events, routes them to a geographic shard, matches
//! them against stored search profiles, records every match exactly once
//! and alerts premium users through durable notifications plus a
//! best-effort realtime push.

pub mod config;
pub mod core;
pub mod models;
pub mod pipeline;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use core::{Matcher, Region, ShardRouter};
pub use models::{JobPostingEvent, MatchDecision, MatchedJobPost, Notification, ScoringWeights, SearchProfile};
pub use pipeline::{EventProcessor, IngestionOptions, NotificationDispatcher, ProcessingOutcome};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        let router = ShardRouter::default();
        assert_eq!(router.region_for("VN"), Region::SoutheastAsia);
        assert_eq!(Matcher::default().weights().skills, 0.40);
    }
}
