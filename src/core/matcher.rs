use crate::core::{
    filters::{check_employment_type, check_location, check_salary, check_skills, check_title},
    scoring::{calculate_match_score, DimensionScores},
    shard::ShardRouter,
};
use crate::models::{JobPostingEvent, MatchDecision, ScoringWeights, SearchProfile};
use std::cmp::Ordering;

/// A candidate profile that matched a posting
#[derive(Debug, Clone)]
pub struct ScoredProfile {
    pub profile: SearchProfile,
    pub score: f64,
}

/// Matching engine - decides whether a posting is relevant to a profile
///
/// # Decision Stages
/// 1. Employment type
/// 2. Skills overlap
/// 3. Salary range overlap
/// 4. Location (country or shard region)
/// 5. Title substring
///
/// Every stage is a wildcard pass when the profile leaves it empty. The
/// matcher holds no mutable state, so one instance can evaluate many
/// profiles in parallel.
#[derive(Debug, Clone)]
pub struct Matcher {
    weights: ScoringWeights,
    router: ShardRouter,
}

impl Matcher {
    pub fn new(weights: ScoringWeights, router: ShardRouter) -> Self {
        Self { weights, router }
    }

    pub fn with_default_weights() -> Self {
        Self {
            weights: ScoringWeights::default(),
            router: ShardRouter::default(),
        }
    }

    pub fn router(&self) -> &ShardRouter {
        &self.router
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Evaluate one posting against one profile
    ///
    /// Pure: the same inputs always produce the same decision and score.
    /// `is_active` is deliberately ignored here; skipping inactive postings
    /// is the caller's policy.
    pub fn evaluate(&self, event: &JobPostingEvent, profile: &SearchProfile) -> MatchDecision {
        let dimensions = DimensionScores {
            employment_type: check_employment_type(event, profile),
            skills: check_skills(event, profile),
            salary: check_salary(event, profile),
            location: check_location(event, profile, &self.router),
            title: check_title(event, profile),
        };

        if dimensions.any_rejected() {
            return MatchDecision::reject();
        }

        MatchDecision {
            is_match: true,
            score: calculate_match_score(&dimensions, &self.weights),
        }
    }

    /// Evaluate a posting against every candidate
    ///
    /// Returns only the matching profiles, best score first. Ties keep
    /// candidate order.
    pub fn evaluate_all(
        &self,
        event: &JobPostingEvent,
        candidates: Vec<SearchProfile>,
    ) -> Vec<ScoredProfile> {
        let mut matched: Vec<ScoredProfile> = candidates
            .into_iter()
            .filter_map(|profile| {
                let decision = self.evaluate(event, &profile);
                decision.is_match.then_some(ScoredProfile {
                    profile,
                    score: decision.score,
                })
            })
            .collect();

        matched.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));

        matched
    }
}

impl Default for Matcher {
    fn default() -> Self {
        Self::with_default_weights()
    }
}
