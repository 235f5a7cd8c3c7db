use crate::core::filters::Dimension;
use crate::models::ScoringWeights;

/// Per-dimension results for one (posting, profile) pair
#[derive(Debug, Clone, Copy)]
pub struct DimensionScores {
    pub skills: Dimension,
    pub title: Dimension,
    pub employment_type: Dimension,
    pub salary: Dimension,
    pub location: Dimension,
}

impl DimensionScores {
    pub fn any_rejected(&self) -> bool {
        self.skills.is_rejected()
            || self.title.is_rejected()
            || self.employment_type.is_rejected()
            || self.salary.is_rejected()
            || self.location.is_rejected()
    }
}

/// Calculate a ranking score (0-100) from per-dimension results
///
/// Scoring formula:
/// score = (
///     skills * 0.40 +            # overlap fraction of desired skills
///     title * 0.20 +
///     employment_type * 0.15 +
///     salary * 0.15 +
///     location * 0.10            # same country 1.0, same region 0.5
/// )
///
/// A wildcard dimension counts for half its weight. The score only ranks
/// matches; it never decides whether something is a match.
pub fn calculate_match_score(dimensions: &DimensionScores, weights: &ScoringWeights) -> f64 {
    let total_weight = weights.skills
        + weights.title
        + weights.employment_type
        + weights.salary
        + weights.location;

    if total_weight <= 0.0 {
        return 0.0;
    }

    let weighted = dimension_value(dimensions.skills) * weights.skills
        + dimension_value(dimensions.title) * weights.title
        + dimension_value(dimensions.employment_type) * weights.employment_type
        + dimension_value(dimensions.salary) * weights.salary
        + dimension_value(dimensions.location) * weights.location;

    ((weighted / total_weight) * 100.0).clamp(0.0, 100.0)
}

#[inline]
fn dimension_value(dimension: Dimension) -> f64 {
    match dimension {
        Dimension::Wildcard => 0.5,
        Dimension::Satisfied(fit) => fit.clamp(0.0, 1.0),
        Dimension::Rejected => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all(dimension: Dimension) -> DimensionScores {
        DimensionScores {
            skills: dimension,
            title: dimension,
            employment_type: dimension,
            salary: dimension,
            location: dimension,
        }
    }

    #[test]
    fn test_perfect_match_scores_100() {
        let score = calculate_match_score(&all(Dimension::Satisfied(1.0)), &ScoringWeights::default());
        assert!((score - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_all_wildcards_score_50() {
        let score = calculate_match_score(&all(Dimension::Wildcard), &ScoringWeights::default());
        assert!((score - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_skills_weighted_highest() {
        let weights = ScoringWeights::default();
        let mut full_skills = all(Dimension::Wildcard);
        full_skills.skills = Dimension::Satisfied(1.0);
        let mut full_location = all(Dimension::Wildcard);
        full_location.location = Dimension::Satisfied(1.0);

        assert!(
            calculate_match_score(&full_skills, &weights)
                > calculate_match_score(&full_location, &weights)
        );
    }

    #[test]
    fn test_zero_weights() {
        let weights = ScoringWeights {
            skills: 0.0,
            title: 0.0,
            employment_type: 0.0,
            salary: 0.0,
            location: 0.0,
        };
        assert_eq!(calculate_match_score(&all(Dimension::Satisfied(1.0)), &weights), 0.0);
    }

    #[test]
    fn test_any_rejected() {
        let mut dims = all(Dimension::Wildcard);
        assert!(!dims.any_rejected());
        dims.salary = Dimension::Rejected;
        assert!(dims.any_rejected());
    }
}
