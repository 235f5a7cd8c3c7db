use crate::core::shard::ShardRouter;
use crate::models::{JobPostingEvent, SearchProfile};
use std::collections::BTreeSet;

/// Result of checking one matching dimension
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Dimension {
    /// The profile left this dimension empty; anything passes
    Wildcard,
    /// The profile constrained this dimension and the posting satisfies it.
    /// Carries the degree of fit in `0.0..=1.0`.
    Satisfied(f64),
    Rejected,
}

impl Dimension {
    #[inline]
    pub fn is_rejected(&self) -> bool {
        matches!(self, Dimension::Rejected)
    }
}

/// Employment type: the posting must offer at least one wanted type
#[inline]
pub fn check_employment_type(event: &JobPostingEvent, profile: &SearchProfile) -> Dimension {
    if profile.employment_types.is_empty() {
        return Dimension::Wildcard;
    }

    if event
        .employment_types
        .iter()
        .any(|t| profile.employment_types.contains(t))
    {
        Dimension::Satisfied(1.0)
    } else {
        Dimension::Rejected
    }
}

/// Skills: at least one desired skill must appear on the posting
///
/// The fit is the fraction of desired skills the posting covers. Comparison
/// ignores case and surrounding whitespace.
#[inline]
pub fn check_skills(event: &JobPostingEvent, profile: &SearchProfile) -> Dimension {
    let desired = normalize_set(&profile.desired_skills);
    if desired.is_empty() {
        return Dimension::Wildcard;
    }

    let offered = normalize_set(&event.skills);
    let overlap = desired.intersection(&offered).count();

    if overlap == 0 {
        Dimension::Rejected
    } else {
        Dimension::Satisfied(overlap as f64 / desired.len() as f64)
    }
}

/// Salary: ranges must overlap when both sides specify them
///
/// Each bound comparison only applies when both of its operands are present.
#[inline]
pub fn check_salary(event: &JobPostingEvent, profile: &SearchProfile) -> Dimension {
    if profile.min_salary.is_none() && profile.max_salary.is_none() {
        return Dimension::Wildcard;
    }

    if let (Some(event_min), Some(profile_max)) = (event.min_salary, profile.max_salary) {
        if event_min > profile_max {
            return Dimension::Rejected;
        }
    }

    if let (Some(event_max), Some(profile_min)) = (event.max_salary, profile.min_salary) {
        if event_max < profile_min {
            return Dimension::Rejected;
        }
    }

    Dimension::Satisfied(1.0)
}

/// Location: same country, same region, or a wildcard profile
#[inline]
pub fn check_location(
    event: &JobPostingEvent,
    profile: &SearchProfile,
    router: &ShardRouter,
) -> Dimension {
    if profile.is_location_wildcard() {
        return Dimension::Wildcard;
    }

    let desired = profile.desired_country.as_deref().unwrap_or_default().trim();

    if desired.eq_ignore_ascii_case(event.country_code.trim()) {
        return Dimension::Satisfied(1.0);
    }

    if router.region_for(desired) == router.region_for(&event.country_code) {
        // Same shard but a different country is a weaker fit
        return Dimension::Satisfied(0.5);
    }

    Dimension::Rejected
}

/// Title: one of the wanted titles must be a substring of the posting title
#[inline]
pub fn check_title(event: &JobPostingEvent, profile: &SearchProfile) -> Dimension {
    let wanted: Vec<String> = profile
        .job_titles
        .iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect();

    if wanted.is_empty() {
        return Dimension::Wildcard;
    }

    let title = event.title.to_lowercase();
    if wanted.iter().any(|t| title.contains(t.as_str())) {
        Dimension::Satisfied(1.0)
    } else {
        Dimension::Rejected
    }
}

fn normalize_set(values: &BTreeSet<String>) -> BTreeSet<String> {
    values
        .iter()
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EmploymentType;

    fn create_test_event() -> JobPostingEvent {
        JobPostingEvent {
            job_id: "job-1".to_string(),
            title: "Senior Go Developer".to_string(),
            skills: ["Go", "Kubernetes"].iter().map(|s| s.to_string()).collect(),
            employment_types: [EmploymentType::FullTime].into_iter().collect(),
            min_salary: Some(50_000),
            max_salary: Some(70_000),
            currency: Some("USD".to_string()),
            country_code: "VN".to_string(),
            is_active: true,
            posted_at: None,
        }
    }

    fn create_test_profile() -> SearchProfile {
        SearchProfile {
            id: "profile-1".to_string(),
            user_id: "user-1".to_string(),
            desired_skills: BTreeSet::new(),
            employment_types: BTreeSet::new(),
            job_titles: BTreeSet::new(),
            desired_country: None,
            min_salary: None,
            max_salary: None,
        }
    }

    #[test]
    fn test_empty_profile_is_all_wildcards() {
        let event = create_test_event();
        let profile = create_test_profile();
        let router = ShardRouter::default();

        assert_eq!(check_employment_type(&event, &profile), Dimension::Wildcard);
        assert_eq!(check_skills(&event, &profile), Dimension::Wildcard);
        assert_eq!(check_salary(&event, &profile), Dimension::Wildcard);
        assert_eq!(check_location(&event, &profile, &router), Dimension::Wildcard);
        assert_eq!(check_title(&event, &profile), Dimension::Wildcard);
    }

    #[test]
    fn test_skills_overlap_fraction() {
        let event = create_test_event();
        let mut profile = create_test_profile();
        profile.desired_skills = ["go", "rust"].iter().map(|s| s.to_string()).collect();

        assert_eq!(check_skills(&event, &profile), Dimension::Satisfied(0.5));

        profile.desired_skills = ["Java"].iter().map(|s| s.to_string()).collect();
        assert!(check_skills(&event, &profile).is_rejected());
    }

    #[test]
    fn test_employment_type_disjoint_rejects() {
        let event = create_test_event();
        let mut profile = create_test_profile();
        profile.employment_types = [EmploymentType::Contract].into_iter().collect();

        assert!(check_employment_type(&event, &profile).is_rejected());
    }

    #[test]
    fn test_salary_partial_bounds() {
        let event = create_test_event();
        let mut profile = create_test_profile();

        profile.min_salary = Some(75_000);
        assert!(check_salary(&event, &profile).is_rejected());

        profile.min_salary = None;
        profile.max_salary = Some(40_000);
        assert!(check_salary(&event, &profile).is_rejected());

        profile.max_salary = Some(55_000);
        assert_eq!(check_salary(&event, &profile), Dimension::Satisfied(1.0));
    }

    #[test]
    fn test_location_same_region() {
        let event = create_test_event();
        let mut profile = create_test_profile();
        let router = ShardRouter::default();

        profile.desired_country = Some("vn".to_string());
        assert_eq!(check_location(&event, &profile, &router), Dimension::Satisfied(1.0));

        profile.desired_country = Some("TH".to_string());
        assert_eq!(check_location(&event, &profile, &router), Dimension::Satisfied(0.5));

        profile.desired_country = Some("DE".to_string());
        assert!(check_location(&event, &profile, &router).is_rejected());
    }

    #[test]
    fn test_title_case_insensitive_substring() {
        let event = create_test_event();
        let mut profile = create_test_profile();

        profile.job_titles = ["go developer"].iter().map(|s| s.to_string()).collect();
        assert_eq!(check_title(&event, &profile), Dimension::Satisfied(1.0));

        profile.job_titles = ["Data Scientist"].iter().map(|s| s.to_string()).collect();
        assert!(check_title(&event, &profile).is_rejected());
    }
}
