use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Kind of employment offered by a posting or wanted by a profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EmploymentType {
    #[serde(alias = "FULLTIME")]
    FullTime,
    #[serde(alias = "PARTTIME")]
    PartTime,
    Contract,
    Internship,
    Freelance,
    Temporary,
}

impl EmploymentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmploymentType::FullTime => "FULL_TIME",
            EmploymentType::PartTime => "PART_TIME",
            EmploymentType::Contract => "CONTRACT",
            EmploymentType::Internship => "INTERNSHIP",
            EmploymentType::Freelance => "FREELANCE",
            EmploymentType::Temporary => "TEMPORARY",
        }
    }
}

impl FromStr for EmploymentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "FULL_TIME" | "FULLTIME" => Ok(EmploymentType::FullTime),
            "PART_TIME" | "PARTTIME" => Ok(EmploymentType::PartTime),
            "CONTRACT" => Ok(EmploymentType::Contract),
            "INTERNSHIP" => Ok(EmploymentType::Internship),
            "FREELANCE" => Ok(EmploymentType::Freelance),
            "TEMPORARY" => Ok(EmploymentType::Temporary),
            other => Err(format!("unknown employment type: {}", other)),
        }
    }
}

impl fmt::Display for EmploymentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Job posting event published by the job management system
///
/// Immutable once received. The bus delivers at least once, so the same
/// `jobId` may arrive any number of times.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_salary_range"))]
#[serde(rename_all = "camelCase")]
pub struct JobPostingEvent {
    #[validate(length(min = 1, max = 255))]
    pub job_id: String,
    #[validate(length(min = 1))]
    pub title: String,
    #[serde(default)]
    pub skills: BTreeSet<String>,
    #[serde(default)]
    pub employment_types: BTreeSet<EmploymentType>,
    #[serde(default)]
    pub min_salary: Option<i64>,
    #[serde(default)]
    pub max_salary: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    #[validate(length(max = 8))]
    pub country_code: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub posted_at: Option<DateTime<Utc>>,
}

fn validate_salary_range(event: &JobPostingEvent) -> Result<(), ValidationError> {
    if let (Some(min), Some(max)) = (event.min_salary, event.max_salary) {
        if min > max {
            return Err(ValidationError::new("salary_range_inverted"));
        }
    }
    Ok(())
}

fn default_true() -> bool { true }

/// A user's stored search criteria
///
/// Owned by the profile module; this crate only reads it. Empty collections
/// and an empty or `remote` country are wildcards.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchProfile {
    pub id: String,
    pub user_id: String,
    #[serde(default)]
    pub desired_skills: BTreeSet<String>,
    #[serde(default)]
    pub employment_types: BTreeSet<EmploymentType>,
    #[serde(default)]
    pub job_titles: BTreeSet<String>,
    #[serde(default)]
    pub desired_country: Option<String>,
    #[serde(default)]
    pub min_salary: Option<i64>,
    #[serde(default)]
    pub max_salary: Option<i64>,
}

impl SearchProfile {
    /// True when the desired country accepts postings from anywhere
    pub fn is_location_wildcard(&self) -> bool {
        match self.desired_country.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(country) => country.eq_ignore_ascii_case("remote"),
        }
    }
}

/// Permanent record of a profile matching a posting
///
/// At most one exists per `(profile_id, job_id)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchedJobPost {
    pub id: Uuid,
    pub profile_id: String,
    pub job_id: String,
    pub user_id: String,
    pub job_title: String,
    pub match_score: f64,
    pub matched_at: DateTime<Utc>,
}

impl MatchedJobPost {
    pub fn new(profile: &SearchProfile, event: &JobPostingEvent, match_score: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            profile_id: profile.id.clone(),
            job_id: event.job_id.clone(),
            user_id: profile.user_id.clone(),
            job_title: event.title.clone(),
            match_score,
            matched_at: Utc::now(),
        }
    }
}

/// Outcome of evaluating one posting against one profile
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchDecision {
    pub is_match: bool,
    pub score: f64,
}

impl MatchDecision {
    pub fn reject() -> Self {
        Self { is_match: false, score: 0.0 }
    }
}

/// Durable alert shown to a premium user
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    pub user_id: String,
    pub title: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub read: bool,
    pub source_match_id: Uuid,
}

impl Notification {
    pub fn for_match(matched: &MatchedJobPost) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: matched.user_id.clone(),
            title: format!("New job match: {}", matched.job_title),
            content: format!(
                "\"{}\" matches one of your search profiles (score {:.0}).",
                matched.job_title, matched.match_score
            ),
            timestamp: Utc::now(),
            read: false,
            source_match_id: matched.id,
        }
    }
}

/// Scoring weights for the match score
#[derive(Debug, Clone, Copy)]
pub struct ScoringWeights {
    pub skills: f64,
    pub title: f64,
    pub employment_type: f64,
    pub salary: f64,
    pub location: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            skills: 0.40,
            title: 0.20,
            employment_type: 0.15,
            salary: 0.15,
            location: 0.10,
        }
    }
}
