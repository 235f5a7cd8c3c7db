// Core algorithm exports
pub mod filters;
pub mod matcher;
pub mod scoring;
pub mod shard;

pub use filters::{check_employment_type, check_location, check_salary, check_skills, check_title, Dimension};
pub use matcher::{Matcher, ScoredProfile};
pub use scoring::{calculate_match_score, DimensionScores};
pub use shard::{Region, ShardRouter};
