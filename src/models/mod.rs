// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{EmploymentType, JobPostingEvent, MatchDecision, MatchedJobPost, Notification, ScoringWeights, SearchProfile};
pub use requests::ListUnreadQuery;
pub use responses::{ErrorResponse, HealthResponse, NotificationActionResponse, PushPayload, UnreadNotificationsResponse};
