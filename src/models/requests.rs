use serde::{Deserialize, Serialize};
use validator::Validate;

/// Query for listing a user's unread notifications
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ListUnreadQuery {
    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 200))]
    pub limit: u32,
}

fn default_limit() -> u32 {
    50
}

impl Default for ListUnreadQuery {
    fn default() -> Self {
        Self { limit: default_limit() }
    }
}
