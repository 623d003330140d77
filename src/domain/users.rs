//! User profile documents: identity plus cumulative match statistics.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::domain::state::UserId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub user_id: UserId,
    pub display_name: String,
    pub matches_played: u32,
    pub matches_won: u32,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl UserProfile {
    pub fn new(user_id: impl Into<UserId>) -> Self {
        let user_id = user_id.into();
        Self {
            display_name: user_id.clone(),
            user_id,
            matches_played: 0,
            matches_won: 0,
            updated_at: OffsetDateTime::now_utc(),
        }
    }
}
