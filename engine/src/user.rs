//! The server-owned user record, as cached by the client.

use crate::{Score, Seconds, UserId, Username};
use serde::{Deserialize, Serialize};

/// A user as reported by the stats server.
///
/// The server is authoritative for every field; the client only ever holds a
/// cached copy and refreshes it from login and sync responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Server-assigned identifier
    pub id: UserId,
    /// Unique login name, immutable after registration
    pub username: Username,
    /// Name shown on the statistics screen
    pub display_name: String,
    /// Highest score the server has seen for this user
    pub best_score: Score,
    /// Total acknowledged playtime in seconds
    pub total_playtime: Seconds,
}

impl UserRecord {
    /// Create a user record.
    pub fn new(
        id: UserId,
        username: impl Into<Username>,
        display_name: impl Into<String>,
        best_score: Score,
        total_playtime: Seconds,
    ) -> Self {
        Self {
            id,
            username: username.into(),
            display_name: display_name.into(),
            best_score,
            total_playtime,
        }
    }

    /// Total playtime split into whole hours and remaining whole minutes.
    pub fn playtime_breakdown(&self) -> (u64, u64) {
        let hours = self.total_playtime / 3600;
        let minutes = (self.total_playtime % 3600) / 60;
        (hours, minutes)
    }

    /// Total playtime as shown on the statistics screen, e.g. `"2h 5m"`.
    pub fn formatted_playtime(&self) -> String {
        let (hours, minutes) = self.playtime_breakdown();
        format!("{}h {}m", hours, minutes)
    }
}
