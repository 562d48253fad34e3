//! Text rendering of the statistics screen.

use rover_engine::{PendingStats, UserRecord};

/// Lines of the statistics screen for `user`, followed by what is still
/// waiting to be synced from this device.
pub fn stats_lines(user: Option<&UserRecord>, pending: &PendingStats) -> Vec<String> {
    let mut lines = vec!["STATISTICS".to_string()];

    match user {
        Some(user) => {
            lines.push(row("Name:", &user.display_name));
            lines.push(row("Username:", &format!("@{}", user.username)));
            lines.push(row("Best Score:", &user.best_score.to_string()));
            lines.push(row("Total Time:", &user.formatted_playtime()));
        }
        None => lines.push("You are not logged in.".to_string()),
    }

    lines.push(String::new());
    lines.push(row("Local Best:", &pending.local_best_score.to_string()));
    lines.push(row("Unsynced Time:", &format!("{}s", pending.pending_playtime)));
    if let Some(saved) = &pending.saved_username {
        lines.push(row("Saved User:", &format!("@{saved}")));
    }

    lines
}

fn row(title: &str, value: &str) -> String {
    format!("{title:>14} {value}")
}
