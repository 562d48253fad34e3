//! Reconciliation of local stats with the server's authoritative record.
//!
//! The client is authoritative for what it has earned locally, the server is
//! authoritative for totals. A sync carries the local best score and the
//! pending playtime; the server adds the playtime to its total, ratchets its
//! best score and answers with the resulting [`UserRecord`].
//!
//! # Merge rules
//!
//! 1. Session results are written locally first, always
//! 2. A sync is only attempted when there is a username and something to send
//! 3. On success the playtime that was sent is acknowledged (never resent)
//! 4. On success the local best score is raised to the server's if higher
//! 5. On failure nothing changes; the values stay queued for the next trigger

use crate::{
    error::Result, LocalStats, Preferences, Score, SessionResult, Seconds, UserRecord, Username,
};
use serde::{Deserialize, Serialize};

/// Body of an `/update_stats` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncRequest {
    /// User the stats belong to
    pub username: Username,
    /// Local best score
    pub score: Score,
    /// Playtime not yet acknowledged, in seconds
    pub playtime_delta: Seconds,
}

/// Why a sync was not attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SkipReason {
    /// Nobody has ever logged in on this device
    NoUsername,
    /// Pending playtime and best score are both zero
    NothingToSend,
    /// A previous sync has not completed yet
    InFlight,
}

/// Outcome of planning a sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SyncPlan {
    Skip(SkipReason),
    Send(SyncRequest),
}

/// What a successful sync changed locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncOutcome {
    /// Seconds removed from the pending accumulator
    pub acknowledged_playtime: Seconds,
    /// Whether the server's best score replaced the local one
    pub best_score_raised: bool,
    /// Local best score after the merge
    pub local_best_score: Score,
    /// Pending playtime after the merge
    pub pending_playtime: Seconds,
}

/// Record a finished run.
///
/// Both values are durable before this returns. Calling it twice for the same
/// successful run counts the playtime twice; retrying after an error does
/// not, since the playtime is written last and only kept if it was flushed.
pub fn save_session_results<P: Preferences>(
    stats: &mut LocalStats<P>,
    result: SessionResult,
) -> Result<()> {
    stats.update_best_score(result.score)?;
    stats.add_pending_playtime(result.playtime_secs)?;
    Ok(())
}

/// Decide whether a sync is worth attempting and what it carries.
///
/// The logged-in user's name is preferred; the last saved username is the
/// fallback. Having neither is a silent skip.
pub fn plan_sync<P: Preferences>(
    stats: &LocalStats<P>,
    current_user: Option<&UserRecord>,
) -> Result<SyncPlan> {
    let username = match current_user {
        Some(user) => Some(user.username.clone()),
        None => stats.username()?,
    };

    let Some(username) = username else {
        return Ok(SyncPlan::Skip(SkipReason::NoUsername));
    };

    let pending = stats.pending_playtime()?;
    let best = stats.local_best_score()?;

    if pending == 0 && best == 0 {
        return Ok(SyncPlan::Skip(SkipReason::NothingToSend));
    }

    Ok(SyncPlan::Send(SyncRequest {
        username,
        score: best,
        playtime_delta: pending,
    }))
}

/// Merge the server's answer to `sent` into local state.
///
/// The playtime carried by `sent` is acknowledged whatever the server
/// reports, so a later sync cannot count it twice.
pub fn apply_sync_success<P: Preferences>(
    stats: &mut LocalStats<P>,
    sent: &SyncRequest,
    server: &UserRecord,
) -> Result<SyncOutcome> {
    stats.acknowledge_playtime(sent.playtime_delta)?;
    let best_score_raised = stats.update_best_score(server.best_score)?;

    Ok(SyncOutcome {
        acknowledged_playtime: sent.playtime_delta,
        best_score_raised,
        local_best_score: stats.local_best_score()?,
        pending_playtime: stats.pending_playtime()?,
    })
}

/// Merge a freshly logged-in user into local state.
///
/// Remembers the username for later syncs and pulls the server's best score
/// up into the local one. The local score never goes down.
pub fn apply_login<P: Preferences>(stats: &mut LocalStats<P>, user: &UserRecord) -> Result<()> {
    stats.save_username(&user.username)?;
    stats.update_best_score(user.best_score)?;
    Ok(())
}
