//! StatsRepository - where local stats meet the server.
//!
//! Session results are always written locally first. A sync sends the local
//! best score and the pending playtime; only a confirmed answer changes local
//! state, and only one sync is in flight at a time.

use crate::api::ApiClient;
use crate::dispatch::{Completion, Dispatcher, Generation};
use crate::error::Result;
use rover_engine::{
    apply_login, apply_sync_success, plan_sync, save_session_results, LocalStats, Preferences,
    SessionResult, SkipReason, SyncPlan, SyncRequest, UserRecord,
};

/// What a sync trigger did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    /// No request was made
    Skipped(SkipReason),
    /// A request is on its way, stamped with this generation
    Dispatched(Generation),
}

/// Owns the local stats and decides when to talk to the server.
#[derive(Debug)]
pub struct StatsRepository<P> {
    stats: LocalStats<P>,
    api: ApiClient,
    sync_in_flight: bool,
}

impl<P: Preferences> StatsRepository<P> {
    pub fn new(stats: LocalStats<P>, api: ApiClient) -> Self {
        Self {
            stats,
            api,
            sync_in_flight: false,
        }
    }

    pub fn stats(&self) -> &LocalStats<P> {
        &self.stats
    }

    pub fn stats_mut(&mut self) -> &mut LocalStats<P> {
        &mut self.stats
    }

    pub fn is_syncing(&self) -> bool {
        self.sync_in_flight
    }

    /// Record a finished run locally. Durable before this returns.
    pub fn save_session_results(&mut self, result: SessionResult) -> Result<()> {
        save_session_results(&mut self.stats, result)?;

        tracing::info!(
            score = result.score,
            playtime = result.playtime_secs,
            pending = self.stats.pending_playtime()?,
            best = self.stats.local_best_score()?,
            "Saved session locally"
        );
        Ok(())
    }

    /// Send pending stats to the server if there is anything to send.
    pub fn sync_data(
        &mut self,
        current_user: Option<&UserRecord>,
        dispatcher: &mut Dispatcher,
    ) -> Result<SyncStatus> {
        if self.sync_in_flight {
            tracing::debug!("Skipping sync: previous sync still in flight");
            return Ok(SyncStatus::Skipped(SkipReason::InFlight));
        }

        let request = match plan_sync(&self.stats, current_user)? {
            SyncPlan::Skip(reason) => {
                tracing::debug!(?reason, "Skipping sync");
                return Ok(SyncStatus::Skipped(reason));
            }
            SyncPlan::Send(request) => request,
        };

        tracing::info!(
            username = %request.username,
            score = request.score,
            playtime_delta = request.playtime_delta,
            "Syncing stats"
        );

        let api = self.api.clone();
        self.sync_in_flight = true;
        let generation = dispatcher.dispatch(async move {
            let outcome = api.update_stats(&request).await;
            Completion::Sync {
                sent: request,
                outcome,
            }
        });

        Ok(SyncStatus::Dispatched(generation))
    }

    /// Apply the result of a sync.
    ///
    /// On success the sent playtime is acknowledged, the best score merged,
    /// and the server's user returned. On failure nothing changes and the
    /// values stay queued for the next trigger.
    pub fn complete_sync(
        &mut self,
        sent: &SyncRequest,
        outcome: Result<UserRecord>,
    ) -> Result<Option<UserRecord>> {
        self.sync_in_flight = false;

        match outcome {
            Ok(user) => {
                let merged = apply_sync_success(&mut self.stats, sent, &user)?;
                tracing::info!(
                    acknowledged = merged.acknowledged_playtime,
                    best = merged.local_best_score,
                    pending = merged.pending_playtime,
                    "Sync successful"
                );
                Ok(Some(user))
            }
            Err(e) => {
                tracing::warn!(error = %e, "Sync failed. Data kept locally");
                Ok(None)
            }
        }
    }

    /// Remember a user that just logged in and pull their best score.
    pub fn process_login_data(&mut self, user: &UserRecord) -> Result<()> {
        apply_login(&mut self.stats, user)?;
        Ok(())
    }
}
