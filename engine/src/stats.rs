//! LocalStats - the on-device record of stats not yet acknowledged.
//!
//! Holds the pending playtime accumulator, the local best score and the last
//! logged-in username on top of a [`Preferences`] backend. Every mutation is
//! written through: it is flushed before the call returns, so a crash right
//! after a run cannot lose its playtime. A mutation whose flush fails is
//! rolled back in memory and returns the error, leaving the store as it was.

use crate::{error::Result, PrefValue, Preferences, Score, Seconds, Username};
use serde::{Deserialize, Serialize};

pub(crate) const KEY_PENDING_PLAYTIME: &str = "pending_playtime";
pub(crate) const KEY_LOCAL_BEST_SCORE: &str = "local_best_score";
pub(crate) const KEY_USERNAME: &str = "username";

/// A read-only view of everything [`LocalStats`] tracks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingStats {
    /// Seconds played but not yet acknowledged by the server
    pub pending_playtime: Seconds,
    /// Highest score seen on this device or reported by the server
    pub local_best_score: Score,
    /// Last username that logged in on this device
    pub saved_username: Option<Username>,
}

/// Durable local stats.
#[derive(Debug, Clone)]
pub struct LocalStats<P> {
    prefs: P,
}

impl<P: Preferences> LocalStats<P> {
    /// Wrap a preferences backend.
    pub fn new(prefs: P) -> Self {
        Self { prefs }
    }

    /// Get the preferences backend.
    pub fn prefs(&self) -> &P {
        &self.prefs
    }

    /// Get the preferences backend mutably, for keys this type does not own.
    pub fn prefs_mut(&mut self) -> &mut P {
        &mut self.prefs
    }

    /// Unwrap the preferences backend.
    pub fn into_inner(self) -> P {
        self.prefs
    }

    pub fn pending_playtime(&self) -> Result<Seconds> {
        Ok(self.prefs.get_int(KEY_PENDING_PLAYTIME)?.unwrap_or(0))
    }

    pub fn local_best_score(&self) -> Result<Score> {
        Ok(self.prefs.get_int(KEY_LOCAL_BEST_SCORE)?.unwrap_or(0))
    }

    pub fn username(&self) -> Result<Option<Username>> {
        self.prefs.get_string(KEY_USERNAME)
    }

    /// Read everything at once.
    pub fn snapshot(&self) -> Result<PendingStats> {
        Ok(PendingStats {
            pending_playtime: self.pending_playtime()?,
            local_best_score: self.local_best_score()?,
            saved_username: self.username()?,
        })
    }

    /// Add a run's playtime to the accumulator.
    pub fn add_pending_playtime(&mut self, seconds: Seconds) -> Result<()> {
        let current = self.pending_playtime()?;
        self.write(
            KEY_PENDING_PLAYTIME,
            Some(PrefValue::Int(current.saturating_add(seconds))),
        )
    }

    /// Clear the accumulator. Only call after the server confirmed a sync.
    pub fn reset_pending_playtime(&mut self) -> Result<()> {
        self.write(KEY_PENDING_PLAYTIME, Some(PrefValue::Int(0)))
    }

    /// Remove exactly `sent` seconds from the accumulator after the server
    /// acknowledged them. Playtime added while the sync was in flight stays.
    pub fn acknowledge_playtime(&mut self, sent: Seconds) -> Result<()> {
        let remaining = self.pending_playtime()?.saturating_sub(sent);
        if remaining == 0 {
            return self.reset_pending_playtime();
        }
        self.write(KEY_PENDING_PLAYTIME, Some(PrefValue::Int(remaining)))
    }

    /// Raise the local best score to `score` if it is higher.
    ///
    /// Returns whether anything was written.
    pub fn update_best_score(&mut self, score: Score) -> Result<bool> {
        if score <= self.local_best_score()? {
            return Ok(false);
        }
        self.write(KEY_LOCAL_BEST_SCORE, Some(PrefValue::Int(score)))?;
        Ok(true)
    }

    pub fn save_username(&mut self, username: &str) -> Result<()> {
        self.write(KEY_USERNAME, Some(PrefValue::Str(username.to_string())))
    }

    /// Forget the saved username (logout).
    pub fn clear_username(&mut self) -> Result<()> {
        self.write(KEY_USERNAME, None)
    }

    /// Set or remove `key` and flush, restoring the old value if the flush
    /// fails.
    fn write(&mut self, key: &str, value: Option<PrefValue>) -> Result<()> {
        let previous = self.prefs.get(key).cloned();
        self.assign(key, value);

        if let Err(e) = self.prefs.flush() {
            self.assign(key, previous);
            return Err(e);
        }
        Ok(())
    }

    fn assign(&mut self, key: &str, value: Option<PrefValue>) {
        match value {
            Some(value) => self.prefs.put(key, value),
            None => self.prefs.remove(key),
        }
    }
}
