//! Session tokens persisted in place of credentials.
//!
//! Login and registration answers may carry an opaque token with a lifetime.
//! The token and its absolute expiry are stored next to the stats; the
//! password never is. Older clients cached the plaintext password under
//! `password`, which is purged on startup.

use chrono::{DateTime, Duration, Utc};
use rover_engine::{error::Result, Preferences};

pub(crate) const KEY_SESSION_TOKEN: &str = "session_token";
pub(crate) const KEY_SESSION_EXPIRES_AT: &str = "session_expires_at";
const KEY_LEGACY_PASSWORD: &str = "password";

/// A server-issued credential with an explicit expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl SessionToken {
    pub fn new(token: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            token: token.into(),
            expires_at,
        }
    }

    /// A token issued at `now` that lives for `expires_in` seconds.
    pub fn issued(token: impl Into<String>, now: DateTime<Utc>, expires_in: u64) -> Self {
        let expires_at = i64::try_from(expires_in)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self::new(token, expires_at)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Reads and writes the session token in a preferences backend.
pub struct TokenStore<'a, P> {
    prefs: &'a mut P,
}

impl<'a, P: Preferences> TokenStore<'a, P> {
    pub fn new(prefs: &'a mut P) -> Self {
        Self { prefs }
    }

    /// Load the stored token if it is still valid.
    ///
    /// An expired or unreadable entry is removed and reads as `None`.
    pub fn load(&mut self, now: DateTime<Utc>) -> Result<Option<SessionToken>> {
        let Some(token) = self.prefs.get_string(KEY_SESSION_TOKEN)? else {
            return Ok(None);
        };

        let expires_at = self
            .prefs
            .get_int(KEY_SESSION_EXPIRES_AT)?
            .and_then(|secs| i64::try_from(secs).ok())
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0));

        let Some(expires_at) = expires_at else {
            tracing::warn!("Stored session token has no usable expiry; discarding");
            self.clear()?;
            return Ok(None);
        };

        let session = SessionToken::new(token, expires_at);
        if session.is_expired(now) {
            tracing::info!(expired_at = %session.expires_at, "Stored session token expired");
            self.clear()?;
            return Ok(None);
        }

        Ok(Some(session))
    }

    pub fn save(&mut self, session: &SessionToken) -> Result<()> {
        let expires_at = u64::try_from(session.expires_at.timestamp()).unwrap_or(0);
        self.prefs.put_string(KEY_SESSION_TOKEN, &session.token);
        self.prefs.put_int(KEY_SESSION_EXPIRES_AT, expires_at);
        self.prefs.flush()
    }

    pub fn clear(&mut self) -> Result<()> {
        self.prefs.remove(KEY_SESSION_TOKEN);
        self.prefs.remove(KEY_SESSION_EXPIRES_AT);
        self.prefs.flush()
    }
}

/// Remove a plaintext password cached by an older client.
///
/// Returns whether one was found.
pub fn purge_legacy_credentials<P: Preferences>(prefs: &mut P) -> Result<bool> {
    if prefs.get(KEY_LEGACY_PASSWORD).is_none() {
        return Ok(false);
    }
    prefs.remove(KEY_LEGACY_PASSWORD);
    prefs.flush()?;
    tracing::info!("Removed cached plaintext password");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rover_engine::MemoryPreferences;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(secs, 0).unwrap()
    }

    #[test]
    fn issued_token_expiry() {
        let token = SessionToken::issued("abc", at(1_000), 60);
        assert_eq!(token.expires_at, at(1_060));
        assert!(!token.is_expired(at(1_059)));
        assert!(token.is_expired(at(1_060)));
    }

    #[test]
    fn save_then_load() {
        let mut prefs = MemoryPreferences::new();
        let token = SessionToken::new("abc", at(2_000));

        TokenStore::new(&mut prefs).save(&token).unwrap();
        let loaded = TokenStore::new(&mut prefs).load(at(1_000)).unwrap();

        assert_eq!(loaded, Some(token));
        assert_eq!(prefs.get_int(KEY_SESSION_EXPIRES_AT).unwrap(), Some(2_000));
    }

    #[test]
    fn expired_token_is_discarded() {
        let mut prefs = MemoryPreferences::new();
        TokenStore::new(&mut prefs)
            .save(&SessionToken::new("abc", at(2_000)))
            .unwrap();

        assert_eq!(TokenStore::new(&mut prefs).load(at(3_000)).unwrap(), None);
        assert_eq!(prefs.get_string(KEY_SESSION_TOKEN).unwrap(), None);
        assert_eq!(prefs.get_int(KEY_SESSION_EXPIRES_AT).unwrap(), None);
    }

    #[test]
    fn token_without_expiry_is_discarded() {
        let mut prefs = MemoryPreferences::new();
        prefs.put_string(KEY_SESSION_TOKEN, "abc");

        assert_eq!(TokenStore::new(&mut prefs).load(at(0)).unwrap(), None);
        assert_eq!(prefs.get_string(KEY_SESSION_TOKEN).unwrap(), None);
    }

    #[test]
    fn legacy_password_is_purged() {
        let mut prefs = MemoryPreferences::new();
        prefs.put_string("username", "rover");
        prefs.put_string(KEY_LEGACY_PASSWORD, "hunter2");

        assert!(purge_legacy_credentials(&mut prefs).unwrap());
        assert!(prefs.get(KEY_LEGACY_PASSWORD).is_none());
        assert_eq!(prefs.get_string("username").unwrap(), Some("rover".into()));

        assert!(!purge_legacy_credentials(&mut prefs).unwrap());
    }
}
