//! The application context.
//!
//! [`App`] is built once by the entry point and handed to whatever needs it.
//! It owns every piece of client state: the stats repository, the cached
//! user, the status line and the dispatcher through which network results
//! come back. Nothing here is shared between threads; completions are
//! applied only from [`App::pump`], [`App::apply_next`] or [`App::settle`].

use crate::api::{ApiClient, AuthResponse};
use crate::auth::{purge_legacy_credentials, TokenStore};
use crate::config::Config;
use crate::dispatch::{Completion, Dispatcher, Generation, Stamped};
use crate::error::{ClientError, Result};
use crate::prefs::FilePreferences;
use crate::sync::{StatsRepository, SyncStatus};
use chrono::Utc;
use rover_engine::{LocalStats, Preferences, SessionResult, UserRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AuthKind {
    Login,
    Register,
    Resume,
}

impl AuthKind {
    fn welcome(self, user: &UserRecord) -> String {
        match self {
            AuthKind::Register => format!("Success! Welcome {}", user.display_name),
            AuthKind::Login | AuthKind::Resume => {
                format!("Welcome back, {}!", user.display_name)
            }
        }
    }
}

/// Client state and the operations the front end drives.
#[derive(Debug)]
pub struct App<P> {
    config: Config,
    api: ApiClient,
    repo: StatsRepository<P>,
    dispatcher: Dispatcher,
    current_user: Option<UserRecord>,
    status: Option<String>,
    last_sync_failure: Option<String>,
    auth_in_progress: bool,
}

impl App<FilePreferences> {
    /// Open the preferences file named by `config` and build the context.
    pub fn open(config: Config) -> Result<Self> {
        let prefs = FilePreferences::open(config.prefs_path())?;
        Self::new(config, prefs)
    }
}

impl<P: Preferences> App<P> {
    pub fn new(config: Config, mut prefs: P) -> Result<Self> {
        purge_legacy_credentials(&mut prefs)?;

        let api = ApiClient::new(config.api_url.clone());
        let repo = StatsRepository::new(LocalStats::new(prefs), api.clone());

        Ok(Self {
            config,
            api,
            repo,
            dispatcher: Dispatcher::new(),
            current_user: None,
            status: None,
            last_sync_failure: None,
            auth_in_progress: false,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The logged-in user as last reported by the server.
    pub fn current_user(&self) -> Option<&UserRecord> {
        self.current_user.as_ref()
    }

    /// The last message meant for the user.
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    /// Why the last completed sync failed, if it did.
    pub fn last_sync_failure(&self) -> Option<&str> {
        self.last_sync_failure.as_deref()
    }

    pub fn stats(&self) -> &LocalStats<P> {
        self.repo.stats()
    }

    /// Whether a login, registration or session resume is awaiting its answer.
    pub fn is_busy(&self) -> bool {
        self.auth_in_progress
    }

    pub fn generation(&self) -> Generation {
        self.dispatcher.generation()
    }

    /// Requests whose completion has not been applied yet.
    pub fn in_flight(&self) -> usize {
        self.dispatcher.in_flight()
    }

    /// Resume the stored session, if there is a valid one.
    ///
    /// Returns whether a request was made. An expired token is discarded
    /// without touching the network.
    pub fn auto_login(&mut self) -> Result<bool> {
        if self.auth_in_progress {
            return Err(ClientError::Busy);
        }

        let prefs = self.repo.stats_mut().prefs_mut();
        let Some(session) = TokenStore::new(prefs).load(Utc::now())? else {
            tracing::debug!("No stored session to resume");
            return Ok(false);
        };

        tracing::info!(expires_at = %session.expires_at, "Resuming stored session");
        self.auth_in_progress = true;

        let api = self.api.clone();
        self.dispatcher.dispatch(async move {
            Completion::Resume(api.resume_session(&session.token).await)
        });
        Ok(true)
    }

    /// Start a login. Returns whether a request was made.
    pub fn login(&mut self, username: &str, password: &str) -> Result<bool> {
        if self.auth_in_progress {
            return Err(ClientError::Busy);
        }
        if username.trim().is_empty() || password.trim().is_empty() {
            self.set_status("Fields cannot be empty");
            return Ok(false);
        }

        self.set_status("Logging in...");
        self.auth_in_progress = true;

        let api = self.api.clone();
        let username = username.to_string();
        let password = password.to_string();
        self.dispatcher.dispatch(async move {
            Completion::Login(api.login(&username, &password).await)
        });
        Ok(true)
    }

    /// Start a registration. Returns whether a request was made.
    pub fn register(&mut self, username: &str, display_name: &str, password: &str) -> Result<bool> {
        if self.auth_in_progress {
            return Err(ClientError::Busy);
        }
        if username.trim().is_empty() || display_name.trim().is_empty() || password.trim().is_empty()
        {
            self.set_status("Fields cannot be empty");
            return Ok(false);
        }

        self.set_status("Registering...");
        self.auth_in_progress = true;

        let api = self.api.clone();
        let username = username.to_string();
        let display_name = display_name.to_string();
        let password = password.to_string();
        self.dispatcher.dispatch(async move {
            Completion::Register(api.register(&username, &display_name, &password).await)
        });
        Ok(true)
    }

    /// Forget the user and the stored session. Pending stats stay on disk.
    ///
    /// Requests still in flight become stale, so a late login or sync answer
    /// cannot bring the user back.
    pub fn logout(&mut self) -> Result<()> {
        self.dispatcher.advance();
        self.auth_in_progress = false;
        self.current_user = None;
        TokenStore::new(self.repo.stats_mut().prefs_mut()).clear()?;
        self.repo.stats_mut().clear_username()?;
        self.set_status("Logged out");
        tracing::info!("Logged out");
        Ok(())
    }

    /// Record a finished run, then try to sync it.
    ///
    /// Call once per run; the run's playtime is counted each time.
    pub fn finish_session(&mut self, result: SessionResult) -> Result<SyncStatus> {
        self.repo.save_session_results(result)?;
        self.sync()
    }

    /// Send pending stats if there is anything to send.
    pub fn sync(&mut self) -> Result<SyncStatus> {
        self.repo
            .sync_data(self.current_user.as_ref(), &mut self.dispatcher)
    }

    /// Tear down the current screen and start a new one.
    ///
    /// Requests still in flight become stale: their completions can no
    /// longer change the current user or the status line.
    pub fn enter_screen(&mut self) -> Generation {
        self.status = None;
        self.auth_in_progress = false;
        self.dispatcher.advance()
    }

    /// Apply every completion that has already arrived. Never waits.
    pub fn pump(&mut self) -> Result<usize> {
        let ready = self.dispatcher.poll();
        let count = ready.len();
        for stamped in ready {
            self.apply(stamped)?;
        }
        Ok(count)
    }

    /// Wait for the next completion and apply it.
    ///
    /// Returns `false` when nothing was in flight.
    pub async fn apply_next(&mut self) -> Result<bool> {
        match self.dispatcher.next().await {
            Some(stamped) => {
                self.apply(stamped)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Apply completions until nothing is in flight, including requests
    /// started by the completions themselves.
    pub async fn settle(&mut self) -> Result<()> {
        while self.apply_next().await? {}
        Ok(())
    }

    fn apply(&mut self, stamped: Stamped) -> Result<()> {
        let current = self.dispatcher.is_current(stamped.generation);

        match stamped.completion {
            Completion::Sync { sent, outcome } => {
                self.last_sync_failure = outcome.as_ref().err().map(ToString::to_string);

                // The durable merge belongs to the repository, not the screen,
                // so it applies whatever the generation.
                let Some(user) = self.repo.complete_sync(&sent, outcome)? else {
                    return Ok(());
                };
                if current {
                    self.current_user = Some(user);
                } else {
                    tracing::debug!(
                        generation = stamped.generation.value(),
                        "Stale sync completion; current user left as is"
                    );
                }
                Ok(())
            }
            Completion::Login(outcome) => self.finish_auth(AuthKind::Login, current, outcome),
            Completion::Register(outcome) => {
                self.finish_auth(AuthKind::Register, current, outcome)
            }
            Completion::Resume(outcome) => self.finish_auth(AuthKind::Resume, current, outcome),
        }
    }

    fn finish_auth(
        &mut self,
        kind: AuthKind,
        current: bool,
        outcome: Result<AuthResponse>,
    ) -> Result<()> {
        if !current {
            tracing::debug!(?kind, "Dropping stale authentication completion");
            return Ok(());
        }
        self.auth_in_progress = false;

        let response = match outcome {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(?kind, error = %e, "Authentication failed");
                if kind == AuthKind::Resume && e.is_unauthorized() {
                    TokenStore::new(self.repo.stats_mut().prefs_mut()).clear()?;
                }
                self.status = Some(format!("Error: {e}"));
                return Ok(());
            }
        };

        self.repo.process_login_data(&response.user)?;
        if let Some(session) = response.session(Utc::now()) {
            TokenStore::new(self.repo.stats_mut().prefs_mut()).save(&session)?;
        }

        tracing::info!(
            ?kind,
            username = %response.user.username,
            best_score = response.user.best_score,
            "Authenticated"
        );
        self.status = Some(kind.welcome(&response.user));
        self.current_user = Some(response.user);

        self.sync()?;
        Ok(())
    }

    fn set_status(&mut self, message: &str) {
        self.status = Some(message.to_string());
    }
}
