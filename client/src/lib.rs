//! # Rover Client
//!
//! Everything around [`rover_engine`] that touches the outside world: the
//! stats server, the preferences file and the command line.
//!
//! - [`api`]: one function per server endpoint
//! - [`prefs`]: the durable JSON preferences file
//! - [`auth`]: session tokens stored in place of the password
//! - [`dispatch`]: tokio tasks whose completions are applied by the owner,
//!   stamped with the generation of the screen that issued them
//! - [`sync`]: the stats repository deciding when to talk to the server
//! - [`app`]: the explicit context tying it all together
//! - [`runner`], [`view`], [`cli`]: the headless front end

pub mod api;
pub mod app;
pub mod auth;
pub mod cli;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod prefs;
pub mod runner;
pub mod sync;
pub mod view;

pub use api::{ApiClient, AuthResponse};
pub use app::App;
pub use auth::{purge_legacy_credentials, SessionToken, TokenStore};
pub use config::{Config, ConfigError};
pub use dispatch::{Completion, Dispatcher, Generation};
pub use error::{ClientError, Result};
pub use prefs::FilePreferences;
pub use runner::{play, Autopilot, PlayOptions, PlayReport};
pub use sync::{StatsRepository, SyncStatus};
