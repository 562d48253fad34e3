//! # Rover Engine
//!
//! The platform-independent core of the Rover endless runner.
//!
//! This crate holds everything that can be decided without touching a
//! screen, a disk or a socket: the per-frame simulation of a run and the
//! bookkeeping that keeps locally earned stats safe until the stats server
//! has acknowledged them.
//!
//! ## Design Principles
//!
//! - **No IO**: storage is reached through the [`Preferences`] trait, the
//!   network is never reached at all
//! - **Deterministic**: a [`Session`] built from the same seed and fed the same
//!   inputs produces the same run
//! - **Testable**: pure logic, [`MemoryPreferences`] stands in for the disk
//!
//! ## Core Concepts
//!
//! ### Local stats
//!
//! [`LocalStats`] keeps three durable values on top of any [`Preferences`]
//! backend:
//! - pending playtime, an accumulator of seconds not yet acknowledged
//! - local best score, a high-water mark that only ever goes up
//! - the last username that logged in on this device
//!
//! Every mutation is flushed before it returns.
//!
//! ### Reconciliation
//!
//! The [`reconcile`] module decides what a sync should carry
//! ([`plan_sync`]) and how the server's authoritative [`UserRecord`] is merged
//! back ([`apply_sync_success`], [`apply_login`]). Failed syncs have no entry
//! point: nothing is mutated, the pending values stay queued.
//!
//! ### Sessions
//!
//! [`Session`] advances one frame per [`Session::step`] call: gravity,
//! jumping, obstacle spawn and cull, the AABB overlap test, score and
//! parallax offsets. When a run ends, [`Session::take_results`] hands out its
//! [`SessionResult`] exactly once.
//!
//! ## Quick Start
//!
//! ```rust
//! use rover_engine::{
//!     apply_sync_success, plan_sync, save_session_results, LocalStats,
//!     MemoryPreferences, SessionResult, SyncPlan, UserRecord,
//! };
//!
//! let mut stats = LocalStats::new(MemoryPreferences::new());
//! stats.save_username("rover").unwrap();
//!
//! save_session_results(&mut stats, SessionResult::new(42, 37)).unwrap();
//!
//! let SyncPlan::Send(request) = plan_sync(&stats, None).unwrap() else {
//!     panic!("expected something to send");
//! };
//! assert_eq!(request.score, 42);
//! assert_eq!(request.playtime_delta, 37);
//!
//! let server = UserRecord::new(1, "rover", "Rover", 50, 900);
//! apply_sync_success(&mut stats, &request, &server).unwrap();
//!
//! assert_eq!(stats.local_best_score().unwrap(), 50);
//! assert_eq!(stats.pending_playtime().unwrap(), 0);
//! ```
//!
//! ## FFI
//!
//! The [`ffi`] module exposes sessions and stats to a native host (the
//! Android launcher) through C-compatible functions exchanging JSON strings.

pub mod error;
pub mod ffi;
pub mod prefs;
pub mod reconcile;
pub mod session;
pub mod stats;
pub mod user;

// Re-export main types at crate root
pub use error::Error;
pub use prefs::{MemoryPreferences, PrefValue, Preferences, PreferencesSnapshot, PREFS_FORMAT_VERSION};
pub use reconcile::{
    apply_login, apply_sync_success, plan_sync, save_session_results, SkipReason, SyncOutcome,
    SyncPlan, SyncRequest,
};
pub use session::{
    FrameInput, FrameSnapshot, GameConfig, GamePhase, Obstacle, ObstacleKind, Rect, Session,
    SessionResult, StepEvent, Viewport,
};
pub use stats::{LocalStats, PendingStats};
pub use user::UserRecord;

/// Type aliases for clarity
pub type Score = u64;
pub type Seconds = u64;
pub type UserId = i64;
pub type Username = String;
