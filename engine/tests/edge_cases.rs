//! Edge case tests for rover-engine
//!
//! These tests walk the stats lifecycle across several runs and cover
//! boundary conditions of the merge rules.

use rover_engine::{
    apply_login, apply_sync_success, plan_sync, save_session_results, FrameInput, GameConfig,
    GamePhase, LocalStats, MemoryPreferences, PreferencesSnapshot, Session, SessionResult,
    SkipReason, SyncPlan, UserRecord, Viewport,
};

fn new_stats() -> LocalStats<MemoryPreferences> {
    LocalStats::new(MemoryPreferences::new())
}

fn expect_send(plan: SyncPlan) -> rover_engine::SyncRequest {
    match plan {
        SyncPlan::Send(request) => request,
        SyncPlan::Skip(reason) => panic!("expected a request, got skip: {:?}", reason),
    }
}

// ============================================================================
// Stats Lifecycle
// ============================================================================

#[test]
fn offline_sessions_then_login_and_sync() {
    let mut stats = new_stats();

    // Session 1, logged out.
    save_session_results(&mut stats, SessionResult::new(42, 37)).unwrap();
    assert_eq!(stats.pending_playtime().unwrap(), 37);
    assert_eq!(stats.local_best_score().unwrap(), 42);
    assert_eq!(
        plan_sync(&stats, None).unwrap(),
        SyncPlan::Skip(SkipReason::NoUsername)
    );

    // Session 2, still logged out, worse score.
    save_session_results(&mut stats, SessionResult::new(10, 20)).unwrap();
    assert_eq!(stats.pending_playtime().unwrap(), 57);
    assert_eq!(stats.local_best_score().unwrap(), 42);

    // Login: the server knows an older, lower best score.
    let login = UserRecord::new(5, "rover", "Rover", 12, 843);
    apply_login(&mut stats, &login).unwrap();
    assert_eq!(stats.local_best_score().unwrap(), 42);

    let request = expect_send(plan_sync(&stats, Some(&login)).unwrap());
    assert_eq!(request.username, "rover");
    assert_eq!(request.score, 42);
    assert_eq!(request.playtime_delta, 57);

    // Someone played on another device meanwhile.
    let server = UserRecord::new(5, "rover", "Rover", 50, 900);
    let outcome = apply_sync_success(&mut stats, &request, &server).unwrap();

    assert!(outcome.best_score_raised);
    assert_eq!(stats.local_best_score().unwrap(), 50);
    assert_eq!(stats.pending_playtime().unwrap(), 0);
}

#[test]
fn failed_sync_leaves_everything_queued() {
    let mut stats = new_stats();
    stats.save_username("rover").unwrap();
    save_session_results(&mut stats, SessionResult::new(42, 37)).unwrap();

    let before = stats.snapshot().unwrap();
    let _request = expect_send(plan_sync(&stats, None).unwrap());
    // The request fails: nothing is applied.
    assert_eq!(stats.snapshot().unwrap(), before);

    // Next trigger carries the same values plus whatever was added since.
    save_session_results(&mut stats, SessionResult::new(5, 3)).unwrap();
    let retry = expect_send(plan_sync(&stats, None).unwrap());
    assert_eq!(retry.playtime_delta, 40);
    assert_eq!(retry.score, 42);
}

#[test]
fn zero_length_run_still_counts_as_a_session() {
    let mut stats = new_stats();
    stats.save_username("rover").unwrap();
    save_session_results(&mut stats, SessionResult::new(0, 0)).unwrap();

    assert_eq!(
        plan_sync(&stats, None).unwrap(),
        SyncPlan::Skip(SkipReason::NothingToSend)
    );
}

#[test]
fn stats_survive_snapshot_restore() {
    let mut stats = new_stats();
    stats.save_username("rover").unwrap();
    save_session_results(&mut stats, SessionResult::new(42, 37)).unwrap();

    let json = stats.prefs().snapshot().to_json().unwrap();
    let restored = LocalStats::new(MemoryPreferences::from_snapshot(
        PreferencesSnapshot::from_json(&json).unwrap(),
    ));

    assert_eq!(restored.snapshot().unwrap(), stats.snapshot().unwrap());
}

#[test]
fn unicode_usernames() {
    let names = ["Ровер", "ローバー", "🚀rover", "with space", ""];

    for name in names {
        let mut stats = new_stats();
        stats.save_username(name).unwrap();
        stats.add_pending_playtime(1).unwrap();

        let request = expect_send(plan_sync(&stats, None).unwrap());
        assert_eq!(request.username, name);
    }
}

#[test]
fn large_values_saturate() {
    let mut stats = new_stats();
    stats.save_username("rover").unwrap();
    save_session_results(&mut stats, SessionResult::new(u64::MAX, u64::MAX)).unwrap();
    save_session_results(&mut stats, SessionResult::new(1, 1)).unwrap();

    assert_eq!(stats.pending_playtime().unwrap(), u64::MAX);
    assert_eq!(stats.local_best_score().unwrap(), u64::MAX);
}

// ============================================================================
// Session Edge Cases
// ============================================================================

#[test]
fn zero_and_negative_dt_do_not_advance() {
    let mut session = Session::new(GameConfig::default(), Viewport::default(), 1);
    session.step(0.0, FrameInput::default());
    session.step(-1.0, FrameInput::default());

    assert_eq!(session.score(), 0);
    assert_eq!(session.rover_y(), session.ground_level());
}

#[test]
fn tiny_viewport() {
    let mut session = Session::new(
        GameConfig {
            first_spawn_delay: 0.0,
            ..GameConfig::default()
        },
        Viewport::new(64.0, 36.0),
        9,
    );

    // Small steps so obstacles cannot skip over the narrow hitbox.
    for _ in 0..10_000 {
        session.step(1.0 / 600.0, FrameInput::default());
        if session.phase() == GamePhase::GameOver {
            break;
        }
    }
    assert_eq!(session.phase(), GamePhase::GameOver);
}

#[test]
fn fixed_spawn_interval() {
    let config = GameConfig {
        first_spawn_delay: 0.0,
        spawn_interval_min: 0.5,
        spawn_interval_max: 0.5,
        hitbox_offset_y_ratio: 1.0,
        ..GameConfig::default()
    };
    let mut session = Session::new(config, Viewport::default(), 1);

    for _ in 0..30 {
        session.step(1.0 / 60.0, FrameInput::default());
    }
    // One spawn on the first frame, the next half a second later.
    assert_eq!(session.obstacles().len(), 1);

    for _ in 0..2 {
        session.step(1.0 / 60.0, FrameInput::default());
    }
    assert_eq!(session.obstacles().len(), 2);
}

#[test]
fn session_feeds_stats() {
    let mut stats = new_stats();
    let mut session = Session::new(
        GameConfig {
            first_spawn_delay: 0.0,
            ..GameConfig::default()
        },
        Viewport::default(),
        11,
    );

    while session.phase() != GamePhase::GameOver {
        session.step(1.0 / 60.0, FrameInput::default());
    }

    let result = session.take_results().unwrap();
    save_session_results(&mut stats, result).unwrap();
    assert!(session.take_results().is_none());

    assert_eq!(stats.local_best_score().unwrap(), result.score);
    assert_eq!(stats.pending_playtime().unwrap(), result.playtime_secs);
}
