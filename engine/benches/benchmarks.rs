//! Performance benchmarks for rover-engine

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rover_engine::{
    apply_sync_success, plan_sync, save_session_results, FrameInput, GameConfig, LocalStats,
    MemoryPreferences, PreferencesSnapshot, Session, SessionResult, SyncPlan, UserRecord,
    Viewport,
};

const DT: f32 = 1.0 / 60.0;

fn bench_session(c: &mut Criterion) {
    let mut group = c.benchmark_group("session");

    group.bench_function("session_new", |b| {
        b.iter(|| Session::new(GameConfig::default(), black_box(Viewport::default()), 1))
    });

    // Steady state with the hitbox lifted so the run never ends
    group.bench_function("step", |b| {
        let config = GameConfig {
            first_spawn_delay: 0.0,
            hitbox_offset_y_ratio: 1.0,
            ..GameConfig::default()
        };
        let mut session = Session::new(config, Viewport::default(), 1);

        b.iter(|| session.step(black_box(DT), black_box(FrameInput::default())))
    });

    group.bench_function("frame", |b| {
        let mut session = Session::new(GameConfig::default(), Viewport::default(), 1);
        for _ in 0..120 {
            session.step(DT, FrameInput::default());
        }

        b.iter(|| session.frame())
    });

    for seconds in [10, 60, 300].iter() {
        group.bench_with_input(
            BenchmarkId::new("full_run_secs", seconds),
            seconds,
            |b, &seconds| {
                let config = GameConfig {
                    hitbox_offset_y_ratio: 1.0,
                    ..GameConfig::default()
                };
                let frames = seconds * 60;

                b.iter(|| {
                    let mut session = Session::new(config.clone(), Viewport::default(), 7);
                    for frame in 0..frames {
                        let input = if frame % 45 == 0 {
                            FrameInput::jump()
                        } else {
                            FrameInput::default()
                        };
                        session.step(DT, input);
                    }
                    session.score()
                })
            },
        );
    }

    group.finish();
}

fn bench_stats(c: &mut Criterion) {
    let mut group = c.benchmark_group("stats");

    group.bench_function("save_session_results", |b| {
        let mut stats = LocalStats::new(MemoryPreferences::new());
        let mut score = 0u64;

        b.iter(|| {
            score += 1;
            save_session_results(&mut stats, black_box(SessionResult::new(score, 30)))
        })
    });

    group.bench_function("plan_and_apply_sync", |b| {
        let server = UserRecord::new(1, "rover", "Rover", 500, 10_000);

        b.iter(|| {
            let mut stats = LocalStats::new(MemoryPreferences::new());
            stats.save_username("rover").unwrap();
            save_session_results(&mut stats, SessionResult::new(42, 37)).unwrap();

            if let SyncPlan::Send(sent) = plan_sync(&stats, None).unwrap() {
                apply_sync_success(&mut stats, black_box(&sent), black_box(&server)).unwrap();
            }
            stats.local_best_score()
        })
    });

    group.finish();
}

fn bench_serialization(c: &mut Criterion) {
    let mut group = c.benchmark_group("serialization");

    group.bench_function("snapshot_to_json", |b| {
        let mut stats = LocalStats::new(MemoryPreferences::new());
        stats.save_username("rover").unwrap();
        save_session_results(&mut stats, SessionResult::new(42, 37)).unwrap();
        let snapshot = stats.prefs().snapshot();

        b.iter(|| black_box(&snapshot).to_json())
    });

    group.bench_function("snapshot_from_json", |b| {
        let json = r#"{"formatVersion":1,"values":{"local_best_score":42,"pending_playtime":37,"username":"rover"}}"#;

        b.iter(|| PreferencesSnapshot::from_json(black_box(json)))
    });

    group.bench_function("frame_to_json", |b| {
        let mut session = Session::new(GameConfig::default(), Viewport::default(), 1);
        for _ in 0..120 {
            session.step(DT, FrameInput::default());
        }
        let frame = session.frame();

        b.iter(|| serde_json::to_string(black_box(&frame)))
    });

    group.finish();
}

criterion_group!(benches, bench_session, bench_stats, bench_serialization);
criterion_main!(benches);
