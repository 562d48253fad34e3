//! Headless play: drives a [`Session`] at a fixed timestep with a simple
//! autopilot, then hands the result to the [`App`].

use crate::app::App;
use crate::error::Result;
use crate::sync::SyncStatus;
use rand::{rngs::StdRng, Rng, SeedableRng};
use rover_engine::{
    FrameInput, GameConfig, GamePhase, Preferences, Session, SessionResult, StepEvent, Viewport,
};

/// Seconds of warning the autopilot wants before an obstacle reaches it.
const REACTION_TIME: f32 = 0.25;

/// Jumps over the nearest obstacle, sometimes failing to.
#[derive(Debug, Clone)]
pub struct Autopilot {
    rng: StdRng,
    miss_chance: f64,
    last_gap: Option<f32>,
    decided: bool,
}

impl Autopilot {
    /// `miss_chance` is the probability of ignoring an obstacle, in `0.0..=1.0`.
    pub fn new(seed: u64, miss_chance: f64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            miss_chance: miss_chance.clamp(0.0, 1.0),
            last_gap: None,
            decided: false,
        }
    }

    /// Input for the next frame of `session`.
    pub fn decide(&mut self, session: &Session) -> FrameInput {
        if session.phase() != GamePhase::Playing {
            return FrameInput::default();
        }

        let hitbox = session.hitbox();
        let gap = session
            .obstacles()
            .iter()
            .map(|obstacle| obstacle.rect.x - hitbox.right())
            .filter(|gap| *gap >= 0.0)
            .fold(None, |nearest: Option<f32>, gap| {
                Some(nearest.map_or(gap, |n| n.min(gap)))
            });

        let Some(gap) = gap else {
            self.last_gap = None;
            self.decided = false;
            return FrameInput::default();
        };

        // A gap that grew means a new obstacle is now the nearest one.
        if self.last_gap.is_some_and(|last| gap > last) {
            self.decided = false;
        }
        self.last_gap = Some(gap);

        let reaction_distance = session.config().game_speed * REACTION_TIME;
        if self.decided || session.is_jumping() || gap > reaction_distance {
            return FrameInput::default();
        }

        self.decided = true;
        if self.rng.gen_bool(self.miss_chance) {
            return FrameInput::default();
        }
        FrameInput::jump()
    }
}

/// Parameters of a headless run.
#[derive(Debug, Clone)]
pub struct PlayOptions {
    pub seed: u64,
    /// Fixed timestep in seconds
    pub dt: f32,
    /// The run is abandoned after this many frames
    pub max_frames: u64,
    pub miss_chance: f64,
    pub viewport: Viewport,
    pub config: GameConfig,
}

impl Default for PlayOptions {
    fn default() -> Self {
        Self {
            seed: 0,
            dt: 1.0 / 60.0,
            max_frames: 60 * 60 * 10,
            miss_chance: 0.2,
            viewport: Viewport::default(),
            config: GameConfig::default(),
        }
    }
}

/// What happened during a headless run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayReport {
    pub frames: u64,
    pub jumps: u64,
    pub obstacles_passed: u64,
    /// `None` when the frame cap ended the run before game over
    pub result: Option<SessionResult>,
    pub sync: Option<SyncStatus>,
}

/// Play one run to game over and record it.
///
/// Completions are applied every frame. At game over the result is saved
/// and synced once, then outstanding network work is awaited. A run cut
/// short by the frame cap records nothing, like leaving the game mid-run.
pub async fn play<P: Preferences>(app: &mut App<P>, options: &PlayOptions) -> Result<PlayReport> {
    let mut session = Session::new(options.config.clone(), options.viewport, options.seed);
    let mut pilot = Autopilot::new(options.seed.wrapping_add(1), options.miss_chance);

    let mut frames = 0;
    let mut jumps = 0;

    while frames < options.max_frames {
        app.pump()?;

        let input = pilot.decide(&session);
        let event = session.step(options.dt, input);
        frames += 1;

        match event {
            StepEvent::Jumped => jumps += 1,
            StepEvent::GameOver => break,
            _ => {}
        }

        tokio::task::yield_now().await;
    }

    let result = session.take_results();
    let sync = match result {
        Some(result) => {
            tracing::info!(
                score = result.score,
                playtime = result.playtime_secs,
                frames,
                "Run finished"
            );
            Some(app.finish_session(result)?)
        }
        None => {
            tracing::info!(frames, "Run abandoned at frame cap");
            None
        }
    };

    app.settle().await?;

    Ok(PlayReport {
        frames,
        jumps,
        obstacles_passed: session.obstacles_passed(),
        result,
        sync,
    })
}
