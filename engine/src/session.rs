//! A single run of the endless runner.
//!
//! The simulation is deterministic: randomness comes from a seeded RNG and
//! time only advances through [`Session::step`]. Play time is accumulated in
//! whole microseconds so score and playtime never drift with float error.
//!
//! Coordinates follow the screen convention of the original client: origin at
//! the bottom-left, y grows upwards, obstacles enter at `x = width` and move
//! left.

use crate::{Score, Seconds};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

const MICROS_PER_SEC: u64 = 1_000_000;

/// Size of the drawable area in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1920.0, 1080.0)
    }
}

/// Tuning constants. Sizes are ratios of the viewport so the game scales
/// with the device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GameConfig {
    /// Vertical acceleration, px/s²
    pub gravity: f32,
    /// Initial upward velocity of a jump, px/s
    pub jump_velocity: f32,
    /// Horizontal speed of obstacles and the road layer, px/s
    pub game_speed: f32,

    pub back_layer_factor: f32,
    pub mid_layer_factor: f32,
    pub road_layer_factor: f32,
    pub front_layer_factor: f32,

    /// Ground line, fraction of height
    pub ground_ratio: f32,
    /// Rover sprite edge, fraction of height
    pub rover_ratio: f32,
    /// Obstacle edge, fraction of height
    pub obstacle_ratio: f32,
    /// Rover sprite left edge, fraction of width
    pub rover_x_ratio: f32,

    /// Hitbox size and offset, fractions of the rover sprite
    pub hitbox_width_ratio: f32,
    pub hitbox_height_ratio: f32,
    pub hitbox_offset_x_ratio: f32,
    pub hitbox_offset_y_ratio: f32,

    /// Seconds before the first obstacle
    pub first_spawn_delay: f32,
    /// Bounds of the random gap between spawns, seconds
    pub spawn_interval_min: f32,
    pub spawn_interval_max: f32,

    /// Play time per score point, seconds
    pub score_tick: f32,

    pub run_frame_duration: f32,
    pub run_frames: usize,
    pub jump_frame_duration: f32,
    pub jump_frames: usize,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            gravity: -3000.0,
            jump_velocity: 1800.0,
            game_speed: 1200.0,
            back_layer_factor: 0.1,
            mid_layer_factor: 0.6,
            road_layer_factor: 1.0,
            front_layer_factor: 1.25,
            ground_ratio: 0.02,
            rover_ratio: 0.5,
            obstacle_ratio: 0.2,
            rover_x_ratio: 0.1,
            hitbox_width_ratio: 0.4,
            hitbox_height_ratio: 0.6,
            hitbox_offset_x_ratio: 0.3,
            hitbox_offset_y_ratio: 0.1,
            first_spawn_delay: 1.5,
            spawn_interval_min: 1.2,
            spawn_interval_max: 2.5,
            score_tick: 0.1,
            run_frame_duration: 1.0 / 30.0,
            run_frames: 30,
            jump_frame_duration: 1.2 / 90.0,
            jump_frames: 90,
        }
    }
}

/// Axis-aligned rectangle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Strict overlap: rectangles that only share an edge do not overlap.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x < other.x + other.width
            && self.x + self.width > other.x
            && self.y < other.y + other.height
            && self.y + self.height > other.y
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ObstacleKind {
    Bag,
    Cone,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    pub kind: ObstacleKind,
    pub rect: Rect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GamePhase {
    Playing,
    Paused,
    GameOver,
}

/// Input sampled for one frame. Each flag means "pressed this frame".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameInput {
    /// Tap or space: jump while playing, restart after game over
    pub jump: bool,
    /// Toggle pause
    pub pause: bool,
    /// Back / escape: leave the game screen
    pub back: bool,
}

impl FrameInput {
    pub fn jump() -> Self {
        Self {
            jump: true,
            ..Self::default()
        }
    }

    pub fn pause() -> Self {
        Self {
            pause: true,
            ..Self::default()
        }
    }

    pub fn back() -> Self {
        Self {
            back: true,
            ..Self::default()
        }
    }
}

/// Something noteworthy that happened during a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StepEvent {
    None,
    Jumped,
    Paused,
    Resumed,
    GameOver,
    Restarted,
    ExitRequested,
}

/// The (score, playtime) pair a finished run contributes to the stats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResult {
    pub score: Score,
    pub playtime_secs: Seconds,
}

impl SessionResult {
    pub fn new(score: Score, playtime_secs: Seconds) -> Self {
        Self {
            score,
            playtime_secs,
        }
    }
}

/// Horizontal offsets of the four background layers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ParallaxLayers {
    pub back: f32,
    pub mid: f32,
    pub road: f32,
    pub front: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AnimationKind {
    Run,
    Jump,
}

/// Everything a renderer needs to draw the current frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameSnapshot {
    pub phase: GamePhase,
    pub score: Score,
    pub obstacles_passed: u64,
    pub rover_x: f32,
    pub rover_y: f32,
    pub rover_size: f32,
    pub animation: AnimationKind,
    pub animation_frame: usize,
    pub obstacles: Vec<Obstacle>,
    pub layers: ParallaxLayers,
}

/// Sizes derived from the viewport once per session.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Metrics {
    ground: f32,
    rover_size: f32,
    obstacle_size: f32,
    rover_x: f32,
}

impl Metrics {
    fn new(config: &GameConfig, viewport: Viewport) -> Self {
        Self {
            ground: viewport.height * config.ground_ratio,
            rover_size: viewport.height * config.rover_ratio,
            obstacle_size: viewport.height * config.obstacle_ratio,
            rover_x: viewport.width * config.rover_x_ratio,
        }
    }
}

/// One run: physics, obstacles, score and the play / pause / game-over state.
#[derive(Debug, Clone)]
pub struct Session {
    config: GameConfig,
    viewport: Viewport,
    metrics: Metrics,
    rng: StdRng,

    phase: GamePhase,
    played_micros: u64,
    score: Score,
    obstacles_passed: u64,

    rover_y: f32,
    rover_velocity_y: f32,
    jumping: bool,
    hitbox: Rect,

    obstacles: Vec<Obstacle>,
    until_spawn: f32,

    layers: ParallaxLayers,
    run_state_time: f32,
    jump_state_time: f32,

    results_taken: bool,
}

impl Session {
    /// Start a run with the given seed.
    pub fn new(config: GameConfig, viewport: Viewport, seed: u64) -> Self {
        let metrics = Metrics::new(&config, viewport);
        let mut session = Self {
            until_spawn: config.first_spawn_delay,
            config,
            viewport,
            metrics,
            rng: StdRng::seed_from_u64(seed),
            phase: GamePhase::Playing,
            played_micros: 0,
            score: 0,
            obstacles_passed: 0,
            rover_y: metrics.ground,
            rover_velocity_y: 0.0,
            jumping: false,
            hitbox: Rect::default(),
            obstacles: Vec::new(),
            layers: ParallaxLayers::default(),
            run_state_time: 0.0,
            jump_state_time: 0.0,
            results_taken: false,
        };
        session.update_hitbox();
        session
    }

    /// Reset the run. Background offsets carry over.
    pub fn restart(&mut self) {
        self.phase = GamePhase::Playing;
        self.played_micros = 0;
        self.score = 0;
        self.obstacles_passed = 0;
        self.rover_y = self.metrics.ground;
        self.rover_velocity_y = 0.0;
        self.jumping = false;
        self.obstacles.clear();
        self.until_spawn = self.config.first_spawn_delay;
        self.run_state_time = 0.0;
        self.jump_state_time = 0.0;
        self.results_taken = false;
        self.update_hitbox();
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn score(&self) -> Score {
        self.score
    }

    pub fn obstacles_passed(&self) -> u64 {
        self.obstacles_passed
    }

    pub fn is_jumping(&self) -> bool {
        self.jumping
    }

    pub fn rover_y(&self) -> f32 {
        self.rover_y
    }

    pub fn rover_velocity_y(&self) -> f32 {
        self.rover_velocity_y
    }

    pub fn ground_level(&self) -> f32 {
        self.metrics.ground
    }

    pub fn hitbox(&self) -> Rect {
        self.hitbox
    }

    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Whole seconds of play so far. Paused time is not counted.
    pub fn playtime_secs(&self) -> Seconds {
        self.played_micros / MICROS_PER_SEC
    }

    /// Advance the simulation by `dt` seconds.
    pub fn step(&mut self, dt: f32, input: FrameInput) -> StepEvent {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        match self.phase {
            GamePhase::Playing => self.step_playing(dt, input),
            GamePhase::Paused => {
                if input.pause {
                    self.phase = GamePhase::Playing;
                    StepEvent::Resumed
                } else {
                    StepEvent::None
                }
            }
            GamePhase::GameOver => {
                if input.back {
                    StepEvent::ExitRequested
                } else if input.jump {
                    self.restart();
                    StepEvent::Restarted
                } else {
                    StepEvent::None
                }
            }
        }
    }

    /// The finished run's result, handed out once per run.
    ///
    /// Returns `None` while the run is still going and after the result has
    /// been taken; [`Session::restart`] re-arms it.
    pub fn take_results(&mut self) -> Option<SessionResult> {
        if self.phase != GamePhase::GameOver || self.results_taken {
            return None;
        }
        self.results_taken = true;
        Some(SessionResult::new(self.score, self.playtime_secs()))
    }

    /// Describe the current frame for a renderer.
    pub fn frame(&self) -> FrameSnapshot {
        let (animation, animation_frame) = if self.jumping {
            let frame = (self.jump_state_time / self.config.jump_frame_duration) as usize;
            (
                AnimationKind::Jump,
                frame.min(self.config.jump_frames.saturating_sub(1)),
            )
        } else {
            let frame = (self.run_state_time / self.config.run_frame_duration) as usize;
            (AnimationKind::Run, frame % self.config.run_frames.max(1))
        };

        FrameSnapshot {
            phase: self.phase,
            score: self.score,
            obstacles_passed: self.obstacles_passed,
            rover_x: self.metrics.rover_x,
            rover_y: self.rover_y,
            rover_size: self.metrics.rover_size,
            animation,
            animation_frame,
            obstacles: self.obstacles.clone(),
            layers: self.layers,
        }
    }

    fn step_playing(&mut self, dt: f32, input: FrameInput) -> StepEvent {
        if input.pause {
            self.phase = GamePhase::Paused;
            return StepEvent::Paused;
        }
        if input.back {
            return StepEvent::ExitRequested;
        }

        self.scroll_layers(dt);

        if self.jumping {
            self.jump_state_time += dt;
        } else {
            self.run_state_time += dt;
        }

        let micros = (f64::from(dt) * MICROS_PER_SEC as f64).round() as u64;
        self.played_micros = self.played_micros.saturating_add(micros);
        self.score = self.played_micros / self.score_tick_micros();

        let mut event = StepEvent::None;
        if input.jump && !self.jumping {
            self.rover_velocity_y = self.config.jump_velocity;
            self.jumping = true;
            self.jump_state_time = 0.0;
            event = StepEvent::Jumped;
        }

        self.rover_velocity_y += self.config.gravity * dt;
        self.rover_y += self.rover_velocity_y * dt;

        if self.rover_y < self.metrics.ground {
            self.rover_y = self.metrics.ground;
            self.rover_velocity_y = 0.0;
            if self.jumping {
                self.jumping = false;
                self.run_state_time = 0.0;
            }
        }

        self.update_hitbox();

        self.until_spawn -= dt;
        if self.until_spawn <= 0.0 {
            self.spawn_obstacle();
            self.until_spawn = self.next_spawn_interval();
        }

        let shift = self.config.game_speed * dt;
        let mut index = self.obstacles.len();
        while index > 0 {
            index -= 1;
            let obstacle = &mut self.obstacles[index];
            obstacle.rect.x -= shift;
            if obstacle.rect.right() < 0.0 {
                self.obstacles_passed += 1;
                self.obstacles.remove(index);
            } else if obstacle.rect.overlaps(&self.hitbox) {
                self.phase = GamePhase::GameOver;
                event = StepEvent::GameOver;
            }
        }

        event
    }

    fn scroll_layers(&mut self, dt: f32) {
        let speed = self.config.game_speed * dt;
        let width = self.viewport.width;
        let wrap = |offset: f32| if offset <= -width { 0.0 } else { offset };

        self.layers.back = wrap(self.layers.back - speed * self.config.back_layer_factor);
        self.layers.mid = wrap(self.layers.mid - speed * self.config.mid_layer_factor);
        self.layers.road = wrap(self.layers.road - speed * self.config.road_layer_factor);
        self.layers.front = wrap(self.layers.front - speed * self.config.front_layer_factor);
    }

    fn update_hitbox(&mut self) {
        let size = self.metrics.rover_size;
        self.hitbox = Rect::new(
            self.metrics.rover_x + size * self.config.hitbox_offset_x_ratio,
            self.rover_y + size * self.config.hitbox_offset_y_ratio,
            size * self.config.hitbox_width_ratio,
            size * self.config.hitbox_height_ratio,
        );
    }

    fn spawn_obstacle(&mut self) {
        let kind = if self.rng.gen_bool(0.5) {
            ObstacleKind::Bag
        } else {
            ObstacleKind::Cone
        };
        let size = self.metrics.obstacle_size;
        self.obstacles.push(Obstacle {
            kind,
            rect: Rect::new(self.viewport.width, self.metrics.ground, size, size),
        });
    }

    fn next_spawn_interval(&mut self) -> f32 {
        let min = self.config.spawn_interval_min;
        let max = self.config.spawn_interval_max;
        if max > min {
            self.rng.gen_range(min..=max)
        } else {
            min
        }
    }

    fn score_tick_micros(&self) -> u64 {
        ((f64::from(self.config.score_tick) * MICROS_PER_SEC as f64).round() as u64).max(1)
    }
}
