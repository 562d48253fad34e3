//! Command line front end.

use crate::app::App;
use crate::error::{ClientError, Result};
use crate::runner::{self, PlayOptions};
use crate::sync::SyncStatus;
use crate::view;
use clap::{Parser, Subcommand};
use rover_engine::Preferences;

/// Rover: play headless runs and keep stats in sync with the server.
#[derive(Debug, Parser)]
#[command(name = "rover", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create an account and log in
    Register {
        username: String,
        /// Name shown on the statistics screen (defaults to the username)
        #[arg(long)]
        display_name: Option<String>,
        #[arg(long, env = "ROVER_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Log in and sync pending stats
    Login {
        username: String,
        #[arg(long, env = "ROVER_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the stored session
    Logout,
    /// Send pending stats to the server
    Sync,
    /// Show the statistics screen
    Stats,
    /// Play headless runs with the autopilot
    Play {
        /// Number of runs
        #[arg(long, default_value_t = 1)]
        runs: u32,
        /// Seed of the first run; later runs use the following seeds
        #[arg(long)]
        seed: Option<u64>,
        /// Probability of the autopilot ignoring an obstacle
        #[arg(long, default_value_t = 0.2)]
        miss_chance: f64,
        /// Simulation frames per second
        #[arg(long, default_value_t = 60)]
        fps: u32,
        /// Abandon a run after this many simulated seconds
        #[arg(long, default_value_t = 600)]
        max_seconds: u64,
    },
}

/// Run `command` against `app`.
///
/// Everything except the account commands first resumes the stored session,
/// the way the game does at launch.
pub async fn run<P: Preferences>(command: Command, app: &mut App<P>) -> Result<()> {
    if !matches!(
        command,
        Command::Register { .. } | Command::Login { .. } | Command::Logout
    ) {
        app.auto_login()?;
        app.settle().await?;
    }

    match command {
        Command::Register {
            username,
            display_name,
            password,
        } => {
            let display_name = display_name.unwrap_or_else(|| username.clone());
            app.register(&username, &display_name, &password)?;
            app.settle().await?;
            report_auth(app)
        }
        Command::Login { username, password } => {
            app.login(&username, &password)?;
            app.settle().await?;
            report_auth(app)
        }
        Command::Logout => {
            app.logout()?;
            println!("Logged out.");
            Ok(())
        }
        Command::Sync => {
            let status = app.sync()?;
            app.settle().await?;
            print_sync(status, app);
            Ok(())
        }
        Command::Stats => {
            for line in view::stats_lines(app.current_user(), &app.stats().snapshot()?) {
                println!("{line}");
            }
            Ok(())
        }
        Command::Play {
            runs,
            seed,
            miss_chance,
            fps,
            max_seconds,
        } => {
            let fps = fps.max(1);
            let first_seed = seed.unwrap_or_else(rand::random);

            for run in 0..runs {
                let options = PlayOptions {
                    seed: first_seed.wrapping_add(u64::from(run)),
                    dt: 1.0 / fps as f32,
                    max_frames: max_seconds.saturating_mul(u64::from(fps)),
                    miss_chance,
                    ..PlayOptions::default()
                };
                let report = runner::play(app, &options).await?;

                match report.result {
                    Some(result) => println!(
                        "Run {}: score {}, {}s, {} obstacles cleared, {} jumps",
                        run + 1,
                        result.score,
                        result.playtime_secs,
                        report.obstacles_passed,
                        report.jumps
                    ),
                    None => println!(
                        "Run {}: abandoned after {} frames, nothing recorded",
                        run + 1,
                        report.frames
                    ),
                }
                if let Some(status) = report.sync {
                    print_sync(status, app);
                }
            }
            Ok(())
        }
    }
}

fn report_auth<P: Preferences>(app: &App<P>) -> Result<()> {
    if let Some(status) = app.status() {
        println!("{status}");
    }
    match app.current_user() {
        Some(_) => Ok(()),
        None => Err(ClientError::NotLoggedIn),
    }
}

fn print_sync<P: Preferences>(status: SyncStatus, app: &App<P>) {
    match status {
        SyncStatus::Skipped(reason) => println!("Sync skipped: {reason:?}"),
        SyncStatus::Dispatched(_) => match app.last_sync_failure() {
            Some(failure) => println!("Sync failed: {failure}. Stats kept locally."),
            None => println!("Stats synced."),
        },
    }
}
