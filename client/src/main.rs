//! Rover - headless client for the Rover endless runner.
//!
//! Plays runs with an autopilot and keeps the stats in sync with the stats
//! server, using the same local store and reconciliation as the game.

use clap::Parser;
use rover_client::cli::{self, Cli};
use rover_client::{App, Config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rover_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = Config::from_env()?;

    tracing::info!(
        api_url = %config.api_url,
        data_dir = %config.data_dir.display(),
        "Starting Rover client"
    );

    let mut app = App::open(config)?;
    cli::run(cli.command, &mut app).await?;

    Ok(())
}
