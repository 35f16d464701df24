//! Karaoke playback controller - command-line driver
//!
//! Plays a single file through the selected backend and polls playback
//! state until the track ends or Ctrl+C stops it. The real embedding
//! application (queue manager / web UI) drives the same contract.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use karaoke_player::{HttpPlayerClient, PlayerClient, PlayerConfig, StdinPlayerClient};
use tokio::signal;
use tokio::time::sleep;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Playback backend selector for the command line
#[derive(ValueEnum, Clone, Copy, Debug)]
enum BackendArg {
    /// Single-byte commands over the player's stdin
    Stdin,
    /// HTTP+XML control server on loopback
    Http,
}

/// Command-line arguments for karaoke-player
#[derive(Parser, Debug)]
#[command(name = "karaoke-player")]
#[command(about = "Karaoke playback controller")]
#[command(version)]
struct Args {
    /// Playback backend to drive
    #[arg(short, long, value_enum, default_value_t = BackendArg::Http)]
    backend: BackendArg,

    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the player binary path
    #[arg(long)]
    player_path: Option<PathBuf>,

    /// Pitch-shift playback by this many semitones (HTTP backend only)
    #[arg(short, long)]
    transpose: Option<i32>,

    /// Video file to play
    file: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "karaoke_player=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut config = PlayerConfig::resolve(args.config.as_deref(), "KARAOKE_CONFIG")
        .context("Failed to load configuration")?;
    if let Some(path) = args.player_path {
        config.player_path = Some(path);
    }

    info!("Playing {}", args.file.display());

    match args.backend {
        BackendArg::Stdin => {
            if args.transpose.is_some() {
                bail!("Transpose is only supported by the http backend");
            }
            let mut client = StdinPlayerClient::new(&config);
            client
                .play_file(&args.file)
                .await
                .context("Failed to start playback")?;
            run_until_done(&mut client).await
        }
        BackendArg::Http => {
            let mut client = HttpPlayerClient::new(&config);
            if let Some(semitones) = args.transpose {
                client
                    .play_file_transpose(&args.file, semitones)
                    .await
                    .context("Failed to start pitch-shifted playback")?;
            } else {
                client
                    .play_file(&args.file)
                    .await
                    .context("Failed to start playback")?;
            }
            run_until_done(&mut client).await
        }
    }
}

/// Poll playback state once a second until the track ends or Ctrl+C
async fn run_until_done(client: &mut dyn PlayerClient) -> Result<()> {
    loop {
        tokio::select! {
            _ = signal::ctrl_c() => {
                info!("Received Ctrl+C, stopping player");
                client.kill().await;
                break;
            }
            _ = sleep(Duration::from_secs(1)) => {
                if !client.is_running() {
                    info!("Player exited");
                    break;
                }
                // Player-unreachable means "assume stopped" for display
                // purposes; it does not end the track.
                match client.is_playing().await {
                    Ok(playing) => debug!(playing, "Playback state"),
                    Err(e) => warn!("Status poll failed: {}", e),
                }
            }
        }
    }
    Ok(())
}
