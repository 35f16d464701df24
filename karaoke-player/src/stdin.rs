//! Stdin-command playback backend
//!
//! Spawns the player as a child process and drives it by writing
//! single ASCII bytes to its standard-input pipe. The player never
//! acknowledges a command, so paused/volume state is client-side
//! bookkeeping that can drift if the process changes state
//! out-of-band.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use karaoke_common::{Error, PlayerConfig, Result};
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, Command};
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

use crate::client::PlayerClient;

/// Default player binary when the config supplies none
const DEFAULT_PLAYER_PATH: &str = "/usr/bin/omxplayer";

/// On-screen display font size passed at launch
const FONT_SIZE: &str = "55";

/// Secondary display selector appended in dual-screen mode
const DUAL_SCREEN_DISPLAY: &str = "7";

/// Volume change per vol_up/vol_down call, in player offset units
const VOLUME_STEP: i32 = 300;

/// Delay before resuming after a seek issued while paused; the player
/// restarts in a paused visual state and needs the seek to land first
const RESTART_RESUME_DELAY: Duration = Duration::from_millis(200);

// Single-byte command protocol. No acknowledgment channel exists.
const CMD_TOGGLE_PAUSE: u8 = b'p';
const CMD_QUIT: u8 = b'q';
const CMD_SEEK_START: u8 = b'i';
const CMD_VOLUME_UP: u8 = b'=';
const CMD_VOLUME_DOWN: u8 = b'-';

/// Playback client controlling the player over its standard input
pub struct StdinPlayerClient {
    player_path: PathBuf,
    audio_device: String,
    dual_screen: bool,
    volume_offset: i32,
    process: Option<Child>,
    paused: bool,
}

impl StdinPlayerClient {
    /// Create a client from the shared player configuration
    pub fn new(config: &PlayerConfig) -> Self {
        let player_path = config
            .player_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_PLAYER_PATH));
        Self {
            player_path,
            audio_device: config.audio_device.clone(),
            dual_screen: config.dual_screen,
            volume_offset: config.volume.unwrap_or(0),
            process: None,
            paused: false,
        }
    }

    /// OS process id of the current child, if one is alive
    pub fn pid(&self) -> Option<u32> {
        self.process.as_ref().and_then(|c| c.id())
    }

    /// Write one command byte to the player's stdin, fire-and-forget.
    ///
    /// The common calling pattern issues commands without checking
    /// liveness first, so a closed pipe is logged and swallowed; the
    /// command is simply lost.
    async fn write_command(&mut self, byte: u8) {
        let Some(stdin) = self.process.as_mut().and_then(|c| c.stdin.as_mut()) else {
            debug!("No player stdin, dropping command {:?}", byte as char);
            return;
        };
        if let Err(e) = stdin.write_all(&[byte]).await {
            warn!("Player stdin write failed (process gone?): {}", e);
            return;
        }
        // Flush unconditionally: the pipe is the only delivery channel.
        if let Err(e) = stdin.flush().await {
            warn!("Player stdin flush failed: {}", e);
        }
    }

    fn launch_args(&self, path: &Path) -> Vec<String> {
        let mut args = vec![
            path.display().to_string(),
            "--blank".to_string(),
            "-o".to_string(),
            self.audio_device.clone(),
            "--vol".to_string(),
            self.volume_offset.to_string(),
            "--font-size".to_string(),
            FONT_SIZE.to_string(),
        ];
        if self.dual_screen {
            args.push("--display".to_string());
            args.push(DUAL_SCREEN_DISPLAY.to_string());
        }
        args
    }
}

#[async_trait]
impl PlayerClient for StdinPlayerClient {
    async fn play_file(&mut self, path: &Path) -> Result<()> {
        self.kill().await;

        let child = Command::new(&self.player_path)
            .args(self.launch_args(path))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::Spawn(format!("{}: {}", self.player_path.display(), e)))?;

        info!(
            file = %path.display(),
            volume_offset = self.volume_offset,
            "Started player"
        );
        self.process = Some(child);
        self.paused = false;
        Ok(())
    }

    async fn pause(&mut self) -> Result<()> {
        if !self.paused {
            self.write_command(CMD_TOGGLE_PAUSE).await;
            self.paused = true;
        }
        Ok(())
    }

    async fn play(&mut self) -> Result<()> {
        if self.paused {
            self.write_command(CMD_TOGGLE_PAUSE).await;
            self.paused = false;
        }
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        // The process handle stays put; callers observe the exit via
        // is_running once the player has processed the quit byte.
        self.write_command(CMD_QUIT).await;
        self.paused = false;
        Ok(())
    }

    async fn restart(&mut self) -> Result<()> {
        self.write_command(CMD_SEEK_START).await;
        if self.paused {
            // The player comes back from the seek visually paused;
            // give the seek a moment to land, then resume.
            sleep(RESTART_RESUME_DELAY).await;
            self.play().await?;
        }
        self.paused = false;
        Ok(())
    }

    async fn vol_up(&mut self) -> Result<()> {
        self.write_command(CMD_VOLUME_UP).await;
        // Local bookkeeping only: the stdin protocol returns no
        // numeric feedback.
        self.volume_offset += VOLUME_STEP;
        Ok(())
    }

    async fn vol_down(&mut self) -> Result<()> {
        self.write_command(CMD_VOLUME_DOWN).await;
        self.volume_offset -= VOLUME_STEP;
        Ok(())
    }

    async fn kill(&mut self) {
        if let Some(mut child) = self.process.take() {
            if let Err(e) = child.kill().await {
                debug!("Kill failed (player already gone?): {}", e);
            }
        }

        // Best-effort sweep of stray players orphaned by a previous
        // unclean shutdown. Output is discarded, failures swallowed.
        #[cfg(unix)]
        {
            let name = self
                .player_path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("omxplayer");
            match Command::new("pkill")
                .arg("-x")
                .arg(name)
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .await
            {
                Ok(status) => debug!("Stray player sweep for {} exited: {}", name, status),
                Err(e) => debug!("Stray player sweep unavailable: {}", e),
            }
        }
    }

    fn is_running(&mut self) -> bool {
        match self.process.as_mut() {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }

    async fn is_playing(&mut self) -> Result<bool> {
        Ok(self.is_running() && !self.paused)
    }

    async fn is_paused(&mut self) -> Result<bool> {
        Ok(self.paused)
    }

    async fn get_volume(&mut self) -> Result<i32> {
        Ok(self.volume_offset)
    }
}
