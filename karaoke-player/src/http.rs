//! HTTP+XML playback backend
//!
//! Spawns the player with its embedded loopback HTTP control server
//! enabled and drives it with authenticated GET requests. Unlike the
//! stdin backend, play/pause and volume are never cached locally:
//! every status read is a fresh HTTP round trip against the
//! authoritative remote document.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use karaoke_common::{Error, PlayerConfig, Platform, Result};
use rand::{distributions::Alphanumeric, Rng};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};
use tracing::{debug, error, info, warn};

use crate::client::PlayerClient;
use crate::status::PlayerStatus;

/// Length of the per-instance control-server password
const PASSWORD_LEN: usize = 32;

/// Volume change per vol_up/vol_down call, on the remote scale
const VOLUME_STEP: i32 = 10;

/// Starting volume when the config supplies none (percentage-like)
const DEFAULT_VOLUME: i32 = 100;

/// How long is_running() stays pinned true after a pitch-shifted
/// launch; the filter chain briefly re-execs the player and the
/// process handle flickers dead during the transition
const TRANSPOSE_WINDOW: Duration = Duration::from_secs(2);

/// Timeout on every control-server round trip. The control channel is
/// loopback; anything slower than this means the server is not up, and
/// a UI poll thread must not stall on it.
const HTTP_TIMEOUT: Duration = Duration::from_secs(2);

// Remote command tokens. The server tolerates redundant pause/play.
const CMD_PAUSE: &str = "pl_pause";
const CMD_PLAY: &str = "pl_play";
const CMD_STOP: &str = "pl_stop";
const CMD_SEEK_START: &str = "seek&val=0";

/// Speex resampler quality for pitch-shifted playback (0-10)
const RESAMPLER_QUALITY_LOW: u8 = 0;
const RESAMPLER_QUALITY_HIGH: u8 = 10;

/// Playback client controlling the player over its HTTP control server
pub struct HttpPlayerClient {
    player_path: PathBuf,
    platform: Platform,
    http_port: u16,
    password: String,
    status_url: String,
    start_volume: i32,
    http: reqwest::Client,
    process: Option<Child>,
    /// Read by UI polls while a deferred task clears it; see
    /// [`HttpPlayerClient::play_file_transpose`]
    transposing: Arc<AtomicBool>,
    clear_task: Option<JoinHandle<()>>,
}

impl HttpPlayerClient {
    /// Create a client from the shared player configuration.
    ///
    /// Generates a fresh random control-server password for the
    /// lifetime of this instance; passwords are never reused across
    /// instances.
    pub fn new(config: &PlayerConfig) -> Self {
        let player_path = config
            .player_path
            .clone()
            .unwrap_or_else(|| default_player_path(config.platform));
        let password: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(PASSWORD_LEN)
            .map(char::from)
            .collect();
        let status_url = format!(
            "http://localhost:{}/requests/status.xml",
            config.http_port
        );
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                warn!("Falling back to default HTTP client: {}", e);
                reqwest::Client::new()
            });

        Self {
            player_path,
            platform: config.platform,
            http_port: config.http_port,
            password,
            status_url,
            start_volume: config.volume.unwrap_or(DEFAULT_VOLUME),
            http,
            process: None,
            transposing: Arc::new(AtomicBool::new(false)),
            clear_task: None,
        }
    }

    /// OS process id of the current child, if one is alive
    pub fn pid(&self) -> Option<u32> {
        self.process.as_ref().and_then(|c| c.id())
    }

    fn launch_args(&self) -> Vec<String> {
        let mut args = vec![
            "-f".to_string(),
            "--play-and-exit".to_string(),
            "--extraintf".to_string(),
            "http".to_string(),
            "--http-port".to_string(),
            self.http_port.to_string(),
            "--http-password".to_string(),
            self.password.clone(),
            "--no-embedded-video".to_string(),
            "--no-keyboard-events".to_string(),
            "--no-mouse-events".to_string(),
            "--mouse-hide-timeout".to_string(),
            "0".to_string(),
            "--video-on-top".to_string(),
            "--gain".to_string(),
            format!("{:.2}", f64::from(self.start_volume) / 100.0),
        ];
        match self.platform {
            Platform::MacOs => args.push("--no-video-deco".to_string()),
            Platform::Windows => args.push("--no-qt-privacy-ask".to_string()),
            _ => {}
        }
        args
    }

    fn transpose_args(&self, semitones: i32) -> Vec<String> {
        // Resource-constrained hardware gets the cheap resampler.
        let quality = match self.platform {
            Platform::RaspberryPi => RESAMPLER_QUALITY_LOW,
            _ => RESAMPLER_QUALITY_HIGH,
        };
        vec![
            "--audio-filter".to_string(),
            "scaletempo_pitch".to_string(),
            format!("--pitch-shift={}", semitones),
            format!("--speex-resampler-quality={}", quality),
        ]
    }

    /// Start playing a file with extra player arguments appended.
    ///
    /// Does not wait for the control server to come up: a command
    /// issued immediately after this returns may race server startup
    /// and fail with a transport error.
    pub async fn play_file_with_args(&mut self, path: &Path, extra_args: &[String]) -> Result<()> {
        if self.is_running() {
            self.kill().await;
        }

        let child = Command::new(&self.player_path)
            .args(self.launch_args())
            .args(extra_args)
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::Spawn(format!("{}: {}", self.player_path.display(), e)))?;

        info!(
            file = %path.display(),
            port = self.http_port,
            "Started player with control server"
        );
        self.process = Some(child);
        Ok(())
    }

    /// Start playing a file pitch-shifted by the given semitone count.
    ///
    /// The pitch-shift filter chain re-execs the player shortly after
    /// launch, which would make is_running() flicker false; the
    /// transposing flag bridges that gap for a fixed window. Any prior
    /// pending clear task is cancelled before a new one is scheduled,
    /// so exactly one deferred clear is outstanding.
    pub async fn play_file_transpose(&mut self, path: &Path, semitones: i32) -> Result<()> {
        let extra_args = self.transpose_args(semitones);

        if let Some(task) = self.clear_task.take() {
            task.abort();
        }
        self.transposing.store(true, Ordering::Relaxed);

        if let Err(e) = self.play_file_with_args(path, &extra_args).await {
            self.transposing.store(false, Ordering::Relaxed);
            return Err(e);
        }

        let flag = Arc::clone(&self.transposing);
        self.clear_task = Some(tokio::spawn(async move {
            sleep(TRANSPOSE_WINDOW).await;
            flag.store(false, Ordering::Relaxed);
        }));
        Ok(())
    }

    /// Issue a remote command and return the raw response body.
    ///
    /// When no player is running the command is logged and dropped;
    /// this never errors for a missing process.
    pub async fn command(&mut self, cmd: &str) -> Result<Option<String>> {
        if !self.is_running() {
            error!("Ignoring command {:?}: no player is running", cmd);
            return Ok(None);
        }
        let url = format!("{}?command={}", self.status_url, cmd);
        let response = self
            .http
            .get(&url)
            .basic_auth("", Some(&self.password))
            .send()
            .await?;
        let body = response.text().await?;
        Ok(Some(body))
    }

    /// Fetch and parse the current status document.
    ///
    /// An unreachable server or malformed body fails the call; stale
    /// defaults are never returned.
    pub async fn get_status(&self) -> Result<PlayerStatus> {
        let response = self
            .http
            .get(&self.status_url)
            .basic_auth("", Some(&self.password))
            .send()
            .await?
            .error_for_status()?;
        let body = response.text().await?;
        PlayerStatus::parse(&body)
    }
}

#[async_trait]
impl PlayerClient for HttpPlayerClient {
    async fn play_file(&mut self, path: &Path) -> Result<()> {
        self.play_file_with_args(path, &[]).await
    }

    async fn pause(&mut self) -> Result<()> {
        self.command(CMD_PAUSE).await?;
        Ok(())
    }

    async fn play(&mut self) -> Result<()> {
        self.command(CMD_PLAY).await?;
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        // The player may tear its control server down while the stop
        // is in flight; losing the response is fine.
        if let Err(e) = self.command(CMD_STOP).await {
            warn!("Stop command failed: {}", e);
        }
        Ok(())
    }

    async fn restart(&mut self) -> Result<()> {
        if let Some(body) = self.command(CMD_SEEK_START).await? {
            debug!("Seek response: {}", body.trim());
        }
        Ok(())
    }

    async fn vol_up(&mut self) -> Result<()> {
        // Read-modify-write against the authoritative remote value.
        let current = self.get_volume().await?;
        self.command(&format!("volume&val={}", current + VOLUME_STEP))
            .await?;
        Ok(())
    }

    async fn vol_down(&mut self) -> Result<()> {
        let current = self.get_volume().await?;
        self.command(&format!("volume&val={}", current - VOLUME_STEP))
            .await?;
        Ok(())
    }

    async fn kill(&mut self) {
        if let Some(mut child) = self.process.take() {
            if let Err(e) = child.kill().await {
                debug!("Kill failed (player already gone?): {}", e);
            }
        }
    }

    fn is_running(&mut self) -> bool {
        if self.transposing.load(Ordering::Relaxed) {
            return true;
        }
        match self.process.as_mut() {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }

    async fn is_playing(&mut self) -> Result<bool> {
        if !self.is_running() {
            return Ok(false);
        }
        Ok(self.get_status().await?.is_playing())
    }

    async fn is_paused(&mut self) -> Result<bool> {
        if !self.is_running() {
            return Ok(false);
        }
        Ok(self.get_status().await?.is_paused())
    }

    async fn get_volume(&mut self) -> Result<i32> {
        Ok(self.get_status().await?.volume)
    }
}

/// Platform default for the player binary
fn default_player_path(platform: Platform) -> PathBuf {
    match platform {
        Platform::RaspberryPi | Platform::Linux => PathBuf::from("/usr/bin/vlc"),
        Platform::MacOs => PathBuf::from("/Applications/VLC.app/Contents/MacOS/VLC"),
        Platform::Windows => PathBuf::from("C:\\Program Files\\VideoLAN\\VLC\\vlc.exe"),
    }
}
