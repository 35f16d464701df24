//! Player configuration loading and platform identification
//!
//! The platform is an injected configuration value: the playback core
//! never sniffs the OS at runtime. Only the compiled fallback used when
//! the caller supplies nothing consults `cfg!(target_os)`.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Host platform the player runs on.
///
/// Drives default executable paths and resampler-quality tuning for
/// pitch-shifted playback (resource-constrained hardware gets the
/// cheaper resampler).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    RaspberryPi,
    Linux,
    MacOs,
    Windows,
}

impl Platform {
    /// Compiled fallback when no platform is configured.
    ///
    /// A Raspberry Pi reports as linux here; callers that care must
    /// configure `raspberry_pi` explicitly.
    pub fn compiled_default() -> Self {
        if cfg!(target_os = "macos") {
            Platform::MacOs
        } else if cfg!(target_os = "windows") {
            Platform::Windows
        } else {
            Platform::Linux
        }
    }
}

/// Configuration for one controlled player instance
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Path to the player binary; backend-specific default when None
    pub player_path: Option<PathBuf>,
    /// Audio output selector passed to the player
    pub audio_device: String,
    /// Append a secondary display selector at launch
    pub dual_screen: bool,
    /// Starting volume; backend-specific default when None
    /// (offset units for the stdin backend, absolute percentage-like
    /// value for the HTTP backend — not normalized across backends)
    pub volume: Option<i32>,
    /// Loopback port for the player's embedded control server
    pub http_port: u16,
    /// Host platform (injected, not detected)
    pub platform: Platform,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            player_path: None,
            audio_device: "both".to_string(),
            dual_screen: false,
            volume: None,
            http_port: 5002,
            platform: Platform::compiled_default(),
        }
    }
}

impl PlayerConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Cannot read {}: {}", path.display(), e)))?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Cannot parse {}: {}", path.display(), e)))
    }

    /// Resolve configuration following the priority order:
    /// 1. Command-line argument (highest priority)
    /// 2. Environment variable
    /// 3. Per-user TOML config file
    /// 4. Compiled defaults (fallback)
    pub fn resolve(cli_arg: Option<&Path>, env_var_name: &str) -> Result<Self> {
        // Priority 1: Command-line argument
        if let Some(path) = cli_arg {
            return Self::from_file(path);
        }

        // Priority 2: Environment variable
        if let Ok(path) = std::env::var(env_var_name) {
            return Self::from_file(Path::new(&path));
        }

        // Priority 3: Per-user TOML config file
        if let Some(path) = default_config_file() {
            if path.exists() {
                return Self::from_file(&path);
            }
        }

        // Priority 4: Compiled defaults
        Ok(Self::default())
    }
}

/// Default per-user configuration file path for the platform
fn default_config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("karaoke").join("config.toml"))
}
