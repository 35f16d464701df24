//! Polymorphic playback-control contract
//!
//! Both backends satisfy [`PlayerClient`]; the embedding application
//! picks one at construction time and drives it from a single
//! controller task. All state is pull/poll based, no callbacks.

use async_trait::async_trait;
use karaoke_common::{PlayerConfig, Result};
use std::path::Path;

use crate::http::HttpPlayerClient;
use crate::stdin::StdinPlayerClient;

/// Playback backend selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Single-byte commands over the child's standard input
    Stdin,
    /// HTTP+XML control server on loopback
    Http,
}

/// Contract both playback backends satisfy.
///
/// One instance controls at most one live player process at a time;
/// every `play_file` supersedes the previous track, force-killing the
/// old child first.
#[async_trait]
pub trait PlayerClient: Send {
    /// Start playing a file, replacing any current track.
    ///
    /// Spawn failure is fatal and surfaces to the caller; it indicates
    /// a broken player installation.
    async fn play_file(&mut self, path: &Path) -> Result<()>;

    /// Pause playback. Idempotent when already paused.
    async fn pause(&mut self) -> Result<()>;

    /// Resume playback. Idempotent when already playing.
    async fn play(&mut self) -> Result<()>;

    /// Stop playback. Transport errors are swallowed: stopping may
    /// race the player shutting itself down.
    async fn stop(&mut self) -> Result<()>;

    /// Seek back to the start of the current track.
    async fn restart(&mut self) -> Result<()>;

    /// Raise the volume by one backend-specific step.
    async fn vol_up(&mut self) -> Result<()>;

    /// Lower the volume by one backend-specific step.
    async fn vol_down(&mut self) -> Result<()>;

    /// Force-terminate the player process. Never errors: a missing or
    /// already-dead process is logged and swallowed.
    async fn kill(&mut self);

    /// True iff a player process is alive (or, for the HTTP backend,
    /// a pitch-shift re-exec window is open).
    fn is_running(&mut self) -> bool;

    /// True iff running and actively playing.
    async fn is_playing(&mut self) -> Result<bool>;

    /// True iff running and paused.
    async fn is_paused(&mut self) -> Result<bool>;

    /// Current volume: locally tracked offset units for the stdin
    /// backend, the authoritative remote value for the HTTP backend.
    async fn get_volume(&mut self) -> Result<i32>;
}

/// Construct the configured backend behind the common contract
pub fn new_client(backend: Backend, config: &PlayerConfig) -> Box<dyn PlayerClient> {
    match backend {
        Backend::Stdin => Box::new(StdinPlayerClient::new(config)),
        Backend::Http => Box::new(HttpPlayerClient::new(config)),
    }
}
