//! # Karaoke Playback Controller (karaoke-player)
//!
//! Drives an external media player process as a remote-controllable
//! device: start/stop a video file, pause/resume, adjust volume, seek
//! back to the start, and (HTTP backend only) pitch-shift playback.
//!
//! Two interchangeable backends sit behind the [`PlayerClient`] trait:
//!
//! - [`StdinPlayerClient`]: commands are single ASCII bytes written to
//!   the child's standard input; there is no feedback channel, so all
//!   observable state is client-side bookkeeping.
//! - [`HttpPlayerClient`]: commands and status go over the player's
//!   embedded loopback HTTP control server; state is always fetched
//!   fresh from the remote status document.

pub mod client;
pub mod http;
pub mod status;
pub mod stdin;

pub use client::{new_client, Backend, PlayerClient};
pub use http::HttpPlayerClient;
pub use karaoke_common::{Error, PlayerConfig, Platform, Result};
pub use status::PlayerStatus;
pub use stdin::StdinPlayerClient;
