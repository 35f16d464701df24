//! # Karaoke Common Library (karaoke-common)
//!
//! Shared types for the karaoke playback controller: the common error
//! type and the player configuration consumed by both playback
//! backends.

pub mod config;
pub mod error;

pub use config::{Platform, PlayerConfig};
pub use error::{Error, Result};
