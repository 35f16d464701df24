//! Status document returned by the player's control server
//!
//! The control server answers status queries with a small XML body;
//! only the `state` and `volume` elements matter here. A malformed or
//! incomplete document is an error, never a silent default.

use karaoke_common::{Error, Result};

/// `state` value reported while a track is actively playing
pub const STATE_PLAYING: &str = "playing";
/// `state` value reported while playback is paused
pub const STATE_PAUSED: &str = "paused";

/// Parsed view of the control server's status document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerStatus {
    /// Playback state: "playing", "paused", "stopped", ...
    pub state: String,
    /// Current volume on the remote scale
    pub volume: i32,
}

impl PlayerStatus {
    /// Parse a status XML body.
    ///
    /// Element order and nesting are not significant; the first
    /// `state` and `volume` elements anywhere in the document win.
    pub fn parse(body: &str) -> Result<Self> {
        let doc = roxmltree::Document::parse(body)
            .map_err(|e| Error::Status(format!("Invalid XML: {}", e)))?;

        let state = element_text(&doc, "state")
            .ok_or_else(|| Error::Status("Missing <state> element".to_string()))?
            .to_string();

        let volume_text = element_text(&doc, "volume")
            .ok_or_else(|| Error::Status("Missing <volume> element".to_string()))?;
        let volume = volume_text
            .parse()
            .map_err(|_| Error::Status(format!("Bad volume value: {:?}", volume_text)))?;

        Ok(Self { state, volume })
    }

    /// True iff the remote state matches the playing sentinel
    pub fn is_playing(&self) -> bool {
        self.state == STATE_PLAYING
    }

    /// True iff the remote state matches the paused sentinel
    pub fn is_paused(&self) -> bool {
        self.state == STATE_PAUSED
    }
}

fn element_text<'a>(doc: &'a roxmltree::Document, name: &str) -> Option<&'a str> {
    doc.descendants()
        .find(|n| n.has_tag_name(name))
        .and_then(|n| n.text())
        .map(str::trim)
}
