/// Shared model types for the playback session and library screens
use serde::{Deserialize, Serialize};

/// A single playable track as it appears in the catalog.
///
/// Tracks are immutable once loaded; every field comes from the static
/// data source and is only ever read afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Unique id within the catalog
    pub id: String,
    pub title: String,
    pub artist: String,
    pub album: String,
    /// Track length in seconds, always positive for catalog tracks
    pub duration: f64,
    /// Opaque artwork reference (the UI resolves it to an image)
    pub artwork: String,
    /// Opaque playable-media reference handed to the audio output
    pub url: String,
}

/// Transport state of the playback session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    Playing,
    Paused,
    Stopped,
}

impl PlaybackState {
    pub fn is_playing(self) -> bool {
        matches!(self, PlaybackState::Playing)
    }
}

/// Read-only snapshot of the playback session handed to the presentation
/// layer. `progress` is recomputed from position and duration at snapshot
/// time and is never stored anywhere.
#[derive(Debug, Clone, Serialize)]
pub struct PlaybackInfo {
    pub current_track: Option<Track>,
    pub state: PlaybackState,
    /// Position within the current track in seconds
    pub position_secs: f64,
    /// Position divided by duration, in [0, 1]; 0 when nothing is loaded
    pub progress: f64,
    /// Tracks queued to play next, in play order
    pub queue: Vec<Track>,
}

impl PlaybackInfo {
    pub fn is_playing(&self) -> bool {
        self.state.is_playing()
    }
}
