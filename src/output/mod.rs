/// Audio output trait and implementations.
///
/// The platform audio capability is an external collaborator: the session
/// coordinator only ever talks to it through these traits. Acquiring a
/// url yields an opaque handle; at most one handle is kept live at a time
/// by the coordinator.
pub mod simulated;

pub use simulated::{SimulatedHandle, SimulatedOutput};

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

/// Error type for audio output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("invalid media url: {0}")]
    InvalidUrl(String),
    #[error("media unavailable: {0}")]
    Unavailable(String),
    #[error("audio output io error: {0}")]
    Io(String),
}

/// Snapshot of a loaded output as reported by the platform player
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputStatus {
    pub is_loaded: bool,
    pub position_ms: u64,
    /// True at most once, on the first status read after the media
    /// reached its natural end
    pub did_just_finish: bool,
}

/// Platform audio capability that can load playable media
#[async_trait]
pub trait AudioOutput: Send + Sync {
    /// Load `url` and return a handle to the prepared output.
    ///
    /// The returned handle starts out loaded but not playing; the caller
    /// requests playback explicitly.
    async fn acquire(&self, url: &str) -> Result<Arc<dyn OutputHandle>, OutputError>;
}

/// A loaded, playable instance of a single track
#[async_trait]
pub trait OutputHandle: Send + Sync {
    /// Start or stop audible playback
    async fn set_playing(&self, playing: bool) -> Result<(), OutputError>;

    /// Move the play head to an absolute position
    async fn seek(&self, position_ms: u64) -> Result<(), OutputError>;

    /// Poll the current status
    async fn status(&self) -> Result<OutputStatus, OutputError>;

    /// Resolves when the media reaches its natural end. This is the push
    /// notification channel; completion is also observable through
    /// [`OutputHandle::status`].
    async fn finished(&self);

    /// Release the underlying resource. Best-effort: implementations log
    /// failures instead of returning them, and must tolerate being
    /// called more than once.
    async fn release(&self);
}
