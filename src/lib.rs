/// Melodeck - playback session core for a music player
pub mod catalog;
pub mod config;
pub mod library;
pub mod models;
pub mod output;
pub mod playback;

pub use catalog::{Catalog, CatalogError};
pub use config::{Config, PlayerSettings};
pub use library::{AlbumSummary, ArtistSummary};
pub use models::{PlaybackInfo, PlaybackState, Track};
pub use output::{AudioOutput, OutputError, OutputHandle, OutputStatus};
pub use playback::{PlayQueue, PlaybackManager, PlayerError, QueueError};

use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize logging for a host application. Call once at startup.
///
/// `level` follows the config file's `log_level` field (error, warn,
/// info, debug, trace); unknown values fall back to info.
pub fn init_logging(level: &str) {
    let crate_level = level
        .parse::<filter::LevelFilter>()
        .unwrap_or(filter::LevelFilter::INFO);
    let filter = filter::Targets::new()
        .with_default(filter::LevelFilter::WARN)
        .with_target("melodeck", crate_level);
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
