/// The track catalog: the fixed, ordered collection of everything playable
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::models::Track;

/// Error type for catalog construction and loading
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("track {id} has non-positive duration {duration}")]
    InvalidDuration { id: String, duration: f64 },
    #[error("duplicate track id {id} in catalog")]
    DuplicateId { id: String },
}

/// Ordered, immutable collection of all available tracks.
///
/// Catalog order defines next/previous traversal whenever the play queue
/// is empty. The catalog is loaded once and never mutated afterwards.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    tracks: Vec<Track>,
}

#[derive(Deserialize)]
struct CatalogFile {
    tracks: Vec<Track>,
}

impl Catalog {
    /// Build a catalog, validating that every track has a positive
    /// duration and a unique id.
    pub fn new(tracks: Vec<Track>) -> Result<Self, CatalogError> {
        let mut seen = std::collections::HashSet::new();
        for track in &tracks {
            if track.duration <= 0.0 {
                return Err(CatalogError::InvalidDuration {
                    id: track.id.clone(),
                    duration: track.duration,
                });
            }
            if !seen.insert(track.id.clone()) {
                return Err(CatalogError::DuplicateId {
                    id: track.id.clone(),
                });
            }
        }
        Ok(Self { tracks })
    }

    /// Parse a catalog from its JSON representation:
    /// `{ "tracks": [ { "id": ..., "title": ..., ... } ] }`
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_json::from_str(json)?;
        Self::new(file.tracks)
    }

    /// Load a catalog from a JSON file on disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path)?;
        let catalog = Self::from_json(&content)?;
        tracing::info!("Loaded catalog with {} tracks", catalog.len());
        Ok(catalog)
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    /// Position of a track id in catalog order, if present
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.tracks.iter().position(|t| t.id == id)
    }
}
