/// User-curated play-next queue.
///
/// Entries play ahead of catalog order and are consumed FIFO: dequeuing
/// removes the head. Duplicate track ids are allowed.
use std::collections::VecDeque;

use thiserror::Error;

use crate::models::Track;

/// Error type for queue operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    #[error("queue index {index} out of bounds (queue length {len})")]
    IndexOutOfBounds { index: usize, len: usize },
}

#[derive(Debug, Clone, Default)]
pub struct PlayQueue {
    entries: VecDeque<Track>,
}

impl PlayQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a track to the tail. No duplicate suppression.
    pub fn push(&mut self, track: Track) {
        self.entries.push_back(track);
    }

    /// Consume and return the head of the queue
    pub fn pop_front(&mut self) -> Option<Track> {
        self.entries.pop_front()
    }

    /// Remove every entry with the given track id, returning how many
    /// were removed
    pub fn remove_all(&mut self, track_id: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|t| t.id != track_id);
        before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Move the entry at `from` to position `to`, shifting the entries in
    /// between. Both indices must be within bounds; on violation the
    /// queue is left untouched.
    pub fn move_entry(&mut self, from: usize, to: usize) -> Result<(), QueueError> {
        let len = self.entries.len();
        for index in [from, to] {
            if index >= len {
                return Err(QueueError::IndexOutOfBounds { index, len });
            }
        }
        if from == to {
            return Ok(());
        }

        let track = self
            .entries
            .remove(from)
            .expect("index validated against queue length");
        self.entries.insert(to, track);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot of the queued tracks in play order
    pub fn tracks(&self) -> Vec<Track> {
        self.entries.iter().cloned().collect()
    }
}
