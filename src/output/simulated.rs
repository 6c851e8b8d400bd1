/// Simulated audio output.
///
/// Playback is driven by a manual clock instead of wall time so tests can
/// step a track forward deterministically. The session coordinator treats
/// this exactly like a real platform player: it acquires handles, starts
/// and stops them, polls status and waits for completion.
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;
use uuid::Uuid;

use crate::catalog::Catalog;
use crate::output::{AudioOutput, OutputError, OutputHandle, OutputStatus};

/// In-process audio output with a registry of playable media
#[derive(Default)]
pub struct SimulatedOutput {
    /// url -> duration in milliseconds
    media: Mutex<HashMap<String, u64>>,
    live: Arc<AtomicUsize>,
    last_handle: Mutex<Option<Arc<SimulatedHandle>>>,
}

impl SimulatedOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `url` playable with the given duration
    pub fn register(&self, url: &str, duration_secs: f64) {
        let duration_ms = (duration_secs.max(0.0) * 1000.0) as u64;
        self.media
            .lock()
            .expect("media registry lock poisoned")
            .insert(url.to_string(), duration_ms);
    }

    /// Register every track of a catalog
    pub fn register_catalog(&self, catalog: &Catalog) {
        for track in catalog.tracks() {
            self.register(&track.url, track.duration);
        }
    }

    /// Number of handles currently held live (acquired, not yet released)
    pub fn live_handles(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// The most recently acquired handle, for driving the simulated clock
    pub fn last_handle(&self) -> Option<Arc<SimulatedHandle>> {
        self.last_handle
            .lock()
            .expect("last handle lock poisoned")
            .clone()
    }
}

#[async_trait]
impl AudioOutput for SimulatedOutput {
    async fn acquire(&self, url: &str) -> Result<Arc<dyn OutputHandle>, OutputError> {
        if url.trim().is_empty() {
            return Err(OutputError::InvalidUrl("empty url".to_string()));
        }

        let duration_ms = {
            let media = self.media.lock().expect("media registry lock poisoned");
            match media.get(url) {
                Some(&d) => d,
                None => return Err(OutputError::Unavailable(url.to_string())),
            }
        };

        let handle = Arc::new(SimulatedHandle {
            id: Uuid::new_v4(),
            url: url.to_string(),
            duration_ms,
            position_ms: AtomicU64::new(0),
            playing: AtomicBool::new(false),
            completed: AtomicBool::new(false),
            just_finished: AtomicBool::new(false),
            released: AtomicBool::new(false),
            live: self.live.clone(),
            finish_notify: Notify::new(),
        });

        self.live.fetch_add(1, Ordering::SeqCst);
        *self
            .last_handle
            .lock()
            .expect("last handle lock poisoned") = Some(handle.clone());

        tracing::debug!(handle = %handle.id, url, "Acquired simulated output");
        Ok(handle)
    }
}

/// A loaded simulated track
pub struct SimulatedHandle {
    id: Uuid,
    url: String,
    duration_ms: u64,
    position_ms: AtomicU64,
    playing: AtomicBool,
    /// Terminal flag: the media ran to its natural end
    completed: AtomicBool,
    /// Edge flag consumed by the next status poll
    just_finished: AtomicBool,
    released: AtomicBool,
    live: Arc<AtomicUsize>,
    finish_notify: Notify,
}

impl SimulatedHandle {
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }

    pub fn position_ms(&self) -> u64 {
        self.position_ms.load(Ordering::SeqCst)
    }

    /// Step the simulated clock. Position only moves while playing, and
    /// reaching the end of the media completes it.
    pub fn advance(&self, ms: u64) {
        if self.released.load(Ordering::SeqCst) || !self.playing.load(Ordering::SeqCst) {
            return;
        }

        let next = self
            .position_ms
            .load(Ordering::SeqCst)
            .saturating_add(ms)
            .min(self.duration_ms);
        self.position_ms.store(next, Ordering::SeqCst);

        if next >= self.duration_ms {
            self.complete();
        }
    }

    /// Force the media to its natural end
    pub fn finish(&self) {
        self.position_ms.store(self.duration_ms, Ordering::SeqCst);
        self.complete();
    }

    fn complete(&self) {
        if self.completed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.playing.store(false, Ordering::SeqCst);
        self.just_finished.store(true, Ordering::SeqCst);
        self.finish_notify.notify_one();
        tracing::debug!(handle = %self.id, url = %self.url, "Simulated media finished");
    }

    fn ensure_live(&self) -> Result<(), OutputError> {
        if self.released.load(Ordering::SeqCst) {
            Err(OutputError::Unavailable(format!(
                "handle for {} already released",
                self.url
            )))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl OutputHandle for SimulatedHandle {
    async fn set_playing(&self, playing: bool) -> Result<(), OutputError> {
        self.ensure_live()?;
        self.playing.store(playing, Ordering::SeqCst);
        Ok(())
    }

    async fn seek(&self, position_ms: u64) -> Result<(), OutputError> {
        self.ensure_live()?;
        self.position_ms
            .store(position_ms.min(self.duration_ms), Ordering::SeqCst);
        Ok(())
    }

    async fn status(&self) -> Result<OutputStatus, OutputError> {
        Ok(OutputStatus {
            is_loaded: !self.released.load(Ordering::SeqCst),
            position_ms: self.position_ms.load(Ordering::SeqCst),
            did_just_finish: self.just_finished.swap(false, Ordering::SeqCst),
        })
    }

    async fn finished(&self) {
        if self.completed.load(Ordering::SeqCst) {
            return;
        }
        self.finish_notify.notified().await;
    }

    async fn release(&self) {
        if !self.released.swap(true, Ordering::SeqCst) {
            self.playing.store(false, Ordering::SeqCst);
            self.live.fetch_sub(1, Ordering::SeqCst);
            tracing::debug!(handle = %self.id, url = %self.url, "Released simulated output");
        }
    }
}

impl Drop for SimulatedHandle {
    fn drop(&mut self) {
        // RAII fallback so a dropped handle never stays counted as live.
        if !self.released.swap(true, Ordering::SeqCst) {
            self.live.fetch_sub(1, Ordering::SeqCst);
        }
    }
}
