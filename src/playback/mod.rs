/// Playback session management.
///
/// [`PlaybackManager`] owns all mutable player state: the current track,
/// transport state, position, the play queue and the single live output
/// handle. The presentation layer reads snapshots and issues commands; the
/// manager mediates between those commands and the platform audio output.
pub mod queue;

pub use queue::{PlayQueue, QueueError};

use std::sync::{Arc, Mutex as StdMutex};

use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tokio::task::AbortHandle;

use crate::catalog::Catalog;
use crate::config::PlayerSettings;
use crate::models::{PlaybackInfo, PlaybackState, Track};
use crate::output::{AudioOutput, OutputError, OutputHandle};

/// Error type for playback commands
#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("failed to start playback of {url}: {source}")]
    Acquisition {
        url: String,
        #[source]
        source: OutputError,
    },
    #[error("catalog is empty")]
    EmptyCatalog,
    #[error(transparent)]
    Queue(#[from] QueueError),
}

/// The mutable playback session. Progress is deliberately absent: it is
/// derived from position and duration on every read so it can never
/// drift from its inputs.
struct SessionState {
    current_track: Option<Track>,
    state: PlaybackState,
    position_secs: f64,
    handle: Option<Arc<dyn OutputHandle>>,
    /// Bumped on every successful acquisition. Watcher tasks and their
    /// completion events carry the generation they were spawned for, so
    /// a superseded watcher can neither clobber the position nor fire a
    /// stale auto-advance.
    generation: u64,
}

impl SessionState {
    fn new() -> Self {
        Self {
            current_track: None,
            state: PlaybackState::Stopped,
            position_secs: 0.0,
            handle: None,
            generation: 0,
        }
    }

    fn progress(&self) -> f64 {
        match &self.current_track {
            Some(track) if track.duration > 0.0 => {
                (self.position_secs / track.duration).clamp(0.0, 1.0)
            }
            _ => 0.0,
        }
    }
}

/// Coordinates the playback session against the platform audio output.
///
/// Commands hold the session lock for their full duration, so they are
/// serialized: a second `play_track` cannot race the first one's
/// release/acquire pair. Constructed once per process and shared by
/// reference; must be created inside a tokio runtime because it spawns
/// the auto-advance listener.
pub struct PlaybackManager {
    catalog: Arc<Catalog>,
    output: Arc<dyn AudioOutput>,
    settings: PlayerSettings,
    session: Arc<Mutex<SessionState>>,
    queue: Arc<Mutex<PlayQueue>>,
    finished_tx: mpsc::UnboundedSender<u64>,
    watcher: StdMutex<Option<AbortHandle>>,
    advance: StdMutex<Option<AbortHandle>>,
}

impl PlaybackManager {
    pub fn new(
        catalog: Arc<Catalog>,
        output: Arc<dyn AudioOutput>,
        settings: PlayerSettings,
    ) -> Arc<Self> {
        let (finished_tx, finished_rx) = mpsc::unbounded_channel::<u64>();

        let manager = Arc::new(Self {
            catalog,
            output,
            settings,
            session: Arc::new(Mutex::new(SessionState::new())),
            queue: Arc::new(Mutex::new(PlayQueue::new())),
            finished_tx,
            watcher: StdMutex::new(None),
            advance: StdMutex::new(None),
        });

        let abort = Self::spawn_advance_listener(&manager, finished_rx);
        *manager
            .advance
            .lock()
            .expect("advance slot lock poisoned") = Some(abort);

        manager
    }

    /// Load and start a track, replacing whatever was playing.
    ///
    /// On failure the session keeps its pre-call current track with
    /// playback stopped, and no output handle is retained.
    pub async fn play_track(&self, track: Track) -> Result<(), PlayerError> {
        let mut session = self.session.lock().await;
        self.start_track(&mut session, track).await
    }

    /// Pause playback. No-op without a live output handle; idempotent.
    pub async fn pause(&self) {
        let mut session = self.session.lock().await;
        let Some(handle) = session.handle.clone() else {
            return;
        };
        match handle.set_playing(false).await {
            Ok(()) => {
                session.state = PlaybackState::Paused;
                tracing::info!("Paused playback");
            }
            Err(error) => tracing::warn!(%error, "Failed to pause playback"),
        }
    }

    /// Resume playback. No-op without a live output handle; idempotent.
    pub async fn resume(&self) {
        let mut session = self.session.lock().await;
        let Some(handle) = session.handle.clone() else {
            return;
        };
        match handle.set_playing(true).await {
            Ok(()) => {
                session.state = PlaybackState::Playing;
                tracing::info!("Resumed playback");
            }
            Err(error) => tracing::warn!(%error, "Failed to resume playback"),
        }
    }

    /// Toggle play/pause
    pub async fn toggle_play_pause(&self) {
        let is_playing = { self.session.lock().await.state.is_playing() };
        if is_playing {
            self.pause().await;
        } else {
            self.resume().await;
        }
    }

    /// Seek within the current track. The target is clamped to
    /// `[0, duration]`; the local position updates optimistically once
    /// the output accepts the request. No-op without a current track.
    pub async fn seek_to(&self, position_secs: f64) {
        let mut session = self.session.lock().await;
        self.seek_locked(&mut session, position_secs).await;
    }

    /// Advance to the next track: the queue head if the queue is
    /// non-empty (consuming it), otherwise the catalog entry after the
    /// current one, wrapping at the end. Returns the track that started,
    /// or `None` when idle with an empty queue.
    pub async fn play_next(&self) -> Result<Option<Track>, PlayerError> {
        let mut session = self.session.lock().await;
        self.advance_locked(&mut session).await
    }

    /// Go back one track. More than the restart threshold into the
    /// current track this restarts it in place; otherwise it moves to
    /// the previous catalog entry, wrapping at the start.
    pub async fn play_previous(&self) -> Result<Option<Track>, PlayerError> {
        let mut session = self.session.lock().await;
        let Some(current) = session.current_track.clone() else {
            return Ok(None);
        };

        if session.position_secs > self.settings.previous_restart_threshold_secs {
            self.seek_locked(&mut session, 0.0).await;
            return Ok(Some(current));
        }

        if self.catalog.is_empty() {
            return Err(PlayerError::EmptyCatalog);
        }
        let len = self.catalog.len();
        let index = self.catalog.index_of(&current.id).unwrap_or(0);
        let Some(previous) = self.catalog.get((index + len - 1) % len).cloned() else {
            return Ok(None);
        };
        self.start_track(&mut session, previous.clone()).await?;
        Ok(Some(previous))
    }

    /// Append a track to the play queue
    pub async fn add_to_queue(&self, track: Track) {
        let mut queue = self.queue.lock().await;
        tracing::debug!(id = %track.id, title = %track.title, "Queued track");
        queue.push(track);
    }

    /// Remove every queue entry with the given id, returning the count
    pub async fn remove_from_queue(&self, track_id: &str) -> usize {
        let mut queue = self.queue.lock().await;
        queue.remove_all(track_id)
    }

    /// Empty the play queue
    pub async fn clear_queue(&self) {
        let mut queue = self.queue.lock().await;
        queue.clear();
    }

    /// Move a queue entry from one position to another. Out-of-bounds
    /// indices are a caller error and leave the queue untouched.
    pub async fn reorder_queue(&self, from: usize, to: usize) -> Result<(), PlayerError> {
        let mut queue = self.queue.lock().await;
        queue.move_entry(from, to).map_err(PlayerError::from)
    }

    /// The full catalog, in traversal order
    pub fn tracks(&self) -> &[Track] {
        self.catalog.tracks()
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub async fn current_track(&self) -> Option<Track> {
        self.session.lock().await.current_track.clone()
    }

    pub async fn is_playing(&self) -> bool {
        self.session.lock().await.state.is_playing()
    }

    /// Position within the current track in seconds
    pub async fn position(&self) -> f64 {
        self.session.lock().await.position_secs
    }

    /// Position divided by duration, in [0, 1]; recomputed on every call
    pub async fn progress(&self) -> f64 {
        self.session.lock().await.progress()
    }

    /// Snapshot of the queued tracks in play order
    pub async fn queue(&self) -> Vec<Track> {
        self.queue.lock().await.tracks()
    }

    /// Aggregate snapshot for the presentation layer
    pub async fn info(&self) -> PlaybackInfo {
        let session = self.session.lock().await;
        let queue = self.queue.lock().await;
        PlaybackInfo {
            current_track: session.current_track.clone(),
            state: session.state,
            position_secs: session.position_secs,
            progress: session.progress(),
            queue: queue.tracks(),
        }
    }

    /// Tear the session down: cancel the position watcher, release any
    /// live output handle and reset to idle. Safe to call more than once.
    pub async fn shutdown(&self) {
        self.abort_watcher();
        let mut session = self.session.lock().await;
        if let Some(handle) = session.handle.take() {
            handle.release().await;
        }
        session.current_track = None;
        session.state = PlaybackState::Stopped;
        session.position_secs = 0.0;
        // Fence any completion event still in flight.
        session.generation += 1;
        tracing::info!("Playback session shut down");
    }

    /// Core transition: release the previous output, acquire the new one
    /// and start it, then commit the session fields and spawn the
    /// watcher. Called with the session lock held.
    async fn start_track(
        &self,
        session: &mut SessionState,
        track: Track,
    ) -> Result<(), PlayerError> {
        // Stop watching the old output before the handle changes hands.
        self.abort_watcher();
        if let Some(previous) = session.handle.take() {
            previous.release().await;
        }

        tracing::info!(id = %track.id, title = %track.title, "Starting playback");

        let handle = match self.output.acquire(&track.url).await {
            Ok(handle) => handle,
            Err(source) => {
                session.state = PlaybackState::Stopped;
                tracing::warn!(url = %track.url, error = %source, "Failed to acquire audio output");
                return Err(PlayerError::Acquisition {
                    url: track.url,
                    source,
                });
            }
        };

        if let Err(source) = handle.set_playing(true).await {
            handle.release().await;
            session.state = PlaybackState::Stopped;
            tracing::warn!(url = %track.url, error = %source, "Output refused to start playback");
            return Err(PlayerError::Acquisition {
                url: track.url,
                source,
            });
        }

        session.generation += 1;
        let generation = session.generation;
        session.current_track = Some(track);
        session.state = PlaybackState::Playing;
        session.position_secs = 0.0;
        session.handle = Some(handle.clone());

        let abort = self.spawn_watcher(handle, generation);
        *self.watcher.lock().expect("watcher slot lock poisoned") = Some(abort);
        Ok(())
    }

    async fn seek_locked(&self, session: &mut SessionState, position_secs: f64) {
        let Some(duration) = session.current_track.as_ref().map(|t| t.duration) else {
            return;
        };
        let Some(handle) = session.handle.clone() else {
            return;
        };

        let clamped = position_secs.clamp(0.0, duration.max(0.0));
        match handle.seek((clamped * 1000.0).round() as u64).await {
            // Optimistic: the next poll tick confirms from the output.
            Ok(()) => session.position_secs = clamped,
            Err(error) => tracing::warn!(%error, "Seek failed"),
        }
    }

    /// Pick and start the next track with the session lock held. Queue
    /// head wins over catalog order; the consumed entry leaves the queue.
    async fn advance_locked(
        &self,
        session: &mut SessionState,
    ) -> Result<Option<Track>, PlayerError> {
        let queued = { self.queue.lock().await.pop_front() };
        let next = match queued {
            Some(track) => Some(track),
            None => match &session.current_track {
                Some(current) => {
                    if self.catalog.is_empty() {
                        return Err(PlayerError::EmptyCatalog);
                    }
                    let index = self
                        .catalog
                        .index_of(&current.id)
                        .map(|i| (i + 1) % self.catalog.len())
                        .unwrap_or(0);
                    self.catalog.get(index).cloned()
                }
                None => None,
            },
        };

        match next {
            Some(track) => {
                self.start_track(session, track.clone()).await?;
                Ok(Some(track))
            }
            None => Ok(None),
        }
    }

    fn abort_watcher(&self) {
        if let Some(previous) = self
            .watcher
            .lock()
            .expect("watcher slot lock poisoned")
            .take()
        {
            previous.abort();
        }
    }

    /// One watcher per acquired handle. Every poll period it refreshes
    /// the position from the output while playing (the poll is suspended
    /// while paused) and emits exactly one generation-tagged completion
    /// event when the media ends, whether the end arrives via the push
    /// notification or a polled `did_just_finish`.
    fn spawn_watcher(&self, handle: Arc<dyn OutputHandle>, generation: u64) -> AbortHandle {
        let session = Arc::clone(&self.session);
        let finished_tx = self.finished_tx.clone();
        let poll_interval = self.settings.poll_interval;

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(poll_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // The first tick of an interval fires immediately.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = handle.finished() => {
                        let _ = finished_tx.send(generation);
                        break;
                    }
                    _ = ticker.tick() => {
                        {
                            let session = session.lock().await;
                            if session.generation != generation {
                                break;
                            }
                            if !session.state.is_playing() {
                                continue;
                            }
                        }

                        match handle.status().await {
                            Ok(status) => {
                                if status.is_loaded {
                                    let mut session = session.lock().await;
                                    if session.generation != generation {
                                        break;
                                    }
                                    if session.state.is_playing() {
                                        let duration = session
                                            .current_track
                                            .as_ref()
                                            .map(|t| t.duration)
                                            .unwrap_or(0.0);
                                        session.position_secs =
                                            (status.position_ms as f64 / 1000.0).min(duration);
                                    }
                                }
                                if status.did_just_finish {
                                    let _ = finished_tx.send(generation);
                                    break;
                                }
                            }
                            Err(error) => {
                                // Transient poll failure: skip the tick; the
                                // displayed position goes stale until the next one.
                                tracing::debug!(%error, "Status poll failed");
                            }
                        }
                    }
                }
            }
        });

        task.abort_handle()
    }

    /// Listens for completion events and auto-advances. Holds only a
    /// weak reference so dropping the manager ends the task.
    fn spawn_advance_listener(
        manager: &Arc<Self>,
        mut finished_rx: mpsc::UnboundedReceiver<u64>,
    ) -> AbortHandle {
        let weak = Arc::downgrade(manager);
        let task = tokio::spawn(async move {
            while let Some(generation) = finished_rx.recv().await {
                let Some(manager) = weak.upgrade() else {
                    break;
                };
                if let Err(error) = manager.advance_after_completion(generation).await {
                    tracing::warn!(%error, "Auto-advance failed");
                }
            }
        });
        task.abort_handle()
    }

    async fn advance_after_completion(&self, generation: u64) -> Result<(), PlayerError> {
        let mut session = self.session.lock().await;
        if session.generation != generation {
            tracing::debug!(generation, "Ignoring stale completion event");
            return Ok(());
        }
        tracing::info!("Track finished, auto-advancing");
        self.advance_locked(&mut session).await.map(|_| ())
    }
}

impl Drop for PlaybackManager {
    fn drop(&mut self) {
        if let Ok(mut watcher) = self.watcher.lock() {
            if let Some(handle) = watcher.take() {
                handle.abort();
            }
        }
        if let Ok(mut advance) = self.advance.lock() {
            if let Some(handle) = advance.take() {
                handle.abort();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{SimulatedHandle, SimulatedOutput};
    use std::time::Duration;

    fn track(id: &str, duration: f64) -> Track {
        Track {
            id: id.to_string(),
            title: format!("Track {id}"),
            artist: "Artist".to_string(),
            album: "Album".to_string(),
            duration,
            artwork: String::new(),
            url: format!("https://example.com/{id}.mp3"),
        }
    }

    /// Catalog from the concrete spec scenario: A(180s), B(200s), C(150s)
    fn abc_catalog() -> Arc<Catalog> {
        Arc::new(
            Catalog::new(vec![track("A", 180.0), track("B", 200.0), track("C", 150.0)]).unwrap(),
        )
    }

    fn fast_settings() -> PlayerSettings {
        PlayerSettings {
            poll_interval: Duration::from_millis(10),
            previous_restart_threshold_secs: 3.0,
        }
    }

    fn rig() -> (Arc<PlaybackManager>, Arc<SimulatedOutput>, Arc<Catalog>) {
        let catalog = abc_catalog();
        let output = Arc::new(SimulatedOutput::new());
        output.register_catalog(&catalog);
        let manager = PlaybackManager::new(catalog.clone(), output.clone(), fast_settings());
        (manager, output, catalog)
    }

    async fn current_id(manager: &PlaybackManager) -> Option<String> {
        manager.current_track().await.map(|t| t.id)
    }

    async fn wait_for_track(manager: &PlaybackManager, id: &str) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while current_id(manager).await.as_deref() != Some(id) {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for track {id}"));
    }

    async fn wait_for_position_at_least(manager: &PlaybackManager, secs: f64) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while manager.position().await < secs {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("timed out waiting for position update");
    }

    fn sim(output: &SimulatedOutput) -> Arc<SimulatedHandle> {
        output.last_handle().expect("no handle acquired yet")
    }

    async fn assert_progress_consistent(manager: &PlaybackManager) {
        let info = manager.info().await;
        let expected = match &info.current_track {
            Some(t) => (info.position_secs / t.duration).clamp(0.0, 1.0),
            None => 0.0,
        };
        assert!(
            (info.progress - expected).abs() < 1e-12,
            "progress {} drifted from position {} / duration",
            info.progress,
            info.position_secs
        );
    }

    #[tokio::test]
    async fn play_then_pause_keeps_current_track() {
        let (manager, _output, catalog) = rig();
        for t in catalog.tracks() {
            manager.play_track(t.clone()).await.unwrap();
            manager.pause().await;
            assert!(!manager.is_playing().await);
            assert_eq!(current_id(&manager).await.as_deref(), Some(t.id.as_str()));
        }
    }

    #[tokio::test]
    async fn pause_and_resume_are_idempotent() {
        let (manager, _output, _catalog) = rig();
        manager.play_track(track("A", 180.0)).await.unwrap();

        manager.pause().await;
        manager.pause().await;
        assert!(!manager.is_playing().await);

        manager.resume().await;
        manager.resume().await;
        assert!(manager.is_playing().await);
    }

    #[tokio::test]
    async fn transport_commands_without_a_track_are_noops() {
        let (manager, _output, _catalog) = rig();
        manager.pause().await;
        manager.resume().await;
        manager.seek_to(10.0).await;
        assert!(!manager.is_playing().await);
        assert_eq!(manager.position().await, 0.0);
        assert_eq!(current_id(&manager).await, None);
    }

    #[tokio::test]
    async fn toggle_flips_between_playing_and_paused() {
        let (manager, _output, _catalog) = rig();
        manager.play_track(track("A", 180.0)).await.unwrap();

        manager.toggle_play_pause().await;
        assert!(!manager.is_playing().await);
        manager.toggle_play_pause().await;
        assert!(manager.is_playing().await);
    }

    #[tokio::test]
    async fn play_next_prefers_queue_and_consumes_head() {
        let (manager, _output, _catalog) = rig();
        manager.play_track(track("A", 180.0)).await.unwrap();
        manager.add_to_queue(track("C", 150.0)).await;
        manager.add_to_queue(track("B", 200.0)).await;

        let started = manager.play_next().await.unwrap().unwrap();
        assert_eq!(started.id, "C");
        assert_eq!(manager.queue().await.len(), 1);
        assert_eq!(current_id(&manager).await.as_deref(), Some("C"));
    }

    #[tokio::test]
    async fn play_next_starts_queue_even_when_idle() {
        let (manager, _output, _catalog) = rig();
        manager.add_to_queue(track("B", 200.0)).await;

        let started = manager.play_next().await.unwrap().unwrap();
        assert_eq!(started.id, "B");
        assert!(manager.queue().await.is_empty());
        assert!(manager.is_playing().await);
    }

    #[tokio::test]
    async fn play_next_wraps_catalog_order() {
        let (manager, _output, _catalog) = rig();
        manager.play_track(track("C", 150.0)).await.unwrap();

        let started = manager.play_next().await.unwrap().unwrap();
        assert_eq!(started.id, "A");
    }

    #[tokio::test]
    async fn play_next_when_idle_with_empty_queue_is_noop() {
        let (manager, _output, _catalog) = rig();
        assert!(manager.play_next().await.unwrap().is_none());
        assert_eq!(current_id(&manager).await, None);
    }

    #[tokio::test]
    async fn play_previous_restarts_when_past_threshold() {
        let (manager, _output, _catalog) = rig();
        manager.play_track(track("B", 200.0)).await.unwrap();
        manager.seek_to(5.0).await;
        assert_eq!(manager.position().await, 5.0);

        let started = manager.play_previous().await.unwrap().unwrap();
        assert_eq!(started.id, "B");
        assert_eq!(current_id(&manager).await.as_deref(), Some("B"));
        assert_eq!(manager.position().await, 0.0);
    }

    #[tokio::test]
    async fn play_previous_moves_back_near_track_start() {
        let (manager, _output, _catalog) = rig();
        manager.play_track(track("B", 200.0)).await.unwrap();
        manager.seek_to(1.0).await;

        let started = manager.play_previous().await.unwrap().unwrap();
        assert_eq!(started.id, "A");
    }

    #[tokio::test]
    async fn play_previous_wraps_to_catalog_end() {
        let (manager, _output, _catalog) = rig();
        manager.play_track(track("A", 180.0)).await.unwrap();

        let started = manager.play_previous().await.unwrap().unwrap();
        assert_eq!(started.id, "C");
    }

    #[tokio::test]
    async fn play_previous_without_a_track_is_noop() {
        let (manager, _output, _catalog) = rig();
        assert!(manager.play_previous().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn seek_clamps_to_track_bounds() {
        let (manager, _output, _catalog) = rig();
        manager.play_track(track("A", 180.0)).await.unwrap();

        manager.seek_to(-5.0).await;
        assert_eq!(manager.position().await, 0.0);

        manager.seek_to(185.0).await;
        assert_eq!(manager.position().await, 180.0);
        assert_eq!(manager.progress().await, 1.0);

        manager.seek_to(45.0).await;
        assert_eq!(manager.position().await, 45.0);
        assert_eq!(manager.progress().await, 45.0 / 180.0);
    }

    #[tokio::test]
    async fn progress_never_drifts_from_its_inputs() {
        let (manager, _output, _catalog) = rig();
        assert_progress_consistent(&manager).await;

        // Fixed interleaving of every state-mutating command.
        manager.play_track(track("A", 180.0)).await.unwrap();
        assert_progress_consistent(&manager).await;
        manager.seek_to(62.5).await;
        assert_progress_consistent(&manager).await;
        manager.pause().await;
        assert_progress_consistent(&manager).await;
        manager.add_to_queue(track("C", 150.0)).await;
        assert_progress_consistent(&manager).await;
        manager.play_next().await.unwrap();
        assert_progress_consistent(&manager).await;
        manager.seek_to(149.0).await;
        assert_progress_consistent(&manager).await;
        manager.resume().await;
        assert_progress_consistent(&manager).await;
        manager.play_previous().await.unwrap();
        assert_progress_consistent(&manager).await;
        manager.seek_to(1e9).await;
        assert_progress_consistent(&manager).await;
        manager.play_next().await.unwrap();
        assert_progress_consistent(&manager).await;
        manager.shutdown().await;
        assert_progress_consistent(&manager).await;
    }

    #[tokio::test]
    async fn acquisition_failure_rolls_back_and_leaks_nothing() {
        let (manager, output, _catalog) = rig();
        manager.play_track(track("A", 180.0)).await.unwrap();
        assert_eq!(output.live_handles(), 1);

        let mut bad = track("X", 120.0);
        bad.url = "https://example.com/unregistered.mp3".to_string();
        let err = manager.play_track(bad).await.unwrap_err();
        assert!(matches!(err, PlayerError::Acquisition { .. }));

        assert_eq!(current_id(&manager).await.as_deref(), Some("A"));
        assert!(!manager.is_playing().await);
        assert_eq!(output.live_handles(), 0);
    }

    #[tokio::test]
    async fn acquisition_failure_from_idle_stays_idle() {
        let (manager, output, _catalog) = rig();
        let mut bad = track("X", 120.0);
        bad.url = "https://example.com/unregistered.mp3".to_string();

        assert!(manager.play_track(bad).await.is_err());
        assert_eq!(current_id(&manager).await, None);
        assert!(!manager.is_playing().await);
        assert_eq!(output.live_handles(), 0);
    }

    #[tokio::test]
    async fn replacing_a_track_releases_the_previous_handle() {
        let (manager, output, _catalog) = rig();
        manager.play_track(track("A", 180.0)).await.unwrap();
        manager.play_track(track("B", 200.0)).await.unwrap();

        assert_eq!(output.live_handles(), 1);
        assert_eq!(sim(&output).url(), "https://example.com/B.mp3");
    }

    #[tokio::test]
    async fn poll_updates_position_from_the_output() {
        let (manager, output, _catalog) = rig();
        manager.play_track(track("A", 180.0)).await.unwrap();

        sim(&output).advance(3000);
        wait_for_position_at_least(&manager, 3.0).await;
        assert_progress_consistent(&manager).await;
    }

    #[tokio::test]
    async fn poll_is_suspended_while_paused() {
        let (manager, output, _catalog) = rig();
        manager.play_track(track("A", 180.0)).await.unwrap();
        manager.pause().await;

        // Move the output directly; the paused coordinator must not pick
        // up the change.
        let handle = sim(&output);
        handle.seek(30_000).await.unwrap();
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(manager.position().await, 0.0);

        manager.resume().await;
        wait_for_position_at_least(&manager, 30.0).await;
    }

    #[tokio::test]
    async fn natural_completion_auto_advances_exactly_once() {
        let (manager, output, _catalog) = rig();
        manager.play_track(track("A", 180.0)).await.unwrap();

        sim(&output).finish();
        wait_for_track(&manager, "B").await;

        // A single completion event advances a single step.
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(current_id(&manager).await.as_deref(), Some("B"));
        assert!(manager.is_playing().await);
    }

    #[tokio::test]
    async fn polled_did_just_finish_auto_advances() {
        let (manager, output, _catalog) = rig();
        manager.play_track(track("C", 150.0)).await.unwrap();

        // Run the simulated clock to the end of the media.
        sim(&output).advance(150_000);
        wait_for_track(&manager, "A").await;
    }

    #[tokio::test]
    async fn playback_sequence_follows_queue_then_catalog() {
        // Spec scenario: A finishes into B, queued C wins over catalog,
        // then catalog order wraps C back to A.
        let (manager, output, _catalog) = rig();

        manager.play_track(track("A", 180.0)).await.unwrap();
        assert_eq!(manager.position().await, 0.0);

        sim(&output).finish();
        wait_for_track(&manager, "B").await;

        manager.add_to_queue(track("C", 150.0)).await;
        let started = manager.play_next().await.unwrap().unwrap();
        assert_eq!(started.id, "C");
        assert!(manager.queue().await.is_empty());

        let started = manager.play_next().await.unwrap().unwrap();
        assert_eq!(started.id, "A");
    }

    #[tokio::test]
    async fn external_track_falls_back_to_catalog_start() {
        let (manager, output, _catalog) = rig();
        let external = Track {
            id: "ext".to_string(),
            title: "Bonus".to_string(),
            artist: "Guest".to_string(),
            album: "Single".to_string(),
            duration: 90.0,
            artwork: String::new(),
            url: "https://example.com/ext.mp3".to_string(),
        };
        output.register(&external.url, external.duration);

        manager.play_track(external).await.unwrap();
        let started = manager.play_next().await.unwrap().unwrap();
        assert_eq!(started.id, "A");
    }

    #[tokio::test]
    async fn queue_edits_through_the_manager() {
        let (manager, _output, _catalog) = rig();
        manager.add_to_queue(track("A", 180.0)).await;
        manager.add_to_queue(track("B", 200.0)).await;
        manager.add_to_queue(track("A", 180.0)).await;

        assert_eq!(manager.remove_from_queue("A").await, 2);
        let remaining = manager.queue().await;
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, "B");

        manager.clear_queue().await;
        assert!(manager.queue().await.is_empty());
    }

    #[tokio::test]
    async fn reorder_queue_validates_bounds() {
        let (manager, _output, _catalog) = rig();
        manager.add_to_queue(track("A", 180.0)).await;
        manager.add_to_queue(track("B", 200.0)).await;
        manager.add_to_queue(track("C", 150.0)).await;

        manager.reorder_queue(0, 2).await.unwrap();
        let ids: Vec<String> = manager.queue().await.into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec!["B", "C", "A"]);

        let err = manager.reorder_queue(5, 0).await.unwrap_err();
        assert!(matches!(err, PlayerError::Queue(_)));
        let ids: Vec<String> = manager.queue().await.into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec!["B", "C", "A"]);
    }

    #[tokio::test]
    async fn shutdown_releases_the_output_and_resets_the_session() {
        let (manager, output, _catalog) = rig();
        manager.play_track(track("A", 180.0)).await.unwrap();
        assert_eq!(output.live_handles(), 1);
        let handle = sim(&output);

        manager.shutdown().await;
        assert_eq!(output.live_handles(), 0);
        assert_eq!(current_id(&manager).await, None);
        assert!(!manager.is_playing().await);
        assert_eq!(manager.position().await, 0.0);

        // A completion arriving after teardown is fenced out.
        handle.finish();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(current_id(&manager).await, None);
    }

    #[tokio::test]
    async fn info_snapshot_reflects_session_and_queue() {
        let (manager, _output, _catalog) = rig();
        manager.play_track(track("B", 200.0)).await.unwrap();
        manager.seek_to(50.0).await;
        manager.add_to_queue(track("C", 150.0)).await;

        let info = manager.info().await;
        assert_eq!(info.current_track.as_ref().map(|t| t.id.as_str()), Some("B"));
        assert!(info.is_playing());
        assert_eq!(info.position_secs, 50.0);
        assert_eq!(info.progress, 0.25);
        assert_eq!(info.queue.len(), 1);
    }
}
