//! Keeps many independently playing audio handles acting as one transport.
//!
//! Fan-out operations (`play_all`, `pause_all`, `stop_all`, `set_position`,
//! `set_looping_all`) dispatch to every handle concurrently and await them
//! together. A failing handle is logged and skipped; it never aborts the
//! batch and nothing is rolled back.
//!
//! Position and drift are best-effort: each handle is queried live and
//! playback keeps moving while the answers come in, so the aggregate is an
//! estimate rather than an atomic snapshot.

use futures_util::future::join_all;
use layerloop_core::{ErrorKind, LoopError, PlaybackConfig, Result};
use layerloop_timeline::{normalize_speed, validate_volume};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::gain::perceptual_gain;
use crate::player::AudioPlayer;

/// Outcome of a fan-out operation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FanOutReport {
    /// Number of handles the operation was attempted on.
    pub attempted: usize,
    /// Handles whose operation failed, with the failure kind.
    pub failed: Vec<(Uuid, ErrorKind)>,
}

impl FanOutReport {
    /// Whether every handle succeeded.
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Synchronized transport over a set of audio handles.
pub struct PlaybackCoordinator {
    players: HashMap<Uuid, Arc<dyn AudioPlayer>>,
    /// Handles the coordinator last started successfully.
    playing: HashSet<Uuid>,
    config: PlaybackConfig,
}

impl PlaybackCoordinator {
    /// Create an empty coordinator with default settings.
    pub fn new() -> Self {
        Self::with_config(PlaybackConfig::default())
    }

    /// Create an empty coordinator.
    pub fn with_config(config: PlaybackConfig) -> Self {
        Self {
            players: HashMap::new(),
            playing: HashSet::new(),
            config,
        }
    }

    /// Number of managed handles.
    pub fn len(&self) -> usize {
        self.players.len()
    }

    /// Whether no handles are managed.
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// IDs of every managed handle.
    pub fn track_ids(&self) -> Vec<Uuid> {
        self.players.keys().copied().collect()
    }

    /// IDs the coordinator has started and not since paused or stopped.
    pub fn playing_tracks(&self) -> Vec<Uuid> {
        self.playing.iter().copied().collect()
    }

    /// The handle registered under `id`.
    pub fn player(&self, id: Uuid) -> Option<&Arc<dyn AudioPlayer>> {
        self.players.get(&id)
    }

    /// Register a handle without touching it.
    pub fn add_track(&mut self, player: Arc<dyn AudioPlayer>) -> Uuid {
        let id = Uuid::new_v4();
        self.players.insert(id, player);
        debug!(track = %id, "Track added");
        id
    }

    /// Register a handle and, if the session is playing, join it in phase.
    ///
    /// The aggregate position is captured before the new handle is inserted
    /// so that it does not skew the average it is about to join.
    pub async fn add_track_and_sync(&mut self, player: Arc<dyn AudioPlayer>) -> Uuid {
        let target = self.position().await;
        let session_playing = self.is_playing().await;

        let id = self.add_track(Arc::clone(&player));
        if !session_playing {
            return id;
        }

        if let Err(e) = player.set_position(target).await {
            warn!(track = %id, error = %e, "Failed to seek new track");
        }
        match player.play().await {
            Ok(()) => {
                self.playing.insert(id);
                info!(track = %id, position_ms = target, "Track joined playback");
            }
            Err(e) => warn!(track = %id, error = %e, "Failed to start new track"),
        }
        id
    }

    /// Remove a handle. Unknown IDs are ignored.
    pub fn remove_track(&mut self, id: Uuid) -> Option<Arc<dyn AudioPlayer>> {
        self.playing.remove(&id);
        self.players.remove(&id)
    }

    /// Remove every handle.
    pub fn clear_all_tracks(&mut self) {
        self.players.clear();
        self.playing.clear();
    }

    /// Run `op` on every handle concurrently and log the failures.
    async fn fan_out<F, Fut>(&self, action: &'static str, op: F) -> (Vec<Uuid>, FanOutReport)
    where
        F: Fn(Arc<dyn AudioPlayer>) -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        let tasks = self.players.iter().map(|(&id, player)| {
            let fut = op(Arc::clone(player));
            async move { (id, fut.await) }
        });
        let results = join_all(tasks).await;

        let mut succeeded = Vec::with_capacity(results.len());
        let mut report = FanOutReport {
            attempted: results.len(),
            failed: Vec::new(),
        };
        for (id, result) in results {
            match result {
                Ok(()) => succeeded.push(id),
                Err(e) => {
                    warn!(track = %id, action, error = %e, "Track operation failed");
                    report.failed.push((id, e.kind()));
                }
            }
        }
        (succeeded, report)
    }

    /// Start every handle.
    pub async fn play_all(&mut self) -> FanOutReport {
        let (started, report) = self.fan_out("play", |p| async move { p.play().await }).await;
        self.playing.extend(started);
        info!(tracks = report.attempted, failed = report.failed.len(), "Play all");
        report
    }

    /// Pause every handle.
    pub async fn pause_all(&mut self) -> FanOutReport {
        let (paused, report) = self.fan_out("pause", |p| async move { p.pause().await }).await;
        for id in paused {
            self.playing.remove(&id);
        }
        info!(tracks = report.attempted, failed = report.failed.len(), "Pause all");
        report
    }

    /// Stop every handle.
    pub async fn stop_all(&mut self) -> FanOutReport {
        let (stopped, report) = self.fan_out("stop", |p| async move { p.stop().await }).await;
        for id in stopped {
            self.playing.remove(&id);
        }
        info!(tracks = report.attempted, failed = report.failed.len(), "Stop all");
        report
    }

    /// Seek every handle to `position_ms`.
    pub async fn set_position(&self, position_ms: f64) -> FanOutReport {
        self.fan_out("seek", move |p| async move { p.set_position(position_ms).await })
            .await
            .1
    }

    /// Enable or disable looping on every handle.
    pub async fn set_looping_all(&self, looping: bool) -> FanOutReport {
        self.fan_out("set_looping", move |p| async move { p.set_looping(looping).await })
            .await
            .1
    }

    /// True if any handle reports playing.
    pub async fn is_playing(&self) -> bool {
        let results = join_all(self.players.iter().map(|(&id, p)| async move {
            (id, p.is_playing().await)
        }))
        .await;
        results.into_iter().any(|(id, result)| match result {
            Ok(playing) => playing,
            Err(e) => {
                debug!(track = %id, error = %e, "is_playing query failed");
                false
            }
        })
    }

    /// Live per-handle positions. Handles whose query fails are omitted.
    pub async fn positions(&self) -> Vec<(Uuid, f64)> {
        let results = join_all(self.players.iter().map(|(&id, p)| async move {
            (id, p.position().await)
        }))
        .await;
        results
            .into_iter()
            .filter_map(|(id, result)| match result {
                Ok(position) if position.is_finite() => Some((id, position)),
                Ok(position) => {
                    warn!(track = %id, position, "Ignoring non-finite position");
                    None
                }
                Err(e) => {
                    warn!(track = %id, error = %e, "Position query failed");
                    None
                }
            })
            .collect()
    }

    /// Mean of all live positions, rounded to whole ms. 0 when empty.
    pub async fn position(&self) -> f64 {
        let positions = self.positions().await;
        if positions.is_empty() {
            return 0.0;
        }
        let sum: f64 = positions.iter().map(|(_, p)| p).sum();
        (sum / positions.len() as f64).round()
    }

    /// Spread between the furthest-ahead and furthest-behind handle.
    pub async fn drift(&self) -> f64 {
        let positions = self.positions().await;
        if positions.len() < 2 {
            return 0.0;
        }
        let (min, max) = positions
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &(_, p)| {
                (lo.min(p), hi.max(p))
            });
        max - min
    }

    /// Seek every handle to the current mean position. Returns the target.
    pub async fn resync_tracks(&self) -> f64 {
        let target = self.position().await;
        let report = self.set_position(target).await;
        info!(position_ms = target, failed = report.failed.len(), "Tracks resynced");
        target
    }

    /// Resync only when drift exceeds the configured tolerance.
    pub async fn resync_if_drifting(&self) -> bool {
        let drift = self.drift().await;
        if drift <= self.config.drift_tolerance_ms {
            return false;
        }
        debug!(drift_ms = drift, tolerance_ms = self.config.drift_tolerance_ms, "Drift over tolerance");
        self.resync_tracks().await;
        true
    }

    /// True if every handle reports loaded. Vacuously true when empty; a
    /// handle whose query fails counts as unloaded.
    pub async fn all_tracks_loaded(&self) -> bool {
        let results = join_all(self.players.iter().map(|(&id, p)| async move {
            (id, p.is_loaded().await)
        }))
        .await;
        results.into_iter().all(|(id, result)| match result {
            Ok(loaded) => loaded,
            Err(e) => {
                debug!(track = %id, error = %e, "is_loaded query failed");
                false
            }
        })
    }

    fn require_player(&self, id: Uuid) -> Result<&Arc<dyn AudioPlayer>> {
        self.players
            .get(&id)
            .ok_or_else(|| LoopError::InvalidArgument(format!("unknown track {}", id)))
    }

    /// Set one handle's volume from a 0–100 value. Out-of-range values are
    /// rejected, not clamped.
    pub async fn set_track_volume(&self, id: Uuid, volume: f64) -> Result<()> {
        validate_volume(volume)?;
        let player = self.require_player(id)?;
        player.set_volume(perceptual_gain(volume)).await
    }

    /// Set one handle's speed. Out-of-range speeds become 1.0.
    pub async fn set_track_speed(&self, id: Uuid, speed: f64) -> Result<()> {
        let player = self.require_player(id)?;
        player.set_speed(normalize_speed(speed)).await
    }
}

impl Default for PlaybackCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
