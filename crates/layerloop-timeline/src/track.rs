//! Tracks and the ordered track collection.

use layerloop_core::{LoopError, Result, SourceHandle};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::loop_math::{self, TrackLoopInfo};

/// One layer of the composition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Unique track ID
    pub id: Uuid,
    /// Display name
    pub name: String,
    /// Where the audio lives
    pub source: SourceHandle,
    /// Nominal duration in ms, before speed adjustment
    pub duration_ms: f64,
    /// Playback speed multiplier (valid range 0.05 to 2.5)
    pub speed: f64,
    /// Volume 0 to 100
    pub volume: f64,
}

impl Track {
    /// Create a track at unit speed and full volume.
    pub fn new(name: impl Into<String>, source: SourceHandle, duration_ms: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            source,
            duration_ms,
            speed: 1.0,
            volume: 100.0,
        }
    }

    /// Set the speed multiplier.
    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = speed;
        self
    }

    /// Set the volume.
    pub fn with_volume(mut self, volume: f64) -> Self {
        self.volume = volume;
        self
    }

    /// Duration after speed adjustment.
    pub fn adjusted_duration(&self) -> f64 {
        loop_math::speed_adjusted_duration(self.duration_ms, self.speed)
    }
}

/// Check that a volume lies within `0..=100`.
pub fn validate_volume(volume: f64) -> Result<()> {
    if volume.is_finite() && (0.0..=100.0).contains(&volume) {
        Ok(())
    } else {
        Err(LoopError::InvalidArgument(format!(
            "volume {} outside 0-100",
            volume
        )))
    }
}

/// Ordered track collection. The track at position 0 is the master track.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackList {
    tracks: Vec<Track>,
}

impl TrackList {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a track. The first track pushed becomes the master.
    pub fn push(&mut self, track: Track) -> Uuid {
        let id = track.id;
        if self.tracks.is_empty() {
            info!(track = %id, name = %track.name, "Master track set");
        }
        self.tracks.push(track);
        id
    }

    /// All tracks in order.
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Number of tracks.
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    /// Whether the collection is empty.
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Find a track by ID.
    pub fn get(&self, id: Uuid) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id == id)
    }

    fn get_mut(&mut self, id: Uuid) -> Result<&mut Track> {
        self.tracks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| LoopError::InvalidArgument(format!("unknown track {}", id)))
    }

    /// Ordinal position of a track.
    pub fn position_of(&self, id: Uuid) -> Option<usize> {
        self.tracks.iter().position(|t| t.id == id)
    }

    /// The master track, if any.
    pub fn master(&self) -> Option<&Track> {
        loop_math::master_track(&self.tracks)
    }

    /// Whether `id` is the master track.
    pub fn is_master(&self, id: Uuid) -> bool {
        loop_math::is_master_track(&self.tracks, id)
    }

    /// Remove a track and return what was removed.
    ///
    /// Removing the master track clears the whole collection, since every
    /// other track's loop geometry is defined relative to it. Unknown IDs
    /// remove nothing.
    pub fn remove(&mut self, id: Uuid) -> Vec<Track> {
        match self.position_of(id) {
            Some(0) => {
                info!(track = %id, cleared = self.tracks.len(), "Master track removed, clearing all tracks");
                std::mem::take(&mut self.tracks)
            }
            Some(index) => {
                debug!(track = %id, index, "Track removed");
                vec![self.tracks.remove(index)]
            }
            None => Vec::new(),
        }
    }

    /// Remove every track.
    pub fn clear(&mut self) {
        self.tracks.clear();
    }

    /// Change a track's speed. Out-of-range speeds are stored as given and
    /// normalized only for duration math.
    pub fn set_speed(&mut self, id: Uuid, speed: f64) -> Result<()> {
        self.get_mut(id)?.speed = speed;
        Ok(())
    }

    /// Change a track's nominal duration.
    pub fn set_duration(&mut self, id: Uuid, duration_ms: f64) -> Result<()> {
        self.get_mut(id)?.duration_ms = duration_ms;
        Ok(())
    }

    /// Change a track's volume. Values outside `0..=100` are rejected.
    pub fn set_volume(&mut self, id: Uuid, volume: f64) -> Result<()> {
        validate_volume(volume)?;
        self.get_mut(id)?.volume = volume;
        Ok(())
    }

    /// Current master loop duration; 0 when empty.
    pub fn master_loop_duration(&self) -> f64 {
        loop_math::master_loop_duration(&self.tracks)
    }

    /// Loop geometry of a non-master track. `None` for the master or an
    /// unknown ID.
    pub fn loop_info(&self, id: Uuid) -> Option<TrackLoopInfo> {
        if self.is_master(id) {
            return None;
        }
        let track = self.get(id)?;
        Some(loop_math::track_loop_info(
            track.adjusted_duration(),
            self.master_loop_duration(),
        ))
    }
}
