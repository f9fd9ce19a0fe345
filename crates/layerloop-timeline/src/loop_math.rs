//! Loop timing math.
//!
//! Pure functions that turn independently-durationed, independently
//! speed-adjusted tracks into one shared cyclic timeline. All durations are
//! milliseconds as `f64`. The master loop is defined by the track at
//! position 0; later tracks never change it.
//!
//! Degenerate input (zero, negative, NaN or infinite durations) never
//! panics: durations collapse to 0, loop counts to 1, and boundary lists to
//! empty.

use layerloop_core::speed;
use uuid::Uuid;

use crate::track::Track;

/// Map any speed outside `0.05..=2.5` (including 0, negatives and NaN) to 1.0.
#[inline]
pub fn normalize_speed(speed: f64) -> f64 {
    if speed.is_finite() && (speed::MIN..=speed::MAX).contains(&speed) {
        speed
    } else {
        speed::DEFAULT
    }
}

#[inline]
fn is_valid_duration(duration: f64) -> bool {
    duration.is_finite() && duration > 0.0
}

/// Duration of `duration` ms of audio played at `speed`, rounded to whole ms.
pub fn speed_adjusted_duration(duration: f64, speed: f64) -> f64 {
    if !is_valid_duration(duration) {
        return 0.0;
    }
    (duration / normalize_speed(speed)).round()
}

/// Length of one master loop cycle: the speed-adjusted duration of track 0.
pub fn master_loop_duration(tracks: &[Track]) -> f64 {
    match tracks.first() {
        Some(master) => speed_adjusted_duration(master.duration_ms, master.speed),
        None => 0.0,
    }
}

/// How many times a track restarts within one master cycle. Always `>= 1`.
pub fn loop_count(track_duration: f64, master_duration: f64) -> u32 {
    if !is_valid_duration(track_duration) || !is_valid_duration(master_duration) {
        return 1;
    }
    let count = (master_duration / track_duration).ceil();
    // `as` saturates, so absurdly short tracks cannot wrap around.
    (count as u32).max(1)
}

/// Start offsets at which a track restarts inside one master cycle.
///
/// Strictly increasing, every element `< master_duration`.
pub fn loop_boundaries(track_duration: f64, master_duration: f64) -> Vec<f64> {
    if !is_valid_duration(track_duration) || !is_valid_duration(master_duration) {
        return Vec::new();
    }
    (0..loop_count(track_duration, master_duration))
        .map(|i| i as f64 * track_duration)
        .filter(|&start| start < master_duration)
        .collect()
}

/// Whether `id` is the master track (position 0).
pub fn is_master_track(tracks: &[Track], id: Uuid) -> bool {
    tracks.first().is_some_and(|t| t.id == id)
}

/// The master track, if any.
pub fn master_track(tracks: &[Track]) -> Option<&Track> {
    tracks.first()
}

/// Loop geometry of one non-master track against the master cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackLoopInfo {
    /// Repetitions per master cycle, `>= 1`.
    pub loop_count: u32,
    /// Restart offsets within the cycle.
    pub boundaries: Vec<f64>,
    /// `loop_count * track_duration`; 0 when the track duration is invalid.
    pub total_duration: f64,
}

/// Bundle [`loop_count`] and [`loop_boundaries`] for one track.
pub fn track_loop_info(track_duration: f64, master_duration: f64) -> TrackLoopInfo {
    let loop_count = loop_count(track_duration, master_duration);
    let total_duration = if is_valid_duration(track_duration) {
        loop_count as f64 * track_duration
    } else {
        0.0
    };
    TrackLoopInfo {
        loop_count,
        boundaries: loop_boundaries(track_duration, master_duration),
        total_duration,
    }
}
