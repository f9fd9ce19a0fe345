//! Render planning.
//!
//! A [`RenderPlan`] is the precomputed event list for one mixdown: each
//! [`Voice`] is one scheduled playback of a decoded track with its onset,
//! length, read rate and gain envelope. The renderer consumes the plan in a
//! single deterministic pass with no incremental state machine.
//!
//! The mixdown master loop is the longest speed-adjusted track, which is a
//! different rule from interactive playback (track 0 only).

use layerloop_audio::perceptual_gain;
use layerloop_core::{LoopError, MixdownConfig, Result};
use layerloop_timeline::{normalize_speed, speed_adjusted_duration};

use crate::envelope::GainEnvelope;

/// What the planner needs to know about one decoded track.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackProfile {
    /// Decoded length in source frames.
    pub source_frames: usize,
    /// Decoded sample rate.
    pub source_rate: u32,
    pub speed: f64,
    /// Volume 0 to 100.
    pub volume: f64,
}

impl TrackProfile {
    /// Decoded duration in ms, before speed adjustment.
    pub fn duration_ms(&self) -> f64 {
        if self.source_rate == 0 {
            return 0.0;
        }
        self.source_frames as f64 * 1000.0 / self.source_rate as f64
    }

    /// Duration after speed adjustment, rounded to whole ms.
    pub fn adjusted_duration_ms(&self) -> f64 {
        speed_adjusted_duration(self.duration_ms(), self.speed)
    }
}

/// How a track is repeated across the render.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LoopStrategy {
    /// The decoded buffer repeats verbatim with no seam control.
    Native,
    /// Manually scheduled overlapping repetitions blended at each seam.
    Crossfaded { repetitions: usize },
}

/// One scheduled playback of a track.
#[derive(Debug, Clone, PartialEq)]
pub struct Voice {
    /// Index into the request's track list.
    pub track: usize,
    /// First output frame.
    pub onset: usize,
    /// Output frames this voice spans (before truncation to the render).
    pub length: usize,
    /// Source frames advanced per output frame.
    pub rate: f64,
    /// Wrap the source read position instead of stopping at its end.
    pub looping: bool,
    /// Gain over absolute output frames, volume included.
    pub envelope: GainEnvelope,
}

/// Precomputed render graph for one mixdown.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderPlan {
    pub sample_rate: u32,
    pub channels: u16,
    /// Length of the output in frames.
    pub total_frames: usize,
    /// Length of the output in ms.
    pub total_duration_ms: f64,
    pub voices: Vec<Voice>,
    /// Master gain stage applied after all voices are summed.
    pub master: GainEnvelope,
}

/// Longest speed-adjusted duration across all tracks; 0 when empty.
pub fn mixdown_loop_duration(tracks: &[TrackProfile]) -> f64 {
    tracks
        .iter()
        .map(TrackProfile::adjusted_duration_ms)
        .fold(0.0, f64::max)
}

/// Length of the render: `master * loop_count + fadeout`.
///
/// A zero loop count or an empty track list renders the fade-out only.
pub fn total_duration_ms(master_ms: f64, loop_count: u32, fadeout_ms: f64) -> f64 {
    let fadeout_ms = if fadeout_ms.is_finite() { fadeout_ms.max(0.0) } else { 0.0 };
    if loop_count == 0 || master_ms <= 0.0 {
        return fadeout_ms;
    }
    master_ms * loop_count as f64 + fadeout_ms
}

/// Frames covering `ms` at `sample_rate`, rounded up.
pub fn ms_to_frames(ms: f64, sample_rate: u32) -> usize {
    if !ms.is_finite() || ms <= 0.0 {
        return 0;
    }
    // Absorb float noise such as 42000.000000001 before rounding up.
    let exact = ms * sample_rate as f64 / 1000.0;
    (exact - 1e-6).ceil().max(0.0) as usize
}

/// Repetitions needed to cover `total_ms` with a track of `track_ms` whose
/// repetitions overlap by `crossfade_ms`.
///
/// At least `ceil(total / track)`. Overlapped repetitions advance by only
/// `track - crossfade` each, so that nominal count can end short of the
/// render; the result is raised to `ceil((total - crossfade) / (track -
/// crossfade))` when needed so the last repetition reaches the end.
pub fn crossfade_repetitions(total_ms: f64, track_ms: f64, crossfade_ms: f64) -> usize {
    if track_ms <= 0.0 || total_ms <= 0.0 {
        return 0;
    }
    let plain = (total_ms / track_ms).ceil();
    let stride = track_ms - crossfade_ms;
    let covering = if stride > 0.0 {
        ((total_ms - crossfade_ms) / stride).ceil()
    } else {
        plain
    };
    plain.max(covering).max(1.0) as usize
}

/// Pick the looping strategy for one track.
pub fn choose_strategy(total_ms: f64, track_ms: f64, crossfade_ms: f64) -> LoopStrategy {
    let wants_crossfade = crossfade_ms > 0.0;
    let repeats = track_ms > 0.0 && total_ms > track_ms;
    let long_enough = track_ms > 2.0 * crossfade_ms;
    if wants_crossfade && repeats && long_enough {
        LoopStrategy::Crossfaded {
            repetitions: crossfade_repetitions(total_ms, track_ms, crossfade_ms),
        }
    } else {
        LoopStrategy::Native
    }
}

impl RenderPlan {
    /// Like [`build`](Self::build), but rejects renders longer than
    /// `config.max_duration_ms` before anything is scheduled.
    pub fn checked(
        tracks: &[TrackProfile],
        loop_count: u32,
        fadeout_ms: f64,
        config: &MixdownConfig,
    ) -> Result<Self> {
        let planned = total_duration_ms(mixdown_loop_duration(tracks), loop_count, fadeout_ms);
        if planned > config.max_duration_ms {
            return Err(LoopError::InvalidArgument(format!(
                "mix of {} ms exceeds the {} ms limit",
                planned, config.max_duration_ms
            )));
        }
        Ok(Self::build(tracks, loop_count, fadeout_ms, config))
    }

    /// Build the plan for `tracks` rendered `loop_count` times with a
    /// `fadeout_ms` global fade.
    pub fn build(
        tracks: &[TrackProfile],
        loop_count: u32,
        fadeout_ms: f64,
        config: &MixdownConfig,
    ) -> Self {
        let sample_rate = config.sample_rate;
        let master_ms = mixdown_loop_duration(tracks);
        let total_duration_ms = total_duration_ms(master_ms, loop_count, fadeout_ms);
        let total_frames = ms_to_frames(total_duration_ms, sample_rate);

        let mut voices = Vec::new();
        for (index, track) in tracks.iter().enumerate() {
            Self::schedule_track(index, track, total_duration_ms, total_frames, config, &mut voices);
        }

        let fade_frames = ms_to_frames(fadeout_ms, sample_rate);
        Self {
            sample_rate,
            channels: config.channels,
            total_frames,
            total_duration_ms,
            voices,
            master: GainEnvelope::fade_out(total_frames, fade_frames),
        }
    }

    fn schedule_track(
        index: usize,
        track: &TrackProfile,
        total_ms: f64,
        total_frames: usize,
        config: &MixdownConfig,
        voices: &mut Vec<Voice>,
    ) {
        if track.source_frames == 0 || track.source_rate == 0 || total_frames == 0 {
            return;
        }
        let gain = perceptual_gain(track.volume);
        let speed = normalize_speed(track.speed);
        let rate = speed * track.source_rate as f64 / config.sample_rate as f64;
        // Exact output length of one pass; the rounded ms value is only for
        // choosing the master loop.
        let pass_frames_exact = track.source_frames as f64 / rate;
        let pass_frames = pass_frames_exact.round().max(1.0) as usize;
        let track_ms = track.adjusted_duration_ms();

        match choose_strategy(total_ms, track_ms, config.crossfade_ms) {
            LoopStrategy::Native => voices.push(Voice {
                track: index,
                onset: 0,
                length: total_frames,
                rate,
                looping: true,
                envelope: GainEnvelope::constant(gain),
            }),
            LoopStrategy::Crossfaded { repetitions } => {
                let fade = ms_to_frames(config.crossfade_ms, config.sample_rate).min(pass_frames / 2);
                let stride = pass_frames_exact - fade as f64;
                for rep in 0..repetitions {
                    let onset = (rep as f64 * stride).round() as usize;
                    if onset >= total_frames {
                        break;
                    }
                    let end = onset + pass_frames;
                    let mut points = Vec::with_capacity(4);
                    if rep == 0 {
                        points.push((onset, 1.0));
                    } else {
                        points.push((onset, 0.0));
                        points.push((onset + fade, 1.0));
                    }
                    if rep + 1 == repetitions {
                        points.push((end, 1.0));
                    } else {
                        points.push((end - fade, 1.0));
                        points.push((end, 0.0));
                    }
                    voices.push(Voice {
                        track: index,
                        onset,
                        length: pass_frames,
                        rate,
                        looping: false,
                        envelope: GainEnvelope::from_points(points).scaled(gain),
                    });
                }
            }
        }
    }

    /// Whether the plan produces any audible voice.
    pub fn is_silent(&self) -> bool {
        self.voices.is_empty()
    }
}
