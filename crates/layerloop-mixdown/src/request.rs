//! Mixdown request and result types.

use layerloop_core::{LoopError, MixFormat, MixQuality, Result, SourceHandle};
use serde::{Deserialize, Serialize};

/// One track to be rendered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixTrack {
    pub source: SourceHandle,
    /// Playback speed multiplier. Out-of-range values render at 1.0.
    #[serde(default = "default_speed")]
    pub speed: f64,
    /// Volume 0 to 100.
    #[serde(default = "default_volume")]
    pub volume: f64,
}

fn default_speed() -> f64 {
    1.0
}

fn default_volume() -> f64 {
    100.0
}

impl MixTrack {
    /// Full-volume track at unit speed.
    pub fn new(source: SourceHandle) -> Self {
        Self {
            source,
            speed: default_speed(),
            volume: default_volume(),
        }
    }

    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = speed;
        self
    }

    pub fn with_volume(mut self, volume: f64) -> Self {
        self.volume = volume;
        self
    }
}

/// Everything needed to render and encode one mix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixRequest {
    pub tracks: Vec<MixTrack>,
    /// Number of master loop cycles to render.
    pub loop_count: u32,
    /// Global fade-out appended after the last cycle, in ms.
    #[serde(default)]
    pub fadeout_ms: f64,
    #[serde(default)]
    pub format: MixFormat,
    #[serde(default)]
    pub quality: MixQuality,
}

impl MixRequest {
    /// Request `loop_count` cycles of `tracks` as WAV with no fade-out.
    pub fn new(tracks: Vec<MixTrack>, loop_count: u32) -> Self {
        Self {
            tracks,
            loop_count,
            fadeout_ms: 0.0,
            format: MixFormat::Wav,
            quality: MixQuality::default(),
        }
    }

    pub fn with_fadeout(mut self, fadeout_ms: f64) -> Self {
        self.fadeout_ms = fadeout_ms;
        self
    }

    pub fn with_format(mut self, format: MixFormat, quality: MixQuality) -> Self {
        self.format = format;
        self.quality = quality;
        self
    }

    /// Reject requests the renderer cannot honour.
    pub fn validate(&self) -> Result<()> {
        if !self.fadeout_ms.is_finite() || self.fadeout_ms < 0.0 {
            return Err(LoopError::InvalidArgument(format!(
                "fade-out must be a non-negative duration, got {}",
                self.fadeout_ms
            )));
        }
        Ok(())
    }

    /// Deserialize from JSON bytes.
    pub fn from_json(data: &[u8]) -> Result<Self> {
        let request: Self = serde_json::from_slice(data)
            .map_err(|e| LoopError::InvalidFormat(format!("Invalid mix request: {}", e)))?;
        request.validate()?;
        Ok(request)
    }
}

/// An encoded mix.
#[derive(Debug, Clone, PartialEq)]
pub struct MixResult {
    /// Encoded bytes in `actual_format`.
    pub data: Vec<u8>,
    /// The format actually produced; differs from the request on fallback.
    pub actual_format: MixFormat,
    /// Rendered length in ms.
    pub duration_ms: f64,
    pub sample_rate: u32,
    pub channels: u16,
}

impl MixResult {
    /// Whether the requested codec had to be replaced.
    pub fn fell_back(&self, request: &MixRequest) -> bool {
        self.actual_format != request.format
    }
}
