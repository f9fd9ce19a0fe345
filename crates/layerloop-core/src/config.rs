//! Engine configuration, loaded from JSON.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{LoopError, Result};
use crate::format::MixFormat;

/// Settings for the interactive playback coordinator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Drift (max - min position) above which a resync is triggered.
    pub drift_tolerance_ms: f64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            drift_tolerance_ms: 50.0,
        }
    }
}

/// Settings for offline mixdown renders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MixdownConfig {
    /// Output sample rate in Hz.
    pub sample_rate: u32,
    /// Output channel count.
    pub channels: u16,
    /// Crossfade applied at loop seams. Zero disables crossfading.
    pub crossfade_ms: f64,
    /// Format used when the requested codec cannot be produced.
    pub fallback_format: MixFormat,
    /// Longest render accepted, in ms. Longer requests are rejected before
    /// any buffer is allocated.
    pub max_duration_ms: f64,
}

impl Default for MixdownConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            channels: 2,
            crossfade_ms: 0.0,
            fallback_format: MixFormat::Wav,
            max_duration_ms: 3_600_000.0,
        }
    }
}

impl MixdownConfig {
    /// Reject settings the renderer cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(LoopError::InvalidArgument(
                "mixdown sample rate must be positive".into(),
            ));
        }
        if self.channels == 0 {
            return Err(LoopError::InvalidArgument(
                "mixdown channel count must be positive".into(),
            ));
        }
        if !self.crossfade_ms.is_finite() || self.crossfade_ms < 0.0 {
            return Err(LoopError::InvalidArgument(format!(
                "crossfade must be a non-negative duration, got {}",
                self.crossfade_ms
            )));
        }
        if !self.max_duration_ms.is_finite() || self.max_duration_ms <= 0.0 {
            return Err(LoopError::InvalidArgument(format!(
                "maximum mix duration must be positive, got {}",
                self.max_duration_ms
            )));
        }
        Ok(())
    }
}

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub playback: PlaybackConfig,
    pub mixdown: MixdownConfig,
}

impl EngineConfig {
    /// Deserialize from JSON bytes. Missing fields take their defaults.
    pub fn from_json(data: &[u8]) -> Result<Self> {
        let config: Self = serde_json::from_slice(data)
            .map_err(|e| LoopError::InvalidFormat(format!("Invalid config: {}", e)))?;
        config.mixdown.validate()?;
        Ok(config)
    }

    /// Serialize to pretty JSON bytes.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(self)
            .map_err(|e| LoopError::Unknown(format!("Failed to serialize config: {}", e)))
    }

    /// Load configuration from a file path.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::from_json(&data)
    }
}
