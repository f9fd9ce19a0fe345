//! LayerLoop Core - Foundation types for looping compositions
//!
//! This crate provides the fundamental types used throughout LayerLoop:
//! - Error taxonomy (LoopError, ErrorKind)
//! - Decoded PCM buffers
//! - Source handles for recordings and imports
//! - Output formats and engine configuration

pub mod buffer;
pub mod config;
pub mod error;
pub mod format;
pub mod source;

pub use buffer::{AudioBuffer, SharedAudioBuffer};
pub use config::{EngineConfig, MixdownConfig, PlaybackConfig};
pub use error::{ErrorKind, LoopError, Result};
pub use format::{bitrate_kbps, MixFormat, MixQuality};
pub use source::SourceHandle;

/// Playback speed limits shared by playback and mixdown.
pub mod speed {
    /// Slowest accepted playback speed multiplier.
    pub const MIN: f64 = 0.05;

    /// Fastest accepted playback speed multiplier.
    pub const MAX: f64 = 2.5;

    /// Speed substituted for anything outside `MIN..=MAX`.
    pub const DEFAULT: f64 = 1.0;
}
