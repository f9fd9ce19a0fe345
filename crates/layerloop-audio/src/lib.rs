//! LayerLoop Audio - Interactive playback
//!
//! Architecture:
//! - `AudioPlayer`: capability trait implemented once per platform backend
//! - `PlayerBackend`: explicit backend selection at construction time
//! - `PlaybackCoordinator`: drives N handles as one looping transport
//! - `perceptual_gain`: volume taper shared with the mixdown engine

pub mod backend;
pub mod coordinator;
pub mod gain;
pub mod player;

pub use backend::{PlayerBackend, SimulatedPlayer};
pub use coordinator::{FanOutReport, PlaybackCoordinator};
pub use gain::perceptual_gain;
pub use player::AudioPlayer;
