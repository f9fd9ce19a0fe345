//! The audio handle capability consumed from the platform.

use async_trait::async_trait;
use layerloop_core::{Result, SourceHandle};

/// One independently driven audio player.
///
/// Every method takes `&self` so the coordinator can drive many handles
/// concurrently; implementations keep their own interior state. Positions
/// and durations are milliseconds.
#[async_trait]
pub trait AudioPlayer: Send + Sync {
    /// Open `source` for playback.
    async fn load(&self, source: &SourceHandle) -> Result<()>;

    async fn play(&self) -> Result<()>;

    async fn pause(&self) -> Result<()>;

    /// Pause and rewind to the start.
    async fn stop(&self) -> Result<()>;

    /// Playback speed multiplier.
    async fn set_speed(&self, speed: f64) -> Result<()>;

    /// Linear output gain, 0.0 to 1.0.
    async fn set_volume(&self, gain: f32) -> Result<()>;

    async fn set_looping(&self, looping: bool) -> Result<()>;

    /// Live playback position.
    async fn position(&self) -> Result<f64>;

    async fn set_position(&self, position_ms: f64) -> Result<()>;

    /// Duration of the loaded source.
    async fn duration(&self) -> Result<f64>;

    async fn is_playing(&self) -> Result<bool>;

    async fn is_loaded(&self) -> Result<bool>;
}
