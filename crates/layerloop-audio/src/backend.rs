//! Player backends, selected explicitly at construction time.

use async_trait::async_trait;
use layerloop_core::{LoopError, Result, SourceHandle};
use layerloop_timeline::{normalize_speed, Track};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::debug;

use crate::player::AudioPlayer;

/// Which player implementation to construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[non_exhaustive]
pub enum PlayerBackend {
    /// Clock-driven player with no audio device. Used for headless
    /// sessions and tests.
    #[default]
    Simulated,
}

impl PlayerBackend {
    /// Create an unloaded player for `track`.
    pub fn create(self, track: &Track) -> Arc<dyn AudioPlayer> {
        match self {
            Self::Simulated => Arc::new(SimulatedPlayer::new(track.duration_ms)),
        }
    }

    /// Create a player for `track` and load its source.
    pub async fn create_loaded(self, track: &Track) -> Result<Arc<dyn AudioPlayer>> {
        let player = self.create(track);
        player.load(&track.source).await?;
        player.set_speed(normalize_speed(track.speed)).await?;
        Ok(player)
    }
}

#[derive(Debug)]
struct SimState {
    source: Option<SourceHandle>,
    duration_ms: f64,
    speed: f64,
    gain: f32,
    looping: bool,
    /// Position at `anchor`, or the frozen position while paused.
    base_position: f64,
    /// Set while playing.
    anchor: Option<Instant>,
}

impl SimState {
    fn position_at(&self, now: Instant) -> f64 {
        let raw = match self.anchor {
            Some(anchor) => {
                let elapsed_ms = now.saturating_duration_since(anchor).as_secs_f64() * 1000.0;
                self.base_position + elapsed_ms * self.speed
            }
            None => self.base_position,
        };
        self.wrap(raw)
    }

    fn wrap(&self, position: f64) -> f64 {
        if self.duration_ms <= 0.0 {
            return 0.0;
        }
        if self.looping {
            position.rem_euclid(self.duration_ms)
        } else {
            position.clamp(0.0, self.duration_ms)
        }
    }

    /// Freeze the clock at the current position.
    fn freeze(&mut self, now: Instant) {
        self.base_position = self.position_at(now);
        self.anchor = None;
    }

    fn reached_end(&self, now: Instant) -> bool {
        !self.looping && self.duration_ms > 0.0 && self.position_at(now) >= self.duration_ms
    }
}

/// A player that advances a virtual clock instead of producing sound.
#[derive(Debug)]
pub struct SimulatedPlayer {
    state: Mutex<SimState>,
}

impl SimulatedPlayer {
    /// Create a player for a source of `duration_ms`.
    pub fn new(duration_ms: f64) -> Self {
        let duration_ms = if duration_ms.is_finite() { duration_ms.max(0.0) } else { 0.0 };
        Self {
            state: Mutex::new(SimState {
                source: None,
                duration_ms,
                speed: 1.0,
                gain: 1.0,
                looping: false,
                base_position: 0.0,
                anchor: None,
            }),
        }
    }

    /// Current linear gain.
    pub fn gain(&self) -> f32 {
        self.state.lock().gain
    }

    /// Current speed multiplier.
    pub fn speed(&self) -> f64 {
        self.state.lock().speed
    }

    fn require_loaded(state: &SimState, action: &str) -> Result<()> {
        if state.source.is_none() {
            return Err(LoopError::PlaybackFailed(format!(
                "cannot {} before a source is loaded",
                action
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl AudioPlayer for SimulatedPlayer {
    async fn load(&self, source: &SourceHandle) -> Result<()> {
        let mut state = self.state.lock();
        debug!(source = %source, "Simulated player loaded");
        state.source = Some(source.clone());
        state.base_position = 0.0;
        state.anchor = None;
        Ok(())
    }

    async fn play(&self) -> Result<()> {
        let now = Instant::now();
        let mut state = self.state.lock();
        Self::require_loaded(&state, "play")?;
        if state.anchor.is_none() {
            if state.reached_end(now) {
                state.base_position = 0.0;
            }
            state.anchor = Some(now);
        }
        Ok(())
    }

    async fn pause(&self) -> Result<()> {
        let now = Instant::now();
        let mut state = self.state.lock();
        if state.anchor.is_some() {
            state.freeze(now);
        }
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        let mut state = self.state.lock();
        state.anchor = None;
        state.base_position = 0.0;
        Ok(())
    }

    async fn set_speed(&self, speed: f64) -> Result<()> {
        let now = Instant::now();
        let mut state = self.state.lock();
        let playing = state.anchor.is_some();
        state.freeze(now);
        state.speed = normalize_speed(speed);
        if playing {
            state.anchor = Some(now);
        }
        Ok(())
    }

    async fn set_volume(&self, gain: f32) -> Result<()> {
        if !(0.0..=1.0).contains(&gain) {
            return Err(LoopError::InvalidArgument(format!(
                "gain {} outside 0.0-1.0",
                gain
            )));
        }
        self.state.lock().gain = gain;
        Ok(())
    }

    async fn set_looping(&self, looping: bool) -> Result<()> {
        let now = Instant::now();
        let mut state = self.state.lock();
        let playing = state.anchor.is_some();
        state.freeze(now);
        state.looping = looping;
        if playing {
            state.anchor = Some(now);
        }
        Ok(())
    }

    async fn position(&self) -> Result<f64> {
        Ok(self.state.lock().position_at(Instant::now()))
    }

    async fn set_position(&self, position_ms: f64) -> Result<()> {
        if !position_ms.is_finite() {
            return Err(LoopError::InvalidArgument(format!(
                "cannot seek to {}",
                position_ms
            )));
        }
        let now = Instant::now();
        let mut state = self.state.lock();
        Self::require_loaded(&state, "seek")?;
        state.base_position = state.wrap(position_ms);
        if state.anchor.is_some() {
            state.anchor = Some(now);
        }
        Ok(())
    }

    async fn duration(&self) -> Result<f64> {
        Ok(self.state.lock().duration_ms)
    }

    async fn is_playing(&self) -> Result<bool> {
        let state = self.state.lock();
        Ok(state.anchor.is_some() && !state.reached_end(Instant::now()))
    }

    async fn is_loaded(&self) -> Result<bool> {
        Ok(self.state.lock().source.is_some())
    }
}
