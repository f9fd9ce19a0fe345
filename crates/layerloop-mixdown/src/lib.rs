//! LayerLoop Mixdown - Offline rendering of looping compositions
//!
//! This crate provides:
//! - Mix requests and results
//! - Piecewise-linear gain envelopes
//! - A precomputed render plan (loop repetition, crossfades, fade-out)
//! - A deterministic parallel renderer
//! - The async `MixdownEngine` with progress and cancel handles

pub mod engine;
pub mod envelope;
pub mod job;
pub mod plan;
pub mod render;
pub mod request;

pub use engine::{MixdownEngine, RenderedMix};
pub use envelope::GainEnvelope;
pub use job::{MixCancel, MixProgress};
pub use plan::{LoopStrategy, RenderPlan, TrackProfile, Voice};
pub use render::render;
pub use request::{MixRequest, MixResult, MixTrack};
