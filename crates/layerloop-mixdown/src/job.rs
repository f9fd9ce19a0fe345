//! Progress and cancel handles for a running mixdown.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

/// Upper bound of the progress ratio once decoding is done.
pub const DECODE_DONE: f32 = 0.3;
/// Upper bound of the progress ratio once rendering is done.
pub const RENDER_DONE: f32 = 0.9;

/// Coarse completion ratio of a mixdown, shared with the caller.
///
/// Decoding reports up to 0.3, rendering up to 0.9 and encoding sets 1.0.
/// The ratio never moves backwards.
#[derive(Debug, Clone)]
pub struct MixProgress(Arc<AtomicU32>);

impl MixProgress {
    /// Create a new progress handle at 0.0.
    pub fn new() -> Self {
        Self(Arc::new(AtomicU32::new(0f32.to_bits())))
    }

    /// Current ratio, 0.0 to 1.0.
    pub fn fraction(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    /// Raise the ratio to `fraction`; lower values are ignored.
    pub fn advance(&self, fraction: f32) {
        let fraction = fraction.clamp(0.0, 1.0);
        let _ = self
            .0
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |bits| {
                (fraction > f32::from_bits(bits)).then(|| fraction.to_bits())
            });
    }

    /// Report `done` of `total` steps within the `from..to` stage window.
    pub fn stage(&self, from: f32, to: f32, done: usize, total: usize) {
        let within = if total == 0 {
            1.0
        } else {
            done as f32 / total as f32
        };
        self.advance(from + (to - from) * within.min(1.0));
    }

    /// Whether the mix has finished encoding.
    pub fn is_complete(&self) -> bool {
        self.fraction() >= 1.0
    }
}

impl Default for MixProgress {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Default)]
struct CancelState {
    cancelled: AtomicBool,
    started: AtomicBool,
}

/// Handle for cancelling a mixdown before it starts rendering.
///
/// Once rendering has started the render runs to completion; a later
/// [`cancel`](Self::cancel) is recorded but has no effect on the result.
#[derive(Debug, Clone, Default)]
pub struct MixCancel(Arc<CancelState>);

impl MixCancel {
    /// Create a new cancel handle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal cancellation. Returns whether it can still take effect.
    pub fn cancel(&self) -> bool {
        self.0.cancelled.store(true, Ordering::SeqCst);
        !self.0.started.load(Ordering::SeqCst)
    }

    /// Check if cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.0.cancelled.load(Ordering::SeqCst)
    }

    /// Whether rendering has begun.
    pub fn has_started(&self) -> bool {
        self.0.started.load(Ordering::SeqCst)
    }

    /// Mark rendering as started. Returns `false` if a cancel arrived first.
    pub(crate) fn begin(&self) -> bool {
        self.0.started.store(true, Ordering::SeqCst);
        !self.0.cancelled.load(Ordering::SeqCst)
    }
}
