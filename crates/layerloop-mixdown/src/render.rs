//! Deterministic offline renderer.
//!
//! The output is split into fixed-size blocks rendered in parallel. Each
//! block sums the voices that overlap it in plan order, so the result does
//! not depend on scheduling and no per-voice buffer is ever allocated.

use std::ops::Range;
use std::sync::atomic::{AtomicUsize, Ordering};

use layerloop_core::{AudioBuffer, SharedAudioBuffer};
use rayon::prelude::*;
use tracing::debug;

use crate::plan::{RenderPlan, Voice};

/// Output frames rendered per parallel work item.
pub const BLOCK_FRAMES: usize = 4_096;

/// Render `plan` from decoded `sources` (indexed by track).
pub fn render(plan: &RenderPlan, sources: &[SharedAudioBuffer]) -> AudioBuffer {
    render_with_progress(plan, sources, |_, _| {})
}

/// Render `plan`, calling `on_block(done, total)` as output blocks finish.
pub fn render_with_progress(
    plan: &RenderPlan,
    sources: &[SharedAudioBuffer],
    on_block: impl Fn(usize, usize) + Sync,
) -> AudioBuffer {
    let channels = plan.channels as usize;
    let mut output = AudioBuffer::silent(plan.total_frames, plan.sample_rate, plan.channels);
    if channels == 0 || plan.total_frames == 0 {
        return output;
    }

    let total = plan.total_frames.div_ceil(BLOCK_FRAMES);
    let done = AtomicUsize::new(0);
    let apply_master = !plan.master.is_constant() || plan.master.gain_at(0) != 1.0;

    output
        .samples
        .par_chunks_mut(BLOCK_FRAMES * channels)
        .enumerate()
        .for_each(|(block, samples)| {
            let start = block * BLOCK_FRAMES;
            let frames = start..start + samples.len() / channels;

            for voice in &plan.voices {
                if let Some(source) = sources.get(voice.track) {
                    mix_voice(voice, source, frames.clone(), samples, channels);
                }
            }

            if apply_master {
                for (offset, frame) in samples.chunks_mut(channels).enumerate() {
                    let gain = plan.master.gain_at(start + offset);
                    for sample in frame {
                        *sample *= gain;
                    }
                }
            }

            on_block(done.fetch_add(1, Ordering::Relaxed) + 1, total);
        });

    debug!(
        voices = plan.voices.len(),
        blocks = total,
        frames = plan.total_frames,
        "Rendered mix"
    );
    output
}

/// Add the part of `voice` that falls inside `frames` to `block`, which
/// holds exactly those output frames.
fn mix_voice(
    voice: &Voice,
    source: &AudioBuffer,
    frames: Range<usize>,
    block: &mut [f32],
    channels: usize,
) {
    let source_frames = source.frames();
    let source_channels = source.channels as usize;
    if source_frames == 0 || source_channels == 0 {
        return;
    }

    let first = voice.onset.max(frames.start);
    let last = voice.onset.saturating_add(voice.length).min(frames.end);
    let wrap = source_frames as f64;
    for frame in first..last {
        let mut position = (frame - voice.onset) as f64 * voice.rate;
        if voice.looping {
            position %= wrap;
        } else if position >= wrap {
            break;
        }
        let index = position as usize;
        let frac = (position - index as f64) as f32;
        let next = if index + 1 < source_frames {
            index + 1
        } else if voice.looping {
            0
        } else {
            index
        };

        let gain = voice.envelope.gain_at(frame);
        if gain == 0.0 {
            continue;
        }
        let base = (frame - frames.start) * channels;
        for (ch, slot) in block[base..base + channels].iter_mut().enumerate() {
            let src_ch = if source_channels == 1 { 0 } else { ch };
            if src_ch >= source_channels {
                continue;
            }
            let a = source.sample(index, src_ch);
            let b = source.sample(next, src_ch);
            *slot += (a + (b - a) * frac) * gain;
        }
    }
}
