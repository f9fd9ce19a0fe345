//! The mixdown engine: decode, plan, render, encode.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use layerloop_core::{AudioBuffer, LoopError, MixdownConfig, Result, SharedAudioBuffer};
use layerloop_media::{AudioDecoder, EncoderChain, SymphoniaDecoder};
use rayon::prelude::*;
use tracing::{info, warn};

use crate::job::{MixCancel, MixProgress, DECODE_DONE, RENDER_DONE};
use crate::plan::{RenderPlan, TrackProfile};
use crate::render::render_with_progress;
use crate::request::{MixRequest, MixResult};

/// An unencoded render.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedMix {
    pub buffer: AudioBuffer,
    /// Planned length in ms.
    pub duration_ms: f64,
}

/// Offline renderer for [`MixRequest`]s.
///
/// The engine holds no per-request state; concurrent calls are independent.
#[derive(Clone)]
pub struct MixdownEngine {
    decoder: Arc<dyn AudioDecoder>,
    encoders: Arc<EncoderChain>,
    config: MixdownConfig,
}

impl MixdownEngine {
    /// Engine over explicit collaborators.
    pub fn new(
        decoder: Arc<dyn AudioDecoder>,
        encoders: EncoderChain,
        config: MixdownConfig,
    ) -> Self {
        Self {
            decoder,
            encoders: Arc::new(encoders),
            config,
        }
    }

    /// Symphonia decoding and the standard encoder chain.
    pub fn standard(config: MixdownConfig) -> Self {
        Self::new(Arc::new(SymphoniaDecoder::new()), EncoderChain::standard(), config)
    }

    pub fn config(&self) -> &MixdownConfig {
        &self.config
    }

    /// Render `request` without encoding it.
    pub async fn render(&self, request: &MixRequest) -> Result<RenderedMix> {
        let job = self.job(request.clone(), MixProgress::new(), MixCancel::new());
        let track_count = request.tracks.len();
        run_blocking(track_count, move || job.render()).await
    }

    /// Render and encode `request`.
    pub async fn mix(&self, request: MixRequest) -> Result<MixResult> {
        self.mix_with(request, &MixProgress::new(), &MixCancel::new())
            .await
    }

    /// Render and encode `request`, reporting through `progress`.
    ///
    /// A `cancel` signalled before rendering begins aborts with
    /// [`LoopError::Cancelled`]. Once rendering has begun it runs to
    /// completion.
    pub async fn mix_with(
        &self,
        request: MixRequest,
        progress: &MixProgress,
        cancel: &MixCancel,
    ) -> Result<MixResult> {
        let track_count = request.tracks.len();
        let job = self.job(request, progress.clone(), cancel.clone());
        run_blocking(track_count, move || job.mix()).await
    }

    fn job(&self, request: MixRequest, progress: MixProgress, cancel: MixCancel) -> MixJob {
        MixJob {
            decoder: Arc::clone(&self.decoder),
            encoders: Arc::clone(&self.encoders),
            config: self.config.clone(),
            request,
            progress,
            cancel,
        }
    }
}

async fn run_blocking<T, F>(track_count: usize, work: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    let outcome = tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| LoopError::Unknown(format!("mixdown task failed: {e}")))
        .and_then(|result| result);
    outcome.map_err(|e| match e {
        LoopError::Cancelled => LoopError::Cancelled,
        other => LoopError::mixing(track_count, other),
    })
}

/// Everything one render needs, owned so it can move to a blocking thread.
struct MixJob {
    decoder: Arc<dyn AudioDecoder>,
    encoders: Arc<EncoderChain>,
    config: MixdownConfig,
    request: MixRequest,
    progress: MixProgress,
    cancel: MixCancel,
}

impl MixJob {
    fn render(&self) -> Result<RenderedMix> {
        self.config.validate()?;
        self.request.validate()?;
        if self.cancel.is_cancelled() {
            return Err(LoopError::Cancelled);
        }

        let sources = self.decode_all()?;
        let profiles: Vec<TrackProfile> = self
            .request
            .tracks
            .iter()
            .zip(&sources)
            .map(|(track, source)| TrackProfile {
                source_frames: source.frames(),
                source_rate: source.sample_rate,
                speed: track.speed,
                volume: track.volume,
            })
            .collect();

        let plan = RenderPlan::checked(
            &profiles,
            self.request.loop_count,
            self.request.fadeout_ms,
            &self.config,
        )?;
        info!(
            tracks = profiles.len(),
            voices = plan.voices.len(),
            duration_ms = plan.total_duration_ms,
            frames = plan.total_frames,
            "Planned mixdown"
        );

        if !self.cancel.begin() {
            info!("Mixdown cancelled before rendering");
            return Err(LoopError::Cancelled);
        }

        let buffer = render_with_progress(&plan, &sources, |done, total| {
            self.progress.stage(DECODE_DONE, RENDER_DONE, done, total);
        });
        if self.cancel.is_cancelled() {
            info!("Cancel requested after rendering started; ignoring");
        }
        self.progress.advance(RENDER_DONE);
        info!(frames = buffer.frames(), peak = buffer.peak(), "Rendered mixdown");

        Ok(RenderedMix {
            buffer,
            duration_ms: plan.total_duration_ms,
        })
    }

    fn mix(self) -> Result<MixResult> {
        let rendered = self.render()?;
        let requested = self.request.format;
        let encoded = self.encoders.encode(
            &rendered.buffer,
            requested,
            self.request.quality,
            self.config.fallback_format,
        )?;
        if encoded.format != requested {
            warn!(%requested, actual = %encoded.format, "Mix encoded in fallback format");
        }
        info!(
            format = %encoded.format,
            bytes = encoded.bytes.len(),
            "Encoded mixdown"
        );
        self.progress.advance(1.0);

        Ok(MixResult {
            data: encoded.bytes,
            actual_format: encoded.format,
            duration_ms: rendered.duration_ms,
            sample_rate: rendered.buffer.sample_rate,
            channels: rendered.buffer.channels,
        })
    }

    fn decode_all(&self) -> Result<Vec<SharedAudioBuffer>> {
        let tracks = &self.request.tracks;
        let total = tracks.len();
        let done = AtomicUsize::new(0);
        let sources = tracks
            .par_iter()
            .map(|track| -> Result<SharedAudioBuffer> {
                let buffer = self.decoder.decode(&track.source)?;
                if buffer.is_empty() {
                    warn!(source = %track.source, "Decoded source has no audio; skipping");
                }
                let finished = done.fetch_add(1, Ordering::Relaxed) + 1;
                self.progress.stage(0.0, DECODE_DONE, finished, total);
                Ok(Arc::new(buffer))
            })
            .collect::<Result<Vec<_>>>()?;
        self.progress.advance(DECODE_DONE);
        info!(tracks = total, "Decoded mixdown sources");
        Ok(sources)
    }
}
