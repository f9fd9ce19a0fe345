//! Audio encoding.
//!
//! Supports:
//! - WAV (via hound), native and always available
//! - FLAC, AAC, MP3, Opus (via an `ffmpeg` binary on `PATH`, when present)
//!
//! [`EncoderChain`] tries the requested format first and falls back to a
//! safe format, reporting the format it actually produced.

use layerloop_core::{bitrate_kbps, AudioBuffer, LoopError, MixFormat, MixQuality, Result};
use std::io::{Cursor, Read, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Encoded bytes and the format they are in.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedAudio {
    pub bytes: Vec<u8>,
    pub format: MixFormat,
}

/// Audio encoder trait
pub trait AudioEncoder: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Whether this encoder can produce `format` at all.
    fn supports(&self, format: MixFormat) -> bool;

    /// Encode `buffer` as `format`. `bitrate_kbps` is `None` for lossless
    /// formats.
    fn encode(
        &self,
        buffer: &AudioBuffer,
        format: MixFormat,
        bitrate_kbps: Option<u32>,
    ) -> Result<Vec<u8>>;
}

// ── WAV ──────────────────────────────────────────────────────────

/// 16-bit PCM WAV encoder using hound
#[derive(Debug, Clone, Copy, Default)]
pub struct WavEncoder;

impl WavEncoder {
    pub fn new() -> Self {
        Self
    }

    /// Encode to WAV bytes without going through the trait.
    pub fn encode_wav(&self, buffer: &AudioBuffer) -> Result<Vec<u8>> {
        let wav_err = |e: hound::Error| LoopError::InvalidFormat(format!("WAV encoding failed: {}", e));

        if buffer.channels == 0 || buffer.sample_rate == 0 {
            return Err(LoopError::InvalidFormat(format!(
                "cannot encode {} channel(s) at {} Hz",
                buffer.channels, buffer.sample_rate
            )));
        }

        let spec = hound::WavSpec {
            channels: buffer.channels,
            sample_rate: buffer.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut output = Vec::with_capacity(44 + buffer.samples.len() * 2);
        {
            let mut writer = hound::WavWriter::new(Cursor::new(&mut output), spec).map_err(wav_err)?;
            for &sample in &buffer.samples {
                let s = (sample.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16;
                writer.write_sample(s).map_err(wav_err)?;
            }
            writer.finalize().map_err(wav_err)?;
        }
        Ok(output)
    }
}

impl AudioEncoder for WavEncoder {
    fn name(&self) -> &'static str {
        "wav"
    }

    fn supports(&self, format: MixFormat) -> bool {
        format == MixFormat::Wav
    }

    fn encode(
        &self,
        buffer: &AudioBuffer,
        format: MixFormat,
        _bitrate_kbps: Option<u32>,
    ) -> Result<Vec<u8>> {
        if format != MixFormat::Wav {
            return Err(LoopError::InvalidFormat(format!("WAV encoder cannot write {}", format)));
        }
        self.encode_wav(buffer)
    }
}

// ── FFmpeg ───────────────────────────────────────────────────────

/// Encoder that pipes WAV through an `ffmpeg` subprocess.
#[derive(Debug, Clone)]
pub struct FfmpegEncoder {
    binary: PathBuf,
}

impl FfmpegEncoder {
    /// Use a specific ffmpeg binary.
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Find `ffmpeg` on `PATH`.
    pub fn locate() -> Option<Self> {
        match which::which("ffmpeg") {
            Ok(path) => {
                debug!(path = %path.display(), "Found ffmpeg");
                Some(Self::new(path))
            }
            Err(_) => None,
        }
    }

    /// `(encoder, muxer)` for a format.
    fn codec_args(format: MixFormat) -> Option<(&'static str, &'static str)> {
        match format {
            MixFormat::Flac => Some(("flac", "flac")),
            MixFormat::Aac => Some(("aac", "adts")),
            MixFormat::Mp3 => Some(("libmp3lame", "mp3")),
            MixFormat::Opus => Some(("libopus", "ogg")),
            MixFormat::Wav => None,
        }
    }

    /// Build the ffmpeg command arguments.
    pub fn ffmpeg_args(format: MixFormat, bitrate_kbps: Option<u32>) -> Option<Vec<String>> {
        let (codec, muxer) = Self::codec_args(format)?;
        let mut args: Vec<String> = vec![
            "-hide_banner".into(),
            "-loglevel".into(),
            "error".into(),
            "-f".into(),
            "wav".into(),
            "-i".into(),
            "pipe:0".into(),
            "-c:a".into(),
            codec.into(),
        ];
        if let Some(kbps) = bitrate_kbps {
            args.extend_from_slice(&["-b:a".into(), format!("{}k", kbps)]);
        }
        args.extend_from_slice(&["-f".into(), muxer.into(), "pipe:1".into()]);
        Some(args)
    }
}

impl AudioEncoder for FfmpegEncoder {
    fn name(&self) -> &'static str {
        "ffmpeg"
    }

    fn supports(&self, format: MixFormat) -> bool {
        Self::codec_args(format).is_some()
    }

    fn encode(
        &self,
        buffer: &AudioBuffer,
        format: MixFormat,
        bitrate_kbps: Option<u32>,
    ) -> Result<Vec<u8>> {
        let args = Self::ffmpeg_args(format, bitrate_kbps).ok_or_else(|| {
            LoopError::InvalidFormat(format!("ffmpeg encoder does not handle {}", format))
        })?;
        let wav = WavEncoder.encode_wav(buffer)?;

        let mut child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| LoopError::ResourceUnavailable(format!("Failed to spawn ffmpeg: {e}")))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| LoopError::ResourceUnavailable("Failed to open ffmpeg stdin".into()))?;
        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| LoopError::ResourceUnavailable("Failed to open ffmpeg stdout".into()))?;

        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| LoopError::ResourceUnavailable("Failed to open ffmpeg stderr".into()))?;

        // stdin is fed and stderr drained on their own threads while stdout
        // is read here, so no full pipe can stall the child.
        let mut encoded = Vec::new();
        let (write_result, read_result, stderr_text) = std::thread::scope(|scope| {
            let writer = scope.spawn(move || {
                let result = stdin.write_all(&wav);
                drop(stdin);
                result
            });
            let diagnostics = scope.spawn(move || {
                let mut text = String::new();
                let _ = stderr.read_to_string(&mut text);
                text
            });
            let read_result = stdout.read_to_end(&mut encoded);
            let write_result = writer
                .join()
                .unwrap_or_else(|_| Err(std::io::Error::other("ffmpeg writer thread panicked")));
            let stderr_text = diagnostics.join().unwrap_or_default();
            (write_result, read_result, stderr_text)
        });

        let status = child
            .wait()
            .map_err(|e| LoopError::ResourceUnavailable(format!("Failed to wait for ffmpeg: {e}")))?;

        if !status.success() {
            return Err(LoopError::ResourceUnavailable(format!(
                "ffmpeg exited with status {}: {}",
                status,
                stderr_text.trim()
            )));
        }
        write_result
            .map_err(|e| LoopError::ResourceUnavailable(format!("Failed to write to ffmpeg: {e}")))?;
        read_result
            .map_err(|e| LoopError::ResourceUnavailable(format!("Failed to read from ffmpeg: {e}")))?;

        if encoded.is_empty() {
            return Err(LoopError::ResourceUnavailable(format!(
                "ffmpeg produced no {} output",
                format
            )));
        }
        Ok(encoded)
    }
}

// ── Chain with fallback ──────────────────────────────────────────

/// Ordered set of encoders tried for a requested format, then a fallback.
#[derive(Clone)]
pub struct EncoderChain {
    encoders: Vec<Arc<dyn AudioEncoder>>,
}

impl EncoderChain {
    /// Chain over explicit encoders, tried in order.
    pub fn new(encoders: Vec<Arc<dyn AudioEncoder>>) -> Self {
        Self { encoders }
    }

    /// ffmpeg (when installed) followed by the native WAV encoder.
    pub fn standard() -> Self {
        let mut encoders: Vec<Arc<dyn AudioEncoder>> = Vec::new();
        match FfmpegEncoder::locate() {
            Some(ffmpeg) => encoders.push(Arc::new(ffmpeg)),
            None => info!("ffmpeg not found; compressed exports will fall back"),
        }
        encoders.push(Arc::new(WavEncoder));
        Self { encoders }
    }

    fn try_format(
        &self,
        buffer: &AudioBuffer,
        format: MixFormat,
        quality: MixQuality,
    ) -> Result<Vec<u8>> {
        let bitrate = bitrate_kbps(format, quality);
        let mut last_error = None;
        for encoder in self.encoders.iter().filter(|e| e.supports(format)) {
            match encoder.encode(buffer, format, bitrate) {
                Ok(bytes) => {
                    debug!(encoder = encoder.name(), %format, bytes = bytes.len(), "Encoded mix");
                    return Ok(bytes);
                }
                Err(e) => {
                    warn!(encoder = encoder.name(), %format, error = %e, "Encoder failed");
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| {
            LoopError::ResourceUnavailable(format!("no encoder available for {}", format))
        }))
    }

    /// Encode as `requested`, falling back to `fallback` if that fails.
    ///
    /// Fails only when the fallback fails too.
    pub fn encode(
        &self,
        buffer: &AudioBuffer,
        requested: MixFormat,
        quality: MixQuality,
        fallback: MixFormat,
    ) -> Result<EncodedAudio> {
        match self.try_format(buffer, requested, quality) {
            Ok(bytes) => Ok(EncodedAudio {
                bytes,
                format: requested,
            }),
            Err(e) if requested != fallback => {
                warn!(%requested, %fallback, error = %e, "Falling back to safe format");
                let bytes = self.try_format(buffer, fallback, quality)?;
                Ok(EncodedAudio {
                    bytes,
                    format: fallback,
                })
            }
            Err(e) => Err(e),
        }
    }
}

impl Default for EncoderChain {
    fn default() -> Self {
        Self::standard()
    }
}
