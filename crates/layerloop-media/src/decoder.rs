//! Audio decoding using symphonia.

use layerloop_core::{AudioBuffer, LoopError, Result, SourceHandle};
use std::fs::File;
use std::io::Cursor;
use std::sync::Arc;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, info, warn};

/// Turns a source handle into PCM.
pub trait AudioDecoder: Send + Sync {
    /// Decode the whole source. Unreadable or unsupported content fails with
    /// `InvalidFormat`; missing files with `FileNotFound`.
    fn decode(&self, source: &SourceHandle) -> Result<AudioBuffer>;
}

/// Shared bytes that symphonia can read through a `Cursor`.
struct SharedBytes(Arc<Vec<u8>>);

impl AsRef<[u8]> for SharedBytes {
    fn as_ref(&self) -> &[u8] {
        self.0.as_slice()
    }
}

/// Decoder for every container and codec symphonia was built with.
#[derive(Debug, Clone, Copy, Default)]
pub struct SymphoniaDecoder;

impl SymphoniaDecoder {
    pub fn new() -> Self {
        Self
    }

    fn open(source: &SourceHandle) -> Result<Box<dyn MediaSource>> {
        match source {
            SourceHandle::File(path) => {
                let file = File::open(path).map_err(|e| match e.kind() {
                    std::io::ErrorKind::NotFound => {
                        LoopError::FileNotFound(path.display().to_string())
                    }
                    _ => LoopError::Io(e),
                })?;
                Ok(Box::new(file))
            }
            SourceHandle::Memory { bytes, .. } => {
                Ok(Box::new(Cursor::new(SharedBytes(Arc::clone(bytes)))))
            }
        }
    }
}

impl AudioDecoder for SymphoniaDecoder {
    fn decode(&self, source: &SourceHandle) -> Result<AudioBuffer> {
        info!(source = %source, "Decoding audio source");

        let mss = MediaSourceStream::new(Self::open(source)?, Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = source.extension() {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .map_err(|e| LoopError::InvalidFormat(format!("{}: {}", source, e)))?;

        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| LoopError::InvalidFormat(format!("{}: no audio track", source)))?;

        let track_id = track.id;
        let sample_rate = track
            .codec_params
            .sample_rate
            .ok_or_else(|| LoopError::InvalidFormat(format!("{}: unknown sample rate", source)))?;
        let mut channels = track
            .codec_params
            .channels
            .map(|c| c.count() as u16)
            .unwrap_or(0);

        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| LoopError::InvalidFormat(format!("{}: {}", source, e)))?;

        let mut samples: Vec<f32> = Vec::new();
        let mut sample_buf: Option<SampleBuffer<f32>> = None;

        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    break;
                }
                Err(SymphoniaError::ResetRequired) => break,
                Err(e) => {
                    return Err(LoopError::InvalidFormat(format!(
                        "{}: packet read error: {}",
                        source, e
                    )));
                }
            };

            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::DecodeError(e)) => {
                    warn!(source = %source, error = %e, "Skipping undecodable packet");
                    continue;
                }
                Err(e) => {
                    return Err(LoopError::InvalidFormat(format!("{}: {}", source, e)));
                }
            };

            // Packets may grow; reallocate when the current buffer can't hold one.
            let spec = *decoded.spec();
            let required = decoded.capacity() * spec.channels.count();
            if sample_buf.as_ref().map_or(true, |buf| buf.capacity() < required) {
                channels = spec.channels.count() as u16;
                sample_buf = Some(SampleBuffer::new(decoded.capacity() as u64, spec));
            }

            if let Some(buf) = sample_buf.as_mut() {
                buf.copy_interleaved_ref(decoded);
                samples.extend_from_slice(buf.samples());
            }
        }

        if channels == 0 {
            return Err(LoopError::InvalidFormat(format!(
                "{}: unknown channel layout",
                source
            )));
        }

        let buffer = AudioBuffer::new(samples, sample_rate, channels);
        debug!(
            source = %source,
            frames = buffer.frames(),
            sample_rate,
            channels,
            "Decoded audio source"
        );
        Ok(buffer)
    }
}
