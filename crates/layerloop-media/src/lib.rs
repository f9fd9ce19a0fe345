//! LayerLoop Media - Audio I/O
//!
//! This crate handles:
//! - Decoding recordings and imports to PCM (symphonia)
//! - Encoding rendered mixes (hound WAV, ffmpeg for compressed codecs)
//! - Falling back to a safe format when a codec is unavailable

pub mod decoder;
pub mod encoder;

pub use decoder::{AudioDecoder, SymphoniaDecoder};
pub use encoder::{AudioEncoder, EncodedAudio, EncoderChain, FfmpegEncoder, WavEncoder};
