//! End-to-end mixdown tests: WAV sources in, WAV mix out, decoded back.

use std::sync::Arc;

use layerloop_core::{AudioBuffer, MixFormat, MixQuality, MixdownConfig, SourceHandle};
use layerloop_media::{AudioDecoder, EncoderChain, SymphoniaDecoder, WavEncoder};
use layerloop_mixdown::{MixProgress, MixCancel, MixRequest, MixTrack, MixdownEngine};

const RATE: u32 = 8_000;

// ── Helpers ────────────────────────────────────────────────────

fn wav_bytes(level: f32, ms: usize, rate: u32, channels: u16) -> Vec<u8> {
    let frames = ms * rate as usize / 1000;
    let buffer = AudioBuffer::new(vec![level; frames * channels as usize], rate, channels);
    WavEncoder::new().encode_wav(&buffer).unwrap()
}

fn memory_track(name: &str, level: f32, ms: usize) -> MixTrack {
    MixTrack::new(SourceHandle::memory(name, wav_bytes(level, ms, RATE, 2)))
}

fn engine() -> MixdownEngine {
    let config = MixdownConfig {
        sample_rate: RATE,
        channels: 2,
        ..Default::default()
    };
    let wav_only = EncoderChain::new(vec![Arc::new(WavEncoder::new())]);
    MixdownEngine::new(Arc::new(SymphoniaDecoder::new()), wav_only, config)
}

fn decode_mix(data: Vec<u8>) -> AudioBuffer {
    SymphoniaDecoder::new()
        .decode(&SourceHandle::memory("mix.wav", data))
        .unwrap()
}

// ── Pipeline ───────────────────────────────────────────────────

#[tokio::test]
async fn two_tracks_mix_to_wav() {
    let request = MixRequest::new(
        vec![
            memory_track("drums.wav", 0.25, 1_000),
            memory_track("bass.wav", 0.25, 500),
        ],
        2,
    )
    .with_fadeout(500.0);

    let progress = MixProgress::new();
    let result = engine()
        .mix_with(request.clone(), &progress, &MixCancel::new())
        .await
        .unwrap();
    assert!(progress.is_complete());
    assert_eq!(result.actual_format, MixFormat::Wav);
    assert!(!result.fell_back(&request));
    assert_eq!(result.duration_ms, 2_500.0);

    let mix = decode_mix(result.data);
    assert_eq!(mix.sample_rate, RATE);
    assert_eq!(mix.channels, 2);
    assert_eq!(mix.frames(), 20_000);

    // Both tracks sound through the looped body.
    assert!((mix.sample(4_000, 0) - 0.5).abs() < 1e-3);
    assert!((mix.sample(12_000, 1) - 0.5).abs() < 1e-3);
    // The fade-out starts at 2000 ms and reaches silence at the end.
    assert!((mix.sample(18_000, 0) - 0.25).abs() < 1e-3);
    assert!(mix.sample(19_999, 0).abs() < 1e-3);
}

#[tokio::test]
async fn compressed_request_falls_back_without_codec() {
    let request = MixRequest::new(vec![memory_track("drums.wav", 0.25, 1_000)], 1)
        .with_format(MixFormat::Opus, MixQuality::Low);
    let result = engine().mix(request.clone()).await.unwrap();
    assert!(result.fell_back(&request));
    assert_eq!(result.actual_format, MixFormat::Wav);
    assert_eq!(decode_mix(result.data).frames(), 8_000);
}

#[tokio::test]
async fn slow_track_stretches_cycle() {
    let request = MixRequest::new(
        vec![memory_track("pad.wav", 0.25, 1_000).with_speed(0.5)],
        1,
    );
    let rendered = engine().render(&request).await.unwrap();
    assert_eq!(rendered.duration_ms, 2_000.0);
    assert_eq!(rendered.buffer.frames(), 16_000);
    assert!((rendered.buffer.sample(15_000, 0) - 0.25).abs() < 1e-3);
}

#[tokio::test]
async fn foreign_sample_rate_is_resampled() {
    let source = SourceHandle::memory("mono48k.wav", wav_bytes(0.5, 1_000, 48_000, 1));
    let request = MixRequest::new(vec![MixTrack::new(source)], 1);
    let rendered = engine().render(&request).await.unwrap();
    assert_eq!(rendered.buffer.sample_rate, RATE);
    assert_eq!(rendered.buffer.frames(), 8_000);
    // Mono is spread to both output channels.
    assert!((rendered.buffer.sample(4_000, 0) - 0.5).abs() < 1e-3);
    assert!((rendered.buffer.sample(4_000, 1) - 0.5).abs() < 1e-3);
}

#[tokio::test]
async fn muted_track_contributes_nothing() {
    let request = MixRequest::new(
        vec![
            memory_track("drums.wav", 0.25, 1_000),
            memory_track("vox.wav", 0.9, 1_000).with_volume(0.0),
        ],
        1,
    );
    let rendered = engine().render(&request).await.unwrap();
    assert!((rendered.buffer.peak() - 0.25).abs() < 1e-3);
}

#[tokio::test]
async fn json_request_with_file_sources() {
    let dir = tempfile::tempdir().unwrap();
    let loop_path = dir.path().join("loop.wav");
    std::fs::write(&loop_path, wav_bytes(0.25, 500, RATE, 2)).unwrap();

    let json = format!(
        r#"{{
            "tracks": [{{ "source": {{ "file": {path:?} }}, "volume": 100 }}],
            "loop_count": 3,
            "fadeout_ms": 250,
            "format": "wav"
        }}"#,
        path = loop_path.display().to_string()
    );
    let request = MixRequest::from_json(json.as_bytes()).unwrap();
    let result = engine().mix(request).await.unwrap();
    assert_eq!(result.duration_ms, 1_750.0);
    assert_eq!(decode_mix(result.data).frames(), 14_000);
}

#[tokio::test]
async fn missing_file_is_a_mixing_failure() {
    let request = MixRequest::new(
        vec![MixTrack::new(SourceHandle::file("/nonexistent/loop.wav"))],
        1,
    );
    let err = engine().mix(request).await.unwrap_err();
    assert_eq!(err.kind(), layerloop_core::ErrorKind::MixingFailed);
    assert!(err.is_recoverable());
}
