//! Volume → linear gain conversion.

/// Convert a 0–100 volume to linear gain using a logarithmic taper.
///
/// `0 → 0`, `100 → 1`, otherwise `1 - ln(100 - v) / ln(100)`. Input is
/// clamped to `0..=100`; NaN is treated as silence.
pub fn perceptual_gain(volume: f64) -> f32 {
    if volume.is_nan() {
        return 0.0;
    }
    let v = volume.clamp(0.0, 100.0);
    if v <= 0.0 {
        return 0.0;
    }
    if v >= 100.0 {
        return 1.0;
    }
    (1.0 - (100.0 - v).ln() / 100f64.ln()) as f32
}
