//! Piecewise-linear gain envelopes over output frames.

use smallvec::SmallVec;

/// A gain curve defined by `(frame, gain)` breakpoints.
///
/// Gain is linearly interpolated between breakpoints, held at the first
/// breakpoint's value before it and at the last one's after it. Breakpoints
/// are kept sorted by frame.
#[derive(Debug, Clone, PartialEq)]
pub struct GainEnvelope {
    points: SmallVec<[(usize, f32); 4]>,
}

impl GainEnvelope {
    /// Constant gain for all frames.
    pub fn constant(gain: f32) -> Self {
        let mut points = SmallVec::new();
        points.push((0, gain));
        Self { points }
    }

    /// Build from breakpoints in any order.
    pub fn from_points(points: impl IntoIterator<Item = (usize, f32)>) -> Self {
        let mut points: SmallVec<[(usize, f32); 4]> = points.into_iter().collect();
        points.sort_by_key(|&(frame, _)| frame);
        if points.is_empty() {
            points.push((0, 1.0));
        }
        Self { points }
    }

    /// Hold 1.0 until `total - fade`, then ramp linearly to 0.0 at `total`.
    pub fn fade_out(total_frames: usize, fade_frames: usize) -> Self {
        if fade_frames == 0 {
            return Self::constant(1.0);
        }
        let start = total_frames.saturating_sub(fade_frames);
        Self::from_points([(0, 1.0), (start, 1.0), (total_frames, 0.0)])
    }

    /// Breakpoints, sorted by frame.
    pub fn points(&self) -> &[(usize, f32)] {
        &self.points
    }

    /// Multiply every breakpoint by `factor`.
    pub fn scaled(mut self, factor: f32) -> Self {
        for (_, gain) in self.points.iter_mut() {
            *gain *= factor;
        }
        self
    }

    /// Gain at `frame`.
    pub fn gain_at(&self, frame: usize) -> f32 {
        let points = &self.points;
        let first = points[0];
        if frame <= first.0 {
            return first.1;
        }
        for pair in points.windows(2) {
            let (f0, g0) = pair[0];
            let (f1, g1) = pair[1];
            if frame <= f1 {
                if f1 == f0 {
                    return g1;
                }
                let t = (frame - f0) as f32 / (f1 - f0) as f32;
                return g0 + (g1 - g0) * t;
            }
        }
        points[points.len() - 1].1
    }

    /// Whether gain never changes.
    pub fn is_constant(&self) -> bool {
        let first = self.points[0].1;
        self.points.iter().all(|&(_, g)| g == first)
    }
}

impl Default for GainEnvelope {
    fn default() -> Self {
        Self::constant(1.0)
    }
}
