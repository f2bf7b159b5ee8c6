//! Pure mappings between sample index, absolute time, logical pixels,
//! device pixels and frequency.
//!
//! Nothing here holds state: the same functions place pixels when drawing
//! and resolve clicks when hit-testing, so the two can never disagree.

use crate::types::{FeatureDraft, TimeRange};
use serde::{Deserialize, Serialize};

// ── Time axis ────────────────────────────────────────────────────────────────

/// Logical x position of absolute time `t` on a surface `width_px` wide.
pub fn time_to_pixel(t: f64, view: TimeRange, width_px: f64) -> f64 {
    let w = view.width();
    if w <= 0.0 {
        return 0.0;
    }
    (t - view.start) / w * width_px
}

pub fn pixel_to_time(x: f64, view: TimeRange, width_px: f64) -> f64 {
    if width_px <= 0.0 {
        return view.start;
    }
    view.start + x / width_px * view.width()
}

pub fn sample_to_time(index: f64, sample_rate: u32, data_start: f64) -> f64 {
    data_start + index / sample_rate.max(1) as f64
}

/// Fractional sample position of `t`; callers floor or round as needed.
pub fn time_to_sample(t: f64, sample_rate: u32, data_start: f64) -> f64 {
    (t - data_start) * sample_rate as f64
}

pub fn logical_to_device(px: f64, device_pixel_ratio: f64) -> f64 {
    px * device_pixel_ratio
}

pub fn device_to_logical(px: f64, device_pixel_ratio: f64) -> f64 {
    if device_pixel_ratio <= 0.0 {
        return px;
    }
    px / device_pixel_ratio
}

// ── Frequency axis ───────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FreqScale {
    #[default]
    Linear,
    Sqrt,
    Log,
}

impl FreqScale {
    pub const ALL: [FreqScale; 3] = [FreqScale::Linear, FreqScale::Sqrt, FreqScale::Log];

    pub fn label(self) -> &'static str {
        match self {
            FreqScale::Linear => "Linear",
            FreqScale::Sqrt => "Square root",
            FreqScale::Log => "Logarithmic",
        }
    }

    /// Map a fraction of the frequency range (0 = 0 Hz, 1 = top of axis) to a
    /// normalised vertical position.
    ///
    /// The log scale works in bin space: `log10(bin + 1) / log10(total_bins)`,
    /// which keeps bin 0 at position 0 instead of hitting log(0).
    pub fn forward(self, frac: f64, total_bins: usize) -> f64 {
        let frac = frac.max(0.0);
        match self {
            FreqScale::Linear => frac,
            FreqScale::Sqrt => frac.sqrt(),
            FreqScale::Log => {
                if total_bins < 2 {
                    return frac;
                }
                let bins = total_bins as f64;
                let bin = frac * (bins - 1.0);
                (bin + 1.0).log10() / bins.log10()
            }
        }
    }

    pub fn inverse(self, pos: f64, total_bins: usize) -> f64 {
        let pos = pos.max(0.0);
        match self {
            FreqScale::Linear => pos,
            FreqScale::Sqrt => pos * pos,
            FreqScale::Log => {
                if total_bins < 2 {
                    return pos;
                }
                let bins = total_bins as f64;
                let bin = 10f64.powf(pos * bins.log10()) - 1.0;
                bin / (bins - 1.0)
            }
        }
    }
}

/// The scale used for a lookup: either a single scale, or two scales blended
/// by an externally supplied factor while a transition runs.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ScaleMapping {
    Fixed(FreqScale),
    Blend { from: FreqScale, to: FreqScale, t: f64 },
}

impl ScaleMapping {
    pub fn blend(from: FreqScale, to: FreqScale, t: f64) -> Self {
        let t = t.clamp(0.0, 1.0);
        if from == to || t >= 1.0 {
            ScaleMapping::Fixed(to)
        } else if t <= 0.0 {
            ScaleMapping::Fixed(from)
        } else {
            ScaleMapping::Blend { from, to, t }
        }
    }

    /// The scale this mapping settles on.
    pub fn target(&self) -> FreqScale {
        match *self {
            ScaleMapping::Fixed(s) => s,
            ScaleMapping::Blend { to, .. } => to,
        }
    }

    pub fn forward(&self, frac: f64, total_bins: usize) -> f64 {
        match *self {
            ScaleMapping::Fixed(s) => s.forward(frac, total_bins),
            ScaleMapping::Blend { from, to, t } => {
                let a = from.forward(frac, total_bins);
                let b = to.forward(frac, total_bins);
                a + (b - a) * t
            }
        }
    }

    pub fn inverse(&self, pos: f64, total_bins: usize) -> f64 {
        match *self {
            ScaleMapping::Fixed(s) => s.inverse(pos, total_bins),
            ScaleMapping::Blend { .. } => {
                // Every scale is monotonic, so the blend is too.
                let pos = pos.max(0.0);
                let mut lo = 0.0;
                let mut hi = 1.0;
                while self.forward(hi, total_bins) < pos && hi < 1.0e6 {
                    hi *= 2.0;
                }
                for _ in 0..60 {
                    let mid = (lo + hi) / 2.0;
                    if self.forward(mid, total_bins) < pos {
                        lo = mid;
                    } else {
                        hi = mid;
                    }
                }
                (lo + hi) / 2.0
            }
        }
    }
}

impl From<FreqScale> for ScaleMapping {
    fn from(s: FreqScale) -> Self {
        ScaleMapping::Fixed(s)
    }
}

/// Frequency axis description shared by the renderer and the overlay.
///
/// `playback_rate` shifts content the way it is heard: a component at `f` Hz
/// is drawn at `f × rate` on an axis that still tops out at `nyquist`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FreqAxis {
    pub nyquist: f64,
    pub total_bins: usize,
    pub playback_rate: f64,
}

impl FreqAxis {
    pub fn new(nyquist: f64, fft_size: usize) -> Self {
        Self { nyquist, total_bins: fft_size / 2 + 1, playback_rate: 1.0 }
    }

    pub fn with_playback_rate(mut self, rate: f64) -> Self {
        if rate.is_finite() && rate > 0.0 {
            self.playback_rate = rate;
        }
        self
    }
}

/// Vertical pixel for frequency `f` (0 at the top edge).
pub fn freq_to_pixel(f: f64, axis: &FreqAxis, height_px: f64, mapping: ScaleMapping) -> f64 {
    if axis.nyquist <= 0.0 {
        return height_px;
    }
    let frac = f * axis.playback_rate / axis.nyquist;
    let pos = mapping.forward(frac, axis.total_bins);
    height_px * (1.0 - pos)
}

pub fn pixel_to_freq(y: f64, axis: &FreqAxis, height_px: f64, mapping: ScaleMapping) -> f64 {
    if height_px <= 0.0 || axis.nyquist <= 0.0 {
        return 0.0;
    }
    let pos = 1.0 - y / height_px;
    let frac = mapping.inverse(pos, axis.total_bins);
    frac * axis.nyquist / axis.playback_rate
}

// ── Surfaces ─────────────────────────────────────────────────────────────────

/// Current size of a drawing surface: logical (CSS) pixels plus the ratio
/// to device pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceSize {
    pub width: f64,
    pub height: f64,
    pub device_pixel_ratio: f64,
}

impl SurfaceSize {
    pub fn new(width: f64, height: f64, device_pixel_ratio: f64) -> Self {
        let dpr = if device_pixel_ratio.is_finite() && device_pixel_ratio > 0.0 {
            device_pixel_ratio
        } else {
            1.0
        };
        Self { width: width.max(0.0), height: height.max(0.0), device_pixel_ratio: dpr }
    }

    pub fn device_width(&self) -> u32 {
        logical_to_device(self.width, self.device_pixel_ratio).round() as u32
    }

    pub fn device_height(&self) -> u32 {
        logical_to_device(self.height, self.device_pixel_ratio).round() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.device_width() == 0 || self.device_height() == 0
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PixelRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl PixelRect {
    pub fn from_corners(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self {
            x: x0.min(x1),
            y: y0.min(y1),
            width: (x1 - x0).abs(),
            height: (y1 - y0).abs(),
        }
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x && x <= self.x + self.width && y >= self.y && y <= self.y + self.height
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn intersects(&self, width: f64, height: f64) -> bool {
        self.right() >= 0.0 && self.x <= width && self.bottom() >= 0.0 && self.y <= height
    }
}

/// Everything needed to place a time/frequency point on one surface.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CoordinateTransform {
    pub view: TimeRange,
    pub size: SurfaceSize,
    pub axis: FreqAxis,
    pub mapping: ScaleMapping,
}

impl CoordinateTransform {
    pub fn x_of(&self, t: f64) -> f64 {
        time_to_pixel(t, self.view, self.size.width)
    }

    pub fn t_of(&self, x: f64) -> f64 {
        pixel_to_time(x, self.view, self.size.width)
    }

    pub fn y_of(&self, f: f64) -> f64 {
        freq_to_pixel(f, &self.axis, self.size.height, self.mapping)
    }

    pub fn f_of(&self, y: f64) -> f64 {
        pixel_to_freq(y, &self.axis, self.size.height, self.mapping)
    }

    pub fn rect_for(&self, start: f64, end: f64, low: f64, high: f64) -> PixelRect {
        PixelRect::from_corners(self.x_of(start), self.y_of(high), self.x_of(end), self.y_of(low))
    }

    /// Convert a logical-pixel rectangle to a domain rectangle, clamped to
    /// `limits` in time and to the representable frequency band.
    pub fn draft_from_rect(&self, rect: &PixelRect, limits: TimeRange) -> FeatureDraft {
        let t0 = self.t_of(rect.x).clamp(limits.start, limits.end);
        let t1 = self.t_of(rect.right()).clamp(limits.start, limits.end);
        let max_f = self.axis.nyquist / self.axis.playback_rate;
        let f_high = self.f_of(rect.y).clamp(0.0, max_f);
        let f_low = self.f_of(rect.bottom()).clamp(0.0, max_f);
        FeatureDraft::from_corners(t0, t1, f_low, f_high)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn axis() -> FreqAxis {
        FreqAxis::new(24_000.0, 1024)
    }

    #[test]
    fn time_round_trips_through_pixels() {
        let view = TimeRange::new(1_000.0, 1_060.0);
        let x = time_to_pixel(1_015.0, view, 1200.0);
        assert!((x - 300.0).abs() < EPS);
        assert!((pixel_to_time(x, view, 1200.0) - 1_015.0).abs() < EPS);
    }

    #[test]
    fn samples_and_device_pixels() {
        assert!((sample_to_time(48_000.0, 48_000, 100.0) - 101.0).abs() < EPS);
        assert!((time_to_sample(101.5, 48_000, 100.0) - 72_000.0).abs() < EPS);
        assert_eq!(logical_to_device(10.0, 2.0), 20.0);
        assert_eq!(device_to_logical(20.0, 2.0), 10.0);
        let size = SurfaceSize::new(400.0, 200.0, 1.5);
        assert_eq!((size.device_width(), size.device_height()), (600, 300));
    }

    #[test]
    fn scale_endpoints_are_fixed() {
        for scale in FreqScale::ALL {
            assert!(scale.forward(0.0, 513).abs() < EPS, "{scale:?}");
            assert!((scale.forward(1.0, 513) - 1.0).abs() < EPS, "{scale:?}");
        }
    }

    #[test]
    fn low_frequencies_get_more_room_on_nonlinear_scales() {
        let lin = FreqScale::Linear.forward(0.1, 513);
        let sqrt = FreqScale::Sqrt.forward(0.1, 513);
        let log = FreqScale::Log.forward(0.1, 513);
        assert!(lin < sqrt && sqrt < log, "{lin} {sqrt} {log}");
    }

    #[test]
    fn inverse_undoes_forward() {
        for scale in FreqScale::ALL {
            for &frac in &[0.0, 0.01, 0.25, 0.5, 0.9, 1.0] {
                let pos = scale.forward(frac, 513);
                assert!((scale.inverse(pos, 513) - frac).abs() < 1e-9, "{scale:?} {frac}");
            }
        }
    }

    #[test]
    fn freq_pixel_round_trip_under_each_scale() {
        let a = axis();
        for scale in FreqScale::ALL {
            let m = ScaleMapping::Fixed(scale);
            let y = freq_to_pixel(3_000.0, &a, 400.0, m);
            assert!((0.0..=400.0).contains(&y));
            assert!((pixel_to_freq(y, &a, 400.0, m) - 3_000.0).abs() < 1e-6);
        }
        assert_eq!(freq_to_pixel(0.0, &a, 400.0, FreqScale::Log.into()), 400.0);
        assert_eq!(freq_to_pixel(24_000.0, &a, 400.0, FreqScale::Log.into()), 0.0);
    }

    #[test]
    fn blend_interpolates_between_scales() {
        let a = axis();
        let lin = freq_to_pixel(6_000.0, &a, 400.0, FreqScale::Linear.into());
        let log = freq_to_pixel(6_000.0, &a, 400.0, FreqScale::Log.into());
        let half = freq_to_pixel(
            6_000.0,
            &a,
            400.0,
            ScaleMapping::blend(FreqScale::Linear, FreqScale::Log, 0.5),
        );
        assert!((half - (lin + log) / 2.0).abs() < 1e-9);

        let m = ScaleMapping::blend(FreqScale::Linear, FreqScale::Log, 0.3);
        let y = freq_to_pixel(6_000.0, &a, 400.0, m);
        assert!((pixel_to_freq(y, &a, 400.0, m) - 6_000.0).abs() < 1e-4);

        assert_eq!(
            ScaleMapping::blend(FreqScale::Linear, FreqScale::Log, 1.0),
            ScaleMapping::Fixed(FreqScale::Log)
        );
    }

    #[test]
    fn playback_rate_shifts_content() {
        let a = axis().with_playback_rate(0.5);
        let y = freq_to_pixel(24_000.0, &a, 400.0, FreqScale::Linear.into());
        assert!((y - 200.0).abs() < EPS);
        assert!((pixel_to_freq(200.0, &a, 400.0, FreqScale::Linear.into()) - 24_000.0).abs() < 1e-6);
    }

    #[test]
    fn transform_converts_rect_to_draft() {
        let t = CoordinateTransform {
            view: TimeRange::new(0.0, 100.0),
            size: SurfaceSize::new(1000.0, 480.0, 2.0),
            axis: FreqAxis::new(24_000.0, 1024),
            mapping: FreqScale::Linear.into(),
        };
        let rect = PixelRect::from_corners(300.0, 240.0, 100.0, 360.0);
        let d = t.draft_from_rect(&rect, TimeRange::new(0.0, 100.0));
        assert!((d.start_time - 10.0).abs() < EPS);
        assert!((d.end_time - 30.0).abs() < EPS);
        assert!((d.low_freq - 6_000.0).abs() < 1e-6);
        assert!((d.high_freq - 12_000.0).abs() < 1e-6);

        let back = t.rect_for(d.start_time, d.end_time, d.low_freq, d.high_freq);
        assert!((back.x - 100.0).abs() < 1e-6 && (back.right() - 300.0).abs() < 1e-6);
        assert!((back.y - 240.0).abs() < 1e-6 && (back.bottom() - 360.0).abs() < 1e-6);
    }

    #[test]
    fn draft_is_clamped_to_limits() {
        let t = CoordinateTransform {
            view: TimeRange::new(0.0, 100.0),
            size: SurfaceSize::new(1000.0, 480.0, 1.0),
            axis: FreqAxis::new(24_000.0, 1024),
            mapping: FreqScale::Sqrt.into(),
        };
        let rect = PixelRect::from_corners(-50.0, -20.0, 500.0, 500.0);
        let d = t.draft_from_rect(&rect, TimeRange::new(20.0, 40.0));
        assert_eq!(d.start_time, 20.0);
        assert_eq!(d.end_time, 40.0);
        assert_eq!(d.low_freq, 0.0);
        assert_eq!(d.high_freq, 24_000.0);
    }
}
