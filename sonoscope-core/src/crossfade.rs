use crate::coords::{FreqScale, ScaleMapping};
use crate::raster::Raster;

/// Cubic ease-out on `[0, 1]`.
pub fn ease_out(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t).powi(3)
}

/// Timed blend from a captured image to whatever is composed next.
///
/// While it runs, frequency lookups use a blended scale mapping so overlay
/// boxes glide with the image instead of jumping.
#[derive(Clone, Debug)]
pub struct Crossfade {
    from: Raster,
    from_scale: FreqScale,
    to_scale: FreqScale,
    started_ms: f64,
    duration_ms: f64,
}

impl Crossfade {
    pub fn new(from: Raster, from_scale: FreqScale, to_scale: FreqScale, started_ms: f64, duration_ms: f64) -> Self {
        Self { from, from_scale, to_scale, started_ms, duration_ms: duration_ms.max(0.0) }
    }

    pub fn from_scale(&self) -> FreqScale {
        self.from_scale
    }

    pub fn to_scale(&self) -> FreqScale {
        self.to_scale
    }

    /// Linear progress in `[0, 1]`.
    pub fn progress(&self, now_ms: f64) -> f64 {
        let elapsed = now_ms - self.started_ms;
        if self.duration_ms <= 0.0 || elapsed >= self.duration_ms {
            return 1.0;
        }
        (elapsed / self.duration_ms).max(0.0)
    }

    /// Eased blend factor. Exactly 1.0 at or after the duration.
    pub fn alpha(&self, now_ms: f64) -> f64 {
        let p = self.progress(now_ms);
        if p >= 1.0 {
            1.0
        } else {
            ease_out(p)
        }
    }

    pub fn is_finished(&self, now_ms: f64) -> bool {
        self.progress(now_ms) >= 1.0
    }

    pub fn mapping(&self, now_ms: f64) -> ScaleMapping {
        ScaleMapping::blend(self.from_scale, self.to_scale, self.alpha(now_ms))
    }

    pub fn frame(&self, target: &Raster, now_ms: f64) -> Raster {
        Raster::blend(&self.from, target, self.alpha(now_ms))
    }

    /// Point the fade at a new destination scale, keeping its clock.
    pub fn retarget(&mut self, to_scale: FreqScale) {
        self.to_scale = to_scale;
    }
}
