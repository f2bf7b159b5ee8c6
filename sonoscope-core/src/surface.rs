//! The spectrogram image for the current viewport.
//!
//! Fast path: crop the authoritative hi-res surface when it serves the view,
//! otherwise crop the tile pyramid. Quality path: hi-res renders are issued
//! with a fresh generation and applied only if nothing newer was issued in
//! the meantime. A change of frequency scale runs a crossfade from the last
//! composed frame.

use crate::coords::{FreqAxis, FreqScale, ScaleMapping, SurfaceSize};
use crate::crossfade::Crossfade;
use crate::hires::RenderSurface;
use crate::pyramid::TilePyramid;
use crate::raster::Raster;
use crate::types::TimeRange;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Completion {
    /// A newer request was issued; the result was dropped.
    Discarded { generation: u64, latest: u64 },
    Applied,
    /// Applied, and the frequency scale differs from the previous surface.
    CrossfadeStarted,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CrossfadeTick {
    Idle,
    Running { alpha: f64 },
    /// The fade just ended; paused indicators may resume.
    Finished,
}

/// One composed frame plus the mapping overlay boxes must use to line up
/// with it.
#[derive(Clone, Debug)]
pub struct Frame {
    pub raster: Raster,
    pub mapping: ScaleMapping,
    pub from_hires: bool,
}

pub struct SpectrogramSurface {
    issued: u64,
    active: Option<RenderSurface>,
    scale: FreqScale,
    crossfade: Option<Crossfade>,
    last_frame: Option<Raster>,
    crossfade_ms: f64,
}

impl SpectrogramSurface {
    pub fn new(scale: FreqScale, crossfade_ms: f64) -> Self {
        Self {
            issued: 0,
            active: None,
            scale,
            crossfade: None,
            last_frame: None,
            crossfade_ms,
        }
    }

    pub fn scale(&self) -> FreqScale {
        self.scale
    }

    pub fn latest_generation(&self) -> u64 {
        self.issued
    }

    pub fn active(&self) -> Option<&RenderSurface> {
        self.active.as_ref()
    }

    pub fn is_crossfading(&self) -> bool {
        self.crossfade.is_some()
    }

    /// Stamp a new quality request. Any request issued earlier is now stale.
    pub fn issue(&mut self) -> u64 {
        self.issued += 1;
        self.issued
    }

    /// Offer a finished hi-res render.
    pub fn complete(&mut self, surface: RenderSurface, now_ms: f64) -> Completion {
        if surface.generation != self.issued {
            log::debug!(
                "Discarding stale hi-res render gen {} (latest {})",
                surface.generation,
                self.issued
            );
            return Completion::Discarded { generation: surface.generation, latest: self.issued };
        }

        let previous = self.active.as_ref().map(|a| a.key.scale);
        let new_scale = surface.key.scale;
        self.active = Some(surface);

        match previous {
            Some(prev) if prev != new_scale => {
                if let Some(fade) = self.crossfade.as_mut() {
                    fade.retarget(new_scale);
                    Completion::Applied
                } else if self.start_crossfade(prev, new_scale, now_ms) {
                    Completion::CrossfadeStarted
                } else {
                    Completion::Applied
                }
            }
            _ => Completion::Applied,
        }
    }

    /// Switch the frequency scale. Outstanding renders become stale and the
    /// last frame fades into the new layout. Returns true if a crossfade
    /// started.
    pub fn set_scale(&mut self, scale: FreqScale, now_ms: f64) -> bool {
        if scale == self.scale {
            return false;
        }
        let from = self
            .crossfade
            .as_ref()
            .map(|f| f.to_scale())
            .unwrap_or(self.scale);
        self.scale = scale;
        self.issue();
        self.crossfade = None;
        self.start_crossfade(from, scale, now_ms)
    }

    fn start_crossfade(&mut self, from: FreqScale, to: FreqScale, now_ms: f64) -> bool {
        let Some(captured) = self.last_frame.clone() else { return false };
        self.crossfade = Some(Crossfade::new(captured, from, to, now_ms, self.crossfade_ms));
        true
    }

    /// Advance the crossfade clock.
    pub fn tick(&mut self, now_ms: f64) -> CrossfadeTick {
        match &self.crossfade {
            None => CrossfadeTick::Idle,
            Some(fade) if fade.is_finished(now_ms) => {
                self.crossfade = None;
                CrossfadeTick::Finished
            }
            Some(fade) => CrossfadeTick::Running { alpha: fade.alpha(now_ms) },
        }
    }

    /// Frequency mapping in force at `now_ms`.
    pub fn mapping(&self, now_ms: f64) -> ScaleMapping {
        match &self.crossfade {
            Some(fade) => fade.mapping(now_ms),
            None => ScaleMapping::Fixed(self.scale),
        }
    }

    /// Compose the frame for `view`. Synchronous; never runs a transform.
    pub fn compose(
        &mut self,
        view: TimeRange,
        size: SurfaceSize,
        pyramid: Option<&TilePyramid>,
        axis: &FreqAxis,
        now_ms: f64,
    ) -> Frame {
        let (w, h) = (size.device_width(), size.device_height());
        let hires = self
            .active
            .as_ref()
            .filter(|a| a.serves(&view, self.scale, axis.playback_rate));
        let from_hires = hires.is_some();
        let base = match (hires, pyramid) {
            (Some(surface), _) => surface.crop(view, w, h),
            (None, Some(pyramid)) => pyramid.crop(view, w, h, axis, ScaleMapping::Fixed(self.scale)),
            (None, None) => Raster::new(w, h),
        };
        let (raster, mapping) = match &self.crossfade {
            Some(fade) => (fade.frame(&base, now_ms), fade.mapping(now_ms)),
            None => (base, ScaleMapping::Fixed(self.scale)),
        };
        self.last_frame = Some(raster.clone());
        Frame { raster, mapping, from_hires }
    }

    /// Drop the hi-res surface (e.g. after a resize changed its pixel width).
    pub fn invalidate(&mut self) {
        self.active = None;
    }

    /// Make every in-flight render stale and stop any crossfade.
    pub fn cancel_pending(&mut self) {
        self.issue();
        self.crossfade = None;
    }

    /// Forget everything tied to the previous recording.
    pub fn reset(&mut self) {
        self.cancel_pending();
        self.active = None;
        self.last_frame = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hires::SurfaceKey;

    fn surface_with(generation: u64, scale: FreqScale, grey: u8) -> RenderSurface {
        let mut raster = Raster::new(8, 4);
        for x in 0..8 {
            for y in 0..4 {
                raster.set_grey(x, y, grey);
            }
        }
        RenderSurface {
            generation,
            key: SurfaceKey { padded: TimeRange::new(0.0, 100.0), scale, playback_rate: 1.0 },
            raster,
        }
    }

    fn size() -> SurfaceSize {
        SurfaceSize::new(8.0, 4.0, 1.0)
    }

    fn axis() -> FreqAxis {
        FreqAxis::new(24_000.0, 1024)
    }

    const VIEW: TimeRange = TimeRange::new(10.0, 90.0);

    #[test]
    fn stale_completion_never_overrides_newer() {
        let mut s = SpectrogramSurface::new(FreqScale::Linear, 300.0);
        let a = s.issue();
        let b = s.issue();
        assert_eq!(s.complete(surface_with(b, FreqScale::Linear, 200), 0.0), Completion::Applied);
        assert_eq!(
            s.complete(surface_with(a, FreqScale::Linear, 50), 10.0),
            Completion::Discarded { generation: a, latest: b }
        );
        let frame = s.compose(VIEW, size(), None, &axis(), 20.0);
        assert!(frame.from_hires);
        assert_eq!(frame.raster.pixel(3, 2)[0], 200);
    }

    #[test]
    fn superseded_request_completing_first_is_also_dropped() {
        let mut s = SpectrogramSurface::new(FreqScale::Linear, 300.0);
        let a = s.issue();
        let b = s.issue();
        assert!(matches!(s.complete(surface_with(a, FreqScale::Linear, 50), 0.0), Completion::Discarded { .. }));
        assert!(s.active().is_none());
        s.complete(surface_with(b, FreqScale::Linear, 200), 5.0);
        assert_eq!(s.active().unwrap().generation, b);
    }

    #[test]
    fn scale_change_crossfades_into_log_within_300ms() {
        let mut s = SpectrogramSurface::new(FreqScale::Linear, 300.0);
        let g = s.issue();
        s.complete(surface_with(g, FreqScale::Linear, 40), 0.0);
        s.compose(VIEW, size(), None, &axis(), 0.0);

        assert!(s.set_scale(FreqScale::Log, 1_000.0));
        assert!(s.is_crossfading());
        // The linear surface no longer serves the view.
        let mid = s.compose(VIEW, size(), None, &axis(), 1_150.0);
        assert!(!mid.from_hires);
        assert!(matches!(mid.mapping, ScaleMapping::Blend { from: FreqScale::Linear, to: FreqScale::Log, .. }));

        let g2 = s.issue();
        assert_eq!(s.complete(surface_with(g2, FreqScale::Log, 220), 1_200.0), Completion::Applied);
        assert!(matches!(s.tick(1_250.0), CrossfadeTick::Running { .. }));
        assert_eq!(s.tick(1_300.0), CrossfadeTick::Finished);
        assert_eq!(s.tick(1_301.0), CrossfadeTick::Idle);

        let done = s.compose(VIEW, size(), None, &axis(), 1_300.0);
        assert_eq!(done.mapping, ScaleMapping::Fixed(FreqScale::Log));
        assert!(done.from_hires);
        assert_eq!(done.raster.pixel(0, 0)[0], 220);
        assert_eq!(s.active().unwrap().key.scale, FreqScale::Log);
    }

    #[test]
    fn hires_completion_with_new_scale_starts_its_own_fade() {
        let mut s = SpectrogramSurface::new(FreqScale::Linear, 300.0);
        let g = s.issue();
        s.complete(surface_with(g, FreqScale::Linear, 40), 0.0);
        s.compose(VIEW, size(), None, &axis(), 0.0);
        s.set_scale(FreqScale::Sqrt, 0.0);
        assert_eq!(s.tick(400.0), CrossfadeTick::Finished);

        let g2 = s.issue();
        assert_eq!(
            s.complete(surface_with(g2, FreqScale::Sqrt, 90), 500.0),
            Completion::CrossfadeStarted
        );
        assert!(s.is_crossfading());
    }

    #[test]
    fn cancel_pending_makes_in_flight_stale() {
        let mut s = SpectrogramSurface::new(FreqScale::Linear, 300.0);
        let g = s.issue();
        s.cancel_pending();
        assert!(matches!(s.complete(surface_with(g, FreqScale::Linear, 1), 0.0), Completion::Discarded { .. }));
    }

    #[test]
    fn set_scale_without_a_frame_switches_immediately() {
        let mut s = SpectrogramSurface::new(FreqScale::Linear, 300.0);
        assert!(!s.set_scale(FreqScale::Log, 0.0));
        assert_eq!(s.mapping(0.0), ScaleMapping::Fixed(FreqScale::Log));
        assert!(!s.set_scale(FreqScale::Log, 0.0));
    }
}
