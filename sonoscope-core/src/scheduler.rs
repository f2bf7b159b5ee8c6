//! Two render cadences: at most one fast redraw per display frame, and a
//! debounced quality render once input settles.

use crate::config::{EngineConfig, SchedulerConfig};
use crate::timer::CancellableTimer;
use crate::types::TimeRange;

pub struct RenderScheduler {
    fast_pending: bool,
    quality: CancellableTimer,
    padding_fraction: f64,
}

impl RenderScheduler {
    pub fn new(config: &SchedulerConfig) -> Self {
        Self {
            fast_pending: false,
            quality: CancellableTimer::new(config.quality_debounce_ms),
            padding_fraction: config.hires_padding_fraction,
        }
    }

    /// Ask for a fast redraw. Returns true only when the caller must request
    /// a display frame; a second request while one is pending is a no-op.
    pub fn request_fast(&mut self) -> bool {
        if self.fast_pending {
            return false;
        }
        self.fast_pending = true;
        true
    }

    pub fn is_fast_pending(&self) -> bool {
        self.fast_pending
    }

    /// Called from the display-frame callback. Returns whether a fast redraw
    /// was pending (and is now being served).
    pub fn begin_frame(&mut self) -> bool {
        std::mem::take(&mut self.fast_pending)
    }

    /// Every input event (re)arms the quality debounce.
    pub fn note_input(&mut self, now_ms: f64) -> f64 {
        self.quality.arm(now_ms)
    }

    pub fn quality_deadline(&self) -> Option<f64> {
        self.quality.deadline()
    }

    /// True once, when the debounce expires uninterrupted.
    pub fn poll_quality(&mut self, now_ms: f64) -> bool {
        self.quality.fire_if_due(now_ms)
    }

    /// Drop the pending frame and the debounce. Returns whether a display
    /// frame request was outstanding.
    pub fn cancel_all(&mut self) -> bool {
        self.quality.cancel();
        std::mem::take(&mut self.fast_pending)
    }

    pub fn padding_fraction(&self) -> f64 {
        self.padding_fraction
    }
}

/// The viewport widened by `fraction` of its width on each side, clamped to
/// the data.
pub fn padded_viewport(view: TimeRange, fraction: f64, data: TimeRange) -> TimeRange {
    view.padded(fraction, &data)
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HiResPlan {
    pub padded: TimeRange,
    pub columns: u32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum QualityDecision {
    Render(HiResPlan),
    /// The base tiles already resolve the view at this surface width.
    PyramidSufficient,
    /// Too few raw samples for one transform frame; keep the current image.
    InsufficientSamples { available: usize, required: usize },
    /// The authoritative hi-res surface still covers the view.
    AlreadyCovered,
}

/// Decide what the quality path should do for `view` on a surface
/// `device_width` pixels wide.
pub fn plan_quality(
    view: TimeRange,
    data: TimeRange,
    device_width: u32,
    sample_rate: u32,
    config: &EngineConfig,
    already_covered: bool,
) -> QualityDecision {
    let base_density = config.pyramid.tile_columns as f64 / config.pyramid.base_tile_secs;
    if base_density * view.width() >= config.pyramid.crossover * device_width as f64 {
        return QualityDecision::PyramidSufficient;
    }
    let padded = padded_viewport(view, config.scheduler.hires_padding_fraction, data);
    let available = (padded.width() * sample_rate as f64).floor() as usize;
    let required = config.min_transform_window();
    if available < required {
        return QualityDecision::InsufficientSamples { available, required };
    }
    if already_covered {
        return QualityDecision::AlreadyCovered;
    }
    let columns = (device_width as f64 * padded.width() / view.width()).ceil() as u32;
    QualityDecision::Render(HiResPlan {
        padded,
        columns: columns.clamp(1, config.hires.max_columns as u32),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bursts_coalesce_into_one_frame() {
        let mut s = RenderScheduler::new(&SchedulerConfig::default());
        assert!(s.request_fast());
        for _ in 0..50 {
            assert!(!s.request_fast());
        }
        assert!(s.begin_frame());
        assert!(!s.begin_frame());
        assert!(s.request_fast());
    }

    #[test]
    fn quality_fires_only_after_quiet_period() {
        let mut s = RenderScheduler::new(&SchedulerConfig::default());
        s.note_input(0.0);
        s.note_input(300.0);
        assert!(!s.poll_quality(500.0));
        s.note_input(650.0);
        assert!(!s.poll_quality(1_000.0));
        assert!(s.poll_quality(1_050.0));
        assert!(!s.poll_quality(2_000.0));
    }

    #[test]
    fn cancel_all_drops_everything() {
        let mut s = RenderScheduler::new(&SchedulerConfig::default());
        s.request_fast();
        s.note_input(0.0);
        assert!(s.cancel_all());
        assert!(!s.is_fast_pending());
        assert!(!s.poll_quality(10_000.0));
    }

    #[test]
    fn padding_is_thirty_percent_each_side_and_clamped() {
        let data = TimeRange::new(0.0, 3600.0);
        assert_eq!(padded_viewport(TimeRange::new(1000.0, 1100.0), 0.3, data), TimeRange::new(970.0, 1130.0));
        assert_eq!(padded_viewport(TimeRange::new(10.0, 110.0), 0.3, data), TimeRange::new(0.0, 140.0));
    }

    #[test]
    fn full_hour_is_served_by_the_pyramid() {
        let cfg = EngineConfig::default();
        let data = TimeRange::new(0.0, 3600.0);
        assert_eq!(plan_quality(data, data, 1600, 48_000, &cfg, false), QualityDecision::PyramidSufficient);
    }

    #[test]
    fn deep_zoom_plans_a_padded_render() {
        let cfg = EngineConfig::default();
        let data = TimeRange::new(0.0, 3600.0);
        let view = TimeRange::new(1000.0, 1100.0);
        match plan_quality(view, data, 1000, 48_000, &cfg, false) {
            QualityDecision::Render(plan) => {
                assert_eq!(plan.padded, TimeRange::new(970.0, 1130.0));
                assert_eq!(plan.columns, 1600);
            }
            other => panic!("expected a render, got {other:?}"),
        }
        assert_eq!(plan_quality(view, data, 1000, 48_000, &cfg, true), QualityDecision::AlreadyCovered);
    }

    #[test]
    fn tiny_sample_counts_keep_the_current_texture() {
        let cfg = EngineConfig::default();
        let data = TimeRange::new(0.0, 0.5);
        let decision = plan_quality(data, data, 800, 1_000, &cfg, false);
        assert_eq!(decision, QualityDecision::InsufficientSamples { available: 500, required: 1024 });
    }
}
