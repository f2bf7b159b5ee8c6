//! The visible time window.
//!
//! `ViewportState` is the single record of what is on screen. It has no
//! rendering logic; whoever mutates it is responsible for asking the render
//! scheduler for a redraw.

use crate::config::ViewportConfig;
use crate::error::ViewportError;
use crate::types::{Region, RegionId, TimeRange};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViewportMode {
    Full,
    Region(RegionId),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ZoomOutcome {
    Zoomed,
    /// The new width reached the snap fraction; the view now equals the data.
    SnappedToFull,
    /// Already at the requested extent.
    Unchanged,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PanOutcome {
    Panned,
    /// Part of the shift was absorbed by a data boundary.
    Clamped,
    Unchanged,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ViewportState {
    mode: ViewportMode,
    view: TimeRange,
    data: TimeRange,
    sample_rate: u32,
    min_width: f64,
    snap_fraction: f64,
}

impl ViewportState {
    /// Create a viewport showing all of `data`.
    ///
    /// Data shorter than the configured minimum lowers the minimum to the data
    /// width so the invariants stay satisfiable.
    pub fn new(data: TimeRange, sample_rate: u32, config: &ViewportConfig) -> Result<Self, ViewportError> {
        if !data.start.is_finite() || !data.end.is_finite() {
            return Err(ViewportError::NonFinite);
        }
        if data.width() <= 0.0 {
            return Err(ViewportError::EmptyData);
        }
        Ok(Self {
            mode: ViewportMode::Full,
            view: data,
            data,
            sample_rate,
            min_width: config.min_view_secs.min(data.width()),
            snap_fraction: config.snap_full_fraction,
        })
    }

    pub fn mode(&self) -> ViewportMode {
        self.mode
    }

    pub fn active_region(&self) -> Option<RegionId> {
        match self.mode {
            ViewportMode::Full => None,
            ViewportMode::Region(id) => Some(id),
        }
    }

    pub fn view(&self) -> TimeRange {
        self.view
    }

    pub fn view_start(&self) -> f64 {
        self.view.start
    }

    pub fn view_end(&self) -> f64 {
        self.view.end
    }

    pub fn data(&self) -> TimeRange {
        self.data
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn min_width(&self) -> f64 {
        self.min_width
    }

    pub fn is_full(&self) -> bool {
        self.view == self.data
    }

    /// `dataStart ≤ viewStart < viewEnd ≤ dataEnd` and the minimum width.
    pub fn is_consistent(&self) -> bool {
        self.data.start <= self.view.start
            && self.view.start < self.view.end
            && self.view.end <= self.data.end
            && self.view.width() >= self.min_width - 1e-9
    }

    /// Rescale the view around `anchor` by `factor` (below 1 zooms in).
    ///
    /// The anchor keeps its relative screen position. Rejected without
    /// mutation if the result would be narrower than the minimum width.
    pub fn zoom_at(&mut self, anchor: f64, factor: f64) -> Result<ZoomOutcome, ViewportError> {
        if !anchor.is_finite() || !factor.is_finite() {
            return Err(ViewportError::NonFinite);
        }
        if factor <= 0.0 {
            return Err(ViewportError::BadFactor(factor));
        }

        let width = self.view.width();
        let new_width = width * factor;
        if new_width < self.min_width {
            return Err(ViewportError::TooNarrow { width: new_width, min: self.min_width });
        }
        if new_width >= self.data.width() * self.snap_fraction {
            if self.is_full() {
                return Ok(ZoomOutcome::Unchanged);
            }
            self.set_to_full();
            return Ok(ZoomOutcome::SnappedToFull);
        }

        let anchor = anchor.clamp(self.view.start, self.view.end);
        let ratio = (anchor - self.view.start) / width;
        let mut start = anchor - ratio * new_width;
        let mut end = start + new_width;
        if start < self.data.start {
            start = self.data.start;
            end = start + new_width;
        }
        if end > self.data.end {
            end = self.data.end;
            start = end - new_width;
        }
        let next = TimeRange::new(start.max(self.data.start), end.min(self.data.end));
        if next == self.view {
            return Ok(ZoomOutcome::Unchanged);
        }
        self.view = next;
        Ok(ZoomOutcome::Zoomed)
    }

    /// Shift the view by `delta` seconds, preserving its width.
    pub fn pan_by(&mut self, delta: f64) -> Result<PanOutcome, ViewportError> {
        if !delta.is_finite() {
            return Err(ViewportError::NonFinite);
        }
        let width = self.view.width();
        let mut start = self.view.start + delta;
        let mut end = self.view.end + delta;
        let mut clamped = false;
        if start < self.data.start {
            start = self.data.start;
            end = start + width;
            clamped = true;
        }
        if end > self.data.end {
            end = self.data.end;
            start = (end - width).max(self.data.start);
            clamped = true;
        }
        let next = TimeRange::new(start, end);
        if next == self.view {
            return Ok(PanOutcome::Unchanged);
        }
        self.view = next;
        Ok(if clamped { PanOutcome::Clamped } else { PanOutcome::Panned })
    }

    /// Show the whole data span. The mode is left alone.
    pub fn set_to_full(&mut self) {
        self.view = self.data;
    }

    /// Switch into region mode and frame the region.
    ///
    /// Regions narrower than the minimum width are framed by a minimum-width
    /// window centred on the region.
    pub fn enter_region(&mut self, region: &Region) -> Result<(), ViewportError> {
        let range = region.range();
        if !range.start.is_finite() || !range.end.is_finite() {
            return Err(ViewportError::NonFinite);
        }
        let mut start = range.start.max(self.data.start);
        let mut end = range.end.min(self.data.end);
        if end - start < self.min_width {
            let center = ((start + end) / 2.0).clamp(self.data.start, self.data.end);
            start = center - self.min_width / 2.0;
            end = center + self.min_width / 2.0;
            if start < self.data.start {
                start = self.data.start;
                end = start + self.min_width;
            }
            if end > self.data.end {
                end = self.data.end;
                start = end - self.min_width;
            }
        }
        self.view = TimeRange::new(start, end);
        self.mode = ViewportMode::Region(region.id);
        Ok(())
    }

    pub fn exit_region(&mut self) {
        self.mode = ViewportMode::Full;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hour() -> ViewportState {
        ViewportState::new(TimeRange::new(0.0, 3600.0), 48_000, &ViewportConfig::default()).unwrap()
    }

    fn region(id: u32, start: f64, end: f64) -> Region {
        Region {
            id: RegionId(id),
            start_time: start,
            end_time: end,
            start_sample: (start * 48_000.0) as u64,
            end_sample: (end * 48_000.0) as u64,
            features: Vec::new(),
        }
    }

    #[test]
    fn zoom_in_around_center_is_symmetric() {
        let mut vp = hour();
        assert_eq!(vp.zoom_at(1800.0, 0.8).unwrap(), ZoomOutcome::Zoomed);
        assert!((vp.view_start() - 360.0).abs() < 1e-9);
        assert!((vp.view_end() - 3240.0).abs() < 1e-9);
        assert!((vp.view().center() - 1800.0).abs() < 1e-9);
    }

    #[test]
    fn zoom_keeps_anchor_screen_position() {
        let mut vp = hour();
        vp.zoom_at(1800.0, 0.5).unwrap();
        let before = (1000.0 - vp.view_start()) / vp.view().width();
        vp.zoom_at(1000.0, 0.5).unwrap();
        let after = (1000.0 - vp.view_start()) / vp.view().width();
        assert!((before - after).abs() < 1e-9);
    }

    #[test]
    fn zoom_below_minimum_width_is_rejected() {
        let mut vp = hour();
        while vp.view().width() * 0.8 >= 1.0 {
            vp.zoom_at(100.0, 0.8).unwrap();
        }
        let before = vp.view();
        let err = vp.zoom_at(100.0, 0.8).unwrap_err();
        assert!(matches!(err, ViewportError::TooNarrow { .. }));
        assert_eq!(vp.view(), before);
        assert!(vp.is_consistent());
    }

    #[test]
    fn zooming_out_snaps_to_full() {
        let mut vp = hour();
        vp.zoom_at(3000.0, 0.5).unwrap();
        let mut outcome = ZoomOutcome::Zoomed;
        for _ in 0..20 {
            outcome = vp.zoom_at(3500.0, 1.2).unwrap();
            assert!(vp.is_consistent());
            if vp.is_full() {
                break;
            }
        }
        assert_eq!(outcome, ZoomOutcome::SnappedToFull);
        assert_eq!(vp.view(), TimeRange::new(0.0, 3600.0));
        assert_eq!(vp.zoom_at(1800.0, 1.2).unwrap(), ZoomOutcome::Unchanged);
    }

    #[test]
    fn zoom_near_edge_is_clamped_into_data() {
        let mut vp = hour();
        vp.zoom_at(1800.0, 0.1).unwrap();
        vp.pan_by(-10_000.0).unwrap();
        vp.zoom_at(0.0, 1.2).unwrap();
        assert_eq!(vp.view_start(), 0.0);
        assert!(vp.is_consistent());
    }

    #[test]
    fn pan_clamps_and_preserves_width() {
        let mut vp = hour();
        vp.zoom_at(1800.0, 0.1).unwrap();
        let width = vp.view().width();

        assert_eq!(vp.pan_by(100.0).unwrap(), PanOutcome::Panned);
        assert!((vp.view().width() - width).abs() < 1e-9);

        assert_eq!(vp.pan_by(1.0e6).unwrap(), PanOutcome::Clamped);
        assert_eq!(vp.view_end(), 3600.0);
        assert!((vp.view().width() - width).abs() < 1e-9);

        assert_eq!(vp.pan_by(10.0).unwrap(), PanOutcome::Unchanged);
        assert_eq!(vp.pan_by(-1.0e6).unwrap(), PanOutcome::Clamped);
        assert_eq!(vp.view_start(), 0.0);
        assert!(vp.is_consistent());
    }

    #[test]
    fn non_finite_input_is_rejected() {
        let mut vp = hour();
        assert_eq!(vp.pan_by(f64::NAN), Err(ViewportError::NonFinite));
        assert_eq!(vp.zoom_at(f64::INFINITY, 0.9), Err(ViewportError::NonFinite));
        assert_eq!(vp.zoom_at(10.0, 0.0), Err(ViewportError::BadFactor(0.0)));
        assert!(vp.is_full());
    }

    #[test]
    fn random_walk_preserves_invariants() {
        let mut vp = hour();
        // Deterministic LCG so the walk is reproducible.
        let mut seed: u64 = 0x5eed;
        let mut next = || {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            (seed >> 11) as f64 / (1u64 << 53) as f64
        };
        for _ in 0..5_000 {
            let r = next();
            if r < 0.5 {
                let anchor = vp.view_start() + next() * vp.view().width();
                let factor = 0.8 + next() * 0.4;
                let _ = vp.zoom_at(anchor, factor);
            } else {
                let _ = vp.pan_by((next() - 0.5) * vp.view().width());
            }
            assert!(vp.is_consistent(), "{:?}", vp.view());
            assert!(vp.view().width() >= 1.0 - 1e-9);
        }
    }

    #[test]
    fn region_mode_round_trip() {
        let mut vp = hour();
        vp.enter_region(&region(7, 600.0, 900.0)).unwrap();
        assert_eq!(vp.mode(), ViewportMode::Region(RegionId(7)));
        assert_eq!(vp.view(), TimeRange::new(600.0, 900.0));
        vp.exit_region();
        assert_eq!(vp.active_region(), None);
    }

    #[test]
    fn tiny_region_is_framed_by_minimum_window() {
        let mut vp = hour();
        vp.enter_region(&region(1, 3599.9, 3600.0)).unwrap();
        assert_eq!(vp.view_end(), 3600.0);
        assert!((vp.view().width() - 1.0).abs() < 1e-9);
        assert!(vp.is_consistent());
    }

    #[test]
    fn short_data_lowers_minimum_width() {
        let vp = ViewportState::new(TimeRange::new(5.0, 5.5), 8_000, &ViewportConfig::default()).unwrap();
        assert_eq!(vp.min_width(), 0.5);
        assert!(vp.is_consistent());
        assert!(ViewportState::new(TimeRange::new(5.0, 5.0), 8_000, &ViewportConfig::default()).is_err());
    }
}
