//! Engine tuning knobs.
//!
//! Every empirically tuned constant lives here as a named, overridable value.
//! The front end loads an optional JSON override on start-up; missing fields
//! fall back to the defaults below.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub viewport: ViewportConfig,
    pub gesture: GestureConfig,
    pub scheduler: SchedulerConfig,
    pub pyramid: PyramidConfig,
    pub hires: HiResConfig,
    pub overlay: OverlayConfig,
    /// Crossfade duration when a rendered surface replaces one with a
    /// different frequency scale.
    pub crossfade_ms: f64,
    /// Bottom of the greyscale dynamic range, in dB below full scale.
    pub db_floor: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            viewport: ViewportConfig::default(),
            gesture: GestureConfig::default(),
            scheduler: SchedulerConfig::default(),
            pyramid: PyramidConfig::default(),
            hires: HiResConfig::default(),
            overlay: OverlayConfig::default(),
            crossfade_ms: 300.0,
            db_floor: -90.0,
        }
    }
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
            ConfigError::Invalid { field, reason: reason.into() }
        }

        if !(self.viewport.min_view_secs > 0.0) {
            return Err(invalid("viewport.min_view_secs", "must be positive"));
        }
        if !(self.viewport.snap_full_fraction > 0.0 && self.viewport.snap_full_fraction <= 1.0) {
            return Err(invalid("viewport.snap_full_fraction", "must be in (0, 1]"));
        }
        let g = &self.gesture;
        if !(g.zoom_step_min > 0.0 && g.zoom_step_min < 1.0) {
            return Err(invalid("gesture.zoom_step_min", "must be in (0, 1)"));
        }
        if !(g.zoom_step_max > 1.0) {
            return Err(invalid("gesture.zoom_step_max", "must exceed 1"));
        }
        if !(g.axis_flip_ratio >= 1.0) {
            return Err(invalid("gesture.axis_flip_ratio", "must be at least 1"));
        }
        if !(self.scheduler.hires_padding_fraction >= 0.0) {
            return Err(invalid("scheduler.hires_padding_fraction", "must not be negative"));
        }
        let p = &self.pyramid;
        if !(p.base_tile_secs > 0.0) {
            return Err(invalid("pyramid.base_tile_secs", "must be positive"));
        }
        if p.tile_columns < 2 {
            return Err(invalid("pyramid.tile_columns", "must be at least 2"));
        }
        if !p.fft_size.is_power_of_two() || p.fft_size < 16 {
            return Err(invalid("pyramid.fft_size", "must be a power of two >= 16"));
        }
        if self.hires.max_columns == 0 || self.hires.chunk_columns == 0 {
            return Err(invalid("hires", "column limits must be positive"));
        }
        if !(self.crossfade_ms >= 0.0) {
            return Err(invalid("crossfade_ms", "must not be negative"));
        }
        if !(self.db_floor < 0.0) {
            return Err(invalid("db_floor", "must be below 0 dB"));
        }
        Ok(())
    }

    /// Samples a quality-path transform needs before it can produce a column.
    pub fn min_transform_window(&self) -> usize {
        self.hires.min_transform_window.unwrap_or(self.pyramid.fft_size)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    pub min_view_secs: f64,
    /// Zooming out past this fraction of the full span snaps to the full view.
    pub snap_full_fraction: f64,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self { min_view_secs: 1.0, snap_full_fraction: 0.99 }
    }
}

/// Which gestures a surface accepts and how strongly it reacts.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfacePolicy {
    pub zoom_enabled: bool,
    pub pan_enabled: bool,
    pub zoom_sensitivity: f64,
    pub pan_sensitivity: f64,
}

impl Default for SurfacePolicy {
    fn default() -> Self {
        Self {
            zoom_enabled: true,
            pan_enabled: true,
            zoom_sensitivity: 1.0,
            pan_sensitivity: 1.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    /// Idle time after which a gesture ends and the axis lock is released.
    pub idle_release_ms: f64,
    /// The other axis must exceed the locked one by this ratio to flip.
    pub axis_flip_ratio: f64,
    pub zoom_step_min: f64,
    pub zoom_step_max: f64,
    /// Exponent applied per wheel pixel: `factor = exp(delta_y * k)`.
    pub wheel_zoom_per_delta: f64,
    pub detail: SurfacePolicy,
    pub overview: SurfacePolicy,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            idle_release_ms: 150.0,
            axis_flip_ratio: 2.0,
            zoom_step_min: 0.8,
            zoom_step_max: 1.2,
            wheel_zoom_per_delta: 0.002,
            detail: SurfacePolicy::default(),
            overview: SurfacePolicy {
                zoom_enabled: false,
                pan_enabled: true,
                zoom_sensitivity: 1.0,
                pan_sensitivity: 4.0,
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub quality_debounce_ms: f64,
    /// Hi-res renders cover the viewport plus this fraction on each side.
    pub hires_padding_fraction: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { quality_debounce_ms: 400.0, hires_padding_fraction: 0.3 }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PyramidConfig {
    pub base_tile_secs: f64,
    pub tile_columns: usize,
    /// Hi-res is skipped while the base tiles provide at least this
    /// fraction of one column per output pixel.
    pub crossover: f64,
    pub fft_size: usize,
}

impl Default for PyramidConfig {
    fn default() -> Self {
        Self {
            base_tile_secs: 15.0 * 60.0,
            tile_columns: 1024,
            crossover: 0.8,
            fft_size: 1024,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HiResConfig {
    /// Overrides the minimum window; defaults to `pyramid.fft_size`.
    pub min_transform_window: Option<usize>,
    pub max_columns: usize,
    /// Columns computed between cooperative yields.
    pub chunk_columns: usize,
}

impl Default for HiResConfig {
    fn default() -> Self {
        Self { min_transform_window: None, max_columns: 4096, chunk_columns: 128 }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    pub drag_threshold_px: f64,
    pub drag_safety_ms: f64,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self { drag_threshold_px: 5.0, drag_safety_ms: 5000.0 }
    }
}
