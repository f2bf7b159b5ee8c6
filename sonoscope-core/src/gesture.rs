//! Raw input → viewport mutations.
//!
//! Wheel gestures lock onto an axis on their first event and keep it until
//! the other axis is more than `axis_flip_ratio` times as strong, or until
//! the gesture goes idle. Vertical means zoom about the cursor, horizontal
//! means pan. Each surface gates the two axes independently.

use crate::config::{GestureConfig, SurfacePolicy};
use crate::error::ViewportError;
use crate::timer::CancellableTimer;
use crate::viewport::{PanOutcome, ViewportState, ZoomOutcome};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    Horizontal,
    Vertical,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SurfaceKind {
    /// The zoomable spectrogram / waveform tracks.
    Detail,
    /// The full-data strip.
    Overview,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerPhase {
    Down,
    Move,
    Up,
    Cancel,
}

/// Input delivered by the front end. Coordinates are logical pixels
/// relative to the target surface.
#[derive(Clone, Debug, PartialEq)]
pub enum InputEvent {
    Wheel { delta_x: f64, delta_y: f64, cursor_x: f64, ctrl: bool },
    Pointer { phase: PointerPhase, x: f64, y: f64 },
    Key { key: String },
    /// Two-finger touch move. `scale` is the finger distance relative to
    /// the previous move; `mid_dx` is how far the midpoint travelled.
    Pinch { scale: f64, mid_x: f64, mid_dx: f64 },
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GestureAction {
    Zoom { anchor: f64, factor: f64 },
    Pan { delta: f64 },
    Pinch { anchor: f64, factor: f64, pan: f64 },
    ZoomToFull,
    CancelDrag,
    Pointer { phase: PointerPhase, x: f64, y: f64 },
    Ignored,
}

/// Fraction of the view width panned by one arrow-key press.
const KEY_PAN_FRACTION: f64 = 0.1;

/// Ephemeral per-gesture state.
#[derive(Clone, Debug)]
pub struct GestureState {
    locked: Option<Axis>,
    settle: CancellableTimer,
}

pub struct GestureInputHandler {
    state: GestureState,
    config: GestureConfig,
}

impl GestureInputHandler {
    pub fn new(config: GestureConfig) -> Self {
        Self {
            state: GestureState {
                locked: None,
                settle: CancellableTimer::new(config.idle_release_ms),
            },
            config,
        }
    }

    pub fn locked_axis(&self) -> Option<Axis> {
        self.state.locked
    }

    pub fn settle_deadline(&self) -> Option<f64> {
        self.state.settle.deadline()
    }

    fn policy(&self, surface: SurfaceKind) -> SurfacePolicy {
        match surface {
            SurfaceKind::Detail => self.config.detail,
            SurfaceKind::Overview => self.config.overview,
        }
    }

    /// Release the axis lock once the gesture has been idle long enough.
    pub fn poll_settle(&mut self, now_ms: f64) -> bool {
        if self.state.settle.fire_if_due(now_ms) {
            self.state.locked = None;
            return true;
        }
        false
    }

    /// Sticky axis classification with hysteresis.
    pub fn classify(&mut self, delta_x: f64, delta_y: f64, now_ms: f64) -> Axis {
        self.poll_settle(now_ms);
        let (ax, ay) = (delta_x.abs(), delta_y.abs());
        let ratio = self.config.axis_flip_ratio;
        let axis = match self.state.locked {
            None if ax >= ay => Axis::Horizontal,
            None => Axis::Vertical,
            Some(Axis::Horizontal) if ay > ratio * ax => Axis::Vertical,
            Some(Axis::Vertical) if ax > ratio * ay => Axis::Horizontal,
            Some(locked) => locked,
        };
        self.state.locked = Some(axis);
        self.state.settle.arm(now_ms);
        axis
    }

    /// Bounded per-event zoom factor; negative `delta_y` zooms in.
    pub fn zoom_factor(&self, delta_y: f64, sensitivity: f64) -> f64 {
        (delta_y * self.config.wheel_zoom_per_delta * sensitivity)
            .exp()
            .clamp(self.config.zoom_step_min, self.config.zoom_step_max)
    }

    /// Translate one event on `surface` (`width_px` logical pixels wide)
    /// into an action against `viewport`.
    pub fn interpret(
        &mut self,
        event: &InputEvent,
        surface: SurfaceKind,
        viewport: &ViewportState,
        width_px: f64,
        now_ms: f64,
    ) -> GestureAction {
        let policy = self.policy(surface);
        let view = viewport.view();
        match event {
            InputEvent::Wheel { delta_x, delta_y, cursor_x, ctrl } => {
                if (*delta_x == 0.0 && *delta_y == 0.0) || width_px <= 0.0 {
                    return GestureAction::Ignored;
                }
                let axis = if *ctrl {
                    self.state.locked = Some(Axis::Vertical);
                    self.state.settle.arm(now_ms);
                    Axis::Vertical
                } else {
                    self.classify(*delta_x, *delta_y, now_ms)
                };
                match axis {
                    Axis::Vertical if policy.zoom_enabled => {
                        let shown = match surface {
                            SurfaceKind::Detail => view,
                            SurfaceKind::Overview => viewport.data(),
                        };
                        let anchor = shown.start + (cursor_x / width_px).clamp(0.0, 1.0) * shown.width();
                        GestureAction::Zoom {
                            anchor,
                            factor: self.zoom_factor(*delta_y, policy.zoom_sensitivity),
                        }
                    }
                    Axis::Horizontal if policy.pan_enabled => GestureAction::Pan {
                        delta: delta_x / width_px * view.width() * policy.pan_sensitivity,
                    },
                    _ => GestureAction::Ignored,
                }
            }
            InputEvent::Pointer { phase, x, y } => GestureAction::Pointer { phase: *phase, x: *x, y: *y },
            InputEvent::Pinch { scale, mid_x, mid_dx } => {
                if !(scale.is_finite() && *scale > 0.0) || width_px <= 0.0 || !policy.zoom_enabled {
                    return GestureAction::Ignored;
                }
                let anchor = view.start + (mid_x / width_px).clamp(0.0, 1.0) * view.width();
                let factor = (1.0 / scale).clamp(self.config.zoom_step_min, self.config.zoom_step_max);
                let pan = if policy.pan_enabled { -mid_dx / width_px * view.width() } else { 0.0 };
                GestureAction::Pinch { anchor, factor, pan }
            }
            InputEvent::Key { key } => match key.as_str() {
                "Escape" => GestureAction::CancelDrag,
                "Home" if policy.zoom_enabled => GestureAction::ZoomToFull,
                "+" | "=" if policy.zoom_enabled => GestureAction::Zoom {
                    anchor: view.center(),
                    factor: self.config.zoom_step_min,
                },
                "-" | "_" if policy.zoom_enabled => GestureAction::Zoom {
                    anchor: view.center(),
                    factor: self.config.zoom_step_max,
                },
                "ArrowLeft" if policy.pan_enabled => GestureAction::Pan { delta: -view.width() * KEY_PAN_FRACTION },
                "ArrowRight" if policy.pan_enabled => GestureAction::Pan { delta: view.width() * KEY_PAN_FRACTION },
                _ => GestureAction::Ignored,
            },
        }
    }
}

/// Apply a viewport action. Returns whether the view changed; rejected
/// mutations leave the viewport untouched and come back as errors.
pub fn apply_action(action: GestureAction, viewport: &mut ViewportState) -> Result<bool, ViewportError> {
    match action {
        GestureAction::Zoom { anchor, factor } => {
            Ok(viewport.zoom_at(anchor, factor)? != ZoomOutcome::Unchanged)
        }
        GestureAction::Pan { delta } => Ok(viewport.pan_by(delta)? != PanOutcome::Unchanged),
        GestureAction::Pinch { anchor, factor, pan } => {
            // A zoom past the minimum width is dropped but the pan still applies.
            let zoomed = match viewport.zoom_at(anchor, factor) {
                Ok(outcome) => outcome != ZoomOutcome::Unchanged,
                Err(ViewportError::TooNarrow { .. }) => false,
                Err(e) => return Err(e),
            };
            let panned = pan != 0.0 && viewport.pan_by(pan)? != PanOutcome::Unchanged;
            Ok(zoomed || panned)
        }
        GestureAction::ZoomToFull => {
            let changed = !viewport.is_full() || viewport.active_region().is_some();
            viewport.exit_region();
            viewport.set_to_full();
            Ok(changed)
        }
        GestureAction::CancelDrag | GestureAction::Pointer { .. } | GestureAction::Ignored => Ok(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ViewportConfig;
    use crate::types::TimeRange;

    fn hour() -> ViewportState {
        ViewportState::new(TimeRange::new(0.0, 3600.0), 48_000, &ViewportConfig::default()).unwrap()
    }

    fn wheel(dx: f64, dy: f64, x: f64) -> InputEvent {
        InputEvent::Wheel { delta_x: dx, delta_y: dy, cursor_x: x, ctrl: false }
    }

    #[test]
    fn axis_lock_is_sticky_with_hysteresis() {
        let mut h = GestureInputHandler::new(GestureConfig::default());
        assert_eq!(h.classify(10.0, 5.0, 0.0), Axis::Horizontal);
        assert_eq!(h.classify(5.0, 8.0, 10.0), Axis::Horizontal);
        assert_eq!(h.classify(5.0, 10.0, 20.0), Axis::Horizontal);
        assert_eq!(h.classify(2.0, 10.0, 30.0), Axis::Vertical);
        assert_eq!(h.classify(6.0, 4.0, 40.0), Axis::Vertical);
    }

    #[test]
    fn lock_releases_after_idle() {
        let mut h = GestureInputHandler::new(GestureConfig::default());
        h.classify(10.0, 0.0, 0.0);
        assert!(!h.poll_settle(149.0));
        assert!(h.poll_settle(150.0));
        assert_eq!(h.locked_axis(), None);
        assert_eq!(h.classify(1.0, 3.0, 200.0), Axis::Vertical);
    }

    #[test]
    fn wheel_up_at_center_zooms_symmetrically() {
        let mut h = GestureInputHandler::new(GestureConfig::default());
        let mut vp = hour();
        let action = h.interpret(&wheel(0.0, -100.0, 500.0), SurfaceKind::Detail, &vp, 1000.0, 0.0);
        let GestureAction::Zoom { anchor, factor } = action else { panic!("expected zoom, got {action:?}") };
        assert_eq!(anchor, 1800.0);
        assert!(factor < 1.0 && factor >= 0.8);
        assert!(apply_action(action, &mut vp).unwrap());

        let view = vp.view();
        assert!(view.width() < 3600.0);
        assert!(((1800.0 - view.start) - (view.end - 1800.0)).abs() < 1e-9);
    }

    #[test]
    fn zoom_step_is_bounded() {
        let h = GestureInputHandler::new(GestureConfig::default());
        assert_eq!(h.zoom_factor(-10_000.0, 1.0), 0.8);
        assert_eq!(h.zoom_factor(10_000.0, 1.0), 1.2);
    }

    #[test]
    fn horizontal_wheel_pans_by_view_fraction() {
        let mut h = GestureInputHandler::new(GestureConfig::default());
        let mut vp = hour();
        vp.zoom_at(1800.0, 0.1).unwrap();
        let before = vp.view();
        let action = h.interpret(&wheel(100.0, 0.0, 0.0), SurfaceKind::Detail, &vp, 1000.0, 0.0);
        let GestureAction::Pan { delta } = action else { panic!("expected pan, got {action:?}") };
        assert!((delta - 36.0).abs() < 1e-9);
        apply_action(action, &mut vp).unwrap();
        assert!((vp.view_start() - before.start - 36.0).abs() < 1e-9);
    }

    #[test]
    fn overview_policy_blocks_zoom_but_allows_pan() {
        let mut h = GestureInputHandler::new(GestureConfig::default());
        let vp = hour();
        let zoom = h.interpret(&wheel(0.0, -50.0, 10.0), SurfaceKind::Overview, &vp, 500.0, 0.0);
        assert_eq!(zoom, GestureAction::Ignored);
        h.poll_settle(1_000.0);
        let pan = h.interpret(&wheel(10.0, 0.0, 10.0), SurfaceKind::Overview, &vp, 500.0, 1_000.0);
        assert!(matches!(pan, GestureAction::Pan { .. }));
    }

    #[test]
    fn ctrl_wheel_always_zooms() {
        let mut h = GestureInputHandler::new(GestureConfig::default());
        let vp = hour();
        let ev = InputEvent::Wheel { delta_x: 40.0, delta_y: -3.0, cursor_x: 0.0, ctrl: true };
        assert!(matches!(
            h.interpret(&ev, SurfaceKind::Detail, &vp, 1000.0, 0.0),
            GestureAction::Zoom { .. }
        ));
    }

    #[test]
    fn keys_map_to_actions() {
        let mut h = GestureInputHandler::new(GestureConfig::default());
        let vp = hour();
        let key = |k: &str| InputEvent::Key { key: k.to_string() };
        assert_eq!(h.interpret(&key("Escape"), SurfaceKind::Detail, &vp, 1.0, 0.0), GestureAction::CancelDrag);
        assert_eq!(h.interpret(&key("Home"), SurfaceKind::Detail, &vp, 1.0, 0.0), GestureAction::ZoomToFull);
        assert_eq!(
            h.interpret(&key("ArrowRight"), SurfaceKind::Detail, &vp, 1.0, 0.0),
            GestureAction::Pan { delta: 360.0 }
        );
        assert_eq!(
            h.interpret(&key("+"), SurfaceKind::Detail, &vp, 1.0, 0.0),
            GestureAction::Zoom { anchor: 1800.0, factor: 0.8 }
        );
        assert_eq!(h.interpret(&key("q"), SurfaceKind::Detail, &vp, 1.0, 0.0), GestureAction::Ignored);
    }

    #[test]
    fn pinch_spread_zooms_in_about_the_midpoint() {
        let mut h = GestureInputHandler::new(GestureConfig::default());
        let mut vp = hour();
        let ev = InputEvent::Pinch { scale: 1.1, mid_x: 250.0, mid_dx: 0.0 };
        let action = h.interpret(&ev, SurfaceKind::Detail, &vp, 1000.0, 0.0);
        let GestureAction::Pinch { anchor, factor, pan } = action else { panic!("expected pinch, got {action:?}") };
        assert_eq!(anchor, 900.0);
        assert!((factor - 1.0 / 1.1).abs() < 1e-12);
        assert_eq!(pan, 0.0);
        assert!(apply_action(action, &mut vp).unwrap());
        let view = vp.view();
        // The anchor keeps its quarter-way position.
        assert!(((900.0 - view.start) / view.width() - 0.25).abs() < 1e-9);
    }

    #[test]
    fn pinch_on_overview_is_ignored_by_default() {
        let mut h = GestureInputHandler::new(GestureConfig::default());
        let vp = hour();
        let ev = InputEvent::Pinch { scale: 2.0, mid_x: 10.0, mid_dx: 5.0 };
        assert_eq!(h.interpret(&ev, SurfaceKind::Overview, &vp, 500.0, 0.0), GestureAction::Ignored);
    }

    #[test]
    fn rejected_zoom_leaves_view_untouched() {
        let mut vp = ViewportState::new(TimeRange::new(0.0, 10.0), 1_000, &ViewportConfig::default()).unwrap();
        vp.zoom_at(5.0, 0.11).unwrap();
        let before = vp.view();
        assert!(apply_action(GestureAction::Zoom { anchor: 5.0, factor: 0.5 }, &mut vp).is_err());
        assert_eq!(vp.view(), before);
    }

    #[test]
    fn zoom_to_full_also_leaves_the_region() {
        use crate::types::{Region, RegionId};
        let mut vp = hour();
        let region = Region {
            id: RegionId(3),
            start_time: 600.0,
            end_time: 900.0,
            start_sample: 600 * 48_000,
            end_sample: 900 * 48_000,
            features: Vec::new(),
        };
        vp.enter_region(&region).unwrap();
        assert_eq!(apply_action(GestureAction::ZoomToFull, &mut vp), Ok(true));
        assert!(vp.is_full());
        assert_eq!(vp.active_region(), None);
        assert_eq!(apply_action(GestureAction::ZoomToFull, &mut vp), Ok(false));
    }
}
