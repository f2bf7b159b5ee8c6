/// Two-finger touch tracking that turns finger movement into engine pinch
/// events.
use sonoscope_core::gesture::InputEvent;

/// Below this finger spacing (px) the distance ratio is too noisy to use.
const MIN_FINGER_DIST: f64 = 10.0;

/// Returns (midpoint_client_x, distance) for exactly 2 touches.
pub fn two_finger_geometry(touches: &web_sys::TouchList) -> Option<(f64, f64)> {
    if touches.length() != 2 {
        return None;
    }
    let t0 = touches.get(0)?;
    let t1 = touches.get(1)?;
    let x0 = t0.client_x() as f64;
    let x1 = t1.client_x() as f64;
    let y0 = t0.client_y() as f64;
    let y1 = t1.client_y() as f64;
    let mid_x = (x0 + x1) / 2.0;
    let dist = ((x1 - x0).powi(2) + (y1 - y0).powi(2)).sqrt();
    Some((mid_x, dist))
}

/// Geometry of the previous two-finger move.
#[derive(Clone, Copy, Debug, Default)]
pub struct PinchTracker {
    last: Option<(f64, f64)>,
}

impl PinchTracker {
    pub fn begin(&mut self, mid_client_x: f64, dist: f64) {
        self.last = Some((mid_client_x, dist));
    }

    pub fn end(&mut self) {
        self.last = None;
    }

    pub fn is_active(&self) -> bool {
        self.last.is_some()
    }

    /// Event for the step since the previous move. `surface_left` converts
    /// client x into surface coordinates.
    pub fn step(&mut self, mid_client_x: f64, dist: f64, surface_left: f64) -> Option<InputEvent> {
        let (last_mid, last_dist) = self.last?;
        self.last = Some((mid_client_x, dist));
        if last_dist < MIN_FINGER_DIST || dist < MIN_FINGER_DIST {
            return None;
        }
        Some(InputEvent::Pinch {
            scale: dist / last_dist,
            mid_x: mid_client_x - surface_left,
            mid_dx: mid_client_x - last_mid,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steps_are_relative_to_the_previous_move() {
        let mut tracker = PinchTracker::default();
        assert!(tracker.step(100.0, 50.0, 0.0).is_none());
        tracker.begin(100.0, 50.0);
        assert_eq!(
            tracker.step(110.0, 100.0, 20.0),
            Some(InputEvent::Pinch { scale: 2.0, mid_x: 90.0, mid_dx: 10.0 })
        );
        assert_eq!(
            tracker.step(110.0, 50.0, 20.0),
            Some(InputEvent::Pinch { scale: 0.5, mid_x: 90.0, mid_dx: 0.0 })
        );
    }

    #[test]
    fn fingers_too_close_are_ignored() {
        let mut tracker = PinchTracker::default();
        tracker.begin(0.0, 4.0);
        assert!(tracker.step(0.0, 40.0, 0.0).is_none());
        assert!(tracker.step(0.0, 80.0, 0.0).is_some());
    }
}
