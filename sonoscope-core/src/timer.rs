/// One-shot cancellable timer driven by an injected clock.
///
/// `arm` (re)starts the countdown, `cancel` disarms it, and `fire_if_due`
/// reports the expiry exactly once. The browser layer pairs each of these
/// with a real `setTimeout`; the state here decides whether the callback
/// still means anything when it runs.
#[derive(Clone, Debug, PartialEq)]
pub struct CancellableTimer {
    delay_ms: f64,
    deadline: Option<f64>,
}

impl CancellableTimer {
    pub fn new(delay_ms: f64) -> Self {
        Self { delay_ms: delay_ms.max(0.0), deadline: None }
    }

    pub fn delay_ms(&self) -> f64 {
        self.delay_ms
    }

    /// Arm (or re-arm) the timer; returns the new deadline.
    pub fn arm(&mut self, now_ms: f64) -> f64 {
        let deadline = now_ms + self.delay_ms;
        self.deadline = Some(deadline);
        deadline
    }

    pub fn cancel(&mut self) -> bool {
        self.deadline.take().is_some()
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<f64> {
        self.deadline
    }

    pub fn remaining_ms(&self, now_ms: f64) -> Option<f64> {
        self.deadline.map(|d| (d - now_ms).max(0.0))
    }

    /// Fire if the deadline has passed. Disarms on fire.
    pub fn fire_if_due(&mut self, now_ms: f64) -> bool {
        match self.deadline {
            Some(d) if now_ms >= d => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_once_after_deadline() {
        let mut t = CancellableTimer::new(400.0);
        t.arm(1000.0);
        assert!(!t.fire_if_due(1399.0));
        assert!(t.fire_if_due(1400.0));
        assert!(!t.fire_if_due(1500.0));
        assert!(!t.is_armed());
    }

    #[test]
    fn rearm_pushes_deadline_back() {
        let mut t = CancellableTimer::new(400.0);
        t.arm(0.0);
        t.arm(300.0);
        assert!(!t.fire_if_due(500.0));
        assert!(t.fire_if_due(700.0));
    }

    #[test]
    fn cancel_prevents_fire() {
        let mut t = CancellableTimer::new(150.0);
        t.arm(0.0);
        assert!(t.cancel());
        assert!(!t.fire_if_due(1_000.0));
        assert!(!t.cancel());
    }
}
