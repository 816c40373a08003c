use std::time::{Duration, Instant};

use crate::core::util::lerp;

/// Linear ramp between two values over a fixed duration. Once the duration
/// has elapsed it yields exactly `to`, however many samples came before.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ramp {
    start: Instant,
    from: f32,
    to: f32,
    duration: Duration,
}

impl Ramp {
    pub fn new(start: Instant, from: f32, to: f32, duration: Duration) -> Self {
        Self {
            start,
            from,
            to,
            duration,
        }
    }

    pub fn progress(&self, now: Instant) -> f32 {
        if self.duration.is_zero() {
            return 1.0;
        }
        let elapsed = now.saturating_duration_since(self.start);
        (elapsed.as_secs_f32() / self.duration.as_secs_f32()).min(1.0)
    }

    pub fn is_complete(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.start) >= self.duration
    }

    pub fn value_at(&self, now: Instant) -> f32 {
        if self.is_complete(now) {
            return self.to;
        }
        lerp(self.from, self.to, self.progress(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ramp_hits_exact_target_at_end() {
        let t0 = Instant::now();
        let ramp = Ramp::new(t0, 80.0, 60.0, Duration::from_millis(300));

        // Uneven sampling must not affect the end value.
        for ms in [3, 17, 40, 41, 299] {
            let v = ramp.value_at(t0 + Duration::from_millis(ms));
            assert!(v <= 80.0 && v >= 60.0);
        }

        assert_eq!(ramp.value_at(t0 + Duration::from_millis(300)), 60.0);
        assert_eq!(ramp.value_at(t0 + Duration::from_secs(5)), 60.0);
    }

    #[test]
    fn ramp_midpoint_is_linear() {
        let t0 = Instant::now();
        let ramp = Ramp::new(t0, 100.0, 0.0, Duration::from_millis(300));
        let mid = ramp.value_at(t0 + Duration::from_millis(150));
        assert!((mid - 50.0).abs() < 0.01);
    }

    #[test]
    fn zero_duration_ramp_is_immediately_complete() {
        let t0 = Instant::now();
        let ramp = Ramp::new(t0, 1.0, 0.0, Duration::ZERO);
        assert!(ramp.is_complete(t0));
        assert_eq!(ramp.value_at(t0), 0.0);
    }
}
