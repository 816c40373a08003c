use std::collections::VecDeque;
use std::time::{Duration, Instant};

pub const DEFAULT_FPS: f32 = 60.0;
pub const MAX_FPS: f32 = 1000.0;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct TickResult {
    pub should_render: bool,
    /// Whole frame intervals that elapsed without a render. A kiosk never
    /// renders them late; they are only counted.
    pub frames_skipped: u32,
}

/// Fixed-rate pacing for the main loop. Time is always passed in so the
/// clock can be driven deterministically.
#[derive(Debug)]
pub struct FrameClock {
    fps: f32,
    frame_count: u64,
    skipped_total: u64,
    last_tick: Instant,
    accumulator: Duration,
    frame_intervals: VecDeque<Duration>,
    max_intervals: usize,
}

impl FrameClock {
    pub fn new(fps: f32) -> Self {
        Self::with_start(fps, Instant::now())
    }

    pub fn with_start(fps: f32, now: Instant) -> Self {
        Self {
            fps: sanitize_fps(fps),
            frame_count: 0,
            skipped_total: 0,
            last_tick: now,
            accumulator: Duration::ZERO,
            frame_intervals: VecDeque::new(),
            max_intervals: 120,
        }
    }

    pub fn fps(&self) -> f32 {
        self.fps
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn skipped_total(&self) -> u64 {
        self.skipped_total
    }

    pub fn frame_duration(&self) -> Duration {
        Duration::from_secs_f32(1.0 / self.fps).max(Duration::from_nanos(1))
    }

    pub fn next_deadline(&self) -> Instant {
        let remaining = self
            .frame_duration()
            .checked_sub(self.accumulator)
            .unwrap_or_default();
        self.last_tick + remaining
    }

    /// How long the loop may sleep before the next frame is due.
    pub fn time_until_next(&self, now: Instant) -> Duration {
        self.next_deadline().saturating_duration_since(now)
    }

    pub fn average_fps(&self) -> f32 {
        if self.frame_intervals.is_empty() {
            return 0.0;
        }

        let sum: Duration = self.frame_intervals.iter().copied().sum();
        let avg = sum / self.frame_intervals.len() as u32;

        if avg.is_zero() {
            return 0.0;
        }

        1.0 / avg.as_secs_f32()
    }

    pub fn tick(&mut self, now: Instant) -> TickResult {
        let elapsed = now.saturating_duration_since(self.last_tick);
        self.last_tick = now;
        self.accumulator += elapsed;

        let frame_duration = self.frame_duration();
        if self.accumulator < frame_duration {
            return TickResult::default();
        }

        let due = u32::try_from(
            self.accumulator.as_nanos() / frame_duration.as_nanos(),
        )
        .unwrap_or(u32::MAX);
        let skipped = due.saturating_sub(1);

        // Missed intervals are dropped, keeping only the sub-frame remainder.
        self.accumulator = self
            .accumulator
            .checked_sub(frame_duration * due)
            .unwrap_or_default();
        self.frame_count += 1;
        self.skipped_total += skipped as u64;
        self.record_interval(elapsed);

        TickResult {
            should_render: true,
            frames_skipped: skipped,
        }
    }

    fn record_interval(&mut self, interval: Duration) {
        self.frame_intervals.push_back(interval);
        if self.frame_intervals.len() > self.max_intervals {
            self.frame_intervals.pop_front();
        }
    }
}

/// Clamps to `1..=MAX_FPS`; anything that is not a number runs at the
/// default rate.
fn sanitize_fps(fps: f32) -> f32 {
    if fps.is_nan() {
        DEFAULT_FPS
    } else {
        fps.clamp(1.0, MAX_FPS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_on_full_interval() {
        let start = Instant::now();
        let mut clock = FrameClock::with_start(60.0, start);

        let half = start + clock.frame_duration() / 2;
        assert_eq!(clock.tick(half), TickResult::default());

        let full = half + clock.frame_duration() / 2;
        let tick = clock.tick(full);
        assert!(tick.should_render);
        assert_eq!(tick.frames_skipped, 0);
        assert_eq!(clock.frame_count(), 1);
    }

    #[test]
    fn lagging_renders_once_and_counts_skips() {
        let start = Instant::now();
        let mut clock = FrameClock::with_start(30.0, start);
        let now = start + clock.frame_duration() * 3;

        let tick = clock.tick(now);
        assert!(tick.should_render);
        assert_eq!(tick.frames_skipped, 2);
        assert_eq!(clock.frame_count(), 1);
        assert_eq!(clock.skipped_total(), 2);

        // No debt carried over from the missed frames.
        let soon = now + clock.frame_duration() / 2;
        assert_eq!(clock.tick(soon), TickResult::default());
    }

    #[test]
    fn deadline_tracks_accumulated_time() {
        let start = Instant::now();
        let mut clock = FrameClock::with_start(50.0, start);
        let quarter = start + Duration::from_millis(5);
        clock.tick(quarter);
        let remaining = clock.time_until_next(quarter);
        assert!(remaining > Duration::from_millis(14));
        assert!(remaining <= Duration::from_millis(15));
    }

    #[test]
    fn unbounded_rates_are_clamped() {
        let start = Instant::now();

        for fps in [f32::INFINITY, f32::MAX, 1.0e12] {
            let mut clock = FrameClock::with_start(fps, start);
            assert_eq!(clock.fps(), MAX_FPS);
            assert!(!clock.frame_duration().is_zero());

            let tick = clock.tick(start + Duration::from_secs(1));
            assert!(tick.should_render);
            assert_eq!(clock.frame_count(), 1);
        }

        let clock = FrameClock::with_start(f32::NAN, start);
        assert_eq!(clock.fps(), DEFAULT_FPS);
        let clock = FrameClock::with_start(f32::NEG_INFINITY, start);
        assert_eq!(clock.fps(), 1.0);
    }

    #[test]
    fn long_stall_does_not_overflow_the_skip_count() {
        let start = Instant::now();
        let mut clock = FrameClock::with_start(MAX_FPS, start);

        let tick = clock.tick(start + Duration::from_secs(60 * 60 * 24 * 60));
        assert!(tick.should_render);
        assert_eq!(tick.frames_skipped, u32::MAX - 1);
    }
}
