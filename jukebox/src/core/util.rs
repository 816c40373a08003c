/// Linear interpolation between two values. `t` is expected in `0.0..=1.0`.
pub fn lerp(start: f32, end: f32, t: f32) -> f32 {
    start + (end - start) * t
}

/// Returns `true` for the 1st, 11th, 21st... occurrence of a counted event.
/// Used to keep recurring warnings out of the log on every frame.
pub fn should_log_occurrence(count: u32, interval: u32) -> bool {
    count > 0 && (count - 1) % interval.max(1) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lerp_endpoints() {
        assert_eq!(lerp(100.0, 75.0, 0.0), 100.0);
        assert_eq!(lerp(100.0, 75.0, 1.0), 75.0);
        assert_eq!(lerp(0.0, 10.0, 0.5), 5.0);
    }

    #[test]
    fn occurrence_logging_is_rate_limited() {
        let logged: Vec<u32> =
            (0..=25).filter(|n| should_log_occurrence(*n, 10)).collect();
        assert_eq!(logged, vec![1, 11, 21]);
    }
}
