//! Artificial dwell time between visible status transitions.
//!
//! A fast round-trip to the coordinating service would otherwise make a
//! file flash through `Loading` and `Ready` faster than anyone can read it.
//! Each deferred transition waits for a randomly drawn target minus the time
//! that already passed since the record last changed.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

use crate::config::RegistryConfig;

/// Source of dwell targets.
pub trait Dwell: Send + Sync {
    /// Draw a target inside `[min, max)`. A degenerate window yields `min`.
    fn pick(&self, min: Duration, max: Duration) -> Duration;
}

/// Uniform draw backed by `fastrand`.
pub struct RandomDwell {
    rng: Mutex<fastrand::Rng>,
}

impl RandomDwell {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(fastrand::Rng::new()),
        }
    }

    /// Reproducible sequence of draws.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(fastrand::Rng::with_seed(seed)),
        }
    }
}

impl Default for RandomDwell {
    fn default() -> Self {
        Self::new()
    }
}

impl Dwell for RandomDwell {
    fn pick(&self, min: Duration, max: Duration) -> Duration {
        let span = u64::try_from(max.saturating_sub(min).as_micros())
            .unwrap_or(u64::MAX);
        if span == 0 {
            return min;
        }
        let offset = self
            .rng
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .u64(0..span);
        min + Duration::from_micros(offset)
    }
}

/// Always the same target, regardless of the window.
#[derive(Clone, Copy, Debug)]
pub struct FixedDwell(pub Duration);

impl Dwell for FixedDwell {
    fn pick(&self, _min: Duration, _max: Duration) -> Duration {
        self.0
    }
}

/// Time left until `target` has passed since `last_update`, never negative.
pub fn compute_jitter_delay(
    last_update: Instant,
    now: Instant,
    target: Duration,
) -> Duration {
    target.saturating_sub(now.saturating_duration_since(last_update))
}

/// Dwell window plus the source drawing targets from it.
#[derive(Clone)]
pub struct Jitter {
    min: Duration,
    max: Duration,
    dwell: Arc<dyn Dwell>,
}

impl Jitter {
    pub fn new(config: &RegistryConfig, dwell: Arc<dyn Dwell>) -> Self {
        Self {
            min: config.min_dwell(),
            max: config.max_dwell(),
            dwell,
        }
    }

    pub fn delay(&self, last_update: Instant, now: Instant) -> Duration {
        let target = self.dwell.pick(self.min, self.max);
        compute_jitter_delay(last_update, now, target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const MIN: Duration = Duration::from_millis(250);
    const MAX: Duration = Duration::from_millis(750);

    #[test]
    fn random_draws_stay_in_window() {
        let dwell = RandomDwell::with_seed(7);
        for _ in 0..10_000 {
            let target = dwell.pick(MIN, MAX);
            assert!(target >= MIN, "{:?} below window", target);
            assert!(target < MAX, "{:?} above window", target);
        }
    }

    #[test]
    fn seeded_draws_repeat() {
        let a = RandomDwell::with_seed(42);
        let b = RandomDwell::with_seed(42);
        for _ in 0..32 {
            assert_eq!(a.pick(MIN, MAX), b.pick(MIN, MAX));
        }
    }

    #[test]
    fn degenerate_window() {
        let dwell = RandomDwell::new();
        assert_eq!(dwell.pick(MIN, MIN), MIN);
        assert_eq!(dwell.pick(MAX, MIN), MAX);
    }

    #[test]
    fn window_wider_than_u64_micros() {
        let dwell = RandomDwell::with_seed(3);
        let max = Duration::from_secs(u64::MAX);
        let mut widest = Duration::ZERO;
        for _ in 0..64 {
            let target = dwell.pick(MIN, max);
            assert!(target >= MIN);
            assert!(target < max);
            widest = widest.max(target);
        }
        // draws spread over the full u64 range instead of a wrapped remainder
        assert!(widest > Duration::from_secs(1 << 40));
    }

    #[rstest]
    #[case(500, 0, 500)]
    #[case(500, 200, 300)]
    #[case(500, 500, 0)]
    #[case(500, 900, 0)]
    #[case(0, 0, 0)]
    fn elapsed_time_is_subtracted(
        #[case] target_ms: u64,
        #[case] elapsed_ms: u64,
        #[case] expected_ms: u64,
    ) {
        let last_update = Instant::now();
        let now = last_update + Duration::from_millis(elapsed_ms);
        assert_eq!(
            compute_jitter_delay(
                last_update,
                now,
                Duration::from_millis(target_ms)
            ),
            Duration::from_millis(expected_ms)
        );
    }

    #[test]
    fn clock_going_backwards_counts_as_no_elapsed_time() {
        let now = Instant::now();
        let last_update = now + Duration::from_millis(100);
        assert_eq!(
            compute_jitter_delay(last_update, now, MIN),
            MIN
        );
    }

    #[test]
    fn immediate_delay_is_bounded() {
        let jitter = Jitter::new(
            &RegistryConfig::default(),
            Arc::new(RandomDwell::new()),
        );
        for _ in 0..1_000 {
            let now = Instant::now();
            let delay = jitter.delay(now, now);
            assert!(delay < MAX);
        }
    }
}
