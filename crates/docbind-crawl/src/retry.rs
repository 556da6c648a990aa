//! Bounded retry with injectable sleeping.
//!
//! Two polling shapes occur during a crawl: waiting for an expanded
//! submenu's container to appear (fixed interval, fixed attempt ceiling)
//! and waiting for images to finish loading before a PDF export (growing
//! backoff under a total budget, giving up without error). Both are
//! expressed through [`RetryPolicy::run`], with sleeping behind the
//! [`Sleeper`] trait so tests observe the schedule instead of waiting it
//! out.

use std::time::Duration;

/// Sleeps for a requested duration.
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

/// [`Sleeper`] that blocks the current thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// A bounded polling schedule.
///
/// The budget is accounted in requested sleep time, not wall-clock time,
/// which keeps the schedule deterministic under a scripted sleeper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Delay before the second attempt.
    pub initial: Duration,
    /// Ceiling the delay doubles up to.
    pub max: Duration,
    /// Total sleep budget across all attempts.
    pub budget: Duration,
}

impl RetryPolicy {
    /// Fixed-interval schedule: `attempts` sleeps of `interval` each.
    pub fn fixed(interval: Duration, attempts: u32) -> Self {
        Self {
            initial: interval,
            max: interval,
            budget: interval * attempts,
        }
    }

    /// Doubling backoff from `initial` capped at `max`, within `budget`.
    pub fn backoff(initial: Duration, max: Duration, budget: Duration) -> Self {
        Self {
            initial,
            max,
            budget,
        }
    }

    /// Poll `probe` until it yields a value or the sleep budget runs out.
    ///
    /// The first probe happens immediately. Returns `None` once the
    /// budget is exhausted without success.
    pub fn run<T>(
        &self,
        sleeper: &dyn Sleeper,
        mut probe: impl FnMut() -> Option<T>,
    ) -> Option<T> {
        let mut slept = Duration::ZERO;
        let mut delay = self.initial;
        loop {
            if let Some(value) = probe() {
                return Some(value);
            }
            if slept >= self.budget {
                return None;
            }
            let step = delay.min(self.budget - slept);
            sleeper.sleep(step);
            slept += step;
            delay = (delay * 2).min(self.max);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use pretty_assertions::assert_eq;

    use crate::mock::RecordingSleeper;

    use super::*;

    #[test]
    fn succeeds_without_sleeping_when_first_probe_hits() {
        let sleeper = RecordingSleeper::new();
        let policy = RetryPolicy::fixed(Duration::from_millis(100), 50);
        let found = policy.run(&sleeper, || Some(7));
        assert_eq!(found, Some(7));
        assert_eq!(sleeper.sleeps(), Vec::<Duration>::new());
    }

    #[test]
    fn fixed_schedule_sleeps_the_interval_each_attempt() {
        let sleeper = RecordingSleeper::new();
        let policy = RetryPolicy::fixed(Duration::from_millis(100), 50);
        let calls = Cell::new(0);
        let found = policy.run(&sleeper, || {
            calls.set(calls.get() + 1);
            (calls.get() == 4).then_some(())
        });
        assert_eq!(found, Some(()));
        assert_eq!(sleeper.sleeps(), vec![Duration::from_millis(100); 3]);
    }

    #[test]
    fn fixed_schedule_gives_up_after_the_attempt_ceiling() {
        let sleeper = RecordingSleeper::new();
        let policy = RetryPolicy::fixed(Duration::from_millis(100), 50);
        let found: Option<()> = policy.run(&sleeper, || None);
        assert_eq!(found, None);
        assert_eq!(sleeper.total(), Duration::from_secs(5));
        assert_eq!(sleeper.sleeps().len(), 50);
    }

    #[test]
    fn backoff_doubles_up_to_the_cap() {
        let sleeper = RecordingSleeper::new();
        let policy = RetryPolicy::backoff(
            Duration::from_millis(100),
            Duration::from_secs(2),
            Duration::from_secs(30),
        );
        let calls = Cell::new(0);
        let found = policy.run(&sleeper, || {
            calls.set(calls.get() + 1);
            (calls.get() == 7).then_some(())
        });
        assert_eq!(found, Some(()));
        let millis: Vec<u128> = sleeper.sleeps().iter().map(Duration::as_millis).collect();
        assert_eq!(millis, vec![100, 200, 400, 800, 1600, 2000]);
    }

    #[test]
    fn backoff_budget_bounds_total_sleep() {
        let sleeper = RecordingSleeper::new();
        let policy = RetryPolicy::backoff(
            Duration::from_millis(100),
            Duration::from_secs(2),
            Duration::from_secs(30),
        );
        let found: Option<()> = policy.run(&sleeper, || None);
        assert_eq!(found, None);
        assert_eq!(sleeper.total(), Duration::from_secs(30));
    }
}
