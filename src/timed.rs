use std::{
    sync::atomic::{AtomicBool, Ordering},
    time::{Duration, Instant},
};

use crate::{Fault, Faultable, Faults, Measurable};

/// A source that advances with wall-clock time over a fixed duration.
///
/// Progress is measured in milliseconds: [`size`](Measurable::size) is the
/// duration and [`current`](Measurable::current) the elapsed time, capped at
/// the duration. The clock starts when the value is created.
#[derive(Debug)]
pub struct TimedProgress {
    start: Instant,
    duration: Duration,
    complete: AtomicBool,
}

impl TimedProgress {
    /// Starts a timer for `duration`.
    #[must_use]
    pub fn new(duration: Duration) -> Self {
        Self {
            start: Instant::now(),
            duration,
            complete: AtomicBool::new(false),
        }
    }

    /// Finishes the timer early.
    pub fn set_completed(&self) {
        self.complete.store(true, Ordering::Release);
    }

    fn is_finished(&self) -> bool {
        if self.complete.load(Ordering::Acquire) {
            return true;
        }
        let finished = self.start.elapsed() >= self.duration;
        if finished {
            self.complete.store(true, Ordering::Release);
        }
        finished
    }

    fn duration_millis(&self) -> i64 {
        i64::try_from(self.duration.as_millis()).unwrap_or(i64::MAX)
    }
}

impl Measurable for TimedProgress {
    fn current(&self) -> i64 {
        let elapsed = self.start.elapsed();
        if self.is_finished() {
            return self.duration_millis();
        }
        i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX)
    }

    fn size(&self) -> i64 {
        self.duration_millis()
    }
}

impl Faultable for TimedProgress {
    /// Reports [`Fault::Completed`] once the timer was finished early or ran
    /// out, so zero-length timers complete as well.
    fn error(&self) -> Option<Faults> {
        self.is_finished().then(|| Faults::from(Fault::Completed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Progressor;

    #[test]
    fn test_fresh_timer_is_running() {
        let timer = TimedProgress::new(Duration::from_secs(60));
        let snapshot = timer.progress();
        assert_eq!(snapshot.size(), 60_000);
        assert!(snapshot.current() < 60_000);
        assert!(!snapshot.is_complete());
    }

    #[test]
    fn test_set_completed() {
        let timer = TimedProgress::new(Duration::from_secs(60));
        timer.set_completed();

        let snapshot = timer.progress();
        assert_eq!(snapshot.current(), 60_000);
        assert!(snapshot.is_complete());
        assert!(snapshot.error().unwrap().is_routine());
    }

    #[test]
    fn test_expired_timer_caps_current() {
        let timer = TimedProgress::new(Duration::from_millis(5));
        std::thread::sleep(Duration::from_millis(20));

        assert_eq!(timer.current(), 5);
        assert!(timer.progress().is_complete());
    }

    #[test]
    fn test_zero_duration_completes() {
        let timer = TimedProgress::new(Duration::ZERO);
        assert_eq!(timer.current(), 0);
        assert!(timer.progress().is_complete());
    }
}
