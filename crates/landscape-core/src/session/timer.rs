use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Time source for the perturbation timer.
pub trait Clock {
    fn now(&self) -> Instant;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Manually advanced clock. Clones share the same time, so a caller can keep
/// a handle while the session owns another.
#[derive(Clone, Debug)]
pub struct ManualClock {
    base: Instant,
    offset: Rc<Cell<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset: Rc::new(Cell::new(Duration::ZERO)),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.offset.set(self.offset.get() + by);
    }

    pub fn elapsed(&self) -> Duration {
        self.offset.get()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + self.offset.get()
    }
}

/// Fixed-period schedule. Dropping it is the cancellation.
#[derive(Clone, Debug)]
pub(crate) struct PerturbTimer {
    period: Duration,
    next_due: Instant,
}

/// Outcome of draining a timer against the current time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Fired {
    pub ticks: u32,
    pub truncated: bool,
}

impl PerturbTimer {
    pub(crate) fn start(now: Instant, period: Duration) -> Self {
        Self {
            period,
            next_due: now + period,
        }
    }

    /// Count period boundaries passed since the last fire, up to `cap`.
    /// When the cap is hit the schedule is realigned to `now`.
    pub(crate) fn fire_due(&mut self, now: Instant, cap: u32) -> Fired {
        let mut ticks = 0;
        while self.next_due <= now {
            if ticks == cap {
                self.next_due = now + self.period;
                return Fired {
                    ticks,
                    truncated: true,
                };
            }
            ticks += 1;
            self.next_due += self.period;
        }
        Fired {
            ticks,
            truncated: false,
        }
    }

    pub(crate) fn next_due(&self) -> Instant {
        self.next_due
    }
}
