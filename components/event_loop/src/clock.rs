//! Time sources for the event loop.
//!
//! The loop never reads wall time directly. It asks a [`Clock`] for the
//! current time and asks it to wait when nothing is due yet: a
//! [`ManualClock`] jumps forward, a [`MonotonicClock`] sleeps the thread.

use core_types::Millis;
use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// A monotonic millisecond time source.
pub trait Clock {
    /// Returns the current time in milliseconds.
    fn now(&self) -> Millis;

    /// Blocks (or jumps) until `now() >= deadline`.
    ///
    /// Returns immediately if the deadline has already passed.
    fn wait_until(&self, deadline: Millis);
}

/// Logical time, advanced only by the loop or by explicit calls.
///
/// Clones share the same counter, so a task body holding a clone can
/// simulate execution latency by calling [`advance`](Self::advance).
///
/// # Examples
///
/// ```
/// use event_loop::{Clock, ManualClock};
///
/// let clock = ManualClock::new();
/// let shared = clock.clone();
///
/// shared.advance(5);
/// assert_eq!(clock.now(), 5);
///
/// clock.wait_until(16);
/// assert_eq!(shared.now(), 16);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<Millis>>,
}

impl ManualClock {
    /// Creates a clock at time zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a clock at the given time.
    pub fn starting_at(now: Millis) -> Self {
        Self {
            now: Rc::new(Cell::new(now)),
        }
    }

    /// Moves time forward by `by` milliseconds.
    pub fn advance(&self, by: Millis) {
        self.now.set(self.now.get().saturating_add(by));
    }

    /// Moves time forward to `to`. Earlier times are ignored.
    pub fn set(&self, to: Millis) {
        if to > self.now.get() {
            self.now.set(to);
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Millis {
        self.now.get()
    }

    fn wait_until(&self, deadline: Millis) {
        self.set(deadline);
    }
}

/// Real time, measured from the moment the clock was created.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    /// Creates a clock whose time zero is now.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Millis {
        Millis::try_from(self.origin.elapsed().as_millis()).unwrap_or(Millis::MAX)
    }

    fn wait_until(&self, deadline: Millis) {
        let now = self.now();
        if deadline > now {
            std::thread::sleep(Duration::from_millis(deadline - now));
        }
    }
}
