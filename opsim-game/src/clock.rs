//! Monotonic millisecond clocks.
use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

/// Milliseconds on a monotonic timeline.
pub type Millis = u64;

/// Source of monotonic timestamps.
pub trait Clock {
    fn now_ms(&self) -> Millis;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_ms(&self) -> Millis {
        (**self).now_ms()
    }
}

impl<C: Clock + ?Sized> Clock for Rc<C> {
    fn now_ms(&self) -> Millis {
        (**self).now_ms()
    }
}

/// Hand-advanced clock. Clones share the same timeline, so a driver can move
/// time forward while the controller reads it.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<Millis>>,
}

impl ManualClock {
    #[must_use]
    pub fn new(start: Millis) -> Self {
        Self {
            now: Rc::new(Cell::new(start)),
        }
    }

    /// Jump to `at`. Time never moves backwards; earlier values are ignored.
    pub fn set(&self, at: Millis) {
        if at > self.now.get() {
            self.now.set(at);
        }
    }

    pub fn advance(&self, by: Millis) {
        self.now.set(self.now.get().saturating_add(by));
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> Millis {
        self.now.get()
    }
}

/// Wall-clock backed monotonic time, measured from construction.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    /// Instant corresponding to a timestamp on this clock's timeline.
    #[must_use]
    pub fn instant_at(&self, at: Millis) -> Instant {
        self.origin + std::time::Duration::from_millis(at)
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> Millis {
        Millis::try_from(self.origin.elapsed().as_millis()).unwrap_or(Millis::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_is_shared_and_monotonic() {
        let clock = ManualClock::new(100);
        let view = clock.clone();
        clock.advance(50);
        assert_eq!(view.now_ms(), 150);
        clock.set(120);
        assert_eq!(view.now_ms(), 150);
        clock.set(400);
        assert_eq!(view.now_ms(), 400);
    }

    #[test]
    fn system_clock_starts_near_zero() {
        let clock = SystemClock::new();
        assert!(clock.now_ms() < 1_000);
        assert!(clock.instant_at(10) >= clock.instant_at(0));
    }
}
