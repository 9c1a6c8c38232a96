//! Cancellable timer handles polled by the session controller.
use crate::clock::Millis;

/// A single deadline that is either armed or idle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OneShotTimer {
    deadline: Option<Millis>,
}

impl OneShotTimer {
    /// Arm the timer, replacing any earlier deadline.
    pub fn arm(&mut self, deadline: Millis) {
        self.deadline = Some(deadline);
    }

    /// Disarm the timer. Returns the deadline that was cancelled, if any.
    pub fn cancel(&mut self) -> Option<Millis> {
        self.deadline.take()
    }

    #[must_use]
    pub const fn deadline(&self) -> Option<Millis> {
        self.deadline
    }

    #[must_use]
    pub fn is_due(&self, now: Millis) -> bool {
        self.deadline.is_some_and(|at| at <= now)
    }

    /// Consume the deadline if it has passed.
    pub fn fire(&mut self, now: Millis) -> Option<Millis> {
        if self.is_due(now) { self.deadline.take() } else { None }
    }
}

/// Fixed-period repeating timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalTimer {
    period: Millis,
    next: Option<Millis>,
}

impl IntervalTimer {
    #[must_use]
    pub const fn new(period: Millis) -> Self {
        Self { period, next: None }
    }

    /// First firing lands one period after `now`.
    pub fn start(&mut self, now: Millis) {
        self.next = Some(now.saturating_add(self.period));
    }

    pub fn cancel(&mut self) {
        self.next = None;
    }

    #[must_use]
    pub const fn deadline(&self) -> Option<Millis> {
        self.next
    }

    /// Consume one due firing and schedule the next. Returns the scheduled time
    /// of the firing.
    pub fn fire(&mut self, now: Millis) -> Option<Millis> {
        let at = self.next.filter(|at| *at <= now)?;
        self.next = Some(at.saturating_add(self.period));
        Some(at)
    }
}
