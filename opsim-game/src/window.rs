//! Reaction windows: the span in which a newly required control counts as on time.
use log::debug;
use serde::{Deserialize, Serialize};

use crate::action::ActionType;
use crate::clock::Millis;
use crate::constants::LOG_TARGET_WINDOW;

/// A live window waiting for the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingWindow {
    pub required: ActionType,
    pub opened_at: Millis,
    pub deadline: Millis,
}

/// What an observation did to the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowTransition {
    /// Requirement unchanged, or cleared while a window stays live.
    Unchanged,
    /// A window opened from idle.
    Opened(PendingWindow),
    /// A changed requirement replaced a live window, which is dropped unscored.
    Preempted {
        dropped: PendingWindow,
        opened: PendingWindow,
    },
}

impl WindowTransition {
    /// The newly opened window, if any.
    #[must_use]
    pub const fn opened(&self) -> Option<PendingWindow> {
        match self {
            Self::Unchanged => None,
            Self::Opened(window) | Self::Preempted { opened: window, .. } => Some(*window),
        }
    }
}

/// Idle/Pending state machine with at most one live window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactionWindowTracker {
    window_ms: Millis,
    pending: Option<PendingWindow>,
    last_observed: Option<ActionType>,
}

impl ReactionWindowTracker {
    #[must_use]
    pub const fn new(window_ms: Millis) -> Self {
        Self {
            window_ms,
            pending: None,
            last_observed: None,
        }
    }

    #[must_use]
    pub const fn pending(&self) -> Option<&PendingWindow> {
        self.pending.as_ref()
    }

    #[must_use]
    pub const fn last_observed(&self) -> Option<ActionType> {
        self.last_observed
    }

    /// Feed the latest resolved requirement.
    ///
    /// A changed requirement opens a window and drops any live one. A cleared
    /// requirement is forgotten but leaves a live window running.
    pub fn observe(&mut self, required: Option<ActionType>, now: Millis) -> WindowTransition {
        let Some(action) = required.filter(|action| !action.is_none()) else {
            self.last_observed = None;
            return WindowTransition::Unchanged;
        };
        if self.last_observed == Some(action) {
            return WindowTransition::Unchanged;
        }

        self.last_observed = Some(action);
        let opened = PendingWindow {
            required: action,
            opened_at: now,
            deadline: now.saturating_add(self.window_ms),
        };
        match self.pending.replace(opened) {
            Some(dropped) => {
                debug!(
                    target: LOG_TARGET_WINDOW,
                    "{} preempted by {} at {now}ms",
                    dropped.required,
                    action
                );
                WindowTransition::Preempted { dropped, opened }
            }
            None => {
                debug!(target: LOG_TARGET_WINDOW, "window opened for {action} at {now}ms");
                WindowTransition::Opened(opened)
            }
        }
    }

    /// Close the live window because the operator pressed a control.
    pub fn consume(&mut self) -> Option<PendingWindow> {
        self.pending.take()
    }

    /// Close the live window if its deadline has passed. The requirement is
    /// forgotten so a still-standing fault re-arms on the next observation.
    pub fn expire(&mut self, now: Millis) -> Option<PendingWindow> {
        let window = self.pending.filter(|window| window.deadline <= now)?;
        self.pending = None;
        self.last_observed = None;
        debug!(
            target: LOG_TARGET_WINDOW,
            "window for {} expired at {now}ms",
            window.required
        );
        Some(window)
    }

    /// Drop everything without scoring.
    pub fn reset(&mut self) {
        self.pending = None;
        self.last_observed = None;
    }
}
