//! Coalescing of annotation-list refreshes.
//!
//! Redraws follow every mutation, but the annotation list shown next to the
//! canvas only needs to catch up occasionally. [`ListRefresh`] collects
//! `ListChanged` events and reports when a refresh is due:
//! 1. **Debounce delay**: wait this long after the last change so a burst of
//!    changes produces one refresh.
//! 2. **Maximum wait**: during a continuous drag changes never stop, so a
//!    refresh is forced once the oldest pending change is this old.

use std::time::Duration;
use web_time::Instant;

use crate::constants::LIST_REFRESH_INTERVAL;

/// Tracks pending list refreshes.
#[derive(Debug)]
pub struct ListRefresh {
    /// Quiet period required after the last change.
    debounce_delay: Duration,

    /// Upper bound on how long a pending refresh may be deferred.
    max_wait: Duration,

    /// First change not yet flushed.
    first_change: Option<Instant>,

    /// Most recent change.
    last_change: Option<Instant>,
}

impl ListRefresh {
    /// Default debounce delay (100 ms).
    pub const DEFAULT_DEBOUNCE_DELAY: Duration = LIST_REFRESH_INTERVAL;

    /// Default maximum wait (500 ms).
    pub const DEFAULT_MAX_WAIT: Duration = Duration::from_millis(500);

    pub fn new() -> Self {
        Self {
            debounce_delay: Self::DEFAULT_DEBOUNCE_DELAY,
            max_wait: Self::DEFAULT_MAX_WAIT,
            first_change: None,
            last_change: None,
        }
    }

    /// Set the debounce delay.
    pub fn with_debounce_delay(mut self, delay: Duration) -> Self {
        self.debounce_delay = delay;
        self
    }

    /// Set the maximum wait. Never shorter than the debounce delay.
    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }

    /// Record a change that needs to reach the list.
    pub fn mark_changed(&mut self) {
        let now = Instant::now();
        self.first_change.get_or_insert(now);
        self.last_change = Some(now);
    }

    /// Whether a refresh is waiting.
    pub fn is_pending(&self) -> bool {
        self.first_change.is_some()
    }

    /// Whether the pending refresh should happen now.
    pub fn is_due(&self) -> bool {
        let (Some(first), Some(last)) = (self.first_change, self.last_change) else {
            return false;
        };
        last.elapsed() >= self.debounce_delay || first.elapsed() >= self.max_wait.max(self.debounce_delay)
    }

    /// Consume a due refresh. Returns true if the caller should refresh the list now.
    pub fn take_due(&mut self) -> bool {
        if !self.is_due() {
            return false;
        }
        self.mark_refreshed();
        log::trace!("List refresh flushed");
        true
    }

    /// Record that the list was refreshed (e.g. eagerly on image switch).
    pub fn mark_refreshed(&mut self) {
        self.first_change = None;
        self.last_change = None;
    }

    /// Time until the pending refresh is due, for hosts that schedule a timer.
    pub fn time_until_due(&self) -> Option<Duration> {
        let (first, last) = (self.first_change?, self.last_change?);
        let by_debounce = self.debounce_delay.saturating_sub(last.elapsed());
        let by_max_wait = self.max_wait.max(self.debounce_delay).saturating_sub(first.elapsed());
        Some(by_debounce.min(by_max_wait))
    }
}

impl Default for ListRefresh {
    fn default() -> Self {
        Self::new()
    }
}
