//! Fire-once deferred deadlines.
//!
//! The core never sleeps. Deferred work (long press, pointer-move throttle,
//! resize debounce) is armed with a deadline and polled from the host's
//! event loop; whichever comes first of firing or [`Timer::cancel`] consumes
//! the payload.

use crate::input::Instant;

/// A cancellable one-shot deadline carrying a payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Timer<T> {
    pending: Option<(Instant, T)>,
}

impl<T> Default for Timer<T> {
    fn default() -> Self {
        Self { pending: None }
    }
}

impl<T> Timer<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm (or re-arm) the timer, replacing any pending payload.
    pub fn arm(&mut self, deadline: Instant, payload: T) -> Option<T> {
        self.pending.replace((deadline, payload)).map(|(_, p)| p)
    }

    /// Replace the payload while keeping the current deadline.
    /// Arms at `deadline` if nothing is pending.
    pub fn coalesce(&mut self, deadline: Instant, payload: T) {
        let at = self.pending.as_ref().map_or(deadline, |(d, _)| *d);
        self.pending = Some((at, payload));
    }

    pub fn cancel(&mut self) -> Option<T> {
        self.pending.take().map(|(_, p)| p)
    }

    pub fn is_armed(&self) -> bool {
        self.pending.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(d, _)| *d)
    }

    pub fn payload(&self) -> Option<&T> {
        self.pending.as_ref().map(|(_, p)| p)
    }

    /// Take the payload if the deadline has passed.
    pub fn fire(&mut self, now: Instant) -> Option<T> {
        match &self.pending {
            Some((deadline, _)) if now >= *deadline => self.cancel(),
            _ => None,
        }
    }
}
