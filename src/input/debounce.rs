//! # Debounce Module
//!
//! Stabilises one binary input against contact bounce.
//!
//! The debouncer follows the single-shot timer contract: every raw edge
//! ([`Debouncer::on_raw_edge`]) arms a timer of the debounce window and
//! remembers the level it saw. When the timer expires
//! ([`Debouncer::on_timer_expire`]) the transition is accepted only if the
//! line is still at that level; a bounce is dropped without re-arming, the
//! next raw edge arms the timer again.
//!
//! [`Debouncer::sample`] is the poll-driven form of the same contract: it is
//! fed the line level on every poll and raises the edge / expiry calls
//! itself from timestamps. A line that never settles produces no event,
//! which is "no change yet" rather than an error.

use std::time::Duration;

/// Direction of an accepted transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    /// Stable level went from low to high
    Rising,
    /// Stable level went from high to low
    Falling,
}

/// Debounce state of one input line
#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    stable: bool,
    pending: bool,
    armed_at: Option<Duration>,
    latched: Option<Edge>,
}

impl Debouncer {
    /// Creates a debouncer whose stable level starts at `initial`
    #[must_use]
    pub fn new(window: Duration, initial: bool) -> Self {
        Self {
            window,
            stable: initial,
            pending: initial,
            armed_at: None,
            latched: None,
        }
    }

    /// Debounced level
    #[must_use]
    pub fn is_high(&self) -> bool {
        self.stable
    }

    /// Whether the debounce timer is running
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.armed_at.is_some()
    }

    #[must_use]
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Raw transition observed at `now`; (re-)arms the timer
    pub fn on_raw_edge(&mut self, level: bool, now: Duration) {
        self.pending = level;
        self.armed_at = Some(now);
    }

    /// Timer expiry with the line currently at `level`
    ///
    /// Returns the accepted edge, which is also latched for [`Debouncer::take_edge`].
    pub fn on_timer_expire(&mut self, level: bool) -> Option<Edge> {
        self.armed_at = None;
        if level != self.pending || level == self.stable {
            return None;
        }

        self.stable = level;
        let edge = if level { Edge::Rising } else { Edge::Falling };
        self.latched = Some(edge);
        Some(edge)
    }

    /// Poll-driven update with the line at `level` at time `now`
    pub fn sample(&mut self, level: bool, now: Duration) -> Option<Edge> {
        if level != self.pending {
            self.on_raw_edge(level, now);
            return None;
        }

        match self.armed_at {
            Some(armed_at) if now.saturating_sub(armed_at) >= self.window => self.on_timer_expire(level),
            _ => None,
        }
    }

    /// Consumes the latched edge, if any
    pub fn take_edge(&mut self) -> Option<Edge> {
        self.latched.take()
    }
}
