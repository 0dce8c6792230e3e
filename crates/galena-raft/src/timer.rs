//! Election and heartbeat timers.
//!
//! Both timers are plain deadline arithmetic: the runtime asks for the next
//! deadline, sleeps until it, and feeds the matching timeout event back into
//! the state machine. Nothing here spawns threads or reads the clock; `now`
//! always comes from the caller, so tests control time completely.

use std::time::{Duration, Instant};

use rand::Rng;

use crate::config::TimingConfig;

// ============================================================================
// Election Timer
// ============================================================================

/// Single-shot, resettable election deadline with randomized duration.
///
/// Each [`reset`](ElectionTimer::reset) cancels any pending deadline and
/// draws a fresh duration uniformly from the configured range, so replicas
/// that start a timeout together still fire apart. A reset before expiry
/// supersedes the earlier deadline; there are no stacked firings.
#[derive(Debug, Clone)]
pub struct ElectionTimer {
    deadline: Option<Instant>,
    min: Duration,
    max: Duration,
}

impl ElectionTimer {
    /// Creates an unarmed timer with the configured timeout range.
    pub fn new(timing: &TimingConfig) -> Self {
        Self {
            deadline: None,
            min: timing.election_timeout_min,
            max: timing.election_timeout_max,
        }
    }

    /// Cancels any pending deadline and schedules a new randomized one.
    pub fn reset(&mut self, now: Instant, rng: &mut impl Rng) {
        let min_ms = u64::try_from(self.min.as_millis()).unwrap_or(u64::MAX);
        let max_ms = u64::try_from(self.max.as_millis()).unwrap_or(u64::MAX);
        let timeout = Duration::from_millis(rng.gen_range(min_ms..=max_ms));
        self.deadline = Some(now + timeout);
    }

    /// Clears the pending deadline without rescheduling.
    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    /// Returns the pending deadline, if armed.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns true if the timer is armed and the deadline has passed.
    pub fn is_expired(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|d| now >= d)
    }
}

// ============================================================================
// Heartbeat Timer
// ============================================================================

/// Fixed-interval heartbeat deadline, armed only while leader.
#[derive(Debug, Clone)]
pub struct HeartbeatTimer {
    deadline: Option<Instant>,
    interval: Duration,
}

impl HeartbeatTimer {
    /// Creates an unarmed timer with the configured interval.
    pub fn new(timing: &TimingConfig) -> Self {
        Self {
            deadline: None,
            interval: timing.heartbeat_interval,
        }
    }

    /// Schedules the next heartbeat one interval from `now`.
    pub fn arm(&mut self, now: Instant) {
        self.deadline = Some(now + self.interval);
    }

    /// Clears the pending deadline.
    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    /// Returns the pending deadline, if armed.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns true if the timer is armed and the deadline has passed.
    pub fn is_expired(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|d| now >= d)
    }
}
