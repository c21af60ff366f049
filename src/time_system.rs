//! Frame clock and delayed-callback heap.
//!
//! The presentation layer drives time by calling `tick(dt)`; nothing in the
//! crate reads a wall clock. Delayed work is a min-heap of timestamped events
//! popped once the clock passes them.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

// =============================================================================
// GAME CLOCK
// =============================================================================

/// Session time in milliseconds
#[derive(Debug, Clone, Default)]
pub struct GameClock {
    pub now: f64,
}

impl GameClock {
    pub fn new() -> Self {
        Self { now: 0.0 }
    }

    /// Advance by `dt_ms`; negative or non-finite steps are ignored
    pub fn advance(&mut self, dt_ms: f64) -> f64 {
        if dt_ms.is_finite() && dt_ms > 0.0 {
            self.now += dt_ms;
        }
        self.now
    }
}

// =============================================================================
// TIMER QUEUE
// =============================================================================

#[derive(Debug, Clone)]
struct Scheduled<T> {
    at: f64,
    /// Insertion order; equal timestamps fire first-in first-out
    seq: u64,
    event: T,
}

impl<T> PartialEq for Scheduled<T> {
    fn eq(&self, other: &Self) -> bool {
        self.at == other.at && self.seq == other.seq
    }
}

impl<T> Eq for Scheduled<T> {}

impl<T> PartialOrd for Scheduled<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Scheduled<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap behavior (earliest time first)
        other
            .at
            .partial_cmp(&self.at)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Events waiting for their timestamp, earliest first
#[derive(Debug, Clone)]
pub struct TimerQueue<T> {
    pending: BinaryHeap<Scheduled<T>>,
    next_seq: u64,
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self {
            pending: BinaryHeap::new(),
            next_seq: 0,
        }
    }
}

impl<T> TimerQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, at: f64, event: T) {
        let at = if at.is_finite() { at } else { 0.0 };
        self.pending.push(Scheduled {
            at,
            seq: self.next_seq,
            event,
        });
        self.next_seq += 1;
    }

    pub fn peek_next(&self) -> Option<f64> {
        self.pending.peek().map(|s| s.at)
    }

    /// Pop the earliest event due at or before `now`
    pub fn pop_due(&mut self, now: f64) -> Option<(f64, T)> {
        if self.peek_next().is_some_and(|at| at <= now) {
            self.pending.pop().map(|s| (s.at, s.event))
        } else {
            None
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timers_fire_in_time_then_insertion_order() {
        let mut timers = TimerQueue::new();
        timers.schedule(50.0, "late");
        timers.schedule(10.0, "a");
        timers.schedule(10.0, "b");
        assert_eq!(timers.peek_next(), Some(10.0));

        assert!(timers.pop_due(5.0).is_none());
        assert_eq!(timers.pop_due(20.0), Some((10.0, "a")));
        assert_eq!(timers.pop_due(20.0), Some((10.0, "b")));
        assert!(timers.pop_due(20.0).is_none());
        assert_eq!(timers.pop_due(50.0), Some((50.0, "late")));
        assert!(timers.is_empty());
    }

    #[test]
    fn test_clock_ignores_bad_steps() {
        let mut clock = GameClock::new();
        clock.advance(16.0);
        clock.advance(-5.0);
        clock.advance(f64::NAN);
        assert_eq!(clock.now, 16.0);
    }
}
