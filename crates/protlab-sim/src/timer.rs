//! ---
//! ems_section: "11-simulation"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Simulation runtime helpers and scenario engines."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
//! One-shot timers that run on simulated time.
//!
//! A timer fires at most once, on the first [`TimerQueue::advance`] that
//! reaches its deadline. Cancelling through the returned handle guarantees the
//! action is never delivered.

use serde::Serialize;

/// Tolerance absorbing accumulated rounding from many small `dt` steps.
const DEADLINE_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TimerHandle(u64);

#[derive(Debug)]
struct PendingTimer<A> {
    handle: TimerHandle,
    remaining_secs: f64,
    action: A,
}

#[derive(Debug)]
pub struct TimerQueue<A> {
    pending: Vec<PendingTimer<A>>,
    next_id: u64,
}

impl<A> Default for TimerQueue<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> TimerQueue<A> {
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
            next_id: 0,
        }
    }

    /// Arm a timer that delivers `action` after `delay_secs` of simulated time.
    pub fn schedule(&mut self, delay_secs: f64, action: A) -> TimerHandle {
        self.next_id += 1;
        let handle = TimerHandle(self.next_id);
        let remaining_secs = if delay_secs.is_finite() {
            delay_secs.max(0.0)
        } else {
            0.0
        };
        self.pending.push(PendingTimer {
            handle,
            remaining_secs,
            action,
        });
        handle
    }

    /// Disarm a pending timer. Returns `false` if it already fired or was
    /// cancelled.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        let before = self.pending.len();
        self.pending.retain(|timer| timer.handle != handle);
        self.pending.len() != before
    }

    pub fn cancel_all(&mut self) {
        self.pending.clear();
    }

    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.pending.iter().any(|timer| timer.handle == handle)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Seconds left on `handle`, if still pending.
    pub fn remaining(&self, handle: TimerHandle) -> Option<f64> {
        self.pending
            .iter()
            .find(|timer| timer.handle == handle)
            .map(|timer| timer.remaining_secs)
    }

    /// Move simulated time forward and return due actions in deadline order.
    pub fn advance(&mut self, dt: f64) -> Vec<(TimerHandle, A)> {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        let mut due = Vec::new();
        let mut still_pending = Vec::with_capacity(self.pending.len());
        for mut timer in self.pending.drain(..) {
            timer.remaining_secs -= dt;
            if timer.remaining_secs <= DEADLINE_EPSILON {
                due.push(timer);
            } else {
                still_pending.push(timer);
            }
        }
        self.pending = still_pending;
        due.sort_by(|a, b| a.remaining_secs.total_cmp(&b.remaining_secs));
        due.into_iter()
            .map(|timer| (timer.handle, timer.action))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_exactly_once_after_delay() {
        let mut queue = TimerQueue::new();
        let handle = queue.schedule(0.1, "close");
        let mut fired = Vec::new();
        for _ in 0..20 {
            fired.extend(queue.advance(1.0 / 60.0));
        }
        assert_eq!(fired, vec![(handle, "close")]);
        assert!(queue.is_empty());
    }

    #[test]
    fn does_not_fire_early() {
        let mut queue = TimerQueue::new();
        let handle = queue.schedule(0.1, ());
        assert!(queue.advance(0.05).is_empty());
        assert!(queue.is_pending(handle));
        let remaining = queue.remaining(handle).unwrap();
        assert!((remaining - 0.05).abs() < 1e-12);
    }

    #[test]
    fn six_sixtieths_reach_a_100ms_deadline() {
        let mut queue = TimerQueue::new();
        queue.schedule(0.1, ());
        let mut fired = 0;
        for _ in 0..6 {
            fired += queue.advance(1.0 / 60.0).len();
        }
        assert_eq!(fired, 1);
    }

    #[test]
    fn cancelled_timer_never_fires() {
        let mut queue = TimerQueue::new();
        let handle = queue.schedule(0.1, 1);
        assert!(queue.cancel(handle));
        assert!(!queue.cancel(handle));
        assert!(queue.advance(1.0).is_empty());
    }

    #[test]
    fn due_actions_are_ordered_by_deadline() {
        let mut queue = TimerQueue::new();
        queue.schedule(0.3, "late");
        queue.schedule(0.1, "early");
        let fired: Vec<_> = queue.advance(0.5).into_iter().map(|(_, a)| a).collect();
        assert_eq!(fired, vec!["early", "late"]);
    }

    #[test]
    fn handles_are_unique_per_queue() {
        let mut queue = TimerQueue::new();
        let first = queue.schedule(1.0, ());
        let second = queue.schedule(1.0, ());
        assert_ne!(first, second);
    }

    #[test]
    fn random_frames_fire_every_live_timer_once() {
        use rand::prelude::*;

        let mut rng = StdRng::seed_from_u64(7);
        let mut queue = TimerQueue::new();
        let mut live = Vec::new();
        for index in 0..32 {
            let handle = queue.schedule(rng.gen_range(0.0..2.0), index);
            if rng.gen_bool(0.25) {
                queue.cancel(handle);
            } else {
                live.push(index);
            }
        }

        let mut fired = Vec::new();
        for _ in 0..400 {
            fired.extend(queue.advance(rng.gen_range(0.001..0.05)).into_iter().map(|(_, a)| a));
        }
        fired.sort_unstable();
        assert_eq!(fired, live);
        assert!(queue.is_empty());
    }
}
