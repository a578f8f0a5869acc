#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic timer scheduler driven by simulated time.
//!
//! The scheduler never sleeps and never runs code on its own. Owners advance
//! its clock with [`Scheduler::advance`] and then drain the timers that came
//! due with [`Scheduler::pop_due`], dispatching each fired action themselves.
//! Timers fire in `(due time, registration order)` order, so ties resolve to
//! the timer registered first, and a repeating timer keeps its registration
//! rank for every occurrence.
//!
//! Actions are plain data rather than closures. The scheduler has no notion of
//! entities: an owner whose action refers to an entity must check that the
//! entity is still alive before acting and cancel the timer when it is not.

use std::{
    collections::{BTreeMap, HashMap},
    time::Duration,
};

use tracing::trace;

/// Smallest interval accepted for repeating timers.
pub const MIN_REPEAT_INTERVAL: Duration = Duration::from_millis(1);

/// Handle identifying a scheduled timer.
///
/// Handles are never reused, so cancelling a finished timer is always safe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

impl TimerId {
    /// Retrieves the numeric representation of the handle.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

/// A timer occurrence handed back to the owner for dispatch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fired<A> {
    /// Handle of the timer that fired.
    pub id: TimerId,
    /// Action registered with the timer.
    pub action: A,
    /// Simulated time at which this occurrence was due.
    pub due: Duration,
    /// One-based count of occurrences fired so far, including this one.
    pub iteration: u32,
    /// Whether the timer is now exhausted and removed.
    pub finished: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Cadence {
    Once,
    Forever { interval: Duration },
    Times { interval: Duration, remaining: u32 },
}

#[derive(Debug)]
struct Timer<A> {
    action: A,
    cadence: Cadence,
    fired: u32,
}

/// Cooperative scheduler of delayed and repeating actions.
#[derive(Debug)]
pub struct Scheduler<A> {
    now: Duration,
    next_id: u64,
    queue: BTreeMap<(Duration, TimerId), Timer<A>>,
    deadlines: HashMap<TimerId, Duration>,
}

impl<A> Default for Scheduler<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> Scheduler<A> {
    /// Creates an empty scheduler whose clock reads zero.
    #[must_use]
    pub fn new() -> Self {
        Self {
            now: Duration::ZERO,
            next_id: 0,
            queue: BTreeMap::new(),
            deadlines: HashMap::new(),
        }
    }

    /// Current reading of the scheduler clock.
    #[must_use]
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Advances the clock; timers only fire through [`Scheduler::pop_due`].
    pub fn advance(&mut self, dt: Duration) {
        self.now = self.now.saturating_add(dt);
    }

    /// Schedules `action` to fire once after `delay`.
    pub fn after(&mut self, delay: Duration, action: A) -> TimerId {
        self.insert(delay, action, Cadence::Once)
    }

    /// Schedules `action` to fire every `interval` until cancelled.
    pub fn every(&mut self, interval: Duration, action: A) -> TimerId {
        let interval = interval.max(MIN_REPEAT_INTERVAL);
        self.insert(interval, action, Cadence::Forever { interval })
    }

    /// Schedules `action` to fire exactly `repeat_count` times, `interval` apart.
    ///
    /// The first occurrence is due one interval from now. A zero count returns
    /// a handle that never fires.
    pub fn every_n(&mut self, interval: Duration, repeat_count: u32, action: A) -> TimerId {
        if repeat_count == 0 {
            return self.allocate_id();
        }

        let interval = interval.max(MIN_REPEAT_INTERVAL);
        self.insert(
            interval,
            action,
            Cadence::Times {
                interval,
                remaining: repeat_count,
            },
        )
    }

    /// Cancels a timer. Returns whether a pending timer was removed.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let Some(due) = self.deadlines.remove(&id) else {
            return false;
        };
        trace!(timer = id.get(), "timer cancelled");
        self.queue.remove(&(due, id)).is_some()
    }

    /// Reports whether the timer is still pending.
    #[must_use]
    pub fn is_scheduled(&self, id: TimerId) -> bool {
        self.deadlines.contains_key(&id)
    }

    /// Time at which the earliest pending timer is due.
    #[must_use]
    pub fn next_due(&self) -> Option<Duration> {
        self.queue.keys().next().map(|(due, _)| *due)
    }

    /// Number of pending timers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Reports whether no timer is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Cancels every pending timer without touching the clock.
    pub fn clear(&mut self) {
        self.queue.clear();
        self.deadlines.clear();
    }

    fn allocate_id(&mut self) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        id
    }

    fn insert(&mut self, delay: Duration, action: A, cadence: Cadence) -> TimerId {
        let id = self.allocate_id();
        let due = self.now.saturating_add(delay);
        trace!(timer = id.get(), due_ms = due.as_millis() as u64, "timer scheduled");
        let _ = self.deadlines.insert(id, due);
        let _ = self.queue.insert(
            (due, id),
            Timer {
                action,
                cadence,
                fired: 0,
            },
        );
        id
    }
}

impl<A: Clone> Scheduler<A> {
    /// Removes and returns the next occurrence due at or before the clock.
    ///
    /// Repeating timers are re-armed before returning, so an owner may cancel
    /// the timer while handling the occurrence. Call repeatedly until `None`
    /// to fire everything that elapsed, including several occurrences of one
    /// repeating timer after a long advance.
    pub fn pop_due(&mut self) -> Option<Fired<A>> {
        let (due, id) = *self.queue.keys().next()?;
        if due > self.now {
            return None;
        }

        let mut timer = self.queue.remove(&(due, id))?;
        timer.fired = timer.fired.saturating_add(1);
        let iteration = timer.fired;

        let next_due = match timer.cadence {
            Cadence::Once => None,
            Cadence::Forever { interval } => Some(due.saturating_add(interval)),
            Cadence::Times {
                interval,
                remaining,
            } => {
                let remaining = remaining.saturating_sub(1);
                timer.cadence = Cadence::Times {
                    interval,
                    remaining,
                };
                (remaining > 0).then(|| due.saturating_add(interval))
            }
        };

        match next_due {
            Some(next) => {
                let action = timer.action.clone();
                let _ = self.deadlines.insert(id, next);
                let _ = self.queue.insert((next, id), timer);
                Some(Fired {
                    id,
                    action,
                    due,
                    iteration,
                    finished: false,
                })
            }
            None => {
                let _ = self.deadlines.remove(&id);
                Some(Fired {
                    id,
                    action: timer.action,
                    due,
                    iteration,
                    finished: true,
                })
            }
        }
    }
}
