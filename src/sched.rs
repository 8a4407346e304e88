//! The frame scheduler: deferred (payload, due-time) registrations
//! polled once per frame by the host.
//!
//! The scheduler owns no thread and never blocks. The host asks for
//! [`Scheduler::current_wait`] to size its event-loop timeout, then
//! calls [`Scheduler::collect`] each frame to drain whatever has come
//! due. Cancellation is by identity.

use std::{
    cmp::Ordering,
    collections::{BinaryHeap, HashSet},
    time::{Duration, SystemTime},
};

/// Identity of a scheduled entry, for cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(u64);

/// An entry with a pending due-time.
struct Pending<T> {
    time: SystemTime,
    /// Tie-break so equal due-times pop in registration order.
    seq: u64,
    payload: T,
}

impl<T> PartialEq for Pending<T> {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.seq == other.seq
    }
}

impl<T> Eq for Pending<T> {}

/// Reverse order so the entry with the closest due-time is at the top.
impl<T> PartialOrd for Pending<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Reverse order so the entry with the closest due-time is at the top.
impl<T> Ord for Pending<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .time
            .cmp(&self.time)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// A heap of pending entries. `T` is whatever the host defers: a
/// callback box, a node handle to poll, an animation token.
pub struct Scheduler<T> {
    pending: BinaryHeap<Pending<T>>,
    cancelled: HashSet<u64>,
    next_seq: u64,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self {
            pending: BinaryHeap::new(),
            cancelled: HashSet::new(),
            next_seq: 0,
        }
    }
}

impl<T> Scheduler<T> {
    /// An empty scheduler.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn schedule_at(&mut self, now: SystemTime, delay: Duration, payload: T) -> TaskId {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.pending.push(Pending {
            time: now + delay,
            seq,
            payload,
        });
        TaskId(seq)
    }

    /// Register a payload to come due after `delay`.
    pub fn schedule(&mut self, delay: Duration, payload: T) -> TaskId {
        self.schedule_at(SystemTime::now(), delay, payload)
    }

    /// Cancel a pending entry. Returns false if it already fired, was
    /// already cancelled, or never existed.
    pub fn cancel(&mut self, id: TaskId) -> bool {
        if id.0 >= self.next_seq || self.cancelled.contains(&id.0) {
            return false;
        }
        if !self.pending.iter().any(|p| p.seq == id.0) {
            return false;
        }
        self.cancelled.insert(id.0);
        true
    }

    /// True if nothing is pending.
    pub fn is_empty(&mut self) -> bool {
        self.purge_cancelled();
        self.pending.is_empty()
    }

    fn purge_cancelled(&mut self) {
        while let Some(top) = self.pending.peek() {
            if self.cancelled.remove(&top.seq) {
                self.pending.pop();
            } else {
                break;
            }
        }
    }

    pub(crate) fn current_wait_at(&mut self, now: SystemTime) -> Option<Duration> {
        self.purge_cancelled();
        self.pending
            .peek()
            .map(|top| top.time.duration_since(now).unwrap_or(Duration::ZERO))
    }

    /// The shortest wait until something comes due: `None` when nothing
    /// is pending, zero when the top entry is already overdue.
    pub fn current_wait(&mut self) -> Option<Duration> {
        self.current_wait_at(SystemTime::now())
    }

    pub(crate) fn collect_at(&mut self, now: SystemTime) -> Vec<T> {
        let mut due = Vec::new();
        while let Some(top) = self.pending.peek() {
            if self.cancelled.remove(&top.seq) {
                self.pending.pop();
                continue;
            }
            if top.time > now {
                break;
            }
            if let Some(p) = self.pending.pop() {
                due.push(p.payload);
            }
        }
        due
    }

    /// Remove and return every payload that has come due, soonest
    /// first.
    pub fn collect(&mut self) -> Vec<T> {
        self.collect_at(SystemTime::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn due_order_and_wait() {
        let now = SystemTime::now();
        let mut s = Scheduler::new();

        assert_eq!(s.current_wait_at(now), None);
        s.schedule_at(now, Duration::from_secs(10), "slow");
        assert_eq!(s.current_wait_at(now).unwrap(), Duration::from_secs(10));
        s.schedule_at(now, Duration::from_secs(2), "fast");
        assert_eq!(s.current_wait_at(now).unwrap(), Duration::from_secs(2));

        assert_eq!(s.collect_at(now + Duration::from_secs(1)), Vec::<&str>::new());
        assert_eq!(s.collect_at(now + Duration::from_secs(3)), vec!["fast"]);
        assert_eq!(s.collect_at(now + Duration::from_secs(11)), vec!["slow"]);
        assert!(s.is_empty());
    }

    #[test]
    fn equal_due_times_pop_in_registration_order() {
        let now = SystemTime::now();
        let mut s = Scheduler::new();
        s.schedule_at(now, Duration::from_secs(1), 1);
        s.schedule_at(now, Duration::from_secs(1), 2);
        s.schedule_at(now, Duration::from_secs(1), 3);
        assert_eq!(s.collect_at(now + Duration::from_secs(1)), vec![1, 2, 3]);
    }

    #[test]
    fn overdue_wait_clamps_to_zero() {
        let now = SystemTime::now();
        let mut s = Scheduler::new();
        s.schedule_at(now, Duration::from_secs(1), ());
        assert_eq!(
            s.current_wait_at(now + Duration::from_secs(5)).unwrap(),
            Duration::ZERO
        );
    }

    #[test]
    fn cancellation_by_identity() {
        let now = SystemTime::now();
        let mut s = Scheduler::new();
        let a = s.schedule_at(now, Duration::from_secs(1), "a");
        let b = s.schedule_at(now, Duration::from_secs(2), "b");

        assert!(s.cancel(a));
        assert!(!s.cancel(a), "already cancelled");
        assert_eq!(s.current_wait_at(now).unwrap(), Duration::from_secs(2));
        assert_eq!(s.collect_at(now + Duration::from_secs(10)), vec!["b"]);
        assert!(!s.cancel(b), "already fired");
    }
}
