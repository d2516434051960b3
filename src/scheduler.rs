//! Time-ordered queue of cancellable events

use std::cell::Cell;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::rc::Rc;
use std::time::Duration;

/// Cancellation handle returned by [`EventQueue::schedule`].
///
/// Cancelling is idempotent and harmless after the event has fired.
#[derive(Debug, Clone)]
pub struct EventHandle(Rc<Cell<bool>>);

impl EventHandle {
    pub fn cancel(&self) {
        self.0.set(true);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.get()
    }
}

/// Entry in the queue
#[derive(Debug)]
struct Scheduled<E> {
    at: Duration,
    seq: u64,
    cancelled: Rc<Cell<bool>>,
    payload: E,
}

impl<E> PartialEq for Scheduled<E> {
    fn eq(&self, other: &Self) -> bool {
        self.at == other.at && self.seq == other.seq
    }
}

impl<E> Eq for Scheduled<E> {}

impl<E> PartialOrd for Scheduled<E> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<E> Ord for Scheduled<E> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap behavior; equal times pop in insertion order
        other
            .at
            .cmp(&self.at)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Min-heap of events keyed on execution time, FIFO among equal times.
#[derive(Debug)]
pub struct EventQueue<E> {
    heap: BinaryHeap<Scheduled<E>>,
    next_seq: u64,
}

impl<E> Default for EventQueue<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> EventQueue<E> {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            next_seq: 0,
        }
    }

    pub fn schedule(&mut self, at: Duration, payload: E) -> EventHandle {
        let cancelled = Rc::new(Cell::new(false));
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Scheduled {
            at,
            seq,
            cancelled: Rc::clone(&cancelled),
            payload,
        });
        EventHandle(cancelled)
    }

    /// Remove and return the earliest live event due at or before `now`.
    pub fn pop_ready(&mut self, now: Duration) -> Option<(Duration, E)> {
        self.discard_cancelled();
        if self.heap.peek()?.at > now {
            return None;
        }
        self.heap.pop().map(|event| (event.at, event.payload))
    }

    /// Time until the earliest live event, zero if one is already due.
    pub fn next_delta(&mut self, now: Duration) -> Option<Duration> {
        self.discard_cancelled();
        self.heap.peek().map(|event| event.at.saturating_sub(now))
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn clear(&mut self) {
        self.heap.clear();
    }

    fn discard_cancelled(&mut self) {
        while self.heap.peek().is_some_and(|event| event.cancelled.get()) {
            self.heap.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    #[test]
    fn pops_in_time_order_skipping_cancelled() {
        let mut queue = EventQueue::new();
        queue.schedule(secs(5), "a");
        queue.schedule(secs(2), "b");
        let cancelled = queue.schedule(secs(2), "c");
        queue.schedule(secs(8), "d");
        cancelled.cancel();

        let mut now = Duration::ZERO;
        let mut fired = Vec::new();
        while let Some(delta) = queue.next_delta(now) {
            now += delta;
            while let Some((at, payload)) = queue.pop_ready(now) {
                fired.push((at, payload));
            }
        }
        assert_eq!(fired, vec![(secs(2), "b"), (secs(5), "a"), (secs(8), "d")]);
    }

    #[test]
    fn equal_times_resolve_fifo() {
        let mut queue = EventQueue::new();
        for i in 0..5 {
            queue.schedule(secs(3), i);
        }
        let order: Vec<_> = std::iter::from_fn(|| queue.pop_ready(secs(3)).map(|(_, i)| i)).collect();
        assert_eq!(order, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn nothing_pops_before_its_time() {
        let mut queue = EventQueue::new();
        queue.schedule(secs(4), ());
        assert!(queue.pop_ready(secs(3)).is_none());
        assert_eq!(queue.next_delta(secs(3)), Some(secs(1)));
        assert_eq!(queue.next_delta(secs(9)), Some(Duration::ZERO));
        assert!(queue.pop_ready(secs(4)).is_some());
        assert_eq!(queue.next_delta(secs(4)), None);
    }

    #[test]
    fn cancel_is_idempotent_and_safe_after_firing() {
        let mut queue = EventQueue::new();
        let handle = queue.schedule(secs(1), 7);
        assert_eq!(queue.pop_ready(secs(1)), Some((secs(1), 7)));
        handle.cancel();
        handle.cancel();
        assert!(handle.is_cancelled());
        assert!(queue.pop_ready(secs(10)).is_none());
    }
}
