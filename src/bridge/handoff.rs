use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

/// Returned by [`HandoffQueue::push`] once the consumer has cancelled the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

impl fmt::Display for Cancelled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("handoff queue cancelled by consumer")
    }
}

struct State<T> {
    items: VecDeque<T>,
    closed: bool,
    cancelled: bool,
}

/// A small, blocking, bounded FIFO between one producer thread and one consumer.
///
/// The producer blocks while the queue is full and the consumer blocks while it is empty. Items
/// come out in the order they went in.
pub struct HandoffQueue<T> {
    state: Mutex<State<T>>,
    not_empty: Condvar,
    not_full: Condvar,
    capacity: usize,
    waited_ns: AtomicU64,
}

impl<T> HandoffQueue<T> {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "capacity must be > 0");
        Self {
            state: Mutex::new(State {
                items: VecDeque::with_capacity(capacity),
                closed: false,
                cancelled: false,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            capacity,
            waited_ns: AtomicU64::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Enqueue one item, blocking while the queue is full.
    ///
    /// Returns the time spent waiting (zero if no wait was required).
    pub fn push(&self, item: T) -> Result<Duration, Cancelled> {
        let start = Instant::now();
        let mut waited = false;
        let mut g = self.state.lock().expect("handoff mutex poisoned");
        while g.items.len() >= self.capacity && !g.cancelled {
            waited = true;
            g = self.not_full.wait(g).expect("handoff mutex poisoned");
        }
        if g.cancelled || g.closed {
            return Err(Cancelled);
        }
        g.items.push_back(item);
        self.not_empty.notify_one();
        drop(g);

        if waited {
            let d = start.elapsed();
            let add = d.as_nanos().min(u64::MAX as u128) as u64;
            let _ = self.waited_ns.fetch_add(add, Ordering::SeqCst);
            Ok(d)
        } else {
            Ok(Duration::ZERO)
        }
    }

    /// Dequeue one item, blocking while the queue is empty and still open.
    ///
    /// `None` once the queue is closed and drained, or cancelled.
    pub fn pop(&self) -> Option<T> {
        let mut g = self.state.lock().expect("handoff mutex poisoned");
        loop {
            if g.cancelled {
                return None;
            }
            if let Some(item) = g.items.pop_front() {
                self.not_full.notify_one();
                return Some(item);
            }
            if g.closed {
                return None;
            }
            g = self.not_empty.wait(g).expect("handoff mutex poisoned");
        }
    }

    /// No more items will be pushed. Items already queued can still be popped.
    pub fn close(&self) {
        let mut g = self.state.lock().expect("handoff mutex poisoned");
        g.closed = true;
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }

    /// Drop queued items and make any blocked or future `push` fail.
    pub fn cancel(&self) {
        let mut g = self.state.lock().expect("handoff mutex poisoned");
        g.cancelled = true;
        g.items.clear();
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }

    pub fn len(&self) -> usize {
        self.state.lock().expect("handoff mutex poisoned").items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total time producers spent blocked on a full queue.
    pub fn total_wait(&self) -> Duration {
        Duration::from_nanos(self.waited_ns.load(Ordering::SeqCst))
    }
}

/// Closes the queue when dropped, so the consumer is released however the producer exits.
pub struct ProducerGuard<'a, T>(pub &'a HandoffQueue<T>);

impl<T> Drop for ProducerGuard<'_, T> {
    fn drop(&mut self) {
        self.0.close();
    }
}
