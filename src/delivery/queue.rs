//! Bounded FIFO shared by producers and delivery workers.

use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::time::Instant;

/// Why a push was refused. The item is handed back.
#[derive(PartialEq, Eq)]
pub enum PushError<T> {
    /// The queue is at capacity.
    Full(T),
    /// The queue was closed; nothing more will be accepted.
    Closed(T),
}

impl<T> fmt::Debug for PushError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PushError::Full(_) => f.write_str("Full(..)"),
            PushError::Closed(_) => f.write_str("Closed(..)"),
        }
    }
}

struct State<T> {
    items: VecDeque<T>,
    closed: bool,
}

/// A bounded, strictly FIFO queue.
///
/// The buffer sits behind a mutex that is never held across an await.
/// Producers park on `not_full`, consumers on `not_empty`; every waiter
/// registers interest before re-checking the buffer so no wakeup is missed.
///
/// Closing stops new pushes but lets consumers drain what is left:
/// [`pop`](Self::pop) returns `None` only once the queue is closed and empty.
pub struct DeliveryQueue<T> {
    state: Mutex<State<T>>,
    capacity: usize,
    not_empty: Notify,
    not_full: Notify,
}

impl<T> DeliveryQueue<T> {
    /// Create a queue holding at most `capacity` items (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            state: Mutex::new(State {
                items: VecDeque::with_capacity(capacity.min(1024)),
                closed: false,
            }),
            capacity,
            not_empty: Notify::new(),
            not_full: Notify::new(),
        }
    }

    /// Enqueue without waiting.
    pub fn try_push(&self, item: T) -> Result<(), PushError<T>> {
        {
            let mut state = self.state.lock();
            if state.closed {
                return Err(PushError::Closed(item));
            }
            if state.items.len() >= self.capacity {
                return Err(PushError::Full(item));
            }
            state.items.push_back(item);
        }
        self.not_empty.notify_one();
        Ok(())
    }

    /// Enqueue, waiting up to `timeout` for a free slot.
    ///
    /// Returns `Full` if the deadline passes first and `Closed` if the queue
    /// is closed while waiting.
    pub async fn push_timeout(&self, item: T, timeout: Duration) -> Result<(), PushError<T>> {
        let deadline = Instant::now() + timeout;
        let mut item = item;

        loop {
            let notified = self.not_full.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            match self.try_push(item) {
                Ok(()) => return Ok(()),
                Err(PushError::Full(back)) => item = back,
                Err(closed) => return Err(closed),
            }

            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return self.try_push(item);
            }
        }
    }

    /// Dequeue the oldest item, waiting while the queue is open and empty.
    pub async fn pop(&self) -> Option<T> {
        loop {
            let notified = self.not_empty.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some((item, more)) = self.take_front() {
                self.not_full.notify_one();
                if more {
                    // Pass the baton so idle consumers pick up the rest.
                    self.not_empty.notify_one();
                }
                return Some(item);
            }
            if self.is_closed() {
                return None;
            }

            notified.await;
        }
    }

    fn take_front(&self) -> Option<(T, bool)> {
        let mut state = self.state.lock();
        let item = state.items.pop_front()?;
        Some((item, !state.items.is_empty()))
    }

    /// Refuse further pushes and wake every waiter.
    pub fn close(&self) {
        self.state.lock().closed = true;
        self.not_empty.notify_waiters();
        self.not_full.notify_waiters();
    }

    /// Remove every queued item and return how many there were.
    pub fn clear(&self) -> usize {
        let removed = {
            let mut state = self.state.lock();
            let n = state.items.len();
            state.items.clear();
            n
        };
        self.not_full.notify_waiters();
        removed
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
