use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};

use crate::Error;

struct State<T> {
    queue: VecDeque<T>,
    closed: bool,
    waiting_receivers: usize,
    take_count: u64,
}

/// A bounded, closable channel shared between producer and consumer threads.
///
/// A channel created with capacity `0` is a rendezvous: `send` does not
/// return until a receiver has taken the value, and at most one value is
/// ever in flight. A channel created with capacity `n > 0` behaves like a
/// conventional bounded queue.
///
/// Internally a single state `Mutex` is guarded by two condition variables:
/// `state_changed`, signalled on every transition a waiter might care about
/// (space freed, value available, a receiver starting to wait, closure), and
/// `taken`, the acknowledgement variable a rendezvous sender blocks on until
/// its value has actually been removed.
pub struct Channel<T> {
    capacity: usize,
    state: Mutex<State<T>>,
    state_changed: Condvar,
    taken: Condvar,
}

impl<T> Channel<T> {
    /// Creates a channel with the given capacity. `capacity == 0` yields a
    /// rendezvous channel.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            state: Mutex::new(State {
                queue: VecDeque::new(),
                closed: false,
                waiting_receivers: 0,
                take_count: 0,
            }),
            state_changed: Condvar::new(),
            taken: Condvar::new(),
        }
    }

    /// The configured capacity. `0` means rendezvous.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Sends a value, blocking until there is room (or, for a rendezvous
    /// channel, until a receiver has taken it). Returns `Err(ClosedChannel)`
    /// if the channel is or becomes closed before the send completes.
    pub fn send(&self, value: T) -> Result<(), Error> {
        let mut guard = self.state.lock().unwrap();
        if guard.closed {
            return Err(Error::ClosedChannel);
        }

        if self.capacity == 0 {
            while !(guard.queue.is_empty() && guard.waiting_receivers > 0) {
                if guard.closed {
                    return Err(Error::ClosedChannel);
                }
                guard = self.state_changed.wait(guard).unwrap();
            }
            if guard.closed {
                return Err(Error::ClosedChannel);
            }
            guard.queue.push_back(value);
            let target = guard.take_count.wrapping_add(1);
            self.state_changed.notify_all();
            loop {
                if guard.take_count == target {
                    return Ok(());
                }
                if guard.closed {
                    // The value never found a receiver; pull it back out.
                    guard.queue.clear();
                    return Err(Error::ClosedChannel);
                }
                guard = self.taken.wait(guard).unwrap();
            }
        } else {
            while guard.queue.len() >= self.capacity {
                if guard.closed {
                    return Err(Error::ClosedChannel);
                }
                guard = self.state_changed.wait(guard).unwrap();
            }
            if guard.closed {
                return Err(Error::ClosedChannel);
            }
            guard.queue.push_back(value);
            self.state_changed.notify_all();
            Ok(())
        }
    }

    /// Sends without blocking. Returns `Err(WouldBlock)` if the channel has
    /// no room right now (or, for a rendezvous channel, no receiver is
    /// currently waiting), and `Err(ClosedChannel)` if it is closed.
    pub fn try_send(&self, value: T) -> Result<(), Error> {
        let mut guard = self.state.lock().unwrap();
        if guard.closed {
            return Err(Error::ClosedChannel);
        }
        let has_room = if self.capacity == 0 {
            guard.queue.is_empty() && guard.waiting_receivers > 0
        } else {
            guard.queue.len() < self.capacity
        };
        if !has_room {
            return Err(Error::WouldBlock);
        }
        guard.queue.push_back(value);
        self.state_changed.notify_all();
        Ok(())
    }

    /// Blocks until a value is available or the channel is closed and
    /// drained. Returns `(Some(value), true)` on success, or `(None, false)`
    /// once the channel is closed and no value remains.
    pub fn receive(&self) -> (Option<T>, bool) {
        let mut guard = self.state.lock().unwrap();
        guard.waiting_receivers += 1;
        self.state_changed.notify_all();
        let result = loop {
            if let Some(value) = guard.queue.pop_front() {
                guard.take_count = guard.take_count.wrapping_add(1);
                self.taken.notify_all();
                self.state_changed.notify_all();
                break (Some(value), true);
            }
            if guard.closed {
                break (None, false);
            }
            guard = self.state_changed.wait(guard).unwrap();
        };
        guard.waiting_receivers -= 1;
        result
    }

    /// Takes a value without blocking. Returns `Err(WouldBlock)` if none is
    /// available and the channel is still open, or `Err(ClosedChannel)` if
    /// it is closed and drained.
    pub fn try_receive(&self) -> Result<T, Error> {
        let mut guard = self.state.lock().unwrap();
        if let Some(value) = guard.queue.pop_front() {
            guard.take_count = guard.take_count.wrapping_add(1);
            self.taken.notify_all();
            self.state_changed.notify_all();
            return Ok(value);
        }
        if guard.closed {
            return Err(Error::ClosedChannel);
        }
        Err(Error::WouldBlock)
    }

    /// Closes the channel. Blocked senders and receivers are woken; senders
    /// waiting on an unacknowledged rendezvous value fail with
    /// `ClosedChannel`, and receivers drain whatever remains queued before
    /// reporting closure.
    pub fn close(&self) {
        let mut guard = self.state.lock().unwrap();
        if guard.closed {
            return;
        }
        guard.closed = true;
        self.state_changed.notify_all();
        self.taken.notify_all();
    }

    /// Whether `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.state.lock().unwrap().closed
    }
}
