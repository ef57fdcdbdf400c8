// src/spmc/core.rs

//! Shared state for the bounded work queue.
//!
//! A single `parking_lot::Mutex` guards the buffer, both waiter queues and the
//! handle counts. Parked threads are woken by flipping their `done` flag and
//! unparking them; they then retry the operation from the top.

use crate::error::{SendError, TryRecvError, TrySendError};

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::iter::Peekable;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::Thread;

/// A parked thread waiting for space (senders) or an item (receivers).
#[derive(Debug)]
pub(crate) struct SyncWaiter {
  /// The handle to the parked thread, used for `unpark()`.
  pub(crate) thread: Thread,
  /// Set before unparking so the adaptive wait can stop re-parking.
  pub(crate) done: Arc<AtomicBool>,
}

impl SyncWaiter {
  #[inline]
  pub(crate) fn wake(self) {
    self.done.store(true, Ordering::Release);
    self.thread.unpark();
  }
}

#[derive(Debug)]
pub(crate) struct SpmcChannelInternal<T> {
  pub(crate) queue: VecDeque<T>,
  pub(crate) waiting_senders: VecDeque<SyncWaiter>,
  pub(crate) waiting_receivers: VecDeque<SyncWaiter>,
  /// Either 1 (open) or 0 (closed); the channel has a single producer.
  pub(crate) sender_count: usize,
  pub(crate) receiver_count: usize,
}

#[derive(Debug)]
pub(crate) struct SpmcShared<T> {
  pub(crate) internal: Mutex<SpmcChannelInternal<T>>,
  pub(crate) capacity: usize,
}

impl<T: Send> SpmcShared<T> {
  pub(crate) fn new(capacity: usize) -> Self {
    let capacity = capacity.max(1);
    SpmcShared {
      internal: Mutex::new(SpmcChannelInternal {
        queue: VecDeque::with_capacity(capacity.min(1024)),
        waiting_senders: VecDeque::new(),
        waiting_receivers: VecDeque::new(),
        sender_count: 1,
        receiver_count: 1,
      }),
      capacity,
    }
  }

  /// Pushes one item if there is room, waking one parked receiver.
  pub(crate) fn try_send_core(&self, item: T) -> Result<(), TrySendError<T>> {
    let mut guard = self.internal.lock();

    if guard.receiver_count == 0 {
      return Err(TrySendError::Closed(item));
    }
    if guard.queue.len() >= self.capacity {
      return Err(TrySendError::Full(item));
    }

    guard.queue.push_back(item);
    if let Some(waiter) = guard.waiting_receivers.pop_front() {
      waiter.wake();
    }
    Ok(())
  }

  /// Pushes as many items from `items` as currently fit under a single lock
  /// acquisition. Returns how many were queued.
  pub(crate) fn try_send_many_core<I>(&self, items: &mut Peekable<I>) -> Result<usize, SendError>
  where
    I: Iterator<Item = T>,
  {
    let mut guard = self.internal.lock();

    if guard.receiver_count == 0 {
      return Err(SendError::Closed);
    }

    let mut pushed = 0;
    while guard.queue.len() < self.capacity {
      match items.next() {
        Some(item) => {
          guard.queue.push_back(item);
          pushed += 1;
        }
        None => break,
      }
    }

    for _ in 0..pushed {
      match guard.waiting_receivers.pop_front() {
        Some(waiter) => waiter.wake(),
        None => break,
      }
    }
    Ok(pushed)
  }

  /// Takes the oldest item, waking one parked sender since space was freed.
  pub(crate) fn try_recv_core(&self) -> Result<T, TryRecvError> {
    let mut guard = self.internal.lock();

    if let Some(item) = guard.queue.pop_front() {
      if let Some(waiter) = guard.waiting_senders.pop_front() {
        waiter.wake();
      }
      return Ok(item);
    }

    // Only report disconnection once the buffer is fully drained.
    if guard.sender_count == 0 {
      return Err(TryRecvError::Disconnected);
    }
    Err(TryRecvError::Empty)
  }

  /// Marks the producer as gone and wakes every parked receiver so they can
  /// drain what is left and then observe end-of-stream.
  pub(crate) fn close_sender(&self) {
    let mut guard = self.internal.lock();
    guard.sender_count = 0;
    for waiter in guard.waiting_receivers.drain(..) {
      waiter.wake();
    }
  }

  /// Drops one receiver. The last one wakes any blocked sender so it can
  /// observe the closure.
  pub(crate) fn close_receiver(&self) {
    let mut guard = self.internal.lock();
    guard.receiver_count = guard.receiver_count.saturating_sub(1);
    if guard.receiver_count == 0 {
      for waiter in guard.waiting_senders.drain(..) {
        waiter.wake();
      }
    }
  }

  pub(crate) fn len(&self) -> usize {
    self.internal.lock().queue.len()
  }
}
