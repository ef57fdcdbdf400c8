// src/spmc/mod.rs

//! A bounded single-producer, multi-consumer work queue.
//!
//! Unlike a broadcast channel, every item is delivered to exactly one
//! receiver. The producer typically writes a whole pass worth of items and
//! then closes its handle; receivers keep draining the buffer after the close
//! and only then observe [`RecvError::Disconnected`].
//!
//! ## Behavior
//!
//! - **Blocking Sender**: `send` and `send_all` block while the buffer is at
//!   capacity and fail with [`SendError::Closed`] once every receiver is gone.
//! - **Blocking Receivers**: `recv` blocks until an item is available or the
//!   sender has been closed and the buffer is drained.
//! - **Cloneable Receivers**: receivers can be cloned freely; the sender
//!   cannot, which keeps end-of-stream a single, explicit event.
//!
//! # Examples
//!
//! ```
//! use fidcache_channel::spmc;
//! use fidcache_channel::RecvError;
//!
//! let (tx, rx) = spmc::bounded(4);
//! assert_eq!(tx.send_all(vec![1, 2, 3]).unwrap(), 3);
//! tx.close().unwrap();
//!
//! let other = rx.clone();
//! assert_eq!(rx.recv(), Ok(1));
//! assert_eq!(other.recv(), Ok(2));
//! assert_eq!(rx.recv(), Ok(3));
//! assert_eq!(other.recv(), Err(RecvError::Disconnected));
//! ```

use crate::error::{CloseError, RecvError, SendError, TryRecvError, TrySendError};

mod backoff;
mod core;
mod sync_impl;

use self::core::SpmcShared;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// The producing half of the queue.
#[derive(Debug)]
pub struct Sender<T: Send> {
  shared: Arc<SpmcShared<T>>,
  closed: AtomicBool,
}

/// A consuming half of the queue. Clones share the same buffer.
#[derive(Debug)]
pub struct Receiver<T: Send> {
  shared: Arc<SpmcShared<T>>,
  closed: AtomicBool,
}

/// Creates a bounded queue holding at most `capacity` items.
///
/// A capacity of `0` is rounded up to `1`.
pub fn bounded<T: Send>(capacity: usize) -> (Sender<T>, Receiver<T>) {
  let shared = Arc::new(SpmcShared::new(capacity));
  (
    Sender {
      shared: Arc::clone(&shared),
      closed: AtomicBool::new(false),
    },
    Receiver {
      shared,
      closed: AtomicBool::new(false),
    },
  )
}

impl<T: Send> Clone for Receiver<T> {
  fn clone(&self) -> Self {
    self.shared.internal.lock().receiver_count += 1;
    Receiver {
      shared: Arc::clone(&self.shared),
      closed: AtomicBool::new(false),
    }
  }
}

impl<T: Send> Sender<T> {
  /// Sends a value, blocking while the queue is full.
  pub fn send(&self, item: T) -> Result<(), SendError> {
    if self.closed.load(Ordering::Relaxed) {
      return Err(SendError::Closed);
    }
    sync_impl::send_sync(&self.shared, item)
  }

  /// Attempts to send a value without blocking.
  pub fn try_send(&self, item: T) -> Result<(), TrySendError<T>> {
    if self.closed.load(Ordering::Relaxed) {
      return Err(TrySendError::Closed(item));
    }
    self.shared.try_send_core(item)
  }

  /// Sends every item of `items` in order, blocking while the queue is full.
  ///
  /// Items are pushed in runs under a single lock acquisition, so a queue
  /// sized for the whole sequence is filled in one step. Returns the number
  /// of items sent. On failure, items already queued stay queued.
  pub fn send_all<I>(&self, items: I) -> Result<usize, SendError>
  where
    I: IntoIterator<Item = T>,
  {
    if self.closed.load(Ordering::Relaxed) {
      return Err(SendError::Closed);
    }
    sync_impl::send_all_sync(&self.shared, items)
  }

  /// Closes the producing side. Receivers drain the remaining items and then
  /// observe end-of-stream.
  ///
  /// Returns `Err(CloseError)` if already closed. Dropping the sender closes
  /// it implicitly.
  pub fn close(&self) -> Result<(), CloseError> {
    if self
      .closed
      .compare_exchange(false, true, Ordering::AcqRel, Ordering::Relaxed)
      .is_ok()
    {
      self.shared.close_sender();
      Ok(())
    } else {
      Err(CloseError)
    }
  }

  /// Returns `true` if this sender was closed or every receiver is gone.
  pub fn is_closed(&self) -> bool {
    self.closed.load(Ordering::Acquire) || self.shared.internal.lock().receiver_count == 0
  }

  /// Number of items currently buffered.
  pub fn len(&self) -> usize {
    self.shared.len()
  }

  /// Returns `true` if no items are buffered.
  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Returns `true` if the buffer is at capacity.
  pub fn is_full(&self) -> bool {
    self.len() >= self.shared.capacity
  }

  /// Maximum number of buffered items.
  pub fn capacity(&self) -> usize {
    self.shared.capacity
  }
}

impl<T: Send> Receiver<T> {
  /// Receives the next item, blocking until one is available or the queue
  /// is closed and drained.
  pub fn recv(&self) -> Result<T, RecvError> {
    if self.closed.load(Ordering::Relaxed) {
      return Err(RecvError::Disconnected);
    }
    sync_impl::recv_sync(&self.shared)
  }

  /// Attempts to receive without blocking.
  pub fn try_recv(&self) -> Result<T, TryRecvError> {
    if self.closed.load(Ordering::Relaxed) {
      return Err(TryRecvError::Disconnected);
    }
    self.shared.try_recv_core()
  }

  /// Closes this receiving handle. Other clones are unaffected.
  pub fn close(&self) -> Result<(), CloseError> {
    if self
      .closed
      .compare_exchange(false, true, Ordering::AcqRel, Ordering::Relaxed)
      .is_ok()
    {
      self.shared.close_receiver();
      Ok(())
    } else {
      Err(CloseError)
    }
  }

  /// Returns `true` once the sender is closed and no items remain, or this
  /// handle was closed.
  pub fn is_closed(&self) -> bool {
    if self.closed.load(Ordering::Acquire) {
      return true;
    }
    let guard = self.shared.internal.lock();
    guard.sender_count == 0 && guard.queue.is_empty()
  }

  /// Number of items currently buffered.
  pub fn len(&self) -> usize {
    self.shared.len()
  }

  /// Returns `true` if no items are buffered.
  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Maximum number of buffered items.
  pub fn capacity(&self) -> usize {
    self.shared.capacity
  }
}

impl<T: Send> Drop for Sender<T> {
  fn drop(&mut self) {
    if !self.closed.swap(true, Ordering::AcqRel) {
      self.shared.close_sender();
    }
  }
}

impl<T: Send> Drop for Receiver<T> {
  fn drop(&mut self) {
    if !self.closed.swap(true, Ordering::AcqRel) {
      self.shared.close_receiver();
    }
  }
}
