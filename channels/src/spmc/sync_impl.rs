//! Blocking send and receive paths.

use super::backoff;
use super::core::{SpmcShared, SyncWaiter};
use crate::error::{RecvError, SendError, TryRecvError, TrySendError};

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::thread;

fn new_waiter() -> (SyncWaiter, Arc<AtomicBool>) {
  let done = Arc::new(AtomicBool::new(false));
  let waiter = SyncWaiter {
    thread: thread::current(),
    done: done.clone(),
  };
  (waiter, done)
}

/// Parks the calling sender until a receiver frees a slot or the last
/// receiver goes away. Returns immediately if either already happened.
fn park_sender<T: Send>(shared: &SpmcShared<T>) {
  let (waiter, done) = new_waiter();
  {
    let mut guard = shared.internal.lock();

    // Re-check under the lock to avoid a lost wakeup.
    if guard.queue.len() < shared.capacity || guard.receiver_count == 0 {
      return;
    }
    guard.waiting_senders.push_back(waiter);
  }
  backoff::wait_until_done(&done);
}

pub(crate) fn send_sync<T: Send>(shared: &SpmcShared<T>, item: T) -> Result<(), SendError> {
  let mut pending = item;
  loop {
    match shared.try_send_core(pending) {
      Ok(()) => return Ok(()),
      Err(TrySendError::Closed(_)) => return Err(SendError::Closed),
      Err(TrySendError::Full(returned)) => pending = returned,
    }
    park_sender(shared);
  }
}

/// Queues every item, filling whatever room exists per lock acquisition and
/// blocking only while the buffer is full.
pub(crate) fn send_all_sync<T, I>(shared: &SpmcShared<T>, items: I) -> Result<usize, SendError>
where
  T: Send,
  I: IntoIterator<Item = T>,
{
  let mut items = items.into_iter().peekable();
  let mut total = 0;
  loop {
    total += shared.try_send_many_core(&mut items)?;
    if items.peek().is_none() {
      return Ok(total);
    }
    park_sender(shared);
  }
}

pub(crate) fn recv_sync<T: Send>(shared: &SpmcShared<T>) -> Result<T, RecvError> {
  loop {
    match shared.try_recv_core() {
      Ok(item) => return Ok(item),
      Err(TryRecvError::Disconnected) => return Err(RecvError::Disconnected),
      Err(TryRecvError::Empty) => {}
    }

    let (waiter, done) = new_waiter();
    {
      let mut guard = shared.internal.lock();

      if !guard.queue.is_empty() {
        continue;
      }
      if guard.sender_count == 0 {
        return Err(RecvError::Disconnected);
      }
      guard.waiting_receivers.push_back(waiter);
    }

    backoff::wait_until_done(&done);
  }
}
