use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

const SPIN_ROUNDS: usize = 10;
const YIELD_ROUNDS: usize = 20;

/// Waits until `done` is set: a short spin, then yielding, then parking.
///
/// Waiters are only ever released through `SyncWaiter::wake`, which sets the
/// flag before unparking, so spurious unparks simply loop back into `park`.
pub(crate) fn wait_until_done(done: &AtomicBool) {
  let is_done = || done.load(Ordering::Acquire);

  for _ in 0..SPIN_ROUNDS {
    if is_done() {
      return;
    }
    std::hint::spin_loop();
  }

  for _ in 0..YIELD_ROUNDS {
    if is_done() {
      return;
    }
    thread::yield_now();
  }

  while !is_done() {
    thread::park();
  }
}
