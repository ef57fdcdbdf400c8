use crate::error::BuildError;

use std::fmt;

/// A fixed-size pool of worker threads used for one-shot parallel jobs.
///
/// Every call to [`WorkerPool::run`] spawns exactly one job per thread and
/// returns once all of them have finished.
pub(crate) struct WorkerPool {
  pool: rayon::ThreadPool,
  threads: usize,
}

impl fmt::Debug for WorkerPool {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("WorkerPool")
      .field("threads", &self.threads)
      .finish()
  }
}

impl WorkerPool {
  pub(crate) fn new(threads: usize) -> Result<Self, BuildError> {
    if threads == 0 {
      return Err(BuildError::ZeroThreads);
    }
    let pool = rayon::ThreadPoolBuilder::new()
      .num_threads(threads)
      .thread_name(|i| format!("fidcache-worker-{i}"))
      .build()
      .map_err(|e| BuildError::ThreadPool(e.to_string()))?;
    Ok(Self { pool, threads })
  }

  #[inline]
  pub(crate) fn threads(&self) -> usize {
    self.threads
  }

  /// Runs `job(worker_index)` once for every worker and waits for all of them.
  ///
  /// A panic in any job is propagated to the caller after the others finish.
  pub(crate) fn run<F>(&self, job: F)
  where
    F: Fn(usize) + Sync,
  {
    let job = &job;
    self.pool.scope(|scope| {
      for worker in 0..self.threads {
        scope.spawn(move |_| job(worker));
      }
    });
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicUsize, Ordering};

  #[test]
  fn run_invokes_every_worker_once() {
    let pool = WorkerPool::new(4).unwrap();
    let calls = AtomicUsize::new(0);
    let mask = AtomicUsize::new(0);
    pool.run(|worker| {
      calls.fetch_add(1, Ordering::SeqCst);
      mask.fetch_or(1 << worker, Ordering::SeqCst);
    });
    assert_eq!(calls.load(Ordering::SeqCst), 4);
    assert_eq!(mask.load(Ordering::SeqCst), 0b1111);
  }

  #[test]
  fn zero_threads_is_rejected() {
    assert_eq!(WorkerPool::new(0).unwrap_err(), BuildError::ZeroThreads);
  }
}
