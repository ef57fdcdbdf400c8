//! The batch cursor shared by all consumers of one pass.
//!
//! Consumers call [`BatchCursor::acquire_current_batch`] once per step. The
//! same batch is served to `worker_count` calls; the call after that pulls
//! the next batch from the hand-off queue and rebuilds the fid → bfid map.
//! Every operation takes the one cursor lock, so a translation can never
//! observe a half-built map.

use crate::batch::BatchFidSeq;
use crate::error::{FidCacheError, Result};
use crate::feature::{Bfid, Fid};
use crate::metrics::Metrics;

use std::fmt;
use std::mem;
use std::sync::Arc;

use ahash::{HashMap, HashMapExt};
use fidcache_channel::spmc;
use parking_lot::Mutex;

/// Externally visible state of a [`BatchCursor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorPhase {
  /// No batch has been acquired yet.
  Idle,
  /// A batch is being served to consumers.
  Active,
  /// The queue is closed and drained. Terminal.
  Exhausted,
}

struct ActiveBatch {
  batch: Arc<BatchFidSeq>,
  fid2bfid: HashMap<Fid, Bfid>,
  /// Consumers that have acquired `batch` so far.
  refs: usize,
}

enum CursorState {
  Idle,
  Active(ActiveBatch),
  Exhausted,
}

pub struct BatchCursor {
  worker_count: usize,
  source: spmc::Receiver<Arc<BatchFidSeq>>,
  state: Mutex<CursorState>,
  metrics: Arc<Metrics>,
}

impl fmt::Debug for BatchCursor {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("BatchCursor")
      .field("worker_count", &self.worker_count)
      .field("phase", &self.phase())
      .field("pending", &self.source.len())
      .finish()
  }
}

impl BatchCursor {
  pub(crate) fn new(
    worker_count: usize,
    source: spmc::Receiver<Arc<BatchFidSeq>>,
    metrics: Arc<Metrics>,
  ) -> Self {
    debug_assert!(worker_count > 0);
    Self {
      worker_count,
      source,
      state: Mutex::new(CursorState::Idle),
      metrics,
    }
  }

  /// Registers the caller as a consumer of the current batch and returns it.
  ///
  /// Advances to the next batch when nothing is active yet or when all
  /// `worker_count` consumers have already acquired the active one. Returns
  /// `None` once the queue is exhausted; the cursor then stays exhausted.
  ///
  /// The refilling call counts as the first consumer, so each batch is
  /// served exactly `worker_count` times rather than `worker_count + 1` as
  /// with a count reset to zero and compared before incrementing.
  pub fn acquire_current_batch(&self) -> Option<Arc<BatchFidSeq>> {
    let mut state = self.state.lock();

    match &mut *state {
      CursorState::Active(active) if active.refs < self.worker_count => {
        active.refs += 1;
        Metrics::add(&self.metrics.batch_acquires, 1);
        return Some(active.batch.clone());
      }
      CursorState::Exhausted => return None,
      _ => {}
    }

    // Reuse the previous map's allocation for the next batch.
    let mut fid2bfid = match mem::replace(&mut *state, CursorState::Idle) {
      CursorState::Active(previous) => previous.fid2bfid,
      _ => HashMap::new(),
    };

    match self.source.recv() {
      Ok(batch) => {
        fid2bfid.clear();
        fid2bfid.reserve(batch.len());
        for (bfid, &fid) in batch.fids().iter().enumerate() {
          fid2bfid.insert(fid, bfid as Bfid);
        }
        tracing::debug!(batch = batch.index(), fids = batch.len(), "cursor advanced");
        Metrics::add(&self.metrics.batch_refills, 1);
        Metrics::add(&self.metrics.batch_acquires, 1);

        let served = batch.clone();
        *state = CursorState::Active(ActiveBatch {
          batch,
          fid2bfid,
          refs: 1,
        });
        Some(served)
      }
      Err(_) => {
        tracing::info!("batch queue exhausted");
        *state = CursorState::Exhausted;
        None
      }
    }
  }

  /// The active batch.
  ///
  /// # Errors
  ///
  /// [`FidCacheError::NoActiveBatch`] before the first acquisition and after
  /// exhaustion.
  pub fn current_batch(&self) -> Result<Arc<BatchFidSeq>> {
    match &*self.state.lock() {
      CursorState::Active(active) => Ok(active.batch.clone()),
      _ => Err(FidCacheError::NoActiveBatch),
    }
  }

  /// Converts fids of the active batch into their bfids.
  pub fn translate(&self, fids: &[Fid]) -> Result<Vec<Bfid>> {
    let mut out = vec![0; fids.len()];
    self.translate_into(fids, &mut out)?;
    Ok(out)
  }

  /// Like [`BatchCursor::translate`] but writes into a caller-provided buffer
  /// of the same length as `fids`.
  ///
  /// # Errors
  ///
  /// - [`FidCacheError::OutputLengthMismatch`] if `out.len() != fids.len()`.
  /// - [`FidCacheError::NoActiveBatch`] if no batch is active.
  /// - [`FidCacheError::FidNotInBatch`] for the first fid outside the batch;
  ///   `out` is then partially written.
  pub fn translate_into(&self, fids: &[Fid], out: &mut [Bfid]) -> Result<()> {
    if out.len() != fids.len() {
      return Err(FidCacheError::OutputLengthMismatch {
        expected: fids.len(),
        actual: out.len(),
      });
    }

    let state = self.state.lock();
    let active = match &*state {
      CursorState::Active(active) => active,
      _ => return Err(FidCacheError::NoActiveBatch),
    };

    for (slot, &fid) in out.iter_mut().zip(fids) {
      match active.fid2bfid.get(&fid) {
        Some(&bfid) => *slot = bfid,
        None => {
          Metrics::add(&self.metrics.translate_misses, 1);
          return Err(FidCacheError::FidNotInBatch { fid });
        }
      }
    }
    Metrics::add(&self.metrics.fids_translated, fids.len());
    Ok(())
  }

  pub fn phase(&self) -> CursorPhase {
    match &*self.state.lock() {
      CursorState::Idle => CursorPhase::Idle,
      CursorState::Active(_) => CursorPhase::Active,
      CursorState::Exhausted => CursorPhase::Exhausted,
    }
  }

  /// How many consumers have acquired the active batch; `0` when none is active.
  pub fn references(&self) -> usize {
    match &*self.state.lock() {
      CursorState::Active(active) => active.refs,
      _ => 0,
    }
  }

  pub fn worker_count(&self) -> usize {
    self.worker_count
  }

  /// Batches still waiting in the hand-off queue.
  pub fn pending(&self) -> usize {
    self.source.len()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::partition::publish;

  fn cursor(worker_count: usize, batches: Vec<Vec<Fid>>) -> BatchCursor {
    let seqs = batches
      .into_iter()
      .enumerate()
      .map(|(i, fids)| BatchFidSeq::new(i, fids))
      .collect();
    BatchCursor::new(worker_count, publish(seqs).unwrap(), Arc::new(Metrics::new()))
  }

  #[test]
  fn refill_reuses_map_and_drops_old_entries() {
    let cursor = cursor(1, vec![vec![10, 20], vec![30]]);
    cursor.acquire_current_batch().unwrap();
    assert_eq!(cursor.translate(&[20, 10]).unwrap(), vec![1, 0]);

    cursor.acquire_current_batch().unwrap();
    assert_eq!(cursor.translate(&[30]).unwrap(), vec![0]);
    assert_eq!(
      cursor.translate(&[10]),
      Err(FidCacheError::FidNotInBatch { fid: 10 })
    );
  }

  #[test]
  fn exhausted_is_terminal() {
    let cursor = cursor(2, vec![vec![1]]);
    assert!(cursor.acquire_current_batch().is_some());
    assert!(cursor.acquire_current_batch().is_some());
    assert!(cursor.acquire_current_batch().is_none());
    assert_eq!(cursor.phase(), CursorPhase::Exhausted);
    assert!(cursor.acquire_current_batch().is_none());
    assert_eq!(cursor.references(), 0);
  }

  #[test]
  fn translate_into_checks_buffer_length() {
    let cursor = cursor(1, vec![vec![4, 8]]);
    cursor.acquire_current_batch().unwrap();
    let mut out = [0; 1];
    assert_eq!(
      cursor.translate_into(&[4, 8], &mut out),
      Err(FidCacheError::OutputLengthMismatch {
        expected: 2,
        actual: 1
      })
    );
  }
}
