//! Splits equal-length record channels into fixed-size batches and computes
//! each batch's distinct, sorted fid set.

use crate::batch::BatchFidSeq;
use crate::error::{FidCacheError, Result};
use crate::feature::{Fid, Record};
use crate::pool::WorkerPool;

use std::sync::Arc;

use fidcache_channel::spmc;
use once_cell::sync::OnceCell;

/// Builds one [`BatchFidSeq`] per `batch_size` window of record indices.
///
/// Worker `i` handles batches `i, i + T, i + 2T, …` for `T` pool threads and
/// stores each result in its own slot, so the output order is the batch
/// order regardless of scheduling.
pub(crate) fn partition<C, R>(
  pool: &WorkerPool,
  channels: &[C],
  batch_size: usize,
) -> Result<Vec<BatchFidSeq>>
where
  C: AsRef<[R]> + Sync,
  R: Record + Sync,
{
  debug_assert!(batch_size > 0);
  let records = check_channels::<C, R>(channels)?;
  let groups = records.div_ceil(batch_size);
  tracing::info!(
    records,
    batch_size,
    groups,
    channels = channels.len(),
    "partitioning records into batches"
  );

  let slots: Vec<OnceCell<BatchFidSeq>> = (0..groups).map(|_| OnceCell::new()).collect();
  let threads = pool.threads();

  pool.run(|worker| {
    for group in (worker..groups).step_by(threads) {
      let first = group * batch_size;
      let last = (first + batch_size).min(records);
      let seq = BatchFidSeq::new(group, collect_fids::<C, R>(channels, first, last));
      let written = slots[group].set(seq);
      debug_assert!(written.is_ok(), "batch {group} produced twice");
    }
  });

  let batches = slots
    .into_iter()
    .enumerate()
    .map(|(index, slot)| {
      slot
        .into_inner()
        .ok_or(FidCacheError::UnfilledBatchSlot { index })
    })
    .collect::<Result<Vec<_>>>()?;

  for batch in &batches {
    tracing::debug!(batch = batch.index(), fids = batch.len(), "batch fid sequence built");
  }
  Ok(batches)
}

/// Returns the common channel length.
fn check_channels<C, R>(channels: &[C]) -> Result<usize>
where
  C: AsRef<[R]>,
{
  let expected = match channels.first() {
    Some(first) => first.as_ref().len(),
    None => return Err(FidCacheError::NoChannels),
  };
  for (channel, recs) in channels.iter().enumerate() {
    let actual = recs.as_ref().len();
    if actual != expected {
      return Err(FidCacheError::ChannelLengthMismatch {
        channel,
        expected,
        actual,
      });
    }
  }
  Ok(expected)
}

/// Union of the fids referenced by records `first..last` of every channel.
fn collect_fids<C, R>(channels: &[C], first: usize, last: usize) -> Vec<Fid>
where
  C: AsRef<[R]>,
  R: Record,
{
  let mut fids = Vec::new();
  for recs in channels {
    for record in &recs.as_ref()[first..last] {
      fids.extend_from_slice(record.fids());
    }
  }
  fids.sort_unstable();
  fids.dedup();
  fids
}

/// Writes every batch into a fresh bounded queue in one bulk send and closes
/// it, so readers see end-of-stream once the batches are drained.
pub(crate) fn publish(batches: Vec<BatchFidSeq>) -> Result<spmc::Receiver<Arc<BatchFidSeq>>> {
  let (tx, rx) = spmc::bounded(batches.len());
  let sent = tx.send_all(batches.into_iter().map(Arc::new))?;
  tx.close().map_err(|_| FidCacheError::QueueClosed)?;
  tracing::debug!(batches = sent, "batch fid sequences handed off");
  Ok(rx)
}
