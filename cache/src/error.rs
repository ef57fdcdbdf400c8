use crate::feature::{FeatureKey, Fid};

use fidcache_channel::SendError;
use thiserror::Error;

/// Errors that can occur when building or reconfiguring a [`FidCache`](crate::FidCache).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
  /// At least one worker thread is required for assignment and partitioning.
  #[error("thread count cannot be zero")]
  ZeroThreads,
  /// Batches must contain at least one record.
  #[error("batch size cannot be zero")]
  ZeroBatchSize,
  /// At least one consumer must read from the batch cursor.
  #[error("worker count cannot be zero")]
  ZeroWorkers,
  /// The key map shard count is not a power of two or exceeds
  /// [`MAX_KEY_SHARDS`](crate::builder::MAX_KEY_SHARDS).
  #[error("key shard count {requested} must be a power of two no greater than {max}")]
  InvalidKeyShards { requested: usize, max: usize },
  /// The worker thread pool could not be created.
  #[error("failed to build worker pool: {0}")]
  ThreadPool(String),
}

/// Errors returned by registry, partitioning and cursor operations.
///
/// All of these describe caller misuse. None of them are transient and
/// nothing in this crate retries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FidCacheError {
  /// The key repeats within the input or was already assigned a fid.
  #[error("duplicate feature key {key}")]
  DuplicateKey { key: FeatureKey },

  /// Assigning `requested` more fids would overflow the 32-bit fid space.
  #[error("fid space exhausted: requested {requested}, only {available} left")]
  FidSpaceExhausted { requested: usize, available: usize },

  /// The key was never assigned a fid.
  #[error("unknown feature key {key}")]
  UnknownKey { key: FeatureKey },

  /// Partitioning needs at least one channel.
  #[error("no record channels given")]
  NoChannels,

  /// Every channel must hold the same number of records.
  #[error("channel {channel} holds {actual} records, expected {expected}")]
  ChannelLengthMismatch {
    channel: usize,
    expected: usize,
    actual: usize,
  },

  /// A worker never produced the batch at `index`.
  #[error("batch slot {index} was never filled")]
  UnfilledBatchSlot { index: usize },

  /// Batch cursor operations were used before any batches were built.
  #[error("no batches have been built for this pass")]
  NotPartitioned,

  /// The cursor has no active batch: nothing acquired yet, or exhausted.
  #[error("no active batch")]
  NoActiveBatch,

  /// The fid is not part of the active batch.
  #[error("fid {fid} is not in the active batch")]
  FidNotInBatch { fid: Fid },

  /// The output buffer length differs from the number of fids.
  #[error("output buffer holds {actual} slots, expected {expected}")]
  OutputLengthMismatch { expected: usize, actual: usize },

  /// The batch hand-off queue was closed before all batches were written.
  #[error("batch queue closed")]
  QueueClosed,
}

impl From<SendError> for FidCacheError {
  fn from(_: SendError) -> Self {
    FidCacheError::QueueClosed
  }
}

pub type Result<T, E = FidCacheError> = std::result::Result<T, E>;
