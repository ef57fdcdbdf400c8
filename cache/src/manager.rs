use crate::batch::BatchFidSeq;
use crate::builder::{FidCacheBuilder, FidCacheConfig};
use crate::cursor::BatchCursor;
use crate::error::{BuildError, FidCacheError, Result};
use crate::feature::{Bfid, FeatureKey, Fid, FidRecord, Record};
use crate::metrics::{Metrics, MetricsSnapshot};
use crate::partition;
use crate::pool::WorkerPool;
use crate::registry::KeyRegistry;

use std::fmt;
use std::sync::Arc;

/// Owns the key registry, worker pool and batch cursor of one training pass.
///
/// Setup methods (`assign_ids`, `build_batches`, `configure`, `reset`) take
/// `&mut self`; everything the per-stream consumers call takes `&self`, so a
/// shared reference can be handed to every worker thread once the batches
/// are built.
pub struct FidCache {
  config: FidCacheConfig,
  pool: WorkerPool,
  registry: KeyRegistry,
  cursor: Option<BatchCursor>,
  metrics: Arc<Metrics>,
}

impl fmt::Debug for FidCache {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("FidCache")
      .field("config", &self.config)
      .field("registry", &self.registry)
      .field("cursor", &self.cursor)
      .field("metrics", &self.metrics.snapshot())
      .finish()
  }
}

impl FidCache {
  pub fn builder() -> FidCacheBuilder {
    FidCacheBuilder::new()
  }

  /// `config` must already be validated.
  pub(crate) fn with_config(config: FidCacheConfig) -> Result<Self, BuildError> {
    let metrics = Arc::new(Metrics::new());
    let pool = WorkerPool::new(config.thread_count)?;
    let registry = KeyRegistry::new(config.key_shards, config.assign_order, metrics.clone());
    tracing::info!(
      thread_count = config.thread_count,
      batch_size = config.batch_size,
      worker_count = config.worker_count,
      "fid cache created"
    );
    Ok(Self {
      config,
      pool,
      registry,
      cursor: None,
      metrics,
    })
  }

  /// Changes the parallelism settings and starts over: the registry is
  /// cleared and any built batches are dropped.
  ///
  /// On error nothing is changed.
  pub fn configure(
    &mut self,
    thread_count: usize,
    batch_size: usize,
    worker_count: usize,
  ) -> Result<(), BuildError> {
    let config = FidCacheConfig {
      thread_count,
      batch_size,
      worker_count,
      ..self.config.clone()
    };
    config.validate()?;
    if thread_count != self.pool.threads() {
      self.pool = WorkerPool::new(thread_count)?;
    }
    self.config = config;
    self.registry.reset();
    self.cursor = None;
    tracing::info!(
      thread_count,
      batch_size,
      worker_count,
      "fid cache configured"
    );
    Ok(())
  }

  /// Clears every key → fid mapping and restarts numbering at zero.
  ///
  /// Must be called between passes unless the caller deliberately extends
  /// the previous pass's registry.
  pub fn reset(&mut self) {
    self.registry.reset();
  }

  pub fn config(&self) -> &FidCacheConfig {
    &self.config
  }

  pub fn registry(&self) -> &KeyRegistry {
    &self.registry
  }

  /// Assigns dense fids to `keys` in parallel. See [`KeyRegistry`] for the
  /// numbering guarantees.
  ///
  /// # Errors
  ///
  /// [`FidCacheError::DuplicateKey`] or [`FidCacheError::FidSpaceExhausted`];
  /// in both cases the registry is left untouched.
  pub fn assign_ids(&mut self, keys: &[FeatureKey]) -> Result<usize> {
    self.registry.assign_ids(&self.pool, keys)
  }

  pub fn lookup(&self, key: FeatureKey) -> Option<Fid> {
    self.registry.lookup(key)
  }

  pub fn to_fid_record(&self, keys: &[FeatureKey]) -> Result<FidRecord> {
    self.registry.to_fid_record(keys)
  }

  /// Computes the batch fid sequences for `channels` without publishing them.
  ///
  /// # Errors
  ///
  /// [`FidCacheError::NoChannels`] and
  /// [`FidCacheError::ChannelLengthMismatch`] are reported before any work
  /// starts.
  pub fn partition<C, R>(&self, channels: &[C]) -> Result<Vec<BatchFidSeq>>
  where
    C: AsRef<[R]> + Sync,
    R: Record + Sync,
  {
    partition::partition(&self.pool, channels, self.config.batch_size)
  }

  /// Partitions `channels`, hands the batches to a fresh cursor and returns
  /// how many batches were built.
  ///
  /// A previous cursor is replaced only on success.
  pub fn build_batches<C, R>(&mut self, channels: &[C]) -> Result<usize>
  where
    C: AsRef<[R]> + Sync,
    R: Record + Sync,
  {
    let batches = self.partition(channels)?;
    let count = batches.len();
    Metrics::add(&self.metrics.batches_built, count);

    let source = partition::publish(batches)?;
    self.cursor = Some(BatchCursor::new(
      self.config.worker_count,
      source,
      self.metrics.clone(),
    ));
    Ok(count)
  }

  /// The cursor over the most recently built batches.
  pub fn cursor(&self) -> Result<&BatchCursor> {
    self.cursor.as_ref().ok_or(FidCacheError::NotPartitioned)
  }

  /// See [`BatchCursor::acquire_current_batch`]. `Ok(None)` marks the end of
  /// the pass.
  pub fn acquire_current_batch(&self) -> Result<Option<Arc<BatchFidSeq>>> {
    Ok(self.cursor()?.acquire_current_batch())
  }

  pub fn current_batch(&self) -> Result<Arc<BatchFidSeq>> {
    self.cursor()?.current_batch()
  }

  pub fn translate(&self, fids: &[Fid]) -> Result<Vec<Bfid>> {
    self.cursor()?.translate(fids)
  }

  pub fn translate_into(&self, fids: &[Fid], out: &mut [Bfid]) -> Result<()> {
    self.cursor()?.translate_into(fids, out)
  }

  pub fn metrics(&self) -> MetricsSnapshot {
    self.metrics.snapshot()
  }
}
