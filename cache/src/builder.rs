use crate::error::BuildError;
use crate::manager::FidCache;
use crate::registry::AssignOrder;

/// Records per batch when none is configured.
pub const DEFAULT_BATCH_SIZE: usize = 512;

/// Upper bound on the shards of the key map.
pub const MAX_KEY_SHARDS: usize = 1 << 16;

fn default_key_shards() -> usize {
  (num_cpus::get() * 4).max(1).next_power_of_two()
}

/// Parallelism and batching settings for a [`FidCache`].
///
/// With the `serde` feature, missing fields fall back to their defaults, so a
/// config file only needs to name what it changes.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
  feature = "serde",
  derive(serde::Serialize, serde::Deserialize),
  serde(default)
)]
pub struct FidCacheConfig {
  /// Worker threads used for fid assignment and partitioning.
  pub thread_count: usize,
  /// Records per batch window.
  pub batch_size: usize,
  /// Consumers expected to acquire each batch from the cursor.
  pub worker_count: usize,
  /// How assignment workers number their keys.
  pub assign_order: AssignOrder,
  /// Shards of the key → fid map. A power of two, at most [`MAX_KEY_SHARDS`].
  pub key_shards: usize,
}

impl Default for FidCacheConfig {
  fn default() -> Self {
    Self {
      thread_count: num_cpus::get().max(1),
      batch_size: DEFAULT_BATCH_SIZE,
      worker_count: 1,
      assign_order: AssignOrder::default(),
      key_shards: default_key_shards(),
    }
  }
}

impl FidCacheConfig {
  /// Checks the invariants `FidCache` relies on.
  pub fn validate(&self) -> Result<(), BuildError> {
    if self.thread_count == 0 {
      return Err(BuildError::ZeroThreads);
    }
    if self.batch_size == 0 {
      return Err(BuildError::ZeroBatchSize);
    }
    if self.worker_count == 0 {
      return Err(BuildError::ZeroWorkers);
    }
    if self.key_shards > MAX_KEY_SHARDS || !self.key_shards.is_power_of_two() {
      return Err(BuildError::InvalidKeyShards {
        requested: self.key_shards,
        max: MAX_KEY_SHARDS,
      });
    }
    Ok(())
  }
}

/// A builder for [`FidCache`].
#[derive(Debug, Clone, Default)]
pub struct FidCacheBuilder {
  config: FidCacheConfig,
}

impl FidCacheBuilder {
  /// Creates a builder with default settings.
  pub fn new() -> Self {
    Self::default()
  }

  /// Starts from an existing configuration, e.g. one loaded from a file.
  pub fn from_config(config: FidCacheConfig) -> Self {
    let key_shards = config.key_shards;
    Self { config }.key_shards(key_shards)
  }

  /// Sets the number of worker threads used for assignment and partitioning.
  pub fn thread_count(mut self, thread_count: usize) -> Self {
    self.config.thread_count = thread_count;
    self
  }

  /// Sets the number of records per batch.
  pub fn batch_size(mut self, batch_size: usize) -> Self {
    self.config.batch_size = batch_size;
    self
  }

  /// Sets how many consumers acquire each batch before the cursor advances.
  pub fn worker_count(mut self, worker_count: usize) -> Self {
    self.config.worker_count = worker_count;
    self
  }

  /// Selects the fid numbering strategy.
  ///
  /// Defaults to [`AssignOrder::Contended`].
  pub fn assign_order(mut self, order: AssignOrder) -> Self {
    self.config.assign_order = order;
    self
  }

  /// Sets the number of shards of the key map, rounded up to a power of two.
  ///
  /// Values above [`MAX_KEY_SHARDS`] are kept as given and rejected by
  /// [`FidCacheBuilder::build`].
  pub fn key_shards(mut self, shards: usize) -> Self {
    // Power of two so the shard index is a mask.
    self.config.key_shards = match shards.max(1).checked_next_power_of_two() {
      Some(rounded) if rounded <= MAX_KEY_SHARDS => rounded,
      _ => shards,
    };
    self
  }

  pub fn config(&self) -> &FidCacheConfig {
    &self.config
  }

  pub fn build(self) -> Result<FidCache, BuildError> {
    self.config.validate()?;
    FidCache::with_config(self.config)
  }
}
