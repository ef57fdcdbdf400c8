//! The key registry: feature key → dense fid, and fid → [`FeatureMeta`].

use crate::error::{FidCacheError, Result};
use crate::feature::{FeatureKey, FeatureMeta, Fid, FidRecord};
use crate::metrics::Metrics;
use crate::pool::WorkerPool;
use crate::store::ShardedKeyMap;

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use ahash::{HashSet, HashSetExt};
use crossbeam_utils::CachePadded;
use once_cell::sync::OnceCell;

/// Number of distinct values a [`Fid`] can take.
const FID_SPACE: u64 = Fid::MAX as u64 + 1;

/// How assignment workers pick the fid for each of their keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(
  feature = "serde",
  derive(serde::Serialize, serde::Deserialize),
  serde(rename_all = "snake_case")
)]
pub enum AssignOrder {
  /// Workers claim fids from one shared atomic counter. Fids are dense but
  /// their order depends on thread scheduling.
  #[default]
  Contended,
  /// Each worker's slice gets a pre-computed fid range, so a key's fid is
  /// its position in the input plus the registry's size before the call.
  Sliced,
}

/// Maps feature keys to dense fids for one pass.
///
/// Entries persist until [`KeyRegistry::reset`]; a later assignment without
/// a reset extends the registry and continues numbering where it left off.
pub struct KeyRegistry {
  store: ShardedKeyMap,
  fid2meta: Vec<OnceCell<FeatureMeta>>,
  next_fid: CachePadded<AtomicUsize>,
  order: AssignOrder,
  metrics: Arc<Metrics>,
}

impl fmt::Debug for KeyRegistry {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("KeyRegistry")
      .field("len", &self.fid2meta.len())
      .field("order", &self.order)
      .field("store", &self.store)
      .finish_non_exhaustive()
  }
}

impl KeyRegistry {
  pub(crate) fn new(num_shards: usize, order: AssignOrder, metrics: Arc<Metrics>) -> Self {
    Self {
      store: ShardedKeyMap::new(num_shards, ahash::RandomState::new()),
      fid2meta: Vec::new(),
      next_fid: CachePadded::new(AtomicUsize::new(0)),
      order,
      metrics,
    }
  }

  /// Assigns a fresh fid to every key in `keys`, using every worker of
  /// `pool` on contiguous slices of the input.
  ///
  /// Returns the number of fids assigned; they are
  /// `len_before..len_before + keys.len()` in some order.
  ///
  /// # Errors
  ///
  /// - [`FidCacheError::DuplicateKey`] if a key repeats in `keys` or is
  ///   already registered.
  /// - [`FidCacheError::FidSpaceExhausted`] if the fids would not fit in 32 bits.
  ///
  /// Both are detected before anything is written.
  pub(crate) fn assign_ids(&mut self, pool: &WorkerPool, keys: &[FeatureKey]) -> Result<usize> {
    let len = keys.len();
    if len == 0 {
      return Ok(0);
    }

    let origin = self.fid2meta.len();
    check_fid_space(origin, len)?;
    self.check_new_keys(keys)?;

    self.store.reserve(len);
    self.fid2meta.resize_with(origin + len, OnceCell::new);
    tracing::debug!(from = origin, to = origin + len, "resized fid2meta");

    let order = self.order;
    let split_len = len.div_ceil(pool.threads());
    let store = &self.store;
    let metas = &self.fid2meta[..];
    let next_fid = &self.next_fid;

    pool.run(|worker| {
      let start = worker * split_len;
      if start >= len {
        return;
      }
      let end = (start + split_len).min(len);

      let mut by_shard: Vec<Vec<(FeatureKey, Fid)>> = vec![Vec::new(); store.num_shards()];
      for (offset, &key) in keys[start..end].iter().enumerate() {
        let fid = match order {
          AssignOrder::Contended => next_fid.fetch_add(1, Ordering::Relaxed),
          AssignOrder::Sliced => origin + start + offset,
        };
        let written = metas[fid].set(FeatureMeta::new(key));
        debug_assert!(written.is_ok(), "fid {fid} claimed twice");
        by_shard[store.shard_index(&key)].push((key, fid as Fid));
      }

      for (shard, entries) in by_shard.into_iter().enumerate() {
        if !entries.is_empty() {
          store.insert_into_shard(shard, entries);
        }
      }
    });

    next_fid.store(origin + len, Ordering::Relaxed);
    Metrics::add(&self.metrics.keys_assigned, len);
    tracing::info!(
      keys = len,
      total = origin + len,
      threads = pool.threads(),
      order = ?order,
      "assigned fids"
    );
    Ok(len)
  }

  fn check_new_keys(&self, keys: &[FeatureKey]) -> Result<()> {
    let mut seen = HashSet::with_capacity(keys.len());
    for &key in keys {
      if !seen.insert(key) || self.store.contains(&key) {
        tracing::warn!(key, "rejecting assignment: duplicate feature key");
        return Err(FidCacheError::DuplicateKey { key });
      }
    }
    Ok(())
  }

  /// Returns the fid assigned to `key`, or `None` if it was never assigned.
  pub fn lookup(&self, key: FeatureKey) -> Option<Fid> {
    Metrics::add(&self.metrics.lookups, 1);
    let fid = self.store.get(&key);
    if fid.is_none() {
      Metrics::add(&self.metrics.lookup_misses, 1);
    }
    fid
  }

  /// Translates the keys of one record into fids.
  ///
  /// # Errors
  ///
  /// [`FidCacheError::UnknownKey`] for the first key that was never assigned.
  pub fn to_fid_record(&self, keys: &[FeatureKey]) -> Result<FidRecord> {
    let fids = keys
      .iter()
      .map(|&key| self.lookup(key).ok_or(FidCacheError::UnknownKey { key }))
      .collect::<Result<Vec<_>>>()?;
    Ok(FidRecord::new(fids))
  }

  /// Metadata recorded for `fid`.
  pub fn meta(&self, fid: Fid) -> Option<&FeatureMeta> {
    self.fid2meta.get(fid as usize).and_then(OnceCell::get)
  }

  /// Number of assigned fids.
  pub fn len(&self) -> usize {
    self.fid2meta.len()
  }

  pub fn is_empty(&self) -> bool {
    self.fid2meta.is_empty()
  }

  pub fn order(&self) -> AssignOrder {
    self.order
  }

  /// Drops every mapping and restarts numbering at zero. Idempotent.
  pub(crate) fn reset(&mut self) {
    self.store.clear();
    self.fid2meta.clear();
    self.next_fid.store(0, Ordering::Relaxed);
    Metrics::add(&self.metrics.resets, 1);
    tracing::debug!("key registry cleared");
  }
}

/// Fails when `requested` more fids after the first `origin` would not fit
/// in a [`Fid`].
fn check_fid_space(origin: usize, requested: usize) -> Result<()> {
  let available = FID_SPACE.saturating_sub(origin as u64);
  if requested as u64 > available {
    return Err(FidCacheError::FidSpaceExhausted {
      requested,
      available: usize::try_from(available).unwrap_or(usize::MAX),
    });
  }
  Ok(())
}
