use crate::feature::{FeatureKey, Fid};

use core::fmt;
use std::collections::HashMap;
use std::hash::{BuildHasher, Hash, Hasher};

use crossbeam_utils::CachePadded;
use parking_lot::RwLock;

#[inline]
fn hash_key<H: BuildHasher>(hasher: &H, key: &FeatureKey) -> u64 {
  let mut state = hasher.build_hasher();
  key.hash(&mut state);
  state.finish()
}

type Shard<H> = CachePadded<RwLock<HashMap<FeatureKey, Fid, H>>>;

/// The key → fid map, split into independently locked shards so that
/// assignment workers writing different keys rarely contend.
pub(crate) struct ShardedKeyMap<H = ahash::RandomState> {
  shards: Box<[Shard<H>]>,
  hasher: H,
}

impl<H> fmt::Debug for ShardedKeyMap<H> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ShardedKeyMap")
      .field("num_shards", &self.shards.len())
      .finish()
  }
}

impl<H> ShardedKeyMap<H>
where
  H: BuildHasher + Clone,
{
  /// `num_shards` must be a power of two; the builder guarantees it.
  pub(crate) fn new(num_shards: usize, hasher: H) -> Self {
    debug_assert!(num_shards.is_power_of_two());
    let shards = (0..num_shards)
      .map(|_| CachePadded::new(RwLock::new(HashMap::with_hasher(hasher.clone()))))
      .collect::<Vec<_>>()
      .into_boxed_slice();

    Self { shards, hasher }
  }

  #[inline]
  pub(crate) fn num_shards(&self) -> usize {
    self.shards.len()
  }

  #[inline]
  pub(crate) fn shard_index(&self, key: &FeatureKey) -> usize {
    hash_key(&self.hasher, key) as usize & (self.shards.len() - 1)
  }

  pub(crate) fn get(&self, key: &FeatureKey) -> Option<Fid> {
    self.shards[self.shard_index(key)].read().get(key).copied()
  }

  pub(crate) fn contains(&self, key: &FeatureKey) -> bool {
    self.shards[self.shard_index(key)].read().contains_key(key)
  }

  /// Writes a run of entries that all hash to `shard`, taking its lock once.
  pub(crate) fn insert_into_shard<I>(&self, shard: usize, entries: I)
  where
    I: IntoIterator<Item = (FeatureKey, Fid)>,
  {
    let mut guard = self.shards[shard].write();
    for (key, fid) in entries {
      let previous = guard.insert(key, fid);
      debug_assert!(previous.is_none(), "key {key} assigned twice");
    }
  }

  /// Grows every shard so that `additional` evenly spread keys fit without
  /// rehashing mid-assignment.
  pub(crate) fn reserve(&mut self, additional: usize) {
    let per_shard = additional / self.shards.len() + 1;
    for shard in self.shards.iter_mut() {
      shard.get_mut().reserve(per_shard);
    }
  }

  pub(crate) fn len(&self) -> usize {
    self.shards.iter().map(|shard| shard.read().len()).sum()
  }

  pub(crate) fn clear(&mut self) {
    for shard in self.shards.iter_mut() {
      shard.get_mut().clear();
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn entries_land_in_their_shard() {
    let mut map = ShardedKeyMap::new(8, ahash::RandomState::new());
    let keys: Vec<FeatureKey> = (0..100).map(|k| k * 7919).collect();
    for (fid, key) in keys.iter().enumerate() {
      map.insert_into_shard(map.shard_index(key), [(*key, fid as Fid)]);
    }

    assert_eq!(map.num_shards(), 8);
    assert_eq!(map.len(), keys.len());
    for (fid, key) in keys.iter().enumerate() {
      assert_eq!(map.get(key), Some(fid as Fid));
    }
    assert!(!map.contains(&1));

    map.clear();
    assert_eq!(map.len(), 0);
    assert_eq!(map.get(&keys[0]), None);
  }
}
