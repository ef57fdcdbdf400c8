#![allow(dead_code)]

use fidcache::{AssignOrder, FeatureKey, FidCache, FidRecord};

pub fn build_test_cache(threads: usize, batch_size: usize, workers: usize) -> FidCache {
  FidCache::builder()
    .thread_count(threads)
    .batch_size(batch_size)
    .worker_count(workers)
    .key_shards(4)
    .build()
    .unwrap()
}

pub fn build_sliced_cache(threads: usize, batch_size: usize, workers: usize) -> FidCache {
  FidCache::builder()
    .thread_count(threads)
    .batch_size(batch_size)
    .worker_count(workers)
    .assign_order(AssignOrder::Sliced)
    .build()
    .unwrap()
}

/// Translates rows of raw keys into fid records through the cache's registry.
pub fn records(cache: &FidCache, rows: &[&[FeatureKey]]) -> Vec<FidRecord> {
  rows
    .iter()
    .map(|keys| cache.to_fid_record(keys).unwrap())
    .collect()
}
