mod common;
use common::*;

use fidcache::{FeatureKey, Fid, FidCacheError};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;

fn random_unique_keys(n: usize) -> Vec<FeatureKey> {
  let mut rng = rand::rng();
  let mut set = HashSet::with_capacity(n);
  while set.len() < n {
    set.insert(rng.random::<u64>());
  }
  let mut keys: Vec<_> = set.into_iter().collect();
  keys.shuffle(&mut rng);
  keys
}

#[test]
fn assign_is_bijection_onto_dense_range() {
  let mut cache = build_test_cache(4, 8, 1);
  let keys = random_unique_keys(10_000);

  assert_eq!(cache.assign_ids(&keys).unwrap(), keys.len());
  assert_eq!(cache.registry().len(), keys.len());

  let mut fids: Vec<Fid> = keys.iter().map(|k| cache.lookup(*k).unwrap()).collect();
  fids.sort_unstable();
  let expected: Vec<Fid> = (0..keys.len() as Fid).collect();
  assert_eq!(fids, expected);

  for key in &keys {
    let fid = cache.lookup(*key).unwrap();
    assert_eq!(cache.registry().meta(fid).unwrap().key(), *key);
  }
}

#[test]
fn extending_without_reset_offsets_new_fids() {
  let mut cache = build_test_cache(3, 8, 1);
  cache.assign_ids(&[1, 2, 3]).unwrap();
  cache.assign_ids(&[10, 20]).unwrap();

  let mut later: Vec<Fid> = [10, 20].iter().map(|k| cache.lookup(*k).unwrap()).collect();
  later.sort_unstable();
  assert_eq!(later, vec![3, 4]);
  assert_eq!(cache.registry().len(), 5);
}

#[test]
fn duplicate_within_call_is_rejected_without_side_effects() {
  let mut cache = build_test_cache(2, 8, 1);
  let err = cache.assign_ids(&[5, 6, 7, 6]).unwrap_err();
  assert_eq!(err, FidCacheError::DuplicateKey { key: 6 });
  assert!(cache.registry().is_empty());
  assert_eq!(cache.lookup(5), None);
}

#[test]
fn duplicate_against_registry_is_rejected() {
  let mut cache = build_test_cache(2, 8, 1);
  cache.assign_ids(&[5, 6]).unwrap();
  let err = cache.assign_ids(&[7, 5]).unwrap_err();
  assert_eq!(err, FidCacheError::DuplicateKey { key: 5 });
  assert_eq!(cache.registry().len(), 2);
  assert_eq!(cache.lookup(7), None);

  cache.reset();
  assert_eq!(cache.assign_ids(&[7, 5]).unwrap(), 2);
}

#[test]
fn lookup_miss_is_none_not_zero() {
  let mut cache = build_test_cache(2, 8, 1);
  cache.assign_ids(&[99]).unwrap();
  assert_eq!(cache.lookup(99), Some(0));
  assert_eq!(cache.lookup(100), None);

  let metrics = cache.metrics();
  assert_eq!(metrics.lookups, 2);
  assert_eq!(metrics.lookup_misses, 1);
}

#[test]
fn empty_assignment_is_a_no_op() {
  let mut cache = build_test_cache(2, 8, 1);
  assert_eq!(cache.assign_ids(&[]).unwrap(), 0);
  assert!(cache.registry().is_empty());
}

#[test]
fn sliced_order_is_deterministic() {
  let keys = random_unique_keys(1_000);
  let mut a = build_sliced_cache(4, 8, 1);
  let mut b = build_sliced_cache(7, 8, 1);
  a.assign_ids(&keys).unwrap();
  b.assign_ids(&keys).unwrap();

  for (i, key) in keys.iter().enumerate() {
    assert_eq!(a.lookup(*key), Some(i as Fid));
    assert_eq!(b.lookup(*key), Some(i as Fid));
  }
}

#[test]
fn to_fid_record_reports_unknown_key() {
  let mut cache = build_test_cache(2, 8, 1);
  cache.assign_ids(&[1, 2]).unwrap();

  let record = cache.to_fid_record(&[2, 1, 2]).unwrap();
  let f1 = cache.lookup(1).unwrap();
  let f2 = cache.lookup(2).unwrap();
  assert_eq!(record.into_inner(), vec![f2, f1, f2]);

  assert_eq!(
    cache.to_fid_record(&[1, 3]),
    Err(FidCacheError::UnknownKey { key: 3 })
  );
}
