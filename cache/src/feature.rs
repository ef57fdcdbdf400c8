//! Identifier types and the record abstraction consumed by the partitioner.

/// Raw 64-bit feature sign as produced by the data source.
pub type FeatureKey = u64;

/// Dense per-pass feature id, used as an index into embedding storage.
pub type Fid = u32;

/// Position of a fid inside the active batch's fid sequence.
pub type Bfid = u32;

/// Per-fid metadata kept by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FeatureMeta {
  key: FeatureKey,
}

impl FeatureMeta {
  pub(crate) fn new(key: FeatureKey) -> Self {
    Self { key }
  }

  /// The feature key this fid was assigned to.
  #[inline]
  pub fn key(&self) -> FeatureKey {
    self.key
  }
}

/// A training sample whose feature keys have already been mapped to fids.
pub trait Record {
  fn fids(&self) -> &[Fid];
}

/// An owned record holding its fids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FidRecord {
  fids: Vec<Fid>,
}

impl FidRecord {
  pub fn new(fids: Vec<Fid>) -> Self {
    Self { fids }
  }

  pub fn into_inner(self) -> Vec<Fid> {
    self.fids
  }
}

impl From<Vec<Fid>> for FidRecord {
  fn from(fids: Vec<Fid>) -> Self {
    Self::new(fids)
  }
}

impl Record for FidRecord {
  #[inline]
  fn fids(&self) -> &[Fid] {
    &self.fids
  }
}

impl Record for Vec<Fid> {
  #[inline]
  fn fids(&self) -> &[Fid] {
    self
  }
}
