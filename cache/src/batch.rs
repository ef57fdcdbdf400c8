use crate::feature::{Bfid, Fid};

/// The distinct fids referenced by one batch window, sorted ascending.
///
/// A fid's position in the sequence is its bfid while the batch is active.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchFidSeq {
  index: usize,
  fids: Box<[Fid]>,
}

impl BatchFidSeq {
  /// `fids` must already be sorted and deduplicated.
  pub(crate) fn new(index: usize, fids: Vec<Fid>) -> Self {
    debug_assert!(fids.windows(2).all(|w| w[0] < w[1]));
    Self {
      index,
      fids: fids.into_boxed_slice(),
    }
  }

  /// Zero-based batch number within the pass.
  #[inline]
  pub fn index(&self) -> usize {
    self.index
  }

  #[inline]
  pub fn fids(&self) -> &[Fid] {
    &self.fids
  }

  #[inline]
  pub fn len(&self) -> usize {
    self.fids.len()
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.fids.is_empty()
  }

  pub fn contains(&self, fid: Fid) -> bool {
    self.fids.binary_search(&fid).is_ok()
  }

  /// The bfid `fid` would have while this batch is active.
  pub fn position(&self, fid: Fid) -> Option<Bfid> {
    self.fids.binary_search(&fid).ok().map(|i| i as Bfid)
  }

  pub fn iter(&self) -> impl Iterator<Item = Fid> + '_ {
    self.fids.iter().copied()
  }
}

impl<'a> IntoIterator for &'a BatchFidSeq {
  type Item = &'a Fid;
  type IntoIter = std::slice::Iter<'a, Fid>;

  fn into_iter(self) -> Self::IntoIter {
    self.fids.iter()
  }
}
