use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crossbeam_utils::CachePadded;

/// Lock-free counters shared by the registry and the batch cursor.
#[derive(Debug)]
pub(crate) struct Metrics {
  // --- Registry ---
  pub(crate) keys_assigned: CachePadded<AtomicU64>,
  pub(crate) lookups: CachePadded<AtomicU64>,
  pub(crate) lookup_misses: CachePadded<AtomicU64>,
  pub(crate) resets: CachePadded<AtomicU64>,

  // --- Partitioning ---
  pub(crate) batches_built: CachePadded<AtomicU64>,

  // --- Cursor ---
  pub(crate) batch_refills: CachePadded<AtomicU64>,
  pub(crate) batch_acquires: CachePadded<AtomicU64>,
  pub(crate) fids_translated: CachePadded<AtomicU64>,
  pub(crate) translate_misses: CachePadded<AtomicU64>,

  created_at: Instant,
}

impl Default for Metrics {
  fn default() -> Self {
    Self {
      keys_assigned: CachePadded::new(AtomicU64::new(0)),
      lookups: CachePadded::new(AtomicU64::new(0)),
      lookup_misses: CachePadded::new(AtomicU64::new(0)),
      resets: CachePadded::new(AtomicU64::new(0)),
      batches_built: CachePadded::new(AtomicU64::new(0)),
      batch_refills: CachePadded::new(AtomicU64::new(0)),
      batch_acquires: CachePadded::new(AtomicU64::new(0)),
      fids_translated: CachePadded::new(AtomicU64::new(0)),
      translate_misses: CachePadded::new(AtomicU64::new(0)),
      created_at: Instant::now(),
    }
  }
}

impl Metrics {
  pub(crate) fn new() -> Self {
    Self::default()
  }

  #[inline]
  pub(crate) fn add(counter: &AtomicU64, n: usize) {
    counter.fetch_add(n as u64, Ordering::Relaxed);
  }

  pub(crate) fn snapshot(&self) -> MetricsSnapshot {
    let lookups = self.lookups.load(Ordering::Relaxed);
    let lookup_misses = self.lookup_misses.load(Ordering::Relaxed);

    MetricsSnapshot {
      keys_assigned: self.keys_assigned.load(Ordering::Relaxed),
      lookups,
      lookup_misses,
      lookup_hit_ratio: if lookups == 0 {
        0.0
      } else {
        (lookups - lookup_misses) as f64 / lookups as f64
      },
      resets: self.resets.load(Ordering::Relaxed),
      batches_built: self.batches_built.load(Ordering::Relaxed),
      batch_refills: self.batch_refills.load(Ordering::Relaxed),
      batch_acquires: self.batch_acquires.load(Ordering::Relaxed),
      fids_translated: self.fids_translated.load(Ordering::Relaxed),
      translate_misses: self.translate_misses.load(Ordering::Relaxed),
      uptime_secs: self.created_at.elapsed().as_secs(),
    }
  }
}

/// A point-in-time copy of the cache's counters.
#[derive(Clone)]
pub struct MetricsSnapshot {
  /// Total fids handed out since creation, across resets.
  pub keys_assigned: u64,
  /// Number of single-key registry lookups.
  pub lookups: u64,
  /// Lookups for keys that were never assigned.
  pub lookup_misses: u64,
  /// Fraction of lookups that found their key.
  pub lookup_hit_ratio: f64,
  /// Number of registry resets, including those done by `configure`.
  pub resets: u64,
  /// Batch fid sequences produced by partitioning.
  pub batches_built: u64,
  /// Times the cursor pulled a new batch from the queue.
  pub batch_refills: u64,
  /// Successful `acquire_current_batch` calls.
  pub batch_acquires: u64,
  /// Fids converted to bfids.
  pub fids_translated: u64,
  /// Translation requests for fids outside the active batch.
  pub translate_misses: u64,
  /// Seconds since the cache was built.
  pub uptime_secs: u64,
}

impl fmt::Debug for MetricsSnapshot {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("MetricsSnapshot")
      .field("keys_assigned", &self.keys_assigned)
      .field("lookups", &self.lookups)
      .field("lookup_misses", &self.lookup_misses)
      .field(
        "lookup_hit_ratio",
        &format!("{:.2}%", self.lookup_hit_ratio * 100.0),
      )
      .field("resets", &self.resets)
      .field("batches_built", &self.batches_built)
      .field("batch_refills", &self.batch_refills)
      .field("batch_acquires", &self.batch_acquires)
      .field("fids_translated", &self.fids_translated)
      .field("translate_misses", &self.translate_misses)
      .field("uptime_secs", &self.uptime_secs)
      .finish()
  }
}
