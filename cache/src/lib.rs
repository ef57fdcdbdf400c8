//! A concurrent feature-id cache manager for sparse training.
//!
//! # Overview
//! - **Key Registry**: assigns dense 32-bit fids to 64-bit feature keys using
//!   a pool of worker threads, and keeps per-fid metadata.
//! - **Batch Partitioner**: splits equal-length record channels into fixed-size
//!   batches and computes each batch's sorted, distinct fid sequence.
//! - **Batch Cursor**: serves the current batch to every consumer of a step
//!   and translates fids into batch-local ids (bfids).
//!
//! ```
//! use fidcache::{FidCache, FidRecord};
//!
//! let mut cache = FidCache::builder()
//!   .thread_count(2)
//!   .batch_size(2)
//!   .worker_count(1)
//!   .build()
//!   .unwrap();
//!
//! cache.assign_ids(&[100, 200, 300]).unwrap();
//! let records: Vec<FidRecord> = [[100, 300], [300, 200], [200, 200]]
//!   .iter()
//!   .map(|keys| cache.to_fid_record(keys).unwrap())
//!   .collect();
//!
//! assert_eq!(cache.build_batches(&[records]).unwrap(), 2);
//! let batch = cache.acquire_current_batch().unwrap().unwrap();
//! assert_eq!(batch.len(), 3);
//! let bfids = cache.translate(batch.fids()).unwrap();
//! assert_eq!(bfids, vec![0, 1, 2]);
//! ```

pub mod batch;
pub mod builder;
pub mod cursor;
pub mod error;
pub mod feature;
pub mod manager;
pub mod metrics;
pub mod registry;

// Internal, crate-only modules
mod partition;
mod pool;
mod store;

pub use batch::BatchFidSeq;
pub use builder::{FidCacheBuilder, FidCacheConfig};
pub use cursor::{BatchCursor, CursorPhase};
pub use error::{BuildError, FidCacheError};
pub use feature::{Bfid, FeatureKey, FeatureMeta, Fid, FidRecord, Record};
pub use manager::FidCache;
pub use metrics::MetricsSnapshot;
pub use registry::{AssignOrder, KeyRegistry};
