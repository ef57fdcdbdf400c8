use fidcache::{FeatureKey, FidCache, FidRecord};
use std::thread;
use tracing_subscriber::EnvFilter;

const STREAMS: usize = 3;

fn main() {
  // RUST_LOG=fidcache=debug shows per-batch sizes and cursor refills.
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .init();

  let mut cache = FidCache::builder()
    .thread_count(4)
    .batch_size(4)
    .worker_count(STREAMS)
    .build()
    .expect("Failed to build fid cache");

  // One pass worth of feature signs.
  let keys: Vec<FeatureKey> = (0..64).map(|i| 0x9e37_79b9_7f4a_7c15u64.wrapping_mul(i + 1)).collect();
  cache.assign_ids(&keys).expect("keys are unique");

  // Two channels of 10 records, each record touching a few of the keys.
  let channels: Vec<Vec<FidRecord>> = (0..2)
    .map(|c| {
      (0..10)
        .map(|r| {
          let picked = [keys[(r * 3 + c) % 64], keys[(r * 7 + 1) % 64], keys[(r + c * 5) % 64]];
          cache.to_fid_record(&picked).expect("keys were assigned")
        })
        .collect()
    })
    .collect();

  let batches = cache.build_batches(&channels).expect("channels have equal length");
  println!("Built {batches} batches.");

  // One consumer per compute stream; each acquires every batch once.
  let cache = &cache;
  thread::scope(|scope| {
    for stream in 0..STREAMS {
      scope.spawn(move || {
        while let Some(batch) = cache.acquire_current_batch().expect("batches were built") {
          let bfids = cache.translate(batch.fids()).expect("fids belong to the batch");
          println!(
            "stream {stream}: batch {} with {} fids -> bfids {:?}",
            batch.index(),
            batch.len(),
            bfids
          );
        }
      });
    }
  });

  println!("\nCache metrics: {:#?}", cache.metrics());
}
