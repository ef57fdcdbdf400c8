mod common;
use common::*;

use fidcache_channel::error::{RecvError, SendError, TryRecvError, TrySendError};
use fidcache_channel::spmc;
use serial_test::serial;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

#[test]
fn spmc_sync_smoke() {
  let (tx, rx) = spmc::bounded(2);
  tx.send(10).unwrap();
  assert_eq!(rx.recv().unwrap(), 10);
}

#[test]
fn spmc_sync_try_recv_and_try_send() {
  let (tx, rx) = spmc::bounded::<i32>(1);
  assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));
  tx.try_send(1).unwrap();
  assert!(tx.is_full());
  assert_eq!(tx.try_send(2), Err(TrySendError::Full(2)));
  assert_eq!(rx.try_recv(), Ok(1));
  assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));
}

#[test]
fn spmc_sync_zero_capacity_rounds_up() {
  let (tx, rx) = spmc::bounded::<u8>(0);
  assert_eq!(tx.capacity(), 1);
  tx.try_send(7).unwrap();
  assert_eq!(rx.recv(), Ok(7));
}

#[test]
fn spmc_sync_close_drains_then_disconnects() {
  let (tx, rx) = spmc::bounded(8);
  assert_eq!(tx.send_all(0..5).unwrap(), 5);
  tx.close().unwrap();
  assert_eq!(tx.close(), Err(fidcache_channel::CloseError));
  assert_eq!(tx.send(99), Err(SendError::Closed));

  assert!(!rx.is_closed());
  for i in 0..5 {
    assert_eq!(rx.recv(), Ok(i));
  }
  assert!(rx.is_closed());
  assert_eq!(rx.recv(), Err(RecvError::Disconnected));
  assert_eq!(rx.try_recv(), Err(TryRecvError::Disconnected));
}

#[test]
fn spmc_sync_drop_sender_disconnects() {
  let (tx, rx) = spmc::bounded::<u32>(4);
  tx.send(1).unwrap();
  drop(tx);
  assert_eq!(rx.recv(), Ok(1));
  assert_eq!(rx.recv(), Err(RecvError::Disconnected));
}

#[test]
fn spmc_sync_send_fails_after_all_receivers_dropped() {
  let (tx, rx) = spmc::bounded::<u32>(4);
  let rx2 = rx.clone();
  drop(rx);
  assert!(!tx.is_closed());
  drop(rx2);
  assert!(tx.is_closed());
  assert_eq!(tx.send(1), Err(SendError::Closed));
  assert_eq!(tx.try_send(2), Err(TrySendError::Closed(2)));
  assert_eq!(tx.send_all(vec![3, 4]), Err(SendError::Closed));
}

#[test]
fn spmc_sync_receiver_close_leaves_clones_working() {
  let (tx, rx) = spmc::bounded(4);
  let rx2 = rx.clone();
  rx.close().unwrap();
  tx.send(5).unwrap();
  assert_eq!(rx.recv(), Err(RecvError::Disconnected));
  assert_eq!(rx2.recv(), Ok(5));
}

#[test]
fn spmc_sync_send_all_fills_exact_capacity_without_blocking() {
  let (tx, rx) = spmc::bounded(ITEMS_MEDIUM);
  let sent = tx.send_all(0..ITEMS_MEDIUM).unwrap();
  assert_eq!(sent, ITEMS_MEDIUM);
  assert!(tx.is_full());
  assert_eq!(rx.len(), ITEMS_MEDIUM);
}

#[test]
#[serial]
fn spmc_sync_send_blocks_until_space() {
  let (tx, rx) = spmc::bounded(1);
  tx.send(1).unwrap();

  let sent_second = Arc::new(AtomicBool::new(false));
  let flag = sent_second.clone();
  let producer = thread::spawn(move || {
    tx.send(2).unwrap();
    flag.store(true, Ordering::SeqCst);
  });

  thread::sleep(SHORT_TIMEOUT / 5);
  assert!(!sent_second.load(Ordering::SeqCst), "send should block while full");

  assert_eq!(rx.recv(), Ok(1));
  producer.join().unwrap();
  assert!(sent_second.load(Ordering::SeqCst));
  assert_eq!(rx.recv(), Ok(2));
  assert_eq!(rx.recv(), Err(RecvError::Disconnected));
}

#[test]
#[serial]
fn spmc_sync_send_all_larger_than_capacity() {
  let (tx, rx) = spmc::bounded(4);
  let producer = thread::spawn(move || tx.send_all(0..ITEMS_HIGH).unwrap());

  let mut received = Vec::with_capacity(ITEMS_HIGH);
  while let Ok(item) = rx.recv() {
    received.push(item);
  }
  assert_eq!(producer.join().unwrap(), ITEMS_HIGH);
  assert_eq!(received, (0..ITEMS_HIGH).collect::<Vec<_>>());
}

#[test]
#[serial]
fn spmc_sync_recv_blocks_until_item() {
  let (tx, rx) = spmc::bounded::<u64>(2);
  let consumer = thread::spawn(move || rx.recv());

  thread::sleep(SHORT_TIMEOUT / 5);
  tx.send(42).unwrap();
  assert_eq!(consumer.join().unwrap(), Ok(42));
}

#[test]
#[serial]
fn spmc_sync_blocked_receivers_wake_on_close() {
  let (tx, rx) = spmc::bounded::<u64>(2);
  let handles: Vec<_> = (0..3)
    .map(|_| {
      let rx = rx.clone();
      thread::spawn(move || rx.recv())
    })
    .collect();

  thread::sleep(SHORT_TIMEOUT / 5);
  let start = Instant::now();
  tx.close().unwrap();
  for h in handles {
    assert_eq!(h.join().unwrap(), Err(RecvError::Disconnected));
  }
  assert!(start.elapsed() < LONG_TIMEOUT);
}

#[test]
#[serial]
fn spmc_sync_each_item_delivered_once() {
  let (tx, rx) = spmc::bounded(16);
  let consumers: Vec<_> = (0..4)
    .map(|_| {
      let rx = rx.clone();
      thread::spawn(move || {
        let mut seen = Vec::new();
        while let Ok(item) = rx.recv() {
          seen.push(item);
        }
        seen
      })
    })
    .collect();
  drop(rx);

  tx.send_all(0..ITEMS_HIGH).unwrap();
  tx.close().unwrap();

  let mut all = HashSet::new();
  let mut total = 0;
  for c in consumers {
    let seen = c.join().unwrap();
    total += seen.len();
    all.extend(seen);
  }
  assert_eq!(total, ITEMS_HIGH);
  assert_eq!(all.len(), ITEMS_HIGH);
}
