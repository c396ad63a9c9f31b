/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use hdr_metrics::{HdrHistogram, Histogram, HistogramConfig};

const THREADS: i64 = 8;
const PER_THREAD: i64 = 10_000;

fn spawn_writers(h: &Arc<HdrHistogram>) -> Vec<thread::JoinHandle<()>> {
    (0..THREADS)
        .map(|t| {
            let h = Arc::clone(h);
            thread::spawn(move || {
                for i in 0..PER_THREAD {
                    h.update((t * PER_THREAD + i) % 2000 - 1000);
                }
            })
        })
        .collect()
}

#[test]
fn concurrent_update() {
    let mut config = HistogramConfig::new(-1000, 1000, 3);
    config.set_shards(4);
    let h = Arc::new(HdrHistogram::with_config(&config).unwrap());

    for w in spawn_writers(&h) {
        w.join().unwrap();
    }

    assert_eq!(h.count(), (THREADS * PER_THREAD) as u64);
    assert_eq!(h.dropped(), 0);
    assert_eq!(h.min(), -1000);
    assert_eq!(h.max(), 999);
    // each value in [-1000, 999] recorded 40 times
    assert_eq!(h.sum(), -1000 * 40);
    assert_eq!(h.mean(), -0.5);
}

#[test]
fn snapshot_while_updating() {
    let h = Arc::new(HdrHistogram::new(-1000, 1000, 3).unwrap());
    let done = Arc::new(AtomicBool::new(false));

    let reader = {
        let h = Arc::clone(&h);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            let mut last = 0;
            while !done.load(Ordering::Acquire) {
                let s = h.snapshot();
                let count = s.count();
                assert!(count >= last);
                last = count;
                if count > 0 {
                    assert!(s.min() >= -1000);
                    assert!(s.max() <= 1000);
                    let mean = s.mean();
                    assert!(s.min() as f64 <= mean && mean <= s.max() as f64);
                    let p50 = s.percentile(0.5);
                    assert!(s.min() as f64 <= p50 && p50 <= s.max() as f64);
                }
                // frozen values never move
                assert_eq!(s.count(), count);
            }
        })
    };

    for w in spawn_writers(&h) {
        w.join().unwrap();
    }
    done.store(true, Ordering::Release);
    reader.join().unwrap();

    let s = h.snapshot();
    assert_eq!(s.count(), (THREADS * PER_THREAD) as u64);
    assert_eq!(s.sum(), h.sum());
}

#[test]
fn clear_while_updating() {
    let h = Arc::new(HdrHistogram::new(-1000, 1000, 3).unwrap());
    let writers = spawn_writers(&h);
    for _ in 0..100 {
        h.clear();
    }
    for w in writers {
        w.join().unwrap();
    }

    // updates racing with clear may be lost, but nothing is corrupted
    let count = h.count();
    assert!(count <= (THREADS * PER_THREAD) as u64);
    if count > 0 {
        assert!(h.min() <= h.max());
    }
    h.clear();
    assert_eq!(h.count(), 0);
    assert_eq!(h.sum(), 0);
}

#[test]
fn rotate_while_updating() {
    let h = Arc::new(HdrHistogram::new(-1000, 1000, 3).unwrap());
    let writers = spawn_writers(&h);
    let mut total = 0;
    for _ in 0..50 {
        total += h.rotate().count();
    }
    for w in writers {
        w.join().unwrap();
    }
    total += h.rotate().count();

    // rotation never loses an update
    assert_eq!(total, (THREADS * PER_THREAD) as u64);
}

#[test]
fn nil_config() {
    let h = HistogramConfig::nil().build().unwrap();
    for v in 0..100 {
        h.update(v);
    }
    assert_eq!(h.count(), 0);
    assert_eq!(h.snapshot().count(), 0);
}
