/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{trace, warn};

use crate::offset::Offset;
use crate::{HdrHistogramSnapshot, Histogram, HistogramConfig, HistogramError, OutOfRangePolicy};

static NEXT_SHARD_HINT: AtomicUsize = AtomicUsize::new(0);

thread_local! {
    static SHARD_HINT: usize = NEXT_SHARD_HINT.fetch_add(1, Ordering::Relaxed);
}

struct Shard {
    buckets: hdrhistogram::Histogram<u64>,
    sum: u128,
    dropped: u64,
}

impl Shard {
    fn reset(&mut self) {
        self.buckets.reset();
        self.sum = 0;
        self.dropped = 0;
    }

    /// Swap out the recorded data, leaving an empty shard with the same
    /// bucket layout.
    fn take(&mut self) -> Shard {
        let empty = hdrhistogram::Histogram::new_from(&self.buckets);
        Shard {
            buckets: std::mem::replace(&mut self.buckets, empty),
            sum: std::mem::take(&mut self.sum),
            dropped: std::mem::take(&mut self.dropped),
        }
    }
}

/// A live histogram accepting concurrent updates.
///
/// The buckets are split into shards, each behind its own lock, and every
/// thread sticks to one shard so writers rarely contend. Reads fold over all
/// shards; a shard is always read whole, but shards are not read at the same
/// instant, so a read may include or miss updates still in flight.
///
/// A `clear` racing with `update` may drop updates that interleave with the
/// reset. This is accepted.
pub struct HdrHistogram {
    shards: Box<[Mutex<Shard>]>,
    offset: Offset,
    policy: OutOfRangePolicy,
}

impl HdrHistogram {
    pub fn new(
        min_value: i64,
        max_value: i64,
        significant_figures: u8,
    ) -> Result<Self, HistogramError> {
        HdrHistogram::with_config(&HistogramConfig::new(
            min_value,
            max_value,
            significant_figures,
        ))
    }

    pub fn with_config(config: &HistogramConfig) -> Result<Self, HistogramError> {
        config.check()?;
        let offset = Offset::new(config.min_value(), config.max_value());
        // the bucket structure only discerns values from 1 and needs high >= 2
        let template = hdrhistogram::Histogram::new_with_bounds(
            1,
            offset.high().max(2),
            config.significant_figures(),
        )?;

        let shards = (0..config.shards())
            .map(|_| {
                Mutex::new(Shard {
                    buckets: template.clone(),
                    sum: 0,
                    dropped: 0,
                })
            })
            .collect();
        Ok(HdrHistogram {
            shards,
            offset,
            policy: config.out_of_range(),
        })
    }

    #[inline]
    pub fn min_value(&self) -> i64 {
        self.offset.min_value()
    }

    #[inline]
    pub fn out_of_range_policy(&self) -> OutOfRangePolicy {
        self.policy
    }

    /// Number of values discarded as out of range since creation, the last
    /// `clear` or the last `rotate`, which hands the count over to the rotated
    /// snapshot. Always `0` with [`OutOfRangePolicy::Saturate`].
    pub fn dropped(&self) -> u64 {
        self.shards.iter().map(|s| lock(s).dropped).sum()
    }

    fn local_shard(&self) -> MutexGuard<'_, Shard> {
        let idx = SHARD_HINT.with(|hint| *hint) % self.shards.len();
        lock(&self.shards[idx])
    }

    fn fold<B, F>(&self, init: B, mut f: F) -> B
    where
        F: FnMut(B, &Shard) -> B,
    {
        self.shards.iter().fold(init, |acc, s| f(acc, &*lock(s)))
    }

    /// Take a frozen copy of the current distribution.
    ///
    /// This clones every shard's buckets. The live `std_dev` and percentile
    /// queries do the same each time they are called, so readers wanting more
    /// than one of them should freeze once and query the copy.
    pub fn freeze(&self) -> HdrHistogramSnapshot {
        self.collect(|s| Shard {
            buckets: s.buckets.clone(),
            sum: s.sum,
            dropped: s.dropped,
        })
    }

    /// Take a frozen copy of the current distribution and reset the live
    /// histogram. Each shard is swapped out under its lock, so no update is
    /// lost between the copy and the reset.
    pub fn rotate(&self) -> HdrHistogramSnapshot {
        self.collect(Shard::take)
    }

    fn collect<F>(&self, mut extract: F) -> HdrHistogramSnapshot
    where
        F: FnMut(&mut Shard) -> Shard,
    {
        let mut merged: Option<Shard> = None;
        for s in self.shards.iter() {
            let part = extract(&mut *lock(s));
            match merged.as_mut() {
                Some(m) => {
                    if let Err(e) = m.buckets.add(&part.buckets) {
                        warn!("failed to merge histogram shard: {e:?}");
                        continue;
                    }
                    m.sum += part.sum;
                    m.dropped += part.dropped;
                }
                None => merged = Some(part),
            }
        }
        // at least one shard is guaranteed by the config check
        let merged = merged.unwrap_or_else(|| unreachable!("histogram without shards"));
        HdrHistogramSnapshot::new(merged.buckets, merged.sum, merged.dropped, self.offset)
    }

    /// Add all values of `snapshot` into this histogram.
    pub fn merge(&self, snapshot: &HdrHistogramSnapshot) -> Result<(), HistogramError> {
        if snapshot.min_value() != self.min_value() {
            return Err(HistogramError::OffsetMismatch {
                left: self.min_value(),
                right: snapshot.min_value(),
            });
        }
        let mut shard = self.local_shard();
        shard.buckets.add(snapshot.buckets())?;
        shard.sum += snapshot.stored_sum();
        shard.dropped += snapshot.dropped();
        Ok(())
    }
}

impl Histogram for HdrHistogram {
    fn update(&self, v: i64) {
        let stored = match self.policy {
            OutOfRangePolicy::Drop => self.offset.shift(v),
            OutOfRangePolicy::Saturate => Some(self.offset.shift_saturating(v)),
        };

        let mut shard = self.local_shard();
        match stored {
            Some(stored) => match shard.buckets.record(stored) {
                Ok(_) => shard.sum += stored as u128,
                Err(e) => {
                    trace!("value {v} not recorded: {e:?}");
                    shard.dropped += 1;
                }
            },
            None => {
                trace!("value {v} out of range, dropped");
                shard.dropped += 1;
            }
        }
    }

    fn clear(&self) {
        for s in self.shards.iter() {
            lock(s).reset();
        }
    }

    fn count(&self) -> u64 {
        self.fold(0, |acc, s| acc + s.buckets.len())
    }

    fn min(&self) -> i64 {
        let stored = self.fold(None, |acc: Option<u64>, s| {
            if s.buckets.is_empty() {
                return acc;
            }
            let v = s.buckets.min();
            Some(acc.map_or(v, |a| a.min(v)))
        });
        self.offset.restore(stored.unwrap_or(0))
    }

    fn max(&self) -> i64 {
        let stored = self.fold(0, |acc, s| {
            if s.buckets.is_empty() {
                acc
            } else {
                acc.max(s.buckets.max())
            }
        });
        self.offset.restore(stored)
    }

    fn sum(&self) -> i64 {
        let (sum, count) = self.fold((0u128, 0u64), |(sum, count), s| {
            (sum + s.sum, count + s.buckets.len())
        });
        self.offset.restore_sum(sum, count)
    }

    fn mean(&self) -> f64 {
        let (sum, count) = self.fold((0u128, 0u64), |(sum, count), s| {
            (sum + s.sum, count + s.buckets.len())
        });
        if count == 0 {
            return 0.0;
        }
        self.offset.restore_sum(sum, count) as f64 / count as f64
    }

    /// Merges all shards on each call, see [`HdrHistogram::freeze`] to read
    /// several values from one copy.
    fn std_dev(&self) -> f64 {
        self.freeze().std_dev()
    }

    fn percentile(&self, p: f64) -> f64 {
        self.freeze().percentile(p)
    }

    fn percentiles(&self, ps: &[f64]) -> Vec<f64> {
        self.freeze().percentiles(ps)
    }

    fn snapshot(&self) -> Arc<dyn Histogram> {
        Arc::new(self.freeze())
    }
}

fn lock(shard: &Mutex<Shard>) -> MutexGuard<'_, Shard> {
    // shard state stays valid even if a holder panicked
    shard.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(v: f64, expected: f64, relative: f64) {
        let delta = (v - expected).abs();
        assert!(
            delta <= expected.abs() * relative,
            "{v} not within {relative} of {expected}"
        );
    }

    #[test]
    fn record_positive() {
        let h = HdrHistogram::new(0, 3_600_000, 3).unwrap();
        for v in [100, 200, 300] {
            h.update(v);
        }
        assert_eq!(h.count(), 3);
        assert_eq!(h.min(), 100);
        assert_eq!(h.max(), 300);
        assert_eq!(h.mean(), 200.0);
        assert_eq!(h.sum(), 600);
        assert_close(h.percentile(0.5), 200.0, 0.001);
        assert_eq!(h.dropped(), 0);
    }

    #[test]
    fn record_negative_offset() {
        let h = HdrHistogram::new(-100, 100, 2).unwrap();
        for v in [-50, 0, 50] {
            h.update(v);
        }
        assert_eq!(h.count(), 3);
        assert_eq!(h.min(), -50);
        assert_eq!(h.max(), 50);
        assert_eq!(h.mean(), 0.0);
        assert_eq!(h.sum(), 0);
        assert_eq!(h.percentile(0.5), 0.0);
        assert_eq!(h.percentile(0.0), -50.0);
        assert_eq!(h.percentile(1.0), 50.0);
    }

    #[test]
    fn single_value() {
        let h = HdrHistogram::new(0, 3_600_000, 3).unwrap();
        h.update(1_234_567);
        assert_close(h.min() as f64, 1_234_567.0, 0.001);
        assert_close(h.max() as f64, 1_234_567.0, 0.001);
        assert_close(h.percentile(0.5), 1_234_567.0, 0.001);
        assert_eq!(h.sum(), 1_234_567);
        assert_eq!(h.mean(), 1_234_567.0);
    }

    #[test]
    fn empty() {
        let h = HdrHistogram::new(-10, 10, 3).unwrap();
        assert_eq!(h.count(), 0);
        assert_eq!(h.min(), -10);
        assert_eq!(h.max(), -10);
        assert_eq!(h.mean(), 0.0);
        assert_eq!(h.sum(), 0);
        assert_eq!(h.std_dev(), 0.0);
        assert_eq!(h.percentile(0.99), -10.0);
    }

    #[test]
    fn clear() {
        let h = HdrHistogram::new(0, 1000, 3).unwrap();
        h.update(5);
        h.update(2000);
        assert_eq!(h.dropped(), 1);
        h.clear();
        assert_eq!(h.count(), 0);
        assert_eq!(h.mean(), 0.0);
        assert_eq!(h.sum(), 0);
        assert_eq!(h.dropped(), 0);

        h.update(7);
        assert_eq!(h.count(), 1);
        assert_eq!(h.min(), 7);
        assert_eq!(h.max(), 7);
    }

    #[test]
    fn drop_out_of_range() {
        let h = HdrHistogram::new(-100, 100, 2).unwrap();
        h.update(-101);
        h.update(101);
        h.update(i64::MIN);
        h.update(i64::MAX);
        h.update(100);
        assert_eq!(h.count(), 1);
        assert_eq!(h.dropped(), 4);
        assert_eq!(h.max(), 100);
    }

    #[test]
    fn saturate_out_of_range() {
        let mut config = HistogramConfig::new(0, 1000, 3);
        config.set_out_of_range(OutOfRangePolicy::Saturate);
        let h = HdrHistogram::with_config(&config).unwrap();
        h.update(-5);
        h.update(5000);
        assert_eq!(h.count(), 2);
        assert_eq!(h.dropped(), 0);
        assert_eq!(h.min(), 0);
        assert_eq!(h.max(), 1000);
        assert_eq!(h.sum(), 1000);
    }

    #[test]
    fn narrow_range() {
        let h = HdrHistogram::new(5, 6, 1).unwrap();
        h.update(5);
        h.update(6);
        assert_eq!(h.count(), 2);
        assert_eq!(h.min(), 5);
        assert_eq!(h.max(), 6);
        assert_eq!(h.sum(), 11);
    }

    #[test]
    fn invalid_config() {
        assert!(matches!(
            HdrHistogram::new(10, 10, 3),
            Err(HistogramError::InvalidRange { min: 10, max: 10 })
        ));
        assert!(matches!(
            HdrHistogram::new(0, 10, 0),
            Err(HistogramError::InvalidSignificantFigures(0))
        ));
        assert!(matches!(
            HdrHistogram::new(0, 10, 6),
            Err(HistogramError::InvalidSignificantFigures(6))
        ));
    }

    #[test]
    fn min_mean_max_order() {
        let h = HdrHistogram::new(-1_000_000, 1_000_000, 3).unwrap();
        for v in (-999_000..999_000).step_by(7_919) {
            h.update(v);
        }
        let mean = h.mean();
        assert!(h.min() as f64 <= mean);
        assert!(mean <= h.max() as f64);
        assert_close(h.sum() as f64, h.count() as f64 * mean, 1e-9);
    }

    #[test]
    fn percentile_order() {
        let h = HdrHistogram::new(0, 100_000, 3).unwrap();
        for v in 1..=10_000 {
            h.update(v);
        }
        let ps = h.percentiles(&[0.0, 0.5, 0.9, 0.99, 1.0]);
        assert_eq!(ps.len(), 5);
        assert!(ps.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(ps[0], h.min() as f64);
        assert_eq!(ps[4], h.max() as f64);
        assert_close(ps[1], 5_000.0, 0.001);
        assert_close(ps[3], 9_900.0, 0.001);
    }

    #[test]
    fn snapshot_matches_live() {
        let h = HdrHistogram::new(-500, 50_000, 3).unwrap();
        for v in (-500..50_000).step_by(37) {
            h.update(v);
        }
        let s = h.snapshot();
        assert_eq!(s.count(), h.count());
        assert_eq!(s.min(), h.min());
        assert_eq!(s.max(), h.max());
        assert_eq!(s.sum(), h.sum());
        assert_eq!(s.mean(), h.mean());
        assert_eq!(s.std_dev(), h.std_dev());
        assert_eq!(s.variance(), h.variance());
        let ps = [0.0, 0.25, 0.5, 0.75, 0.9, 0.99, 0.999, 1.0];
        assert_eq!(s.percentiles(&ps), h.percentiles(&ps));
    }

    #[test]
    fn snapshot_is_frozen() {
        let h = HdrHistogram::new(0, 1000, 3).unwrap();
        h.update(10);
        let s = h.snapshot();
        h.update(20);
        h.update(30);
        assert_eq!(s.count(), 1);
        assert_eq!(s.max(), 10);
        h.clear();
        assert_eq!(s.count(), 1);
        assert_eq!(s.sum(), 10);
    }

    #[test]
    fn rotate() {
        let h = HdrHistogram::new(0, 1000, 3).unwrap();
        h.update(1);
        h.update(2);
        h.update(5000);
        let s = h.rotate();
        assert_eq!(s.count(), 2);
        assert_eq!(s.sum(), 3);
        assert_eq!(s.dropped(), 1);
        assert_eq!(h.count(), 0);
        assert_eq!(h.dropped(), 0);

        h.update(3);
        assert_eq!(h.min(), 3);
        assert_eq!(s.max(), 2);
    }

    #[test]
    fn merge() {
        let a = HdrHistogram::new(-10, 1000, 3).unwrap();
        let b = HdrHistogram::new(-10, 1000, 3).unwrap();
        a.update(-10);
        b.update(100);
        b.update(200);
        b.update(5000);
        a.merge(&b.freeze()).unwrap();
        assert_eq!(a.count(), 3);
        assert_eq!(a.dropped(), 1);
        assert_eq!(a.min(), -10);
        assert_eq!(a.max(), 200);
        assert_eq!(a.sum(), 290);

        let c = HdrHistogram::new(0, 1000, 3).unwrap();
        assert!(matches!(
            a.merge(&c.freeze()),
            Err(HistogramError::OffsetMismatch {
                left: -10,
                right: 0
            })
        ));
    }

    #[test]
    fn sharded() {
        let mut config = HistogramConfig::new(0, 1_000_000, 3);
        config.set_shards(4);
        let h = Arc::new(HdrHistogram::with_config(&config).unwrap());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let h = Arc::clone(&h);
                std::thread::spawn(move || {
                    for v in 0..1000 {
                        h.update(i * 1000 + v);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(h.count(), 8000);
        assert_eq!(h.min(), 0);
        assert_eq!(h.max(), 7999);
        assert_eq!(h.sum(), (0..8000).sum::<i64>());

        let s = h.freeze();
        assert_eq!(s.count(), 8000);
        assert_eq!(s.sum(), h.sum());
    }
}
