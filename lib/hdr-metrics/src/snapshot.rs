/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::Arc;

use crate::offset::Offset;
use crate::{Histogram, HistogramError, clamp_quantile};

struct Frozen {
    buckets: hdrhistogram::Histogram<u64>,
    sum: u128,
    dropped: u64,
    offset: Offset,
}

/// A read-only copy of a [`HdrHistogram`](crate::HdrHistogram) taken at one
/// point in time.
///
/// Clones share the same frozen data. Calling [`Histogram::update`] or
/// [`Histogram::clear`] on a snapshot is a bug in the caller and panics.
#[derive(Clone)]
pub struct HdrHistogramSnapshot {
    inner: Arc<Frozen>,
}

impl HdrHistogramSnapshot {
    pub(crate) fn new(
        buckets: hdrhistogram::Histogram<u64>,
        sum: u128,
        dropped: u64,
        offset: Offset,
    ) -> Self {
        HdrHistogramSnapshot {
            inner: Arc::new(Frozen {
                buckets,
                sum,
                dropped,
                offset,
            }),
        }
    }

    #[inline]
    pub fn min_value(&self) -> i64 {
        self.inner.offset.min_value()
    }

    /// Values dropped as out of range by the source histogram up to the time
    /// this snapshot was taken.
    #[inline]
    pub fn dropped(&self) -> u64 {
        self.inner.dropped
    }

    #[inline]
    pub(crate) fn buckets(&self) -> &hdrhistogram::Histogram<u64> {
        &self.inner.buckets
    }

    #[inline]
    pub(crate) fn stored_sum(&self) -> u128 {
        self.inner.sum
    }

    /// Combine two snapshots into a new one. Both must share the same min
    /// value offset.
    pub fn merge(&self, other: &HdrHistogramSnapshot) -> Result<Self, HistogramError> {
        if other.min_value() != self.min_value() {
            return Err(HistogramError::OffsetMismatch {
                left: self.min_value(),
                right: other.min_value(),
            });
        }
        let mut buckets = self.inner.buckets.clone();
        buckets.add(other.buckets())?;
        Ok(HdrHistogramSnapshot::new(
            buckets,
            self.inner.sum + other.inner.sum,
            self.inner.dropped + other.inner.dropped,
            self.inner.offset,
        ))
    }

    /// Whether both handles share the same frozen data.
    pub fn ptr_eq(&self, other: &HdrHistogramSnapshot) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Histogram for HdrHistogramSnapshot {
    fn update(&self, _v: i64) {
        panic!("update called on a HdrHistogramSnapshot");
    }

    fn clear(&self) {
        panic!("clear called on a HdrHistogramSnapshot");
    }

    fn count(&self) -> u64 {
        self.inner.buckets.len()
    }

    fn min(&self) -> i64 {
        if self.inner.buckets.is_empty() {
            return self.min_value();
        }
        self.inner.offset.restore(self.inner.buckets.min())
    }

    fn max(&self) -> i64 {
        if self.inner.buckets.is_empty() {
            return self.min_value();
        }
        self.inner.offset.restore(self.inner.buckets.max())
    }

    fn sum(&self) -> i64 {
        self.inner
            .offset
            .restore_sum(self.inner.sum, self.inner.buckets.len())
    }

    fn std_dev(&self) -> f64 {
        if self.inner.buckets.is_empty() {
            return 0.0;
        }
        self.inner.buckets.stdev()
    }

    fn percentile(&self, p: f64) -> f64 {
        if self.inner.buckets.is_empty() {
            return self.min_value() as f64;
        }
        let stored = self.inner.buckets.value_at_quantile(clamp_quantile(p));
        self.inner.offset.restore(stored) as f64
    }

    /// Returns a handle to the same frozen data.
    fn snapshot(&self) -> Arc<dyn Histogram> {
        Arc::new(self.clone())
    }
}
