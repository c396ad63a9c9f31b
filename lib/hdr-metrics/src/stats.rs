/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use portable_atomic::AtomicF64;

use super::{Histogram, Quantile};

pub struct HistogramQuantileStats {
    quantile: Quantile,
    value: AtomicF64,
}

impl HistogramQuantileStats {
    fn new(quantile: Quantile) -> Self {
        HistogramQuantileStats {
            quantile,
            value: AtomicF64::new(0.0_f64),
        }
    }
}

/// The summary values last published from a histogram, readable without
/// touching the histogram itself.
pub struct HistogramStats {
    count: AtomicU64,
    min: AtomicI64,
    max: AtomicI64,
    mean: AtomicF64,
    std_dev: AtomicF64,
    quantile: Vec<HistogramQuantileStats>,
}

impl HistogramStats {
    pub fn new() -> Self {
        HistogramStats {
            count: AtomicU64::new(0),
            min: AtomicI64::new(0),
            max: AtomicI64::new(0),
            mean: AtomicF64::new(0.0_f64),
            std_dev: AtomicF64::new(0.0_f64),
            quantile: Vec::with_capacity(8),
        }
    }

    pub fn with_quantiles<'a, T>(quantiles: T) -> Self
    where
        T: IntoIterator<Item = &'a Quantile>,
    {
        let mut stats = HistogramStats::new();
        for q in quantiles {
            stats.quantile.push(HistogramQuantileStats::new(q.clone()));
        }
        stats
    }

    pub fn with_quantile(mut self, quantile: Quantile) -> Self {
        self.quantile.push(HistogramQuantileStats::new(quantile));
        self
    }

    /// Publish the current values of `histogram`. All values are read from a
    /// single snapshot of it, so they describe the same distribution.
    pub fn update(&self, histogram: &dyn Histogram) {
        let histogram = histogram.snapshot();
        self.count.store(histogram.count(), Ordering::Relaxed);
        self.min.store(histogram.min(), Ordering::Relaxed);
        self.max.store(histogram.max(), Ordering::Relaxed);
        self.mean.store(histogram.mean(), Ordering::Relaxed);
        self.std_dev.store(histogram.std_dev(), Ordering::Relaxed);
        for q in &self.quantile {
            q.value
                .store(histogram.percentile(q.quantile.value()), Ordering::Relaxed);
        }
    }

    #[inline]
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn foreach_stat<F>(&self, mut call: F)
    where
        F: FnMut(Option<f64>, &str, f64),
    {
        let count = self.count.load(Ordering::Relaxed);
        call(None, "count", count as f64);
        let min = self.min.load(Ordering::Relaxed);
        call(None, "min", min as f64);
        let max = self.max.load(Ordering::Relaxed);
        call(None, "max", max as f64);
        let mean = self.mean.load(Ordering::Relaxed);
        call(None, "mean", mean);
        let std_dev = self.std_dev.load(Ordering::Relaxed);
        call(None, "stddev", std_dev);
        for q in &self.quantile {
            let v = q.value.load(Ordering::Relaxed);
            call(Some(q.quantile.value()), q.quantile.as_str(), v);
        }
    }
}

impl Default for HistogramStats {
    fn default() -> Self {
        HistogramStats::new()
            .with_quantile(Quantile::PCT50)
            .with_quantile(Quantile::PCT80)
            .with_quantile(Quantile::PCT90)
            .with_quantile(Quantile::PCT95)
            .with_quantile(Quantile::PCT99)
    }
}
