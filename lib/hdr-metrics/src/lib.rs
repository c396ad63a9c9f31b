/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::Arc;

mod offset;

mod error;
pub use error::{HistogramError, OutOfRangePolicyParseError};

mod hdr;
pub use hdr::HdrHistogram;

mod snapshot;
pub use snapshot::HdrHistogramSnapshot;

mod nil;
pub use nil::NilHistogram;

mod quantile;
pub use quantile::{Quantile, QuantileParseError};

mod stats;
pub use stats::HistogramStats;

mod refresh;
pub use refresh::HistogramRefresher;

mod config;
pub use config::{HistogramConfig, HistogramMetricsConfig, OutOfRangePolicy};

#[cfg(feature = "yaml")]
pub mod yaml;

/// The capability shared by live histograms, their snapshots and the no-op
/// implementation.
///
/// All values are reported in the caller's domain. Read queries on an empty
/// histogram return neutral values: `0` for count, sum, mean and deviation,
/// the configured min value for min, max and percentiles.
pub trait Histogram: Send + Sync {
    /// Record a value.
    ///
    /// # Panics
    ///
    /// Panics when called on a snapshot.
    fn update(&self, v: i64);

    /// Reset all counts, keeping the configuration.
    ///
    /// # Panics
    ///
    /// Panics when called on a snapshot.
    fn clear(&self);

    fn count(&self) -> u64;

    fn min(&self) -> i64;

    fn max(&self) -> i64;

    fn sum(&self) -> i64;

    fn mean(&self) -> f64 {
        let count = self.count();
        if count == 0 {
            return 0.0;
        }
        self.sum() as f64 / count as f64
    }

    fn std_dev(&self) -> f64;

    /// The square of [`Histogram::std_dev`].
    ///
    /// Older consumers of this interface got a constant `0` here.
    fn variance(&self) -> f64 {
        let std_dev = self.std_dev();
        std_dev * std_dev
    }

    /// Value at quantile `p`, with `p` in `[0, 1]`. Out of range input is
    /// clamped, NaN is taken as `0`.
    fn percentile(&self, p: f64) -> f64;

    fn percentiles(&self, ps: &[f64]) -> Vec<f64> {
        ps.iter().map(|p| self.percentile(*p)).collect()
    }

    /// A read-only copy of the current distribution.
    fn snapshot(&self) -> Arc<dyn Histogram>;

    #[inline]
    fn is_empty(&self) -> bool {
        self.count() == 0
    }
}

pub(crate) fn clamp_quantile(p: f64) -> f64 {
    if p.is_nan() { 0.0 } else { p.clamp(0.0, 1.0) }
}
