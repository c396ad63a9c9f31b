/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::collections::BTreeSet;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;

use crate::{
    HdrHistogram, Histogram, HistogramError, HistogramRefresher, HistogramStats, NilHistogram,
    OutOfRangePolicyParseError, Quantile,
};

const MAX_SHARDS: usize = 64;

/// What to do with values outside of `[min_value, max_value]`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutOfRangePolicy {
    /// Discard the value and count it as dropped.
    #[default]
    Drop,
    /// Record the nearest bound instead.
    Saturate,
}

impl OutOfRangePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutOfRangePolicy::Drop => "drop",
            OutOfRangePolicy::Saturate => "saturate",
        }
    }
}

impl FromStr for OutOfRangePolicy {
    type Err = OutOfRangePolicyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "drop" | "discard" => Ok(OutOfRangePolicy::Drop),
            "saturate" | "clamp" => Ok(OutOfRangePolicy::Saturate),
            _ => Err(OutOfRangePolicyParseError(s.to_string())),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HistogramConfig {
    min_value: i64,
    max_value: i64,
    significant_figures: u8,
    shards: usize,
    out_of_range: OutOfRangePolicy,
    nil: bool,
}

impl HistogramConfig {
    pub fn new(min_value: i64, max_value: i64, significant_figures: u8) -> Self {
        let shards = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        HistogramConfig {
            min_value,
            max_value,
            significant_figures,
            shards: shards.clamp(1, MAX_SHARDS),
            out_of_range: OutOfRangePolicy::default(),
            nil: false,
        }
    }

    /// A config building histograms that record nothing.
    pub fn nil() -> Self {
        HistogramConfig {
            nil: true,
            ..Default::default()
        }
    }

    #[inline]
    pub fn set_range(&mut self, min_value: i64, max_value: i64) {
        self.min_value = min_value;
        self.max_value = max_value;
    }

    #[inline]
    pub fn set_min_value(&mut self, min_value: i64) {
        self.min_value = min_value;
    }

    #[inline]
    pub fn set_max_value(&mut self, max_value: i64) {
        self.max_value = max_value;
    }

    #[inline]
    pub fn set_significant_figures(&mut self, sigfig: u8) {
        self.significant_figures = sigfig;
    }

    /// Set the number of independently locked shards, clamped to `1..=64`.
    #[inline]
    pub fn set_shards(&mut self, shards: usize) {
        self.shards = shards.clamp(1, MAX_SHARDS);
    }

    #[inline]
    pub fn set_out_of_range(&mut self, policy: OutOfRangePolicy) {
        self.out_of_range = policy;
    }

    #[inline]
    pub fn set_nil(&mut self, nil: bool) {
        self.nil = nil;
    }

    #[inline]
    pub fn min_value(&self) -> i64 {
        self.min_value
    }

    #[inline]
    pub fn max_value(&self) -> i64 {
        self.max_value
    }

    #[inline]
    pub fn significant_figures(&self) -> u8 {
        self.significant_figures
    }

    #[inline]
    pub fn shards(&self) -> usize {
        self.shards
    }

    #[inline]
    pub fn out_of_range(&self) -> OutOfRangePolicy {
        self.out_of_range
    }

    #[inline]
    pub fn is_nil(&self) -> bool {
        self.nil
    }

    pub fn check(&self) -> Result<(), HistogramError> {
        if self.max_value <= self.min_value {
            return Err(HistogramError::InvalidRange {
                min: self.min_value,
                max: self.max_value,
            });
        }
        if !(1..=5).contains(&self.significant_figures) {
            return Err(HistogramError::InvalidSignificantFigures(
                self.significant_figures,
            ));
        }
        Ok(())
    }

    pub fn build(&self) -> Result<Arc<dyn Histogram>, HistogramError> {
        if self.nil {
            return Ok(Arc::new(NilHistogram));
        }
        Ok(Arc::new(HdrHistogram::with_config(self)?))
    }
}

impl Default for HistogramConfig {
    fn default() -> Self {
        HistogramConfig::new(0, 3_600_000, 3)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HistogramMetricsConfig {
    histogram: HistogramConfig,
    quantile_list: BTreeSet<Quantile>,
    refresh_interval: Duration,
}

impl HistogramMetricsConfig {
    pub fn with_refresh(dur: Duration) -> Self {
        HistogramMetricsConfig {
            histogram: HistogramConfig::default(),
            quantile_list: BTreeSet::new(),
            refresh_interval: dur,
        }
    }

    #[inline]
    pub fn set_histogram(&mut self, config: HistogramConfig) {
        self.histogram = config;
    }

    #[inline]
    pub fn histogram(&self) -> &HistogramConfig {
        &self.histogram
    }

    #[inline]
    pub fn histogram_mut(&mut self) -> &mut HistogramConfig {
        &mut self.histogram
    }

    #[inline]
    pub fn set_quantile_list(&mut self, list: BTreeSet<Quantile>) {
        self.quantile_list = list;
    }

    #[inline]
    pub fn set_refresh_interval(&mut self, dur: Duration) {
        self.refresh_interval = dur;
    }

    #[inline]
    pub fn refresh_interval(&self) -> Duration {
        self.refresh_interval
    }

    fn build_stats(&self) -> Arc<HistogramStats> {
        if self.quantile_list.is_empty() {
            Arc::new(HistogramStats::default())
        } else {
            Arc::new(HistogramStats::with_quantiles(&self.quantile_list))
        }
    }

    /// Build the live histogram and the stats it is published into, spawning
    /// the refresh task on `handle`, or on the current runtime if `None`.
    ///
    /// The refresh task only reads the histogram, so its counts are reset by
    /// `clear` alone.
    /// A nil config spawns nothing and its stats stay at zero.
    pub fn build_spawned(
        &self,
        handle: Option<Handle>,
    ) -> Result<(Arc<dyn Histogram>, Arc<HistogramStats>), HistogramError> {
        let stats = self.build_stats();
        if self.histogram.is_nil() {
            let nil: Arc<dyn Histogram> = Arc::new(NilHistogram);
            return Ok((nil, stats));
        }

        let h = Arc::new(HdrHistogram::with_config(&self.histogram)?);
        HistogramRefresher::new(self.refresh_interval, &h)
            .spawn_refresh(Arc::clone(&stats), handle);
        let live: Arc<dyn Histogram> = h;
        Ok((live, stats))
    }
}

impl Default for HistogramMetricsConfig {
    fn default() -> Self {
        HistogramMetricsConfig::with_refresh(Duration::from_secs(4))
    }
}
