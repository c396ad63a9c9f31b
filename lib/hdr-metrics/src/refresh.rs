/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::{Arc, Weak};
use std::time::Duration;

use log::debug;
use tokio::runtime::Handle;

use crate::{HdrHistogram, HistogramStats};

const MIN_REFRESH_INTERVAL: Duration = Duration::from_millis(1);

/// Periodically publishes a snapshot of a histogram into [`HistogramStats`].
///
/// The live histogram is never reset here, its counts keep accumulating until
/// the owner calls `clear`. Only a weak reference is held; refreshing stops
/// once the histogram is dropped by its owners.
pub struct HistogramRefresher {
    refresh_interval: Duration,
    inner: Weak<HdrHistogram>,
}

impl HistogramRefresher {
    /// A zero interval is raised to one millisecond.
    pub fn new(refresh_interval: Duration, histogram: &Arc<HdrHistogram>) -> Self {
        HistogramRefresher {
            refresh_interval: refresh_interval.max(MIN_REFRESH_INTERVAL),
            inner: Arc::downgrade(histogram),
        }
    }

    #[inline]
    pub fn refresh_interval(&self) -> Duration {
        self.refresh_interval
    }

    /// Publish once. Returns `false` if the histogram is gone.
    pub fn refresh(&self, stats: &HistogramStats) -> bool {
        let Some(histogram) = self.inner.upgrade() else {
            return false;
        };
        stats.update(&histogram.freeze());
        true
    }

    pub fn spawn_refresh(self, stats: Arc<HistogramStats>, handle: Option<Handle>) {
        let handle = handle.unwrap_or_else(Handle::current);
        handle.spawn(async move {
            debug!(
                "histogram refresh started with interval {:?}",
                self.refresh_interval
            );
            let mut refresh_interval = tokio::time::interval(self.refresh_interval);
            loop {
                refresh_interval.tick().await;
                if !self.refresh(&stats) {
                    break;
                }
            }
            debug!("histogram refresh stopped as the histogram has been dropped");
        });
    }
}
