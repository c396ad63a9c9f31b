/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::Arc;

use crate::Histogram;

/// A histogram that records nothing, used when metrics are disabled.
#[derive(Clone, Copy, Debug, Default)]
pub struct NilHistogram;

impl Histogram for NilHistogram {
    fn update(&self, _v: i64) {}

    fn clear(&self) {}

    fn count(&self) -> u64 {
        0
    }

    fn min(&self) -> i64 {
        0
    }

    fn max(&self) -> i64 {
        0
    }

    fn sum(&self) -> i64 {
        0
    }

    fn mean(&self) -> f64 {
        0.0
    }

    fn std_dev(&self) -> f64 {
        0.0
    }

    fn variance(&self) -> f64 {
        0.0
    }

    fn percentile(&self, _p: f64) -> f64 {
        0.0
    }

    fn percentiles(&self, ps: &[f64]) -> Vec<f64> {
        vec![0.0; ps.len()]
    }

    fn snapshot(&self) -> Arc<dyn Histogram> {
        Arc::new(NilHistogram)
    }
}
