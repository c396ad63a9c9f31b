/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

//! Translation between the caller's signed domain and the non-negative
//! domain stored in the buckets.
//!
//! Every recorded value `v` is stored as `v - min_value`, and every stored
//! value read back is reported as `stored + min_value`. No other module does
//! offset arithmetic.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Offset {
    min_value: i64,
    high: u64,
}

impl Offset {
    pub(crate) fn new(min_value: i64, max_value: i64) -> Self {
        let high = (max_value as i128 - min_value as i128).max(0) as u64;
        Offset { min_value, high }
    }

    #[inline]
    pub(crate) fn min_value(&self) -> i64 {
        self.min_value
    }

    /// The largest stored value in range.
    #[inline]
    pub(crate) fn high(&self) -> u64 {
        self.high
    }

    /// Shift `v` into the stored domain, `None` if it falls outside of it.
    pub(crate) fn shift(&self, v: i64) -> Option<u64> {
        let stored = v as i128 - self.min_value as i128;
        if stored < 0 || stored > self.high as i128 {
            None
        } else {
            Some(stored as u64)
        }
    }

    /// Shift `v` into the stored domain, clamping to its bounds.
    pub(crate) fn shift_saturating(&self, v: i64) -> u64 {
        let stored = v as i128 - self.min_value as i128;
        stored.clamp(0, self.high as i128) as u64
    }

    pub(crate) fn restore(&self, stored: u64) -> i64 {
        clamp_i64(stored as i128 + self.min_value as i128)
    }

    /// Each of the `count` samples carries its own shift, so the offset is
    /// added back once per sample.
    pub(crate) fn restore_sum(&self, stored_sum: u128, count: u64) -> i64 {
        let shift = self.min_value as i128 * count as i128;
        let stored_sum = stored_sum.min(i128::MAX as u128) as i128;
        clamp_i64(stored_sum.saturating_add(shift))
    }
}

fn clamp_i64(v: i128) -> i64 {
    v.clamp(i64::MIN as i128, i64::MAX as i128) as i64
}
