/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use hdrhistogram::{AdditionError, CreationError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HistogramError {
    #[error("max value {max} should be greater than min value {min}")]
    InvalidRange { min: i64, max: i64 },
    #[error("significant figures {0} out of range 1..=5")]
    InvalidSignificantFigures(u8),
    #[error("unable to create bucket structure: {0:?}")]
    Creation(CreationError),
    #[error("min value offset mismatch: {left} vs {right}")]
    OffsetMismatch { left: i64, right: i64 },
    #[error("unable to merge histograms: {0:?}")]
    Addition(AdditionError),
}

impl From<CreationError> for HistogramError {
    fn from(e: CreationError) -> Self {
        HistogramError::Creation(e)
    }
}

impl From<AdditionError> for HistogramError {
    fn from(e: AdditionError) -> Self {
        HistogramError::Addition(e)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid out of range policy: {0}")]
pub struct OutOfRangePolicyParseError(pub String);
