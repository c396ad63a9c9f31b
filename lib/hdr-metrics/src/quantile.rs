/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use num_traits::ToPrimitive;
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QuantileParseError {
    #[error("invalid decimal: {0}")]
    InvalidDecimal(#[from] rust_decimal::Error),
    #[error("quantile {0} out of range [0, 1]")]
    OutOfRange(Decimal),
    #[error("quantile {0} not representable as f64")]
    NotRepresentable(Decimal),
}

/// A quantile in `[0, 1]`, kept in its decimal form so that it can be used as
/// a stable metrics name.
#[derive(Clone, Debug)]
pub struct Quantile {
    decimal: Decimal,
    value: f64,
    name: Cow<'static, str>,
}

macro_rules! const_quantile {
    ($name:ident, $lo:literal, $scale:literal, $value:literal, $s:literal) => {
        pub const $name: Quantile = Quantile {
            decimal: Decimal::from_parts($lo, 0, 0, false, $scale),
            value: $value,
            name: Cow::Borrowed($s),
        };
    };
}

impl Quantile {
    const_quantile!(PCT50, 5, 1, 0.5, "0.5");
    const_quantile!(PCT80, 8, 1, 0.8, "0.8");
    const_quantile!(PCT90, 9, 1, 0.9, "0.9");
    const_quantile!(PCT95, 95, 2, 0.95, "0.95");
    const_quantile!(PCT98, 98, 2, 0.98, "0.98");
    const_quantile!(PCT99, 99, 2, 0.99, "0.99");
    const_quantile!(PCT999, 999, 3, 0.999, "0.999");

    #[inline]
    pub fn value(&self) -> f64 {
        self.value
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.name
    }

    fn from_decimal(decimal: Decimal) -> Result<Self, QuantileParseError> {
        if (decimal.is_sign_negative() && !decimal.is_zero()) || decimal > Decimal::ONE {
            return Err(QuantileParseError::OutOfRange(decimal));
        }
        let decimal = decimal.normalize();
        let value = decimal
            .to_f64()
            .ok_or(QuantileParseError::NotRepresentable(decimal))?;
        Ok(Quantile {
            decimal,
            value,
            name: Cow::Owned(decimal.to_string()),
        })
    }
}

impl FromStr for Quantile {
    type Err = QuantileParseError;

    /// Accepts a plain fraction like `0.99` or a percentage like `99%`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let decimal = match s.strip_suffix('%') {
            Some(pct) => Decimal::from_str(pct.trim())? / Decimal::ONE_HUNDRED,
            None => Decimal::from_str(s)?,
        };
        Quantile::from_decimal(decimal)
    }
}

impl fmt::Display for Quantile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl PartialEq for Quantile {
    fn eq(&self, other: &Self) -> bool {
        self.decimal == other.decimal
    }
}

impl Eq for Quantile {}

impl Hash for Quantile {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.decimal.hash(state);
    }
}

impl PartialOrd for Quantile {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Quantile {
    fn cmp(&self, other: &Self) -> Ordering {
        self.decimal.cmp(&other.decimal)
    }
}
