/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

//! Parsing of histogram configs from YAML values.
//!
//! ```yaml
//! histogram:
//!   min: -100
//!   max: 100
//!   significant_figures: 2
//!   out_of_range: saturate
//! refresh: 10s
//! quantile: 0.5, 0.9, 99.9%
//! ```

use std::collections::BTreeSet;
use std::error::Error;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, anyhow};
use yaml_rust::Yaml;

use crate::{HistogramConfig, HistogramMetricsConfig, Quantile};

/// Call `f` with the normalized name and the value of each entry of a map.
fn parse_map<F>(value: &Yaml, what: &str, mut f: F) -> anyhow::Result<()>
where
    F: FnMut(&str, &Yaml) -> anyhow::Result<()>,
{
    let Yaml::Hash(map) = value else {
        return Err(anyhow!("yaml value type for '{what}' should be 'map'"));
    };
    for (k, v) in map.iter() {
        let Yaml::String(key) = k else {
            return Err(anyhow!("key in '{what}' map should be string"));
        };
        let name = key.to_lowercase().replace('-', "_");
        f(&name, v).context(format!("invalid value for key {key} in '{what}'"))?;
    }
    Ok(())
}

/// Parse any scalar through its textual form.
fn parse_scalar<T>(value: &Yaml) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: Error + Send + Sync + 'static,
{
    let text = match value {
        Yaml::String(s) | Yaml::Real(s) => s.clone(),
        Yaml::Integer(i) => i.to_string(),
        Yaml::Boolean(b) => b.to_string(),
        _ => return Err(anyhow!("yaml value should be a scalar")),
    };
    Ok(T::from_str(text.trim())?)
}

/// A non-zero interval, either a humanize string like `10s` or integer
/// seconds.
pub fn as_interval(value: &Yaml) -> anyhow::Result<Duration> {
    let dur = match value {
        Yaml::String(s) => humanize_rs::duration::parse(s)
            .map_err(|e| anyhow!("invalid humanize duration string {s}: {e}"))?,
        Yaml::Integer(i) => Duration::from_secs(u64::try_from(*i)?),
        _ => {
            return Err(anyhow!(
                "yaml value type for 'interval' should be 'string' or 'integer'"
            ));
        }
    };
    if dur.is_zero() {
        return Err(anyhow!("interval should not be zero"));
    }
    Ok(dur)
}

/// Either a comma separated string or a sequence of quantiles.
pub fn as_quantile_list(value: &Yaml) -> anyhow::Result<BTreeSet<Quantile>> {
    match value {
        Yaml::String(s) => s
            .split(',')
            .map(|v| Quantile::from_str(v.trim()).context(format!("invalid quantile {v}")))
            .collect(),
        Yaml::Array(seq) => seq
            .iter()
            .enumerate()
            .map(|(i, v)| parse_scalar(v).context(format!("invalid quantile at #{i}")))
            .collect(),
        _ => Err(anyhow!(
            "yaml value type for 'quantile list' should be 'seq' or 'str'"
        )),
    }
}

pub fn as_histogram_config(value: &Yaml) -> anyhow::Result<HistogramConfig> {
    let mut config = HistogramConfig::default();
    parse_map(value, "histogram", |k, v| {
        match k {
            "min" | "min_value" => config.set_min_value(parse_scalar(v)?),
            "max" | "max_value" => config.set_max_value(parse_scalar(v)?),
            "significant_figures" | "sigfig" => config.set_significant_figures(parse_scalar(v)?),
            "shards" => config.set_shards(parse_scalar(v)?),
            "out_of_range" => config.set_out_of_range(parse_scalar(v)?),
            "nil" => config.set_nil(parse_scalar(v)?),
            _ => return Err(anyhow!("unknown key")),
        }
        Ok(())
    })?;
    config.check()?;
    Ok(config)
}

/// A map, or a bare interval as the short form setting only the refresh
/// interval.
pub fn as_histogram_metrics_config(value: &Yaml) -> anyhow::Result<HistogramMetricsConfig> {
    if !matches!(value, Yaml::Hash(_)) {
        let refresh = as_interval(value).context("invalid short form of histogram metrics")?;
        return Ok(HistogramMetricsConfig::with_refresh(refresh));
    }

    let mut config = HistogramMetricsConfig::default();
    parse_map(value, "histogram metrics", |k, v| {
        match k {
            "histogram" => config.set_histogram(as_histogram_config(v)?),
            "quantile" => config.set_quantile_list(as_quantile_list(v)?),
            "refresh" => config.set_refresh_interval(as_interval(v)?),
            _ => return Err(anyhow!("unknown key")),
        }
        Ok(())
    })?;
    Ok(config)
}
