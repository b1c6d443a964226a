//! Windowing of full series into per-length training batches
//!
//! Every supported prefix length gets its own batch. Batches are never
//! pooled because the feature dimensionality differs per length.

use crate::error::{ForecastError, ForecastResult};
use crate::models::{
    is_supported_length, Series, TrainingExample, MAX_PREFIX_DAYS, SERIES_LEN,
};
use std::collections::BTreeMap;

/// Training batches keyed by prefix length
pub type WindowedBatches = BTreeMap<usize, Vec<TrainingExample>>;

/// Cut one series at position `days`
pub fn window(series: &Series, days: usize) -> TrainingExample {
    let (prefix, remainder) = series.values().split_at(days.min(SERIES_LEN));
    TrainingExample {
        prefix: prefix.to_vec(),
        remainder: remainder.to_vec(),
    }
}

/// Window every series for every requested length.
///
/// An empty table yields an empty batch per length; the trainer rejects it.
pub fn window_all(series: &[Series], lengths: &[usize]) -> ForecastResult<WindowedBatches> {
    check_lengths(lengths)?;
    Ok(lengths
        .iter()
        .map(|&days| (days, series.iter().map(|s| window(s, days)).collect()))
        .collect())
}

/// Window the two-table training input.
///
/// `prefix_rows` carry the first `MAX_PREFIX_DAYS` observations of each
/// series and `target_rows` the full `SERIES_LEN` trajectory. Prefixes come
/// from the first table and remainders from the second.
pub fn window_tables(
    prefix_rows: &[Vec<f64>],
    target_rows: &[Vec<f64>],
    lengths: &[usize],
) -> ForecastResult<WindowedBatches> {
    check_lengths(lengths)?;

    if prefix_rows.len() != target_rows.len() {
        return Err(ForecastError::TrainingData(format!(
            "prefix table has {} rows but target table has {}",
            prefix_rows.len(),
            target_rows.len()
        )));
    }

    for (row, (prefix, target)) in prefix_rows.iter().zip(target_rows).enumerate() {
        if prefix.len() != MAX_PREFIX_DAYS {
            return Err(ForecastError::TrainingData(format!(
                "prefix row {} has {} columns, expected {}",
                row,
                prefix.len(),
                MAX_PREFIX_DAYS
            )));
        }
        if target.len() != SERIES_LEN {
            return Err(ForecastError::TrainingData(format!(
                "target row {} has {} columns, expected {}",
                row,
                target.len(),
                SERIES_LEN
            )));
        }
    }

    Ok(lengths
        .iter()
        .map(|&days| {
            let batch = prefix_rows
                .iter()
                .zip(target_rows)
                .map(|(prefix, target)| TrainingExample {
                    prefix: prefix[..days].to_vec(),
                    remainder: target[days..].to_vec(),
                })
                .collect();
            (days, batch)
        })
        .collect())
}

pub(crate) fn check_lengths(lengths: &[usize]) -> ForecastResult<()> {
    match lengths.iter().find(|&&days| !is_supported_length(days)) {
        Some(days) => Err(ForecastError::TrainingData(format!(
            "unsupported prefix length {}",
            days
        ))),
        None => Ok(()),
    }
}
