//! Core data models for day-count forecasting

use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

/// Number of points in every complete series
pub const SERIES_LEN: usize = 30;

/// Longest prefix a caller may supply
pub const MAX_PREFIX_DAYS: usize = 7;

/// Prefix lengths that can have a trained model
pub const SUPPORTED_PREFIX_LENGTHS: RangeInclusive<usize> = 1..=MAX_PREFIX_DAYS;

/// Returns true if `days` is a prefix length the system can serve
pub fn is_supported_length(days: usize) -> bool {
    SUPPORTED_PREFIX_LENGTHS.contains(&days)
}

/// Number of points predicted for a prefix of `days` points
pub fn remainder_len(days: usize) -> usize {
    SERIES_LEN.saturating_sub(days)
}

/// One complete observed trajectory of exactly `SERIES_LEN` points
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series(Vec<f64>);

impl Series {
    /// Build a series, returning `None` unless it has exactly `SERIES_LEN` points
    pub fn new(values: Vec<f64>) -> Option<Self> {
        (values.len() == SERIES_LEN).then_some(Self(values))
    }

    pub fn values(&self) -> &[f64] {
        &self.0
    }
}

/// Leading observed points of a trajectory: 1..=7 finite, non-negative values.
///
/// Every constructor enforces both invariants.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prefix(Vec<f64>);

impl Prefix {
    pub(crate) fn new_unchecked(values: Vec<f64>) -> Self {
        debug_assert!(is_supported_length(values.len()));
        Self(values)
    }

    /// Build a prefix, rejecting bad lengths and negative or non-finite values
    pub fn from_values(values: Vec<f64>) -> Option<Self> {
        let valid = is_supported_length(values.len())
            && values.iter().all(|v| v.is_finite() && *v >= 0.0);
        valid.then_some(Self(values))
    }

    pub fn days(&self) -> usize {
        self.0.len()
    }

    pub fn values(&self) -> &[f64] {
        &self.0
    }
}

/// A (prefix, remainder) pair cut from one series at position `k`
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingExample {
    pub prefix: Vec<f64>,
    pub remainder: Vec<f64>,
}

impl TrainingExample {
    pub fn days(&self) -> usize {
        self.prefix.len()
    }

    /// Join prefix and remainder back into a full trajectory
    pub fn rejoin(&self) -> Vec<f64> {
        let mut full = Vec::with_capacity(self.prefix.len() + self.remainder.len());
        full.extend_from_slice(&self.prefix);
        full.extend_from_slice(&self.remainder);
        full
    }
}

/// Full predicted timeline returned to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    /// Rounded prefix followed by the rounded predicted remainder
    pub timeline: Vec<f64>,
    /// Number of real, caller-supplied days used for the prediction
    pub days_used: usize,
}

/// Raw serving input with optional `day1`..`day7` fields.
///
/// Values are kept as untyped JSON so that strings or booleans reach the
/// validator instead of failing deserialization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day1: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day2: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day3: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day4: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day5: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day6: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day7: Option<serde_json::Value>,
    /// Set when the request object carried fields other than the day slots
    #[serde(skip)]
    pub has_other_fields: bool,
}

impl RawInput {
    /// Build an input from plain numbers, day1 first
    pub fn from_days(days: &[f64]) -> Self {
        let mut input = Self::default();
        for (idx, value) in days.iter().take(MAX_PREFIX_DAYS).enumerate() {
            input.set_day(idx + 1, serde_json::Value::from(*value));
        }
        input
    }

    /// Build an input from an arbitrary JSON document
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        let object = value.as_object()?;
        let mut input = Self::default();
        for (key, value) in object {
            match key
                .strip_prefix("day")
                .and_then(|n| n.parse::<usize>().ok())
                .filter(|n| is_supported_length(*n))
            {
                Some(day) => input.set_day(day, value.clone()),
                None => input.has_other_fields = true,
            }
        }
        Some(input)
    }

    /// Value for day index 1..=7; JSON null counts as absent
    pub fn day(&self, day: usize) -> Option<&serde_json::Value> {
        let slot = match day {
            1 => &self.day1,
            2 => &self.day2,
            3 => &self.day3,
            4 => &self.day4,
            5 => &self.day5,
            6 => &self.day6,
            7 => &self.day7,
            _ => return None,
        };
        slot.as_ref().filter(|v| !v.is_null())
    }

    pub fn set_day(&mut self, day: usize, value: serde_json::Value) {
        let slot = match day {
            1 => &mut self.day1,
            2 => &mut self.day2,
            3 => &mut self.day3,
            4 => &mut self.day4,
            5 => &mut self.day5,
            6 => &mut self.day6,
            7 => &mut self.day7,
            _ => return,
        };
        *slot = Some(value);
    }

    /// True when the request carried no fields at all
    pub fn is_empty(&self) -> bool {
        !self.has_other_fields
            && [
                &self.day1, &self.day2, &self.day3, &self.day4, &self.day5, &self.day6,
                &self.day7,
            ]
            .iter()
            .all(|slot| slot.is_none())
    }
}
