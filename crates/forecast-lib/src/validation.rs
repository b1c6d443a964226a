//! Input validation for serving requests
//!
//! Turns a raw `day1`..`day7` request into a contiguous [`Prefix`]. The
//! scan stops at the first missing day, so a prefix never contains gaps.

use crate::error::ValidationError;
use crate::models::{Prefix, RawInput, MAX_PREFIX_DAYS};
use serde_json::Value;

/// Validate an optional raw input (absent body counts as no data)
pub fn validate(input: Option<&RawInput>) -> Result<Prefix, ValidationError> {
    let input = match input {
        Some(input) if !input.is_empty() => input,
        _ => return Err(ValidationError::NoData),
    };

    let mut days = Vec::with_capacity(MAX_PREFIX_DAYS);
    for day in 1..=MAX_PREFIX_DAYS {
        let Some(value) = input.day(day) else {
            break;
        };
        days.push(non_negative_number(value).ok_or(ValidationError::InvalidValue)?);
    }

    if days.is_empty() {
        return Err(ValidationError::NoDays);
    }

    Ok(Prefix::new_unchecked(days))
}

/// Booleans and numeric strings are rejected; only JSON numbers count
fn non_negative_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite() && *v >= 0.0),
        _ => None,
    }
}
