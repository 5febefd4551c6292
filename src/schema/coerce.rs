//! Type coercion from raw JSON values to declared field types.
//!
//! Errors carry locations relative to the value being coerced; the caller
//! prefixes the field name.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::{Number, Value};

use super::errors::{ErrorKind, ValidationError};
use super::types::{EnumType, FieldType};
use super::value::FieldValue;

/// Timestamps whose magnitude exceeds this are read as milliseconds.
const MILLIS_THRESHOLD: i64 = 20_000_000_000;

/// Accepted naive datetime layouts, tried in order.
const DATETIME_LAYOUTS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Coerces `value` to `ty`, collecting every element error for lists and
/// nested records.
pub(crate) fn coerce(ty: &FieldType, value: &Value) -> Result<FieldValue, Vec<ValidationError>> {
    if value.is_null() {
        return Err(vec![ValidationError::new(
            ErrorKind::NoneNotAllowed,
            "none is not an allowed value",
        )]);
    }

    match ty {
        FieldType::Int => coerce_int(value).map(FieldValue::Int).map_err(|e| vec![e]),
        FieldType::Str => coerce_str(value).map(FieldValue::Str).map_err(|e| vec![e]),
        FieldType::DateTime => coerce_datetime(value)
            .map(FieldValue::DateTime)
            .map_err(|e| vec![e]),
        FieldType::Enum(members) => coerce_enum(members, value)
            .map(FieldValue::Enum)
            .map_err(|e| vec![e]),
        FieldType::List(element) => {
            let Value::Array(items) = value else {
                return Err(vec![ValidationError::new(
                    ErrorKind::List,
                    "value is not a valid list",
                )]);
            };

            let mut coerced = Vec::with_capacity(items.len());
            let mut errors = Vec::new();
            for (index, item) in items.iter().enumerate() {
                match coerce(element, item) {
                    Ok(v) => coerced.push(v),
                    Err(item_errors) => {
                        errors.extend(item_errors.into_iter().map(|e| e.at(index)));
                    }
                }
            }

            if errors.is_empty() {
                Ok(FieldValue::List(coerced))
            } else {
                Err(errors)
            }
        }
        FieldType::Model(schema) => {
            let Value::Object(map) = value else {
                return Err(vec![ValidationError::new(
                    ErrorKind::Dict,
                    "value is not a valid dict",
                )]);
            };
            schema
                .validate_map(map)
                .map(FieldValue::Model)
                .map_err(|errors| errors.into_errors())
        }
    }
}

fn coerce_int(value: &Value) -> Result<i64, ValidationError> {
    let invalid = || ValidationError::new(ErrorKind::Integer, "value is not a valid integer");
    match value {
        Value::Number(n) => integral(n).ok_or_else(invalid),
        Value::String(s) => s.trim().parse::<i64>().map_err(|_| invalid()),
        _ => Err(invalid()),
    }
}

/// Integers, and floats with no fractional part that fit in i64.
fn integral(n: &Number) -> Option<i64> {
    if let Some(i) = n.as_i64() {
        return Some(i);
    }
    let f = n.as_f64()?;
    if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

fn coerce_str(value: &Value) -> Result<String, ValidationError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        _ => Err(ValidationError::new(ErrorKind::Str, "str type expected")),
    }
}

fn coerce_enum(members: &EnumType, value: &Value) -> Result<String, ValidationError> {
    match value {
        Value::String(s) if members.contains(s) => Ok(s.clone()),
        _ => Err(ValidationError::new(
            ErrorKind::Enum,
            format!(
                "value is not a valid enumeration member; permitted: {}",
                members.permitted()
            ),
        )
        .with_context("enum_values", members.members_repr())),
    }
}

fn coerce_datetime(value: &Value) -> Result<NaiveDateTime, ValidationError> {
    let parsed = match value {
        Value::Number(n) => match n.as_i64() {
            Some(ts) => from_timestamp(ts),
            None => n.as_f64().and_then(from_timestamp_f64),
        },
        Value::String(s) => parse_datetime(s),
        _ => None,
    };
    parsed.ok_or_else(|| ValidationError::new(ErrorKind::DateTime, "invalid datetime format"))
}

/// Parses a datetime from text.
///
/// Accepts numeric Unix timestamps, `YYYY-MM-DD[T| ]HH:MM[:SS[.fff]]`,
/// RFC 3339 with an offset (converted to UTC) and bare dates (midnight).
pub fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();

    if let Ok(ts) = text.parse::<i64>() {
        return from_timestamp(ts);
    }
    if let Ok(ts) = text.parse::<f64>() {
        return from_timestamp_f64(ts);
    }

    for layout in DATETIME_LAYOUTS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, layout) {
            return Some(dt);
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_utc());
    }

    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Unix timestamp in seconds, or milliseconds beyond 2e10 in magnitude.
pub fn from_timestamp(ts: i64) -> Option<NaiveDateTime> {
    let dt = if ts.unsigned_abs() > MILLIS_THRESHOLD as u64 {
        DateTime::<Utc>::from_timestamp_millis(ts)
    } else {
        DateTime::<Utc>::from_timestamp(ts, 0)
    };
    dt.map(|dt| dt.naive_utc())
}

fn from_timestamp_f64(ts: f64) -> Option<NaiveDateTime> {
    if !ts.is_finite() {
        return None;
    }
    let secs = if ts.abs() > MILLIS_THRESHOLD as f64 {
        ts / 1000.0
    } else {
        ts
    };
    let whole = secs.floor();
    if whole < i64::MIN as f64 || whole >= i64::MAX as f64 {
        return None;
    }
    let nanos = (((secs - whole) * 1e9).round() as u32).min(999_999_999);
    DateTime::<Utc>::from_timestamp(whole as i64, nanos).map(|dt| dt.naive_utc())
}
