//! Field and root validators.
//!
//! A field validator runs either before coercion (on the raw JSON value, and
//! may rewrite it) or after coercion (on the typed value). A root validator
//! sees the whole coerced record and only runs when every field passed.
//! A validator signals rejection by returning `Err(message)`.

use std::fmt;
use std::sync::Arc;

use regex::Regex;
use serde_json::Value;

use super::value::{FieldValue, Record};

type PreFn = dyn Fn(Value) -> Result<Value, String> + Send + Sync;
type PostFn = dyn Fn(FieldValue) -> Result<FieldValue, String> + Send + Sync;
type RootFn = dyn Fn(&Record) -> Result<(), String> + Send + Sync;

/// When a field validator runs relative to type coercion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Pre,
    Post,
}

#[derive(Clone)]
enum FieldCheck {
    Pre(Arc<PreFn>),
    Post(Arc<PostFn>),
}

/// Named check or transform attached to one field.
#[derive(Clone)]
pub struct FieldValidator {
    name: String,
    check: FieldCheck,
}

impl FieldValidator {
    /// Runs on the raw value before coercion.
    pub fn pre<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Value) -> Result<Value, String> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            check: FieldCheck::Pre(Arc::new(f)),
        }
    }

    /// Runs on the coerced value and may replace it.
    pub fn post<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(FieldValue) -> Result<FieldValue, String> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            check: FieldCheck::Post(Arc::new(f)),
        }
    }

    /// Post-coercion check that leaves the value untouched.
    pub fn check<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&FieldValue) -> Result<(), String> + Send + Sync + 'static,
    {
        Self::post(name, move |value| f(&value).map(|()| value))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stage(&self) -> Stage {
        match self.check {
            FieldCheck::Pre(_) => Stage::Pre,
            FieldCheck::Post(_) => Stage::Post,
        }
    }

    pub(crate) fn apply_pre(&self, value: Value) -> Result<Value, String> {
        match &self.check {
            FieldCheck::Pre(f) => f(value),
            FieldCheck::Post(_) => Ok(value),
        }
    }

    pub(crate) fn apply_post(&self, value: FieldValue) -> Result<FieldValue, String> {
        match &self.check {
            FieldCheck::Post(f) => f(value),
            FieldCheck::Pre(_) => Ok(value),
        }
    }
}

impl fmt::Debug for FieldValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldValidator")
            .field("name", &self.name)
            .field("stage", &self.stage())
            .finish()
    }
}

/// Named check over the whole coerced record.
#[derive(Clone)]
pub struct RootValidator {
    name: String,
    check: Arc<RootFn>,
}

impl RootValidator {
    pub fn new<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Record) -> Result<(), String> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            check: Arc::new(f),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn run(&self, record: &Record) -> Result<(), String> {
        (self.check)(record)
    }
}

impl fmt::Debug for RootValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RootValidator")
            .field("name", &self.name)
            .finish()
    }
}

// =============================================================================
// Built-in field validators
// =============================================================================

/// Lowercases string input before coercion. Other values pass through.
pub fn lowercase() -> FieldValidator {
    FieldValidator::pre("lowercase", |value| {
        Ok(match value {
            Value::String(s) => Value::String(s.to_lowercase()),
            other => other,
        })
    })
}

/// Uppercases string input before coercion.
pub fn uppercase() -> FieldValidator {
    FieldValidator::pre("uppercase", |value| {
        Ok(match value {
            Value::String(s) => Value::String(s.to_uppercase()),
            other => other,
        })
    })
}

/// Strips surrounding whitespace from string input before coercion.
pub fn trim() -> FieldValidator {
    FieldValidator::pre("trim", |value| {
        Ok(match value {
            Value::String(s) => Value::String(s.trim().to_string()),
            other => other,
        })
    })
}

/// Inclusive integer bounds.
pub fn range(min: Option<i64>, max: Option<i64>, message: Option<String>) -> FieldValidator {
    FieldValidator::check("range", move |value| {
        let Some(n) = value.as_int() else {
            return Ok(());
        };
        if let Some(min) = min {
            if n < min {
                return Err(message.clone().unwrap_or_else(|| {
                    format!("ensure this value is greater than or equal to {}", min)
                }));
            }
        }
        if let Some(max) = max {
            if n > max {
                return Err(message.clone().unwrap_or_else(|| {
                    format!("ensure this value is less than or equal to {}", max)
                }));
            }
        }
        Ok(())
    })
}

/// Inclusive length bounds: characters for strings, items for lists.
pub fn length(min: Option<usize>, max: Option<usize>, message: Option<String>) -> FieldValidator {
    FieldValidator::check("length", move |value| {
        let (len, unit) = match value {
            FieldValue::Str(s) => (s.chars().count(), "characters"),
            FieldValue::List(items) => (items.len(), "items"),
            _ => return Ok(()),
        };
        if let Some(min) = min {
            if len < min {
                return Err(message
                    .clone()
                    .unwrap_or_else(|| format!("ensure this value has at least {} {}", min, unit)));
            }
        }
        if let Some(max) = max {
            if len > max {
                return Err(message
                    .clone()
                    .unwrap_or_else(|| format!("ensure this value has at most {} {}", max, unit)));
            }
        }
        Ok(())
    })
}

/// String must match `pattern` (unanchored unless the pattern anchors itself).
pub fn pattern(pattern: &str, message: Option<String>) -> Result<FieldValidator, regex::Error> {
    let regex = Regex::new(pattern)?;
    Ok(FieldValidator::check("pattern", move |value| match value {
        FieldValue::Str(s) if !regex.is_match(s) => Err(message
            .clone()
            .unwrap_or_else(|| format!("string does not match regex \"{}\"", regex.as_str()))),
        _ => Ok(()),
    }))
}

// =============================================================================
// Built-in root validators
// =============================================================================

/// `target` must not exceed `max` while `field` equals `equals`.
pub fn cap_when(
    field: impl Into<String>,
    equals: Value,
    target: impl Into<String>,
    max: i64,
    message: impl Into<String>,
) -> RootValidator {
    let field = field.into();
    let target = target.into();
    let message = message.into();
    let name = format!("cap_when:{}", target);
    RootValidator::new(name, move |record| {
        let matches = record
            .get(&field)
            .map(|v| v.to_json() == equals)
            .unwrap_or(false);
        match record.get_int(&target) {
            Some(n) if matches && n > max => Err(message.clone()),
            _ => Ok(()),
        }
    })
}

/// `first` must not be greater than `second` (ints or datetimes; nulls skip).
pub fn ascending(
    first: impl Into<String>,
    second: impl Into<String>,
    message: Option<String>,
) -> RootValidator {
    let first = first.into();
    let second = second.into();
    let name = format!("ascending:{}:{}", first, second);
    RootValidator::new(name, move |record| {
        let out_of_order = match (record.get(&first), record.get(&second)) {
            (Some(FieldValue::Int(a)), Some(FieldValue::Int(b))) => a > b,
            (Some(FieldValue::DateTime(a)), Some(FieldValue::DateTime(b))) => a > b,
            _ => false,
        };
        if out_of_order {
            Err(message
                .clone()
                .unwrap_or_else(|| format!("{} must not be after {}", first, second)))
        } else {
            Ok(())
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_stage_reported() {
        assert_eq!(lowercase().stage(), Stage::Pre);
        assert_eq!(range(Some(1), None, None).stage(), Stage::Post);
    }

    #[test]
    fn test_lowercase_only_touches_strings() {
        let v = lowercase();
        assert_eq!(v.apply_pre(json!("Math")).unwrap(), json!("math"));
        assert_eq!(v.apply_pre(json!(5)).unwrap(), json!(5));
    }

    #[test]
    fn test_trim_and_uppercase() {
        assert_eq!(trim().apply_pre(json!("  a b ")).unwrap(), json!("a b"));
        assert_eq!(uppercase().apply_pre(json!("eur")).unwrap(), json!("EUR"));
    }

    #[test]
    fn test_pre_validator_ignored_at_post_stage() {
        let v = lowercase();
        let value = FieldValue::Str("Math".into());
        assert_eq!(v.apply_post(value.clone()).unwrap(), value);
    }

    #[test]
    fn test_range_bounds_inclusive() {
        let v = range(Some(1), Some(100), None);
        assert!(v.apply_post(FieldValue::Int(1)).is_ok());
        assert!(v.apply_post(FieldValue::Int(100)).is_ok());
        assert_eq!(
            v.apply_post(FieldValue::Int(101)).unwrap_err(),
            "ensure this value is less than or equal to 100"
        );
        assert_eq!(
            v.apply_post(FieldValue::Int(0)).unwrap_err(),
            "ensure this value is greater than or equal to 1"
        );
    }

    #[test]
    fn test_range_custom_message() {
        let v = range(Some(1), Some(100), Some("out of range".into()));
        assert_eq!(v.apply_post(FieldValue::Int(500)).unwrap_err(), "out of range");
    }

    #[test]
    fn test_length_counts_chars_and_items() {
        let v = length(Some(2), Some(3), None);
        assert!(v.apply_post(FieldValue::Str("héé".into())).is_ok());
        assert_eq!(
            v.apply_post(FieldValue::Str("h".into())).unwrap_err(),
            "ensure this value has at least 2 characters"
        );
        assert_eq!(
            v.apply_post(FieldValue::List(vec![FieldValue::Int(1); 4]))
                .unwrap_err(),
            "ensure this value has at most 3 items"
        );
    }

    #[test]
    fn test_pattern() {
        let v = pattern("^[a-z]+$", None).unwrap();
        assert!(v.apply_post(FieldValue::Str("abc".into())).is_ok());
        assert!(v.apply_post(FieldValue::Str("ab1".into())).is_err());
        assert!(pattern("(", None).is_err());
    }

    #[test]
    fn test_cap_when() {
        let v = cap_when("subject", json!("art"), "grade", 90, "Art grade cannot exceed 90");

        let mut record = Record::default();
        record.push("subject", FieldValue::Enum("art".into()));
        record.push("grade", FieldValue::Int(95));
        assert_eq!(v.run(&record).unwrap_err(), "Art grade cannot exceed 90");

        let mut record = Record::default();
        record.push("subject", FieldValue::Enum("math".into()));
        record.push("grade", FieldValue::Int(95));
        assert!(v.run(&record).is_ok());
    }

    #[test]
    fn test_ascending() {
        let v = ascending("start", "end", None);
        let mut record = Record::default();
        record.push("start", FieldValue::Int(5));
        record.push("end", FieldValue::Int(3));
        assert_eq!(v.run(&record).unwrap_err(), "start must not be after end");

        let mut record = Record::default();
        record.push("start", FieldValue::Int(3));
        record.push("end", FieldValue::Null);
        assert!(v.run(&record).is_ok());
    }

    #[test]
    fn test_debug_shows_name_only() {
        let rendered = format!("{:?}", lowercase());
        assert!(rendered.contains("lowercase"));
        assert!(rendered.contains("Pre"));
    }
}
