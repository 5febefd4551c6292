//! Record validation engine
//!
//! Validation semantics:
//! - Fields are processed in declaration order
//! - Absent fields take their default, null when optional, else `missing`
//! - Pre validators run on the raw value, then coercion, then post validators
//! - A field that failed coercion skips its post validators
//! - Field errors are collected, never short-circuited
//! - Root validators run only when every field passed, and stop at the first
//!   failure (reported under `__root__`)
//!
//! Validation is pure: the schema is never mutated and the same input always
//! yields the same outcome.

use serde_json::{Map, Value};

use super::coerce::coerce;
use super::errors::{ErrorKind, ValidationError, ValidationErrors, ValidationResult};
use super::types::{ExtraPolicy, FieldDef, Schema};
use super::validators::Stage;
use super::value::{FieldValue, Record};

impl Schema {
    /// Validates an untyped input against this schema.
    ///
    /// # Errors
    ///
    /// Returns every field error in declaration order, then undeclared-field
    /// errors, then at most one `__root__` error. A non-object input yields a
    /// single `type_error.dict` under `__root__`.
    pub fn validate(&self, input: &Value) -> ValidationResult<Record> {
        match input.as_object() {
            Some(map) => self.validate_map(map),
            None => Err(ValidationErrors::new(
                self.name(),
                vec![ValidationError::root(
                    ErrorKind::Dict,
                    "value is not a valid dict",
                )],
            )),
        }
    }

    /// Validates an input mapping against this schema.
    pub fn validate_map(&self, input: &Map<String, Value>) -> ValidationResult<Record> {
        let mut errors = Vec::new();
        let mut record = Record::with_capacity(self.fields().len());

        for field in self.fields() {
            match input.get(field.name()) {
                None => match field.absent_value() {
                    Some(value) => record.push(field.name(), value),
                    None => errors.push(ValidationError::missing(field.name())),
                },
                Some(raw) => match validate_field(field, raw) {
                    Ok(value) => record.push(field.name(), value),
                    Err(field_errors) => errors.extend(
                        field_errors.into_iter().map(|e| e.at(field.name())),
                    ),
                },
            }
        }

        if self.extra() == ExtraPolicy::Forbid {
            for key in input.keys() {
                if self.field(key).is_none() {
                    errors.push(
                        ValidationError::new(ErrorKind::Extra, "extra fields not permitted")
                            .at(key.as_str()),
                    );
                }
            }
        }

        if errors.is_empty() {
            for validator in self.root_validators() {
                if let Err(message) = validator.run(&record) {
                    tracing::trace!(
                        schema = %self.name(),
                        validator = %validator.name(),
                        "root validator rejected record"
                    );
                    errors.push(ValidationError::root(ErrorKind::Value, message));
                    break;
                }
            }
        }

        if errors.is_empty() {
            tracing::trace!(schema = %self.name(), fields = record.len(), "record validated");
            Ok(record)
        } else {
            tracing::debug!(
                schema = %self.name(),
                errors = errors.len(),
                "record validation failed"
            );
            Err(ValidationErrors::new(self.name(), errors))
        }
    }
}

/// Runs one field's pipeline. Error locations are relative to the field.
fn validate_field(field: &FieldDef, raw: &Value) -> Result<FieldValue, Vec<ValidationError>> {
    let mut value = raw.clone();
    for validator in field.validators_for(Stage::Pre) {
        value = validator
            .apply_pre(value)
            .map_err(|message| vec![ValidationError::value(message)])?;
    }

    if value.is_null() && field.is_optional() {
        return Ok(FieldValue::Null);
    }

    let mut coerced = coerce(field.field_type(), &value)?;

    for validator in field.validators_for(Stage::Post) {
        coerced = validator
            .apply_post(coerced)
            .map_err(|message| vec![ValidationError::value(message)])?;
    }

    Ok(coerced)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::types::{EnumType, FieldType};
    use crate::schema::validators::{self, FieldValidator, RootValidator};
    use crate::schema::value::FieldValue;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use serde_json::json;

    fn user_schema() -> Schema {
        Schema::builder("User")
            .field(FieldDef::int("id"))
            .field(FieldDef::datetime("signup_ts").optional())
            .field(FieldDef::list("friends", FieldType::Int).with_default(FieldValue::List(vec![])))
            .field(FieldDef::string("name").with_default("John Doe"))
            .build()
            .unwrap()
    }

    #[test]
    fn test_valid_document_passes() {
        let record = user_schema()
            .validate(&json!({"id": "123", "friends": [1, 2, "3"]}))
            .unwrap();
        assert_eq!(record.get_int("id"), Some(123));
        assert_eq!(record.get("signup_ts"), Some(&FieldValue::Null));
        assert_eq!(record.get_str("name"), Some("John Doe"));
        assert_eq!(
            record.get("friends"),
            Some(&FieldValue::List(vec![
                FieldValue::Int(1),
                FieldValue::Int(2),
                FieldValue::Int(3)
            ]))
        );
    }

    #[test]
    fn test_missing_required_field_fails() {
        let errors = user_schema().validate(&json!({"name": "Alice"})).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.errors()[0].kind(), ErrorKind::Missing);
        assert_eq!(errors.errors()[0].loc_display(), "id");
    }

    #[test]
    fn test_errors_follow_field_order() {
        let errors = user_schema()
            .validate(&json!({"friends": "x", "signup_ts": "bad", "id": "nope"}))
            .unwrap_err();
        let locs: Vec<String> = errors.iter().map(|e| e.loc_display()).collect();
        assert_eq!(locs, vec!["id", "signup_ts", "friends"]);
    }

    #[test]
    fn test_list_element_errors_located_under_field() {
        let errors = user_schema()
            .validate(&json!({"id": 1, "friends": [1, "two", 3]}))
            .unwrap_err();
        assert_eq!(errors.errors()[0].loc_display(), "friends -> 1");
        assert_eq!(errors.errors()[0].kind(), ErrorKind::Integer);
    }

    #[test]
    fn test_null_for_required_field() {
        let errors = user_schema().validate(&json!({"id": null})).unwrap_err();
        assert_eq!(errors.errors()[0].kind(), ErrorKind::NoneNotAllowed);
    }

    #[test]
    fn test_non_object_input() {
        let errors = user_schema().validate(&json!([1, 2])).unwrap_err();
        assert_eq!(errors.errors()[0].loc_display(), "__root__");
        assert_eq!(errors.errors()[0].kind(), ErrorKind::Dict);
    }

    #[test]
    fn test_extra_fields_ignored_by_default() {
        let record = user_schema().validate(&json!({"id": 1, "unknown": true})).unwrap();
        assert!(record.get("unknown").is_none());
    }

    #[test]
    fn test_extra_fields_forbidden() {
        let schema = Schema::builder("Strict")
            .field(FieldDef::int("id"))
            .extra(ExtraPolicy::Forbid)
            .build()
            .unwrap();
        let errors = schema
            .validate(&json!({"id": "x", "unknown_field": 1}))
            .unwrap_err();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors.errors()[1].loc_display(), "unknown_field");
        assert_eq!(errors.errors()[1].kind(), ErrorKind::Extra);
    }

    #[test]
    fn test_pre_validator_runs_before_coercion() {
        let subject = EnumType::new("Subject", ["math", "art"]).unwrap();
        let schema = Schema::builder("Lesson")
            .field(FieldDef::enumeration("subject", subject).with_validator(validators::lowercase()))
            .build()
            .unwrap();
        let record = schema.validate(&json!({"subject": "MaTh"})).unwrap();
        assert_eq!(record.get("subject"), Some(&FieldValue::Enum("math".into())));
    }

    #[test]
    fn test_pre_validator_failure_skips_coercion() {
        let schema = Schema::builder("Pre")
            .field(FieldDef::int("n").with_validator(FieldValidator::pre("reject", |_| {
                Err("rejected early".to_string())
            })))
            .build()
            .unwrap();
        let errors = schema.validate(&json!({"n": "not a number"})).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.errors()[0].kind(), ErrorKind::Value);
        assert_eq!(errors.errors()[0].message(), "rejected early");
    }

    #[test]
    fn test_type_error_skips_post_validators() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let schema = Schema::builder("Counted")
            .field(FieldDef::int("n").with_validator(FieldValidator::check("count", move |_| {
                seen.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })))
            .build()
            .unwrap();

        assert!(schema.validate(&json!({"n": "abc"})).is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        assert!(schema.validate(&json!({"n": 4})).is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_post_validator_can_transform() {
        let schema = Schema::builder("Doubled")
            .field(FieldDef::int("n").with_validator(FieldValidator::post("double", |v| {
                Ok(FieldValue::Int(v.as_int().unwrap_or(0) * 2))
            })))
            .build()
            .unwrap();
        assert_eq!(schema.validate(&json!({"n": "21"})).unwrap().get_int("n"), Some(42));
    }

    #[test]
    fn test_root_validators_fail_fast() {
        let second_ran = Arc::new(AtomicUsize::new(0));
        let seen = second_ran.clone();
        let schema = Schema::builder("Roots")
            .field(FieldDef::int("n"))
            .root_validator(RootValidator::new("first", |_| Err("first failed".into())))
            .root_validator(RootValidator::new("second", move |_| {
                seen.fetch_add(1, Ordering::SeqCst);
                Err("second failed".into())
            }))
            .build()
            .unwrap();

        let errors = schema.validate(&json!({"n": 1})).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.errors()[0].message(), "first failed");
        assert_eq!(second_ran.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_root_validators_skipped_on_field_errors() {
        let ran = Arc::new(AtomicUsize::new(0));
        let seen = ran.clone();
        let schema = Schema::builder("Roots")
            .field(FieldDef::int("n"))
            .root_validator(RootValidator::new("count", move |_| {
                seen.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }))
            .build()
            .unwrap();

        assert!(schema.validate(&json!({"n": "x"})).is_err());
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_nested_model_errors_prefixed() {
        let inner = Arc::new(
            Schema::builder("Inner")
                .field(FieldDef::int("value"))
                .build()
                .unwrap(),
        );
        let outer = Schema::builder("Outer")
            .field(FieldDef::model("inner", inner))
            .build()
            .unwrap();

        let errors = outer.validate(&json!({"inner": {"value": "x"}})).unwrap_err();
        assert_eq!(errors.model(), "Outer");
        assert_eq!(errors.errors()[0].loc_display(), "inner -> value");

        let errors = outer.validate(&json!({"inner": 5})).unwrap_err();
        assert_eq!(errors.errors()[0].kind(), ErrorKind::Dict);
    }

    #[test]
    fn test_validation_is_deterministic() {
        let schema = user_schema();
        let input = json!({"id": "x", "signup_ts": "bad"});
        let first = schema.validate(&input).unwrap_err();
        for _ in 0..50 {
            assert_eq!(schema.validate(&input).unwrap_err(), first);
        }
    }
}
