//! Error types for record validation.
//!
//! Two families live here:
//! - `ValidationErrors`: data-level failures produced by a validation call.
//!   These are values returned to the caller, never process-fatal.
//! - `SchemaError`: construction-time failures (bad schema, bad definition
//!   file, registry conflicts).
//!
//! Diagnostic format:
//!
//! ```text
//! 2 validation errors for User
//! id
//!   value is not a valid integer (type=type_error.integer)
//! signup_ts
//!   invalid datetime format (type=value_error.datetime)
//! ```

use std::fmt;

use serde_json::{json, Value};
use thiserror::Error;

/// Sentinel location used for whole-record failures.
pub const ROOT_LOC: &str = "__root__";

/// Error kinds with their stable type codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Required field absent
    Missing,
    /// Null given for a non-optional field
    NoneNotAllowed,
    /// Value not coercible to integer
    Integer,
    /// Value not coercible to string
    Str,
    /// Value is not a permitted enum member
    Enum,
    /// Value is not a sequence
    List,
    /// Value is not a mapping
    Dict,
    /// Value not parseable as datetime
    DateTime,
    /// Undeclared field under a forbidding schema
    Extra,
    /// Custom validator rejection (field or root)
    Value,
    /// Malformed JSON text
    JsonDecode,
    /// Argument binding failure
    Type,
}

impl ErrorKind {
    /// Returns the type code shown in diagnostics.
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::Missing => "value_error.missing",
            ErrorKind::NoneNotAllowed => "type_error.none.not_allowed",
            ErrorKind::Integer => "type_error.integer",
            ErrorKind::Str => "type_error.str",
            ErrorKind::Enum => "type_error.enum",
            ErrorKind::List => "type_error.list",
            ErrorKind::Dict => "type_error.dict",
            ErrorKind::DateTime => "value_error.datetime",
            ErrorKind::Extra => "value_error.extra",
            ErrorKind::Value => "value_error",
            ErrorKind::JsonDecode => "value_error.jsondecode",
            ErrorKind::Type => "type_error",
        }
    }

    /// Whether this kind comes from a failed type coercion.
    pub fn is_type_error(&self) -> bool {
        self.code().starts_with("type_error")
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// One step of an error location.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// A field (or argument) name
    Field(String),
    /// A list index
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Field(name) => write!(f, "{}", name),
            PathSegment::Index(i) => write!(f, "{}", i),
        }
    }
}

impl From<&str> for PathSegment {
    fn from(name: &str) -> Self {
        PathSegment::Field(name.to_string())
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        PathSegment::Index(index)
    }
}

/// A single failure at a location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    loc: Vec<PathSegment>,
    message: String,
    kind: ErrorKind,
    context: Vec<(String, String)>,
}

impl ValidationError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            loc: Vec::new(),
            message: message.into(),
            kind,
            context: Vec::new(),
        }
    }

    /// Required field absent.
    pub fn missing(field: &str) -> Self {
        Self::new(ErrorKind::Missing, "field required").at(field)
    }

    /// Whole-record failure located at `__root__`.
    pub fn root(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::new(kind, message).at(ROOT_LOC)
    }

    /// Custom validator rejection.
    pub fn value(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Value, message)
    }

    /// Prepends a segment to the location.
    pub fn at(mut self, segment: impl Into<PathSegment>) -> Self {
        self.loc.insert(0, segment.into());
        self
    }

    /// Attaches a context entry rendered after the type code.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.push((key.into(), value.into()));
        self
    }

    pub fn loc(&self) -> &[PathSegment] {
        &self.loc
    }

    /// Location rendered as `a -> b -> 0`.
    pub fn loc_display(&self) -> String {
        self.loc
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join(" -> ")
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn context(&self) -> &[(String, String)] {
        &self.context
    }

    /// Structured form used by the CLI.
    pub fn to_json(&self) -> Value {
        let loc: Vec<Value> = self
            .loc
            .iter()
            .map(|s| match s {
                PathSegment::Field(name) => Value::from(name.as_str()),
                PathSegment::Index(i) => Value::from(*i),
            })
            .collect();
        json!({
            "loc": loc,
            "msg": self.message,
            "type": self.kind.code(),
        })
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\n  {} (type={}",
            self.loc_display(),
            self.message,
            self.kind.code()
        )?;
        for (key, value) in &self.context {
            write!(f, "; {}={}", key, value)?;
        }
        write!(f, ")")
    }
}

/// All failures of one validation call, tagged with the model name.
///
/// Never empty when returned from the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors {
    model: String,
    errors: Vec<ValidationError>,
}

impl ValidationErrors {
    pub fn new(model: impl Into<String>, errors: Vec<ValidationError>) -> Self {
        Self {
            model: model.into(),
            errors,
        }
    }

    /// Model (schema or operation) name the errors are reported for.
    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.errors.iter()
    }

    pub fn into_errors(self) -> Vec<ValidationError> {
        self.errors
    }

    /// Structured form used by the CLI.
    pub fn to_json(&self) -> Value {
        Value::Array(self.errors.iter().map(ValidationError::to_json).collect())
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self.errors.len();
        let noun = if count == 1 { "error" } else { "errors" };
        write!(f, "{} validation {} for {}", count, noun, self.model)?;
        for error in &self.errors {
            write!(f, "\n{}", error)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

impl<'a> IntoIterator for &'a ValidationErrors {
    type Item = &'a ValidationError;
    type IntoIter = std::slice::Iter<'a, ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}

/// Result of a validation call.
pub type ValidationResult<T> = Result<T, ValidationErrors>;

/// Schema construction and registry errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    // ==================
    // Construction
    // ==================
    /// Schema or field declared without a name
    #[error("schema '{schema}': names must not be empty")]
    EmptyName { schema: String },

    /// Field declared twice
    #[error("schema '{schema}' declares field '{field}' more than once")]
    DuplicateField { schema: String, field: String },

    /// Field uses the `__root__` sentinel name
    #[error("schema '{schema}': field name '{field}' is reserved")]
    ReservedField { schema: String, field: String },

    /// Enum declared without members
    #[error("enum '{name}' must declare at least one member")]
    EmptyEnum { name: String },

    /// Enum declares a member twice
    #[error("enum '{name}' declares member '{member}' more than once")]
    DuplicateMember { name: String, member: String },

    /// Default value does not conform to the declared type
    #[error("schema '{schema}': default for field '{field}' is invalid: {reason}")]
    InvalidDefault {
        schema: String,
        field: String,
        reason: String,
    },

    /// Rule parameters are unusable
    #[error("schema '{schema}': invalid rule on '{field}': {reason}")]
    InvalidRule {
        schema: String,
        field: String,
        reason: String,
    },

    /// Root rule references a field the schema lacks
    #[error("schema '{schema}': rule references unknown field '{field}'")]
    UnknownField { schema: String, field: String },

    // ==================
    // Registry
    // ==================
    /// Schema name registered twice
    #[error("schema '{0}' is already registered")]
    AlreadyRegistered(String),

    /// Schema name not found
    #[error("schema '{0}' not found")]
    UnknownSchema(String),

    /// Model references form a cycle
    #[error("schema reference cycle through '{0}'")]
    CyclicReference(String),

    /// Definition file could not be read or decoded
    #[error("malformed schema file '{path}': {reason}")]
    Malformed { path: String, reason: String },
}

impl SchemaError {
    /// Stable error code.
    pub fn code(&self) -> &'static str {
        match self {
            SchemaError::EmptyName { .. } => "RC_SCHEMA_EMPTY_NAME",
            SchemaError::DuplicateField { .. } => "RC_SCHEMA_DUPLICATE_FIELD",
            SchemaError::ReservedField { .. } => "RC_SCHEMA_RESERVED_FIELD",
            SchemaError::EmptyEnum { .. } => "RC_SCHEMA_EMPTY_ENUM",
            SchemaError::DuplicateMember { .. } => "RC_SCHEMA_DUPLICATE_MEMBER",
            SchemaError::InvalidDefault { .. } => "RC_SCHEMA_INVALID_DEFAULT",
            SchemaError::InvalidRule { .. } => "RC_SCHEMA_INVALID_RULE",
            SchemaError::UnknownField { .. } => "RC_SCHEMA_UNKNOWN_FIELD",
            SchemaError::AlreadyRegistered(_) => "RC_SCHEMA_ALREADY_REGISTERED",
            SchemaError::UnknownSchema(_) => "RC_SCHEMA_UNKNOWN",
            SchemaError::CyclicReference(_) => "RC_SCHEMA_CYCLE",
            SchemaError::Malformed { .. } => "RC_SCHEMA_MALFORMED",
        }
    }
}

/// Result type for schema construction and registry operations
pub type SchemaResult<T> = Result<T, SchemaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_error_uses_singular_noun() {
        let errors = ValidationErrors::new("User", vec![ValidationError::missing("id")]);
        assert_eq!(
            errors.to_string(),
            "1 validation error for User\nid\n  field required (type=value_error.missing)"
        );
    }

    #[test]
    fn test_multiple_errors_use_plural_noun() {
        let errors = ValidationErrors::new(
            "User",
            vec![
                ValidationError::new(ErrorKind::Integer, "value is not a valid integer").at("id"),
                ValidationError::new(ErrorKind::DateTime, "invalid datetime format")
                    .at("signup_ts"),
            ],
        );
        assert_eq!(
            errors.to_string(),
            "2 validation errors for User\nid\n  value is not a valid integer (type=type_error.integer)\n\
             signup_ts\n  invalid datetime format (type=value_error.datetime)"
        );
    }

    #[test]
    fn test_nested_location_display() {
        let err = ValidationError::value("bad").at(2usize).at("friends");
        assert_eq!(err.loc_display(), "friends -> 2");
    }

    #[test]
    fn test_context_rendered_after_type() {
        let err = ValidationError::new(ErrorKind::Enum, "nope")
            .at("subject")
            .with_context("enum_values", "[a]");
        assert_eq!(err.to_string(), "subject\n  nope (type=type_error.enum; enum_values=[a])");
    }

    #[test]
    fn test_root_error_location() {
        let err = ValidationError::root(ErrorKind::Value, "Art grade cannot exceed 90");
        assert_eq!(err.loc_display(), ROOT_LOC);
    }

    #[test]
    fn test_error_json_shape() {
        let err = ValidationError::value("bad").at(1usize).at("tags");
        assert_eq!(
            err.to_json(),
            json!({"loc": ["tags", 1], "msg": "bad", "type": "value_error"})
        );
    }

    #[test]
    fn test_type_error_classification() {
        assert!(ErrorKind::Enum.is_type_error());
        assert!(ErrorKind::NoneNotAllowed.is_type_error());
        assert!(!ErrorKind::DateTime.is_type_error());
        assert!(!ErrorKind::Missing.is_type_error());
    }

    #[test]
    fn test_schema_error_codes() {
        assert_eq!(
            SchemaError::AlreadyRegistered("User".into()).code(),
            "RC_SCHEMA_ALREADY_REGISTERED"
        );
        let err = SchemaError::DuplicateField {
            schema: "User".into(),
            field: "id".into(),
        };
        assert!(err.to_string().contains("more than once"));
    }
}
