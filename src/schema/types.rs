//! Schema type definitions
//!
//! Supported field types:
//! - int: 64-bit signed integer
//! - string: UTF-8 string
//! - datetime: naive date and time (UTC when derived from an offset or timestamp)
//! - enum: one of a fixed set of string members
//! - list: homogeneous sequence with element type
//! - model: nested record validated by another schema

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::errors::{SchemaError, SchemaResult, ROOT_LOC};
use super::validators::{FieldValidator, RootValidator, Stage};
use super::value::FieldValue;

/// A fixed set of permitted string members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumType {
    name: String,
    members: Vec<String>,
}

impl EnumType {
    /// Creates an enum type; members must be non-empty and unique.
    pub fn new<I, S>(name: impl Into<String>, members: I) -> SchemaResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = name.into();
        let members: Vec<String> = members.into_iter().map(Into::into).collect();

        if members.is_empty() {
            return Err(SchemaError::EmptyEnum { name });
        }

        let mut seen = HashSet::new();
        for member in &members {
            if !seen.insert(member.as_str()) {
                return Err(SchemaError::DuplicateMember {
                    name: name.clone(),
                    member: member.clone(),
                });
            }
        }

        Ok(Self { name, members })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn members(&self) -> &[String] {
        &self.members
    }

    pub fn contains(&self, candidate: &str) -> bool {
        self.members.iter().any(|m| m == candidate)
    }

    /// `'math', 'history', 'art'`
    pub fn permitted(&self) -> String {
        self.members
            .iter()
            .map(|m| format!("'{}'", m))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// `[<Subject.math: 'math'>, ...]`
    pub fn members_repr(&self) -> String {
        let items: Vec<String> = self
            .members
            .iter()
            .map(|m| format!("<{}.{}: '{}'>", self.name, m, m))
            .collect();
        format!("[{}]", items.join(", "))
    }
}

/// Declared type of a field.
#[derive(Debug, Clone)]
pub enum FieldType {
    /// 64-bit signed integer
    Int,
    /// UTF-8 string
    Str,
    /// Date and time without offset
    DateTime,
    /// Fixed set of string members
    Enum(EnumType),
    /// Homogeneous sequence (boxed to allow nesting)
    List(Box<FieldType>),
    /// Nested record with its own schema
    Model(Arc<Schema>),
}

impl FieldType {
    /// Creates a list type with the given element type.
    pub fn list(element: FieldType) -> Self {
        FieldType::List(Box::new(element))
    }

    /// Returns the type name for listings and error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldType::Int => "int",
            FieldType::Str => "string",
            FieldType::DateTime => "datetime",
            FieldType::Enum(_) => "enum",
            FieldType::List(_) => "list",
            FieldType::Model(_) => "model",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Enum(e) => write!(f, "enum[{}]", e.members().join(",")),
            FieldType::List(element) => write!(f, "list[{}]", element),
            FieldType::Model(schema) => write!(f, "model[{}]", schema.name()),
            other => write!(f, "{}", other.type_name()),
        }
    }
}

/// Field definition: name, type, default and validators.
#[derive(Debug, Clone)]
pub struct FieldDef {
    name: String,
    field_type: FieldType,
    default: Option<FieldValue>,
    optional: bool,
    description: Option<String>,
    validators: Vec<FieldValidator>,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            default: None,
            optional: false,
            description: None,
            validators: Vec::new(),
        }
    }

    /// Create an int field
    pub fn int(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Int)
    }

    /// Create a string field
    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Str)
    }

    /// Create a datetime field
    pub fn datetime(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::DateTime)
    }

    /// Create an enum field
    pub fn enumeration(name: impl Into<String>, members: EnumType) -> Self {
        Self::new(name, FieldType::Enum(members))
    }

    /// Create a list field
    pub fn list(name: impl Into<String>, element: FieldType) -> Self {
        Self::new(name, FieldType::list(element))
    }

    /// Create a nested model field
    pub fn model(name: impl Into<String>, schema: Arc<Schema>) -> Self {
        Self::new(name, FieldType::Model(schema))
    }

    /// Accept null and treat absence as null.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Value used when the field is absent. Must conform to the field type.
    pub fn with_default(mut self, value: impl Into<FieldValue>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Informational metadata, never enforced.
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Appends a validator. Pre and post validators each keep declaration order.
    pub fn with_validator(mut self, validator: FieldValidator) -> Self {
        self.validators.push(validator);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field_type(&self) -> &FieldType {
        &self.field_type
    }

    pub fn default(&self) -> Option<&FieldValue> {
        self.default.as_ref()
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// True iff there is no default and the field is not optional.
    pub fn is_required(&self) -> bool {
        self.default.is_none() && !self.optional
    }

    /// Value to use when the field is absent from the input.
    pub fn absent_value(&self) -> Option<FieldValue> {
        match &self.default {
            Some(value) => Some(value.clone()),
            None if self.optional => Some(FieldValue::Null),
            None => None,
        }
    }

    pub fn validators(&self) -> &[FieldValidator] {
        &self.validators
    }

    /// Validators for one stage, in declaration order.
    pub fn validators_for(&self, stage: Stage) -> impl Iterator<Item = &FieldValidator> {
        self.validators.iter().filter(move |v| v.stage() == stage)
    }
}

/// Handling of input keys the schema does not declare.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtraPolicy {
    /// Undeclared keys are dropped
    #[default]
    Ignore,
    /// Undeclared keys are errors
    Forbid,
}

/// Complete schema definition. Immutable once built.
#[derive(Debug, Clone)]
pub struct Schema {
    name: String,
    fields: Vec<FieldDef>,
    root_validators: Vec<RootValidator>,
    extra: ExtraPolicy,
}

impl Schema {
    /// Starts building a schema with the given model name.
    pub fn builder(name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder {
            name: name.into(),
            fields: Vec::new(),
            root_validators: Vec::new(),
            extra: ExtraPolicy::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn root_validators(&self) -> &[RootValidator] {
        &self.root_validators
    }

    pub fn extra(&self) -> ExtraPolicy {
        self.extra
    }

    pub fn required_fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.iter().filter(|f| f.is_required())
    }

    /// Validates the schema structure itself (not a record)
    fn validate_structure(&self) -> SchemaResult<()> {
        if self.name.is_empty() {
            return Err(SchemaError::EmptyName {
                schema: self.name.clone(),
            });
        }

        let mut seen = HashSet::new();
        for field in &self.fields {
            if field.name.is_empty() {
                return Err(SchemaError::EmptyName {
                    schema: self.name.clone(),
                });
            }

            if field.name == ROOT_LOC {
                return Err(SchemaError::ReservedField {
                    schema: self.name.clone(),
                    field: field.name.clone(),
                });
            }

            if !seen.insert(field.name.as_str()) {
                return Err(SchemaError::DuplicateField {
                    schema: self.name.clone(),
                    field: field.name.clone(),
                });
            }

            if let Some(default) = &field.default {
                let fits = default.conforms_to(&field.field_type)
                    || (default.is_null() && field.optional);
                if !fits {
                    return Err(SchemaError::InvalidDefault {
                        schema: self.name.clone(),
                        field: field.name.clone(),
                        reason: format!("expected {}", field.field_type),
                    });
                }
            }
        }

        Ok(())
    }
}

/// Explicit schema construction.
pub struct SchemaBuilder {
    name: String,
    fields: Vec<FieldDef>,
    root_validators: Vec<RootValidator>,
    extra: ExtraPolicy,
}

impl SchemaBuilder {
    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    pub fn root_validator(mut self, validator: RootValidator) -> Self {
        self.root_validators.push(validator);
        self
    }

    pub fn extra(mut self, policy: ExtraPolicy) -> Self {
        self.extra = policy;
        self
    }

    /// Checks the structure and freezes the schema.
    pub fn build(self) -> SchemaResult<Schema> {
        let schema = Schema {
            name: self.name,
            fields: self.fields,
            root_validators: self.root_validators,
            extra: self.extra,
        };
        schema.validate_structure()?;
        Ok(schema)
    }
}

/// `func_with_validate` -> `FuncWithValidate`
pub(crate) fn camel_case(name: &str) -> String {
    name.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subject() -> EnumType {
        EnumType::new("Subject", ["math", "history", "art"]).unwrap()
    }

    fn sample_schema() -> Schema {
        Schema::builder("User")
            .field(FieldDef::int("id"))
            .field(FieldDef::datetime("signup_ts").optional())
            .field(FieldDef::list("friends", FieldType::Int).with_default(FieldValue::List(vec![])))
            .field(FieldDef::string("name").with_default("John Doe"))
            .build()
            .unwrap()
    }

    #[test]
    fn test_schema_structure_valid() {
        let schema = sample_schema();
        assert_eq!(schema.name(), "User");
        assert_eq!(schema.fields().len(), 4);
    }

    #[test]
    fn test_required_flag() {
        let schema = sample_schema();
        let required: Vec<&str> = schema.required_fields().map(|f| f.name()).collect();
        assert_eq!(required, vec!["id"]);
        assert!(!schema.field("signup_ts").unwrap().is_required());
    }

    #[test]
    fn test_field_order_preserved() {
        let schema = sample_schema();
        let names: Vec<&str> = schema.fields().iter().map(|f| f.name()).collect();
        assert_eq!(names, vec!["id", "signup_ts", "friends", "name"]);
    }

    #[test]
    fn test_duplicate_field_rejected() {
        let result = Schema::builder("User")
            .field(FieldDef::int("id"))
            .field(FieldDef::string("id"))
            .build();
        assert!(matches!(result, Err(SchemaError::DuplicateField { .. })));
    }

    #[test]
    fn test_reserved_field_rejected() {
        let result = Schema::builder("User").field(FieldDef::int(ROOT_LOC)).build();
        assert!(matches!(result, Err(SchemaError::ReservedField { .. })));
    }

    #[test]
    fn test_empty_schema_name_rejected() {
        let result = Schema::builder("").field(FieldDef::int("id")).build();
        assert!(matches!(result, Err(SchemaError::EmptyName { .. })));
    }

    #[test]
    fn test_default_must_match_type() {
        let result = Schema::builder("User")
            .field(FieldDef::int("id").with_default("not a number"))
            .build();
        assert!(matches!(result, Err(SchemaError::InvalidDefault { .. })));
    }

    #[test]
    fn test_null_default_needs_optional() {
        let result = Schema::builder("User")
            .field(FieldDef::datetime("ts").with_default(FieldValue::Null))
            .build();
        assert!(result.is_err());

        let result = Schema::builder("User")
            .field(FieldDef::datetime("ts").optional().with_default(FieldValue::Null))
            .build();
        assert!(result.is_ok());
    }

    #[test]
    fn test_enum_requires_members() {
        let empty: Vec<String> = Vec::new();
        assert!(matches!(
            EnumType::new("Subject", empty),
            Err(SchemaError::EmptyEnum { .. })
        ));
        assert!(matches!(
            EnumType::new("Subject", ["art", "art"]),
            Err(SchemaError::DuplicateMember { .. })
        ));
    }

    #[test]
    fn test_enum_rendering() {
        let e = subject();
        assert_eq!(e.permitted(), "'math', 'history', 'art'");
        assert_eq!(
            e.members_repr(),
            "[<Subject.math: 'math'>, <Subject.history: 'history'>, <Subject.art: 'art'>]"
        );
    }

    #[test]
    fn test_field_type_names() {
        assert_eq!(FieldType::Int.type_name(), "int");
        assert_eq!(FieldType::Str.type_name(), "string");
        assert_eq!(FieldType::DateTime.type_name(), "datetime");
        assert_eq!(FieldType::Enum(subject()).type_name(), "enum");
        assert_eq!(FieldType::list(FieldType::Int).type_name(), "list");
        assert_eq!(FieldType::list(FieldType::Int).to_string(), "list[int]");
    }

    #[test]
    fn test_camel_case() {
        assert_eq!(camel_case("func_with_validate"), "FuncWithValidate");
        assert_eq!(camel_case("grade"), "Grade");
        assert_eq!(camel_case("__private_fn"), "PrivateFn");
    }
}
