//! Declarative schema definitions.
//!
//! A definition is the on-disk form of a schema: field types, defaults and a
//! fixed vocabulary of rules instead of arbitrary callables. Building a
//! definition resolves model references and turns rules into validators.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::coerce::coerce;
use super::errors::{SchemaError, SchemaResult};
use super::types::{camel_case, EnumType, ExtraPolicy, FieldDef, FieldType, Schema};
use super::validators::{self, FieldValidator, RootValidator};
use super::value::FieldValue;

/// Schema as stored in a definition file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaDefinition {
    /// Model name, unique within a loader
    pub name: String,
    /// Undeclared key handling
    #[serde(default)]
    pub extra: ExtraPolicy,
    /// Fields in declaration order
    pub fields: Vec<FieldDefinition>,
    /// Whole-record rules, run in order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub root_rules: Vec<RootRule>,
}

/// Field as stored in a definition file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub name: String,
    #[serde(flatten)]
    pub field_type: TypeDefinition,
    #[serde(default)]
    pub optional: bool,
    /// Raw default, coerced to the field type at build time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<Rule>,
}

/// Field type as stored in a definition file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TypeDefinition {
    Int,
    String,
    Datetime,
    Enum {
        /// Defaults to the field name in CamelCase
        #[serde(default, skip_serializing_if = "Option::is_none")]
        enum_name: Option<String>,
        members: Vec<String>,
    },
    List {
        items: Box<TypeDefinition>,
    },
    /// Reference to another schema by name
    Model {
        schema: String,
    },
}

impl TypeDefinition {
    /// Schema names this type refers to.
    pub fn references(&self) -> Vec<&str> {
        match self {
            TypeDefinition::List { items } => items.references(),
            TypeDefinition::Model { schema } => vec![schema.as_str()],
            _ => Vec::new(),
        }
    }

    fn resolve(
        &self,
        field: &str,
        lookup: &dyn Fn(&str) -> SchemaResult<Arc<Schema>>,
    ) -> SchemaResult<FieldType> {
        Ok(match self {
            TypeDefinition::Int => FieldType::Int,
            TypeDefinition::String => FieldType::Str,
            TypeDefinition::Datetime => FieldType::DateTime,
            TypeDefinition::Enum { enum_name, members } => {
                let name = enum_name.clone().unwrap_or_else(|| camel_case(field));
                FieldType::Enum(EnumType::new(name, members.iter().cloned())?)
            }
            TypeDefinition::List { items } => FieldType::list(items.resolve(field, lookup)?),
            TypeDefinition::Model { schema } => FieldType::Model(lookup(schema)?),
        })
    }
}

/// Built-in field rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum Rule {
    /// Lowercase string input before coercion
    Lowercase,
    /// Uppercase string input before coercion
    Uppercase,
    /// Trim string input before coercion
    Trim,
    /// Inclusive integer bounds
    Range {
        min: Option<i64>,
        max: Option<i64>,
        message: Option<String>,
    },
    /// Inclusive string/list length bounds
    Length {
        min: Option<usize>,
        max: Option<usize>,
        message: Option<String>,
    },
    /// Regular expression a string must match
    Pattern {
        regex: String,
        message: Option<String>,
    },
}

impl Rule {
    pub fn to_validator(&self, schema: &str, field: &str) -> SchemaResult<FieldValidator> {
        let invalid = |reason: String| SchemaError::InvalidRule {
            schema: schema.to_string(),
            field: field.to_string(),
            reason,
        };

        match self {
            Rule::Lowercase => Ok(validators::lowercase()),
            Rule::Uppercase => Ok(validators::uppercase()),
            Rule::Trim => Ok(validators::trim()),
            Rule::Range { min, max, message } => {
                if let (Some(min), Some(max)) = (min, max) {
                    if min > max {
                        return Err(invalid(format!("range min {} exceeds max {}", min, max)));
                    }
                }
                Ok(validators::range(*min, *max, message.clone()))
            }
            Rule::Length { min, max, message } => {
                if let (Some(min), Some(max)) = (min, max) {
                    if min > max {
                        return Err(invalid(format!("length min {} exceeds max {}", min, max)));
                    }
                }
                Ok(validators::length(*min, *max, message.clone()))
            }
            Rule::Pattern { regex, message } => validators::pattern(regex, message.clone())
                .map_err(|e| invalid(format!("invalid regex: {}", e))),
        }
    }
}

/// Built-in whole-record rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum RootRule {
    /// `target` must not exceed `max` while `field` equals `equals`
    CapWhen {
        field: String,
        equals: Value,
        target: String,
        max: i64,
        message: String,
    },
    /// `first` must not be after `second`
    Ascending {
        first: String,
        second: String,
        message: Option<String>,
    },
}

impl RootRule {
    /// Field names the rule reads.
    pub fn fields(&self) -> [&str; 2] {
        match self {
            RootRule::CapWhen { field, target, .. } => [field.as_str(), target.as_str()],
            RootRule::Ascending { first, second, .. } => [first.as_str(), second.as_str()],
        }
    }

    pub fn to_validator(&self) -> RootValidator {
        match self {
            RootRule::CapWhen {
                field,
                equals,
                target,
                max,
                message,
            } => validators::cap_when(field.clone(), equals.clone(), target.clone(), *max, message.clone()),
            RootRule::Ascending {
                first,
                second,
                message,
            } => validators::ascending(first.clone(), second.clone(), message.clone()),
        }
    }
}

impl SchemaDefinition {
    /// Schema names referenced by any field, in field order.
    pub fn references(&self) -> Vec<&str> {
        self.fields
            .iter()
            .flat_map(|f| f.field_type.references())
            .collect()
    }

    /// Builds the engine schema, resolving model references through `lookup`.
    pub fn build<L>(&self, lookup: L) -> SchemaResult<Schema>
    where
        L: Fn(&str) -> SchemaResult<Arc<Schema>>,
    {
        let mut builder = Schema::builder(&self.name).extra(self.extra);

        for field in &self.fields {
            let field_type = field.field_type.resolve(&field.name, &lookup)?;
            let mut def = FieldDef::new(&field.name, field_type);

            if field.optional {
                def = def.optional();
            }
            if let Some(description) = &field.description {
                def = def.describe(description);
            }
            if let Some(raw) = &field.default {
                let value = if raw.is_null() && field.optional {
                    FieldValue::Null
                } else {
                    coerce(def.field_type(), raw).map_err(|errors| SchemaError::InvalidDefault {
                        schema: self.name.clone(),
                        field: field.name.clone(),
                        reason: errors
                            .first()
                            .map(|e| e.message().to_string())
                            .unwrap_or_default(),
                    })?
                };
                def = def.with_default(value);
            }
            for rule in &field.rules {
                def = def.with_validator(rule.to_validator(&self.name, &field.name)?);
            }

            builder = builder.field(def);
        }

        for rule in &self.root_rules {
            for name in rule.fields() {
                if !self.fields.iter().any(|f| f.name == name) {
                    return Err(SchemaError::UnknownField {
                        schema: self.name.clone(),
                        field: name.to_string(),
                    });
                }
            }
            builder = builder.root_validator(rule.to_validator());
        }

        builder.build()
    }
}
