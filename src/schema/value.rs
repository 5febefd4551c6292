//! Coerced values and validated records.

use chrono::NaiveDateTime;
use serde::ser::{Serialize, Serializer};
use serde_json::{Map, Value};

use super::types::FieldType;

/// ISO-8601 rendering; fractional seconds appear only when non-zero.
pub const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// A value after coercion to its declared type.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Absent or null optional value
    Null,
    Int(i64),
    Str(String),
    DateTime(NaiveDateTime),
    /// Enum member value
    Enum(String),
    List(Vec<FieldValue>),
    /// Nested record
    Model(Record),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            FieldValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// String content of a string or enum value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Str(s) | FieldValue::Enum(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<&NaiveDateTime> {
        match self {
            FieldValue::DateTime(dt) => Some(dt),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[FieldValue]> {
        match self {
            FieldValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            FieldValue::Model(record) => Some(record),
            _ => None,
        }
    }

    /// Whether this value could have been produced by coercing to `ty`.
    pub fn conforms_to(&self, ty: &FieldType) -> bool {
        match (self, ty) {
            (FieldValue::Int(_), FieldType::Int) => true,
            (FieldValue::Str(_), FieldType::Str) => true,
            (FieldValue::DateTime(_), FieldType::DateTime) => true,
            (FieldValue::Enum(member), FieldType::Enum(e)) => e.contains(member),
            (FieldValue::List(items), FieldType::List(element)) => {
                items.iter().all(|item| item.conforms_to(element))
            }
            (FieldValue::Model(record), FieldType::Model(schema)) => schema
                .fields()
                .iter()
                .all(|field| match record.get(field.name()) {
                    Some(FieldValue::Null) => field.is_optional(),
                    Some(value) => value.conforms_to(field.field_type()),
                    None => false,
                }),
            _ => false,
        }
    }

    /// Plain JSON form: datetimes as ISO strings, enums as member values.
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Null => Value::Null,
            FieldValue::Int(i) => Value::from(*i),
            FieldValue::Str(s) | FieldValue::Enum(s) => Value::from(s.as_str()),
            FieldValue::DateTime(dt) => Value::from(dt.format(DATETIME_FORMAT).to_string()),
            FieldValue::List(items) => Value::Array(items.iter().map(FieldValue::to_json).collect()),
            FieldValue::Model(record) => record.to_json(),
        }
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Int(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Str(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Str(value)
    }
}

impl From<NaiveDateTime> for FieldValue {
    fn from(value: NaiveDateTime) -> Self {
        FieldValue::DateTime(value)
    }
}

impl From<Vec<FieldValue>> for FieldValue {
    fn from(value: Vec<FieldValue>) -> Self {
        FieldValue::List(value)
    }
}

impl From<Record> for FieldValue {
    fn from(value: Record) -> Self {
        FieldValue::Model(value)
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldValue::Null => serializer.serialize_unit(),
            FieldValue::Int(i) => serializer.serialize_i64(*i),
            FieldValue::Str(s) | FieldValue::Enum(s) => serializer.serialize_str(s),
            FieldValue::DateTime(dt) => serializer.collect_str(&dt.format(DATETIME_FORMAT)),
            FieldValue::List(items) => serializer.collect_seq(items),
            FieldValue::Model(record) => record.serialize(serializer),
        }
    }
}

/// Validated, coerced record in schema field order.
///
/// Only the engine builds records; callers get read access.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    fields: Vec<(String, FieldValue)>,
}

impl Record {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            fields: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn push(&mut self, name: &str, value: FieldValue) {
        self.fields.push((name.to_string(), value));
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    pub fn get_int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(FieldValue::as_int)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(FieldValue::as_str)
    }

    pub fn get_datetime(&self, name: &str) -> Option<&NaiveDateTime> {
        self.get(name).and_then(FieldValue::as_datetime)
    }

    /// Field names in schema order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Plain JSON object form.
    pub fn to_json(&self) -> Value {
        let map: Map<String, Value> = self
            .fields
            .iter()
            .map(|(name, value)| (name.clone(), value.to_json()))
            .collect();
        Value::Object(map)
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.fields.iter().map(|(name, value)| (name, value)))
    }
}
