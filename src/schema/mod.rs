//! Schema engine
//!
//! A schema is an ordered list of typed fields plus whole-record checks.
//! Validating untyped JSON against it either yields a typed [`Record`] or the
//! complete list of problems as [`ValidationErrors`].
//!
//! # Design Principles
//!
//! - Declaration order drives processing, output and error order
//! - Field errors aggregate; root checks fail fast
//! - Lenient coercion (`"123"` is an int, `1643205440` a datetime)
//! - Schemas are immutable and shareable across threads
//! - Validation is deterministic

mod codec;
mod coerce;
mod definition;
mod errors;
mod loader;
mod types;
mod validator;
pub mod validators;
mod value;

pub use codec::{parse, serialize, SpacedFormatter};
pub use coerce::{from_timestamp, parse_datetime};
pub use definition::{FieldDefinition, RootRule, Rule, SchemaDefinition, TypeDefinition};
pub use errors::{
    ErrorKind, PathSegment, SchemaError, SchemaResult, ValidationError, ValidationErrors,
    ValidationResult, ROOT_LOC,
};
pub use loader::SchemaLoader;
pub use types::{EnumType, ExtraPolicy, FieldDef, FieldType, Schema, SchemaBuilder};
pub use validators::{FieldValidator, RootValidator, Stage};
pub use value::{FieldValue, Record, DATETIME_FORMAT};
pub(crate) use types::camel_case;
