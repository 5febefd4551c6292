//! recordcheck - declarative validation for JSON records
//!
//! Schemas coerce untyped JSON into typed records, report every problem with
//! its location, serialize records to a canonical text form and validate the
//! arguments of wrapped operations.

pub mod arguments;
pub mod cli;
pub mod schema;
