//! Canonical text form of validated records.
//!
//! `{"id": 123, "signup_ts": "2019-06-01T12:22:00", "friends": [1, 2, 3]}`
//!
//! Keys follow schema field order; items are separated by `", "` and keys from
//! values by `": "`. Parsing the text back through the same schema yields an
//! equal record.

use std::fmt;
use std::io;

use serde::Serialize;
use serde_json::ser::Formatter;
use serde_json::Value;

use super::errors::{ErrorKind, ValidationError, ValidationErrors, ValidationResult};
use super::types::Schema;
use super::value::Record;

/// Single-line JSON with a space after every separator.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpacedFormatter;

impl Formatter for SpacedFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }
}

/// Bridges serde_json's byte writer onto a `fmt::Formatter`.
struct FmtWriter<'a, 'b> {
    inner: &'a mut fmt::Formatter<'b>,
}

impl io::Write for FmtWriter<'_, '_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        // serde_json only emits complete UTF-8 sequences
        let text = std::str::from_utf8(buf)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        self.inner
            .write_str(text)
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "formatter error"))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let writer = FmtWriter { inner: f };
        let mut serializer = serde_json::Serializer::with_formatter(writer, SpacedFormatter);
        self.serialize(&mut serializer).map_err(|_| fmt::Error)
    }
}

/// Canonical text of a record.
pub fn serialize(record: &Record) -> String {
    record.to_string()
}

/// Parses canonical (or any JSON object) text and validates it.
pub fn parse(schema: &Schema, text: &str) -> ValidationResult<Record> {
    schema.parse(text)
}

impl Schema {
    /// Parses JSON text and validates the result.
    ///
    /// Malformed JSON is reported as a single `value_error.jsondecode` under
    /// `__root__`.
    pub fn parse(&self, text: &str) -> ValidationResult<Record> {
        let raw: Value = serde_json::from_str(text).map_err(|e| {
            ValidationErrors::new(
                self.name(),
                vec![ValidationError::root(ErrorKind::JsonDecode, e.to_string())],
            )
        })?;
        self.validate(&raw)
    }
}
