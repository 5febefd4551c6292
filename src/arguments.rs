//! Validated operation arguments.
//!
//! [`ValidatedFunction`] binds positional and keyword arguments to a declared
//! parameter list, validates them like record fields and only then invokes the
//! wrapped operation with the coerced arguments. Errors are reported against a
//! model named after the operation in CamelCase.

use serde_json::{Map, Value};

use crate::schema::{
    camel_case, ErrorKind, FieldDef, Record, Schema, SchemaResult, ValidationError,
    ValidationErrors, ValidationResult,
};

const ARGS_LOC: &str = "args";
const KWARGS_LOC: &str = "kwargs";

/// Operation wrapped with argument validation.
pub struct ValidatedFunction<F> {
    name: String,
    schema: Schema,
    func: F,
}

impl<F, R> ValidatedFunction<F>
where
    F: Fn(&Record) -> R,
{
    /// Wraps `func`; parameters bind positionally in the given order.
    pub fn new(name: impl Into<String>, params: Vec<FieldDef>, func: F) -> SchemaResult<Self> {
        let name = name.into();
        let schema = params
            .into_iter()
            .fold(Schema::builder(camel_case(&name)), |builder, param| {
                builder.field(param)
            })
            .build()?;
        Ok(Self { name, schema, func })
    }

    /// Operation name as given.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parameter schema, named after the operation in CamelCase.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Calls with keyword arguments only. `kwargs` must be a JSON object.
    pub fn call(&self, kwargs: &Value) -> ValidationResult<R> {
        match kwargs.as_object() {
            Some(map) => self.call_with(&[], map),
            None => Err(ValidationErrors::new(
                self.schema.name(),
                vec![ValidationError::new(ErrorKind::Dict, "value is not a valid dict").at(KWARGS_LOC)],
            )),
        }
    }

    /// Binds `args` to parameters in order, merges `kwargs`, validates and
    /// invokes the operation.
    ///
    /// # Errors
    ///
    /// Field errors in parameter order, followed by binding errors.
    pub fn call_with(&self, args: &[Value], kwargs: &Map<String, Value>) -> ValidationResult<R> {
        let (bound, binding_errors) = self.bind(args, kwargs);

        let mut errors = Vec::new();
        let record = match self.schema.validate_map(&bound) {
            Ok(record) => Some(record),
            Err(field_errors) => {
                errors.extend(field_errors.into_errors());
                None
            }
        };
        errors.extend(binding_errors);

        match record {
            Some(record) if errors.is_empty() => {
                tracing::trace!(function = %self.name, "arguments validated");
                Ok((self.func)(&record))
            }
            _ => {
                tracing::debug!(
                    function = %self.name,
                    errors = errors.len(),
                    "argument validation failed"
                );
                Err(ValidationErrors::new(self.schema.name(), errors))
            }
        }
    }

    fn bind(
        &self,
        args: &[Value],
        kwargs: &Map<String, Value>,
    ) -> (Map<String, Value>, Vec<ValidationError>) {
        let params = self.schema.fields();
        let mut bound = Map::new();
        let mut errors = Vec::new();

        for (param, value) in params.iter().zip(args) {
            bound.insert(param.name().to_string(), value.clone());
        }
        if args.len() > params.len() {
            errors.push(
                ValidationError::new(
                    ErrorKind::Type,
                    format!(
                        "{} positional argument{} expected but {} given",
                        params.len(),
                        if params.len() == 1 { "" } else { "s" },
                        args.len()
                    ),
                )
                .at(ARGS_LOC),
            );
        }

        for (key, value) in kwargs {
            if self.schema.field(key).is_none() {
                errors.push(
                    ValidationError::new(
                        ErrorKind::Type,
                        format!("unexpected keyword argument: '{}'", key),
                    )
                    .at(KWARGS_LOC),
                );
            } else if bound.contains_key(key) {
                errors.push(
                    ValidationError::new(
                        ErrorKind::Type,
                        format!("multiple values for argument: '{}'", key),
                    )
                    .at(KWARGS_LOC),
                );
            } else {
                bound.insert(key.clone(), value.clone());
            }
        }

        (bound, errors)
    }
}

/// Wraps `func` so every call validates its arguments against `params`.
pub fn validate_arguments<F, R>(
    name: impl Into<String>,
    params: Vec<FieldDef>,
    func: F,
) -> SchemaResult<ValidatedFunction<F>>
where
    F: Fn(&Record) -> R,
{
    ValidatedFunction::new(name, params, func)
}
