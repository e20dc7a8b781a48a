//! Coerce literals to the declared type of a column.
//!
//! | literal \ column | Int     | Uint    | Float   | Bool | String | Bytes | Uuid     |
//! |------------------|---------|---------|---------|------|--------|-------|----------|
//! | Int              | yes     | if >= 0 | exact   |      |        |       |          |
//! | Uint             | in range| yes     | exact   |      |        |       |          |
//! | Float            | integral, in range | integral, in range | yes | | |   |          |
//! | Bool             |         |         |         | yes  |        |       |          |
//! | String           |         |         |         |      | yes    | UTF-8 | if valid |
//! | Bytes            |         |         |         |      |        | yes   |          |
//! | Uuid             |         |         |         |      |        |       | yes      |
//!
//! Any other pairing, and any conversion that would lose information, is a
//! [Error::TypeMismatch]. Values are never clamped or truncated.

use super::{Assignment, Error};
use crate::{
    schema::{Column, Schema},
    value::{Type, Value},
};
use std::collections::HashSet;
use uuid::Uuid;

/// 2^63, the smallest float that does not fit in an i64.
const I64_LIMIT: f64 = 9_223_372_036_854_775_808.0;

/// 2^64, the smallest float that does not fit in a u64.
const U64_LIMIT: f64 = 18_446_744_073_709_551_616.0;

fn int_to_float(v: i64) -> Option<f64> {
    let f = v as f64;
    (f < I64_LIMIT && f as i64 == v).then_some(f)
}

fn uint_to_float(v: u64) -> Option<f64> {
    let f = v as f64;
    (f < U64_LIMIT && f as u64 == v).then_some(f)
}

fn float_to_int(v: f64) -> Option<i64> {
    (v.fract() == 0.0 && (-I64_LIMIT..I64_LIMIT).contains(&v)).then_some(v as i64)
}

fn float_to_uint(v: f64) -> Option<u64> {
    (v.fract() == 0.0 && (0.0..U64_LIMIT).contains(&v)).then_some(v as u64)
}

/// Coerce `literal` to the type of `column`.
///
/// A null literal is accepted unless the column is NOT NULL.
pub fn coerce(column: &Column, literal: &Value) -> Result<Value, Error> {
    if literal.is_null() {
        if !column.nullable {
            return Err(Error::NullConstraint(column.name.clone()));
        }
        return Ok(Value::Null);
    }
    let coerced = match (column.kind, literal) {
        (Type::Bool, Value::Bool(v)) => Some(Value::Bool(*v)),

        (Type::Int, Value::Int(v)) => Some(Value::Int(*v)),
        (Type::Int, Value::Uint(v)) => i64::try_from(*v).ok().map(Value::Int),
        (Type::Int, Value::Float(v)) => float_to_int(*v).map(Value::Int),

        (Type::Uint, Value::Uint(v)) => Some(Value::Uint(*v)),
        (Type::Uint, Value::Int(v)) => u64::try_from(*v).ok().map(Value::Uint),
        (Type::Uint, Value::Float(v)) => float_to_uint(*v).map(Value::Uint),

        (Type::Float, Value::Float(v)) => Some(Value::Float(*v)),
        (Type::Float, Value::Int(v)) => int_to_float(*v).map(Value::Float),
        (Type::Float, Value::Uint(v)) => uint_to_float(*v).map(Value::Float),

        (Type::String, Value::String(v)) => Some(Value::String(v.clone())),

        (Type::Bytes, Value::Bytes(v)) => Some(Value::Bytes(v.clone())),
        (Type::Bytes, Value::String(v)) => Some(Value::Bytes(v.as_bytes().to_vec())),

        (Type::Uuid, Value::Uuid(v)) => Some(Value::Uuid(*v)),
        (Type::Uuid, Value::String(v)) => Uuid::parse_str(v).ok().map(Value::Uuid),

        _ => None,
    };
    coerced.ok_or_else(|| Error::TypeMismatch {
        column: column.name.clone(),
        expected: column.kind,
        found: literal.kind_name(),
        value: literal.to_string(),
    })
}

/// Validate an assignment list against `schema`, returning the coerced values.
///
/// Fails if a column is unknown or assigned more than once, or if any literal cannot be stored in
/// its column.
pub fn validate(schema: &Schema, assignments: &[Assignment]) -> Result<Vec<Assignment>, Error> {
    let mut seen = HashSet::new();
    for (tag, _) in assignments {
        let column = schema.column(*tag).ok_or(Error::UnknownColumn(*tag))?;
        if !seen.insert(*tag) {
            return Err(Error::DuplicateAssignment(column.name.clone()));
        }
    }
    assignments
        .iter()
        .map(|(tag, literal)| {
            let column = schema.column(*tag).ok_or(Error::UnknownColumn(*tag))?;
            Ok((*tag, coerce(column, literal)?))
        })
        .collect()
}
