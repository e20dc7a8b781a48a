//! Conversion between physical map entries and logical rows.
//!
//! # Keyed tables
//!
//! The key tuple holds the primary key columns and the value tuple holds every other column, both
//! in declared order. Every entry decodes to exactly one row.
//!
//! # Keyless tables
//!
//! Tables without a primary key collapse identical rows into a single entry:
//!
//! ```text
//! key:   ( SHA-256(payload) : Bytes, discriminator : Uint )
//! value: ( count : Uint, column 0, column 1, ... )
//! ```
//!
//! The payload is the tuple of every column in declared order (nulls included), so identical rows
//! share a digest. `count` is the number of identical rows the entry stands for and is always at
//! least 1. The discriminator is 0 unless two distinct payloads share a digest, in which case the
//! later one is stored under the next free discriminator.

use crate::{
    schema::{Column, Schema, Tag},
    tuple::Tuple,
    value::{Type, Value},
};
use commonware_codec::Encode;
use commonware_cryptography::{Hasher, Sha256};
use std::{
    collections::BTreeMap,
    fmt::{self, Display},
};
use thiserror::Error;

/// Errors that can occur when converting between entries and rows.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("malformed row: {0}")]
    Malformed(String),
    #[error("invalid duplicate count: {0}")]
    InvalidCount(u64),
    #[error("unknown column tag: {0}")]
    UnknownColumn(Tag),
    #[error("primary key column is null: {0}")]
    NullKey(String),
    #[error("invalid value for {column}: expected {expected}, found {found}")]
    InvalidValue {
        column: String,
        expected: Type,
        found: String,
    },
}

static NULL: Value = Value::Null;

/// A logical row: the (non-null) value of each column, by tag.
///
/// Nulls are never stored, so two rows are equal exactly when every column holds an equal value.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Row(BTreeMap<Tag, Value>);

impl Row {
    /// An empty row (every column null).
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the row with `tag` set to `value`.
    pub fn with(mut self, tag: Tag, value: impl Into<Value>) -> Self {
        self.set(tag, value.into());
        self
    }

    /// Set `tag` to `value` (setting [Value::Null] clears the column).
    pub fn set(&mut self, tag: Tag, value: Value) {
        if value.is_null() {
            self.0.remove(&tag);
        } else {
            self.0.insert(tag, value);
        }
    }

    /// Returns the value of `tag` ([Value::Null] if unset).
    pub fn get(&self, tag: Tag) -> &Value {
        self.0.get(&tag).unwrap_or(&NULL)
    }

    /// Iterate over the non-null columns in tag order.
    pub fn iter(&self) -> impl Iterator<Item = (Tag, &Value)> + '_ {
        self.0.iter().map(|(tag, value)| (*tag, value))
    }

    /// Number of non-null columns.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if every column is null.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (tag, value)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{tag}: {value}")?;
        }
        f.write_str("}")
    }
}

fn check_value(column: &Column, value: &Value) -> Result<(), Error> {
    if value.conforms_to(column.kind) {
        return Ok(());
    }
    Err(Error::InvalidValue {
        column: column.name.clone(),
        expected: column.kind,
        found: value.kind_name(),
    })
}

fn malformed(column: &Column, value: &Value) -> Error {
    Error::Malformed(format!(
        "column {} holds {} but is declared {}",
        column.name,
        value.kind_name(),
        column.kind
    ))
}

/// Decode the row stored in a map entry, along with the number of times it occurs.
///
/// Entries of keyed tables always occur once. Entries of keyless tables carry their count as the
/// first field of `value`.
pub fn decode(key: &Tuple, value: &Tuple, schema: &Schema) -> Result<(Row, u64), Error> {
    let mut row = Row::new();
    if schema.is_keyless() {
        let count = match value.get(0) {
            Some(Value::Uint(count)) if *count > 0 => *count,
            Some(Value::Uint(count)) => {
                return Err(Error::Malformed(format!(
                    "non-positive duplicate count: {count}"
                )))
            }
            Some(other) => {
                return Err(Error::Malformed(format!(
                    "duplicate count is {}",
                    other.kind_name()
                )))
            }
            None => return Err(Error::Malformed("missing duplicate count".into())),
        };
        let payload = &value.values()[1..];
        if payload.len() != schema.columns().len() {
            return Err(Error::Malformed(format!(
                "expected {} fields, found {}",
                schema.columns().len(),
                payload.len()
            )));
        }
        for (column, field) in schema.columns().iter().zip(payload) {
            if !field.conforms_to(column.kind) {
                return Err(malformed(column, field));
            }
            row.set(column.tag, field.clone());
        }
        return Ok((row, count));
    }

    let keys = schema.key_columns().count();
    let values = schema.value_columns().count();
    if key.len() != keys || value.len() != values {
        return Err(Error::Malformed(format!(
            "expected {keys} key and {values} value fields, found {} and {}",
            key.len(),
            value.len()
        )));
    }
    for (column, field) in schema.key_columns().zip(key.values()) {
        if field.is_null() {
            return Err(Error::Malformed(format!("null key column {}", column.name)));
        }
        if !field.conforms_to(column.kind) {
            return Err(malformed(column, field));
        }
        row.set(column.tag, field.clone());
    }
    for (column, field) in schema.value_columns().zip(value.values()) {
        if !field.conforms_to(column.kind) {
            return Err(malformed(column, field));
        }
        row.set(column.tag, field.clone());
    }
    Ok((row, 1))
}

/// Encode `row`, occurring `count` times, as a map entry.
///
/// This is the inverse of [decode]: `decode(encode(r, n, s)) == (r, n)`.
pub fn encode(row: &Row, count: u64, schema: &Schema) -> Result<(Tuple, Tuple), Error> {
    validate(row, schema)?;
    if schema.is_keyless() {
        if count == 0 {
            return Err(Error::InvalidCount(count));
        }
        let payload = payload(row, schema);
        return Ok((keyless_key(&payload, 0), keyless_value(count, &payload)));
    }

    if count != 1 {
        return Err(Error::InvalidCount(count));
    }
    let key = key(row, schema)?;
    let value = schema
        .value_columns()
        .map(|c| row.get(c.tag).clone())
        .collect();
    Ok((key, value))
}

/// Check that every column of `row` is declared by `schema` with a matching type.
pub fn validate(row: &Row, schema: &Schema) -> Result<(), Error> {
    for (tag, value) in row.iter() {
        let column = schema.column(tag).ok_or(Error::UnknownColumn(tag))?;
        check_value(column, value)?;
    }
    Ok(())
}

/// The primary key tuple of `row` in a keyed table.
pub fn key(row: &Row, schema: &Schema) -> Result<Tuple, Error> {
    schema
        .key_columns()
        .map(|c| {
            let value = row.get(c.tag);
            if value.is_null() {
                return Err(Error::NullKey(c.name.clone()));
            }
            Ok(value.clone())
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Tuple::new)
}

/// The payload of `row` in a keyless table: every column in declared order.
pub fn payload(row: &Row, schema: &Schema) -> Tuple {
    schema
        .columns()
        .iter()
        .map(|c| row.get(c.tag).clone())
        .collect()
}

/// The content address of a keyless payload under `discriminator`.
pub fn keyless_key(payload: &Tuple, discriminator: u64) -> Tuple {
    let mut hasher = Sha256::new();
    hasher.update(&payload.encode());
    let digest = hasher.finalize();
    Tuple::new(vec![
        Value::Bytes(digest.to_vec()),
        Value::Uint(discriminator),
    ])
}

/// Splits the value tuple of a keyless entry into its count and payload.
pub(crate) fn keyless_parts(value: &Tuple) -> Option<(u64, Tuple)> {
    match value.values().split_first() {
        Some((Value::Uint(count), payload)) => Some((*count, Tuple::new(payload.to_vec()))),
        _ => None,
    }
}

/// Builds the value tuple of a keyless entry.
pub(crate) fn keyless_value(count: u64, payload: &Tuple) -> Tuple {
    std::iter::once(Value::Uint(count))
        .chain(payload.values().iter().cloned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Column;
    use commonware_macros::test_traced;
    use rand::{rngs::StdRng, Rng, SeedableRng};
    use uuid::Uuid;

    fn keyed() -> Schema {
        Schema::new(vec![
            Column::key(0, "id", Type::Int),
            Column::new(1, "name", Type::String).not_null(),
            Column::new(2, "score", Type::Float),
        ])
        .unwrap()
    }

    fn keyless() -> Schema {
        Schema::new(vec![
            Column::new(0, "a", Type::Int),
            Column::new(1, "b", Type::String),
        ])
        .unwrap()
    }

    /// A schema with a column of every type, keyed by `(shard, id)` when `keyed`.
    fn every_type(keyed: bool) -> Schema {
        let key = |tag, name, kind| {
            if keyed {
                Column::key(tag, name, kind)
            } else {
                Column::new(tag, name, kind)
            }
        };
        Schema::new(vec![
            key(0, "shard", Type::Uint),
            key(1, "id", Type::Uuid),
            Column::new(2, "active", Type::Bool),
            Column::new(3, "delta", Type::Int),
            Column::new(4, "label", Type::String),
            Column::new(5, "weight", Type::Float),
            Column::new(6, "blob", Type::Bytes),
        ])
        .unwrap()
    }

    #[test_traced]
    fn test_keyed_round_trip() {
        let schema = keyed();
        let row = Row::new().with(0, 7i64).with(1, "seven");
        let (key, value) = encode(&row, 1, &schema).unwrap();
        assert_eq!(key, Tuple::new(vec![Value::Int(7)]));
        assert_eq!(value, Tuple::new(vec![Value::from("seven"), Value::Null]));
        assert_eq!(decode(&key, &value, &schema).unwrap(), (row, 1));
    }

    #[test_traced]
    fn test_keyed_encode_invalid() {
        let schema = keyed();
        let row = Row::new().with(0, 7i64);
        assert_eq!(encode(&row, 2, &schema), Err(Error::InvalidCount(2)));
        assert_eq!(
            encode(&Row::new().with(1, "x"), 1, &schema),
            Err(Error::NullKey("id".into()))
        );
        assert_eq!(
            encode(&row.clone().with(9, 1i64), 1, &schema),
            Err(Error::UnknownColumn(9))
        );
        assert!(matches!(
            encode(&row.with(2, "not a float"), 1, &schema),
            Err(Error::InvalidValue { .. })
        ));
    }

    #[test_traced]
    fn test_keyed_decode_malformed() {
        let schema = keyed();
        let key = Tuple::new(vec![Value::Int(1)]);
        let short = Tuple::new(vec![Value::from("x")]);
        assert!(matches!(
            decode(&key, &short, &schema),
            Err(Error::Malformed(_))
        ));
        let wrong = Tuple::new(vec![Value::Int(1), Value::Null]);
        assert!(matches!(
            decode(&key, &wrong, &schema),
            Err(Error::Malformed(_))
        ));
        let null_key = Tuple::new(vec![Value::Null]);
        let value = Tuple::new(vec![Value::from("x"), Value::Null]);
        assert!(matches!(
            decode(&null_key, &value, &schema),
            Err(Error::Malformed(_))
        ));
    }

    #[test_traced]
    fn test_keyless_round_trip() {
        let schema = keyless();
        let row = Row::new().with(0, 1i64).with(1, "x");
        let (key, value) = encode(&row, 3, &schema).unwrap();
        assert_eq!(key.len(), 2);
        assert_eq!(key.get(1), Some(&Value::Uint(0)));
        assert_eq!(value.get(0), Some(&Value::Uint(3)));
        assert_eq!(decode(&key, &value, &schema).unwrap(), (row.clone(), 3));

        // Identical rows share an address, different rows do not.
        let (same, _) = encode(&row, 1, &schema).unwrap();
        assert_eq!(same, key);
        let (other, _) = encode(&row.with(1, "y"), 1, &schema).unwrap();
        assert_ne!(other, key);

        assert_eq!(
            encode(&Row::new(), 0, &schema),
            Err(Error::InvalidCount(0))
        );
    }

    #[test_traced]
    fn test_keyless_decode_malformed() {
        let schema = keyless();
        let key = keyless_key(&Tuple::default(), 0);
        for value in [
            Tuple::default(),
            Tuple::new(vec![Value::Uint(0), Value::Null, Value::Null]),
            Tuple::new(vec![Value::Int(1), Value::Null, Value::Null]),
            Tuple::new(vec![Value::Uint(1), Value::Null]),
            Tuple::new(vec![Value::Uint(1), Value::from("x"), Value::Null]),
        ] {
            assert!(matches!(
                decode(&key, &value, &schema),
                Err(Error::Malformed(_))
            ));
        }
    }

    #[test_traced]
    fn test_random_round_trip() {
        let mut rng = StdRng::seed_from_u64(0);
        let schemas = [keyed(), keyless(), every_type(true), every_type(false)];
        for _ in 0..400 {
            let schema = &schemas[rng.gen_range(0..schemas.len())];
            let mut row = Row::new();
            for column in schema.columns() {
                if !column.nullable || rng.gen_bool(0.7) {
                    let value = match column.kind {
                        Type::Bool => Value::Bool(rng.gen()),
                        Type::Int => Value::Int(rng.gen()),
                        Type::Uint => Value::Uint(rng.gen()),
                        Type::Float => Value::Float(rng.gen()),
                        Type::String => Value::String(format!("s{}", rng.gen::<u16>())),
                        Type::Bytes => {
                            let len = rng.gen_range(0..300);
                            Value::Bytes((0..len).map(|_| rng.gen()).collect())
                        }
                        Type::Uuid => Value::Uuid(Uuid::from_u128(rng.gen())),
                    };
                    row.set(column.tag, value);
                }
            }
            let count = if schema.is_keyless() {
                rng.gen_range(1..5)
            } else {
                1
            };
            let (key, value) = encode(&row, count, schema).unwrap();
            assert_eq!(decode(&key, &value, schema).unwrap(), (row, count));
        }
    }

    #[test_traced]
    fn test_keyless_parts() {
        let payload = Tuple::new(vec![Value::Int(1), Value::Null]);
        let value = keyless_value(4, &payload);
        assert_eq!(keyless_parts(&value), Some((4, payload)));
        assert_eq!(keyless_parts(&Tuple::default()), None);
    }

    #[test_traced]
    fn test_row_nulls_are_not_stored() {
        let mut row = Row::new().with(1, "x");
        row.set(1, Value::Null);
        assert!(row.is_empty());
        assert_eq!(row, Row::new());
        assert_eq!(row.get(1), &Value::Null);
        assert_eq!(
            Row::new().with(0, 1i64).with(1, "a").to_string(),
            "{0: 1, 1: 'a'}"
        );
    }
}
