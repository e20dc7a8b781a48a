//! Typed column values.
//!
//! A [Value] is the unit stored in every field of a [crate::tuple::Tuple]. Values are totally
//! ordered so that tuples built from them can be used as keys of an ordered map:
//!
//! 1. [Value::Null] sorts before everything else.
//! 2. Values of different variants sort by variant (in declaration order).
//! 3. Values of the same variant sort by payload (floats use [f64::total_cmp]).
//!
//! # Format
//!
//! ```text
//! +-------------+-----------------------------------------+
//! | Kind (u8)   | Payload                                 |
//! +-------------+-----------------------------------------+
//!
//! Null:   (empty)
//! Bool:   u8 (0 or 1)
//! Int:    i64 (big-endian)
//! Uint:   u64 (big-endian)
//! Float:  f64 (big-endian bits)
//! String: Len (varint) | UTF-8 bytes
//! Bytes:  Len (varint) | bytes
//! Uuid:   [u8; 16]
//! ```

use bytes::{Buf, BufMut};
use commonware_codec::{
    util::at_least, varint::UInt, EncodeSize, Error as CodecError, FixedSize, Read, ReadExt, Write,
};
use commonware_utils::hex;
use std::{
    cmp::Ordering,
    fmt::{self, Display},
    hash::{Hash, Hasher},
};
use uuid::Uuid;

const NULL_KIND: u8 = 0;
const BOOL_KIND: u8 = 1;
const INT_KIND: u8 = 2;
const UINT_KIND: u8 = 3;
const FLOAT_KIND: u8 = 4;
const STRING_KIND: u8 = 5;
const BYTES_KIND: u8 = 6;
const UUID_KIND: u8 = 7;

/// The declared type of a column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Type {
    Bool,
    Int,
    Uint,
    Float,
    String,
    Bytes,
    Uuid,
}

impl Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Type::Bool => "BOOL",
            Type::Int => "INT",
            Type::Uint => "UINT",
            Type::Float => "FLOAT",
            Type::String => "STRING",
            Type::Bytes => "BYTES",
            Type::Uuid => "UUID",
        };
        f.write_str(name)
    }
}

/// A single typed value (or null).
#[derive(Clone, Debug)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    String(String),
    Bytes(Vec<u8>),
    Uuid(Uuid),
}

impl Value {
    /// Returns the [Type] of the value, or `None` for [Value::Null].
    pub fn kind(&self) -> Option<Type> {
        match self {
            Value::Null => None,
            Value::Bool(_) => Some(Type::Bool),
            Value::Int(_) => Some(Type::Int),
            Value::Uint(_) => Some(Type::Uint),
            Value::Float(_) => Some(Type::Float),
            Value::String(_) => Some(Type::String),
            Value::Bytes(_) => Some(Type::Bytes),
            Value::Uuid(_) => Some(Type::Uuid),
        }
    }

    /// Returns true if the value is [Value::Null].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns true if the value is null or has the given type.
    pub fn conforms_to(&self, kind: Type) -> bool {
        self.kind().map_or(true, |k| k == kind)
    }

    /// Returns a printable name for the value's type (`NULL` for nulls).
    pub fn kind_name(&self) -> String {
        self.kind()
            .map(|k| k.to_string())
            .unwrap_or_else(|| "NULL".to_string())
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Null => NULL_KIND,
            Value::Bool(_) => BOOL_KIND,
            Value::Int(_) => INT_KIND,
            Value::Uint(_) => UINT_KIND,
            Value::Float(_) => FLOAT_KIND,
            Value::String(_) => STRING_KIND,
            Value::Bytes(_) => BYTES_KIND,
            Value::Uuid(_) => UUID_KIND,
        }
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Uint(a), Value::Uint(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => a.total_cmp(b),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::Bytes(a), Value::Bytes(b)) => a.cmp(b),
            (Value::Uuid(a), Value::Uuid(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            Value::Null => {}
            Value::Bool(v) => v.hash(state),
            Value::Int(v) => v.hash(state),
            Value::Uint(v) => v.hash(state),
            // Consistent with `total_cmp`: equal floats have equal bit patterns.
            Value::Float(v) => v.to_bits().hash(state),
            Value::String(v) => v.hash(state),
            Value::Bytes(v) => v.hash(state),
            Value::Uuid(v) => v.hash(state),
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Uint(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::String(v) => write!(f, "'{v}'"),
            Value::Bytes(v) => write!(f, "x'{}'", hex(v)),
            Value::Uuid(v) => write!(f, "'{v}'"),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::Uint(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Value::Uuid(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

fn len_prefixed_size(bytes: &[u8]) -> usize {
    UInt(bytes.len() as u64).encode_size() + bytes.len()
}

fn write_len_prefixed(bytes: &[u8], buf: &mut impl BufMut) {
    UInt(bytes.len() as u64).write(buf);
    buf.put_slice(bytes);
}

fn read_len_prefixed(buf: &mut impl Buf) -> Result<Vec<u8>, CodecError> {
    let len: u64 = UInt::<u64>::read(buf)?.into();
    let len = usize::try_from(len).map_err(|_| CodecError::Invalid("Value", "length overflow"))?;
    at_least(buf, len)?;
    let mut bytes = vec![0; len];
    buf.copy_to_slice(&mut bytes);
    Ok(bytes)
}

impl Write for Value {
    fn write(&self, buf: &mut impl BufMut) {
        self.rank().write(buf);
        match self {
            Value::Null => {}
            Value::Bool(v) => v.write(buf),
            Value::Int(v) => v.write(buf),
            Value::Uint(v) => v.write(buf),
            Value::Float(v) => v.write(buf),
            Value::String(v) => write_len_prefixed(v.as_bytes(), buf),
            Value::Bytes(v) => write_len_prefixed(v, buf),
            Value::Uuid(v) => v.as_bytes().write(buf),
        }
    }
}

impl EncodeSize for Value {
    fn encode_size(&self) -> usize {
        u8::SIZE
            + match self {
                Value::Null => 0,
                Value::Bool(_) => bool::SIZE,
                Value::Int(_) => i64::SIZE,
                Value::Uint(_) => u64::SIZE,
                Value::Float(_) => f64::SIZE,
                Value::String(v) => len_prefixed_size(v.as_bytes()),
                Value::Bytes(v) => len_prefixed_size(v),
                Value::Uuid(_) => 16,
            }
    }
}

impl Read for Value {
    type Cfg = ();

    fn read_cfg(buf: &mut impl Buf, _: &()) -> Result<Self, CodecError> {
        match u8::read(buf)? {
            NULL_KIND => Ok(Value::Null),
            BOOL_KIND => Ok(Value::Bool(bool::read(buf)?)),
            INT_KIND => Ok(Value::Int(i64::read(buf)?)),
            UINT_KIND => Ok(Value::Uint(u64::read(buf)?)),
            FLOAT_KIND => Ok(Value::Float(f64::read(buf)?)),
            STRING_KIND => {
                let bytes = read_len_prefixed(buf)?;
                String::from_utf8(bytes)
                    .map(Value::String)
                    .map_err(|_| CodecError::Invalid("Value", "string is not utf-8"))
            }
            BYTES_KIND => Ok(Value::Bytes(read_len_prefixed(buf)?)),
            UUID_KIND => Ok(Value::Uuid(Uuid::from_bytes(<[u8; 16]>::read(buf)?))),
            kind => Err(CodecError::InvalidEnum(kind)),
        }
    }
}
