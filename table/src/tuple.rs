//! Ordered sequences of [Value]s used as the keys and values of a table's map.
//!
//! Tuples compare lexicographically, field by field, so a map ordered by its key tuples is ordered
//! by its first key column, then its second, and so on. A shorter tuple sorts before any longer
//! tuple it prefixes.
//!
//! # Format
//!
//! ```text
//! +----------------+---------+---------+-----+
//! | Arity (varint) | Value 0 | Value 1 | ... |
//! +----------------+---------+---------+-----+
//! ```

use crate::value::Value;
use bytes::{Buf, BufMut};
use commonware_codec::{
    util::at_least, varint::UInt, EncodeSize, Error as CodecError, Read, ReadExt, Write,
};
use std::fmt::{self, Display};

/// An immutable, ordered sequence of values.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tuple(Vec<Value>);

impl Tuple {
    /// Create a tuple from `values`.
    pub fn new(values: Vec<Value>) -> Self {
        Self(values)
    }

    /// Number of fields in the tuple.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the tuple has no fields.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the field at `index`, if present.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.0.get(index)
    }

    /// Returns all fields.
    pub fn values(&self) -> &[Value] {
        &self.0
    }
}

impl From<Vec<Value>> for Tuple {
    fn from(values: Vec<Value>) -> Self {
        Self(values)
    }
}

impl FromIterator<Value> for Tuple {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, value) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{value}")?;
        }
        f.write_str(")")
    }
}

impl Write for Tuple {
    fn write(&self, buf: &mut impl BufMut) {
        UInt(self.0.len() as u64).write(buf);
        for value in &self.0 {
            value.write(buf);
        }
    }
}

impl EncodeSize for Tuple {
    fn encode_size(&self) -> usize {
        UInt(self.0.len() as u64).encode_size()
            + self.0.iter().map(EncodeSize::encode_size).sum::<usize>()
    }
}

impl Read for Tuple {
    type Cfg = ();

    fn read_cfg(buf: &mut impl Buf, _: &()) -> Result<Self, CodecError> {
        let arity: u64 = UInt::<u64>::read(buf)?.into();
        let arity =
            usize::try_from(arity).map_err(|_| CodecError::Invalid("Tuple", "arity overflow"))?;
        // Every value occupies at least one byte.
        at_least(buf, arity)?;
        let mut values = Vec::with_capacity(arity);
        for _ in 0..arity {
            values.push(Value::read(buf)?);
        }
        Ok(Self(values))
    }
}
