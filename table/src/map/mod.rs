//! An immutable, ordered, content-addressed map from key [Tuple]s to value [Tuple]s.
//!
//! A [Map] is never modified in place: [Map::apply] derives a new map from a diff and leaves the
//! original untouched, so any number of readers can hold (and iterate) older versions while a new
//! version is derived. Two maps with identical contents have identical [Map::digest]s.
//!
//! The table core only depends on the [Map] and [Cursor] traits, so it runs unchanged over any
//! backing store that can provide ordered iteration and point lookups. [mem::Map] is an in-memory
//! implementation.

use crate::tuple::Tuple;
use commonware_cryptography::sha256::Digest;
use std::{collections::BTreeMap, num::NonZeroUsize};
use thiserror::Error;

pub mod mem;

/// Errors that can occur when interacting with a [Map].
#[derive(Debug, Error)]
pub enum Error {
    #[error("codec error: {0}")]
    Codec(#[from] commonware_codec::Error),
    #[error("offset out of range: {0} > {1}")]
    OffsetOutOfRange(u64, u64),
}

/// A set of changes to apply to a [Map].
///
/// If the value is `Some`, the key is being created or updated. If the value is `None`, the key is
/// being deleted. Ordered so that changes are applied deterministically.
pub type Diff = BTreeMap<Tuple, Option<Tuple>>;

/// A forward-only cursor over the entries of a [Map], in key order.
pub trait Cursor {
    /// Returns the next entry, or `None` once the cursor is exhausted.
    fn next(&mut self) -> Result<Option<(Tuple, Tuple)>, Error>;
}

/// An immutable ordered map.
pub trait Map: Clone {
    /// The cursor returned by the iteration methods.
    type Cursor<'a>: Cursor
    where
        Self: 'a;

    /// Number of entries in the map.
    fn len(&self) -> u64;

    /// Returns true if the map has no entries.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the value stored at `key`, if any.
    fn get(&self, key: &Tuple) -> Result<Option<Tuple>, Error>;

    /// Iterate over all entries, one at a time.
    fn iter(&self) -> Result<Self::Cursor<'_>, Error>;

    /// Iterate over all entries, fetching `read_ahead` entries at a time.
    fn iter_buffered(&self, read_ahead: NonZeroUsize) -> Result<Self::Cursor<'_>, Error>;

    /// Iterate starting at the entry with (zero-based) position `offset`.
    ///
    /// An `offset` equal to [Map::len] yields an empty cursor. Larger offsets are an error.
    fn iter_at(&self, offset: u64) -> Result<Self::Cursor<'_>, Error>;

    /// Iterate starting at the first entry whose key is greater than or equal to `key`.
    fn iter_from(&self, key: &Tuple) -> Result<Self::Cursor<'_>, Error>;

    /// Derive a new map by applying `diff` to this one.
    fn apply(&self, diff: Diff) -> Result<Self, Error>;

    /// The content address of the map.
    fn digest(&self) -> Digest;
}
