//! An immutable version of a table.

use crate::{
    map::{self, Map},
    reader::{self, Reader},
    row::{self, Row},
    schema::Schema,
    tuple::Tuple,
};
use commonware_cryptography::sha256::Digest;
use std::sync::Arc;

/// A table's [Map] paired with the [Schema] needed to interpret it.
///
/// Snapshots are never modified: updates derive a new snapshot (see [crate::update::execute]) and
/// leave this one readable.
#[derive(Clone)]
pub struct Snapshot<M: Map> {
    map: M,
    schema: Arc<Schema>,
}

impl<M: Map> Snapshot<M> {
    /// Pair `map` with `schema`.
    pub fn new(map: M, schema: impl Into<Arc<Schema>>) -> Self {
        Self {
            map,
            schema: schema.into(),
        }
    }

    /// The underlying map.
    pub fn map(&self) -> &M {
        &self.map
    }

    /// The schema of the table.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// The content address of the table's map.
    pub fn digest(&self) -> Digest {
        self.map.digest()
    }

    /// Read every row of the table.
    pub fn rows(&self) -> Result<Reader<'_, M>, reader::Error> {
        Reader::open(&self.map, &self.schema)
    }

    /// Returns the row stored at `key` and the number of times it occurs.
    pub fn get(&self, key: &Tuple) -> Result<Option<(Row, u64)>, Error> {
        let Some(value) = self.map.get(key)? else {
            return Ok(None);
        };
        Ok(Some(row::decode(key, &value, &self.schema)?))
    }

    /// Derive a snapshot of the same table over `map`.
    pub(crate) fn with_map(&self, map: M) -> Self {
        Self {
            map,
            schema: self.schema.clone(),
        }
    }
}

/// Errors that can occur when looking up a single row.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("map error: {0}")]
    Map(#[from] map::Error),
    #[error("row error: {0}")]
    Row(#[from] row::Error),
}
