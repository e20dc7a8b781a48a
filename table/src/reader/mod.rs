//! Iterate over the logical rows of a table.
//!
//! A [Reader] wraps a [Cursor] over a table's [Map] and decodes each physical entry with
//! [crate::row::decode]. Entries of keyless tables that stand for `n` identical rows are expanded,
//! so the reader emits every logical row exactly as many times as it was inserted.
//!
//! # State
//!
//! The reader is a small state machine:
//!
//! ```text
//!            next entry (count = n)
//!   Idle ---------------------------> Emitting { remaining: n }
//!    ^  \                                 |
//!    |   \ end of map / error             | emit; remaining -= 1
//!    |    v                               |
//!    | Exhausted                          |
//!    +------------------------------------+ remaining == 0
//! ```
//!
//! Readers are forward-only and cannot be restarted: open a new one at the desired position.
//!
//! # Partitions
//!
//! Offsets accepted by [Reader::open_at] and [Reader::open_partition] count _physical entries_,
//! not logical rows. A partition therefore always starts at the beginning of a run of duplicates
//! and emits the whole run, and the partitions returned by [partitions] together emit exactly the
//! rows of a full scan (no run is split or attributed to two partitions).
//!
//! # Ranges
//!
//! Scans over arbitrary key ranges are not supported: [Reader::open_range] always fails with
//! [Error::NotImplemented].

use crate::{
    map::{self, Cursor, Map},
    row::{self, Row},
    schema::Schema,
    tuple::Tuple,
};
use std::{
    num::{NonZeroU64, NonZeroUsize},
    ops::Bound,
};
use thiserror::Error;

/// Errors that can occur when reading rows.
#[derive(Debug, Error)]
pub enum Error {
    #[error("not implemented: {0}")]
    NotImplemented(&'static str),
    #[error("invalid partition: [{0}, {1})")]
    InvalidPartition(u64, u64),
    #[error("row error: {0}")]
    Row(#[from] row::Error),
    #[error("map error: {0}")]
    Map(#[from] map::Error),
}

/// Where a [Reader] is in its current entry.
#[derive(Debug)]
enum State {
    /// No row is buffered; the next call reads an entry.
    Idle,

    /// `row` (stored at `key`) must still be emitted `remaining` times.
    ///
    /// # Invariant
    ///
    /// `remaining` is never zero.
    Emitting {
        key: Tuple,
        row: Row,
        remaining: u64,
    },

    /// The cursor returned its last entry (or failed).
    Exhausted,
}

/// A lazy, forward-only sequence of the logical rows of a table.
pub struct Reader<'a, M: Map + 'a> {
    cursor: M::Cursor<'a>,
    schema: &'a Schema,
    state: State,

    /// Physical entries the reader may still consume (`None` if unbounded).
    limit: Option<u64>,
}

impl<'a, M: Map + 'a> Reader<'a, M> {
    fn new(cursor: M::Cursor<'a>, schema: &'a Schema, limit: Option<u64>) -> Self {
        Self {
            cursor,
            schema,
            state: State::Idle,
            limit,
        }
    }

    /// Read every row of `map`, from the beginning.
    pub fn open(map: &'a M, schema: &'a Schema) -> Result<Self, Error> {
        Ok(Self::new(map.iter()?, schema, None))
    }

    /// Read every row of `map`, from the beginning, fetching `read_ahead` entries at a time.
    pub fn open_buffered(
        map: &'a M,
        schema: &'a Schema,
        read_ahead: NonZeroUsize,
    ) -> Result<Self, Error> {
        Ok(Self::new(map.iter_buffered(read_ahead)?, schema, None))
    }

    /// Read rows starting at the physical entry at position `offset`.
    ///
    /// Because `offset` counts entries (not rows), the reader never starts inside a run of
    /// duplicates.
    pub fn open_at(map: &'a M, schema: &'a Schema, offset: u64) -> Result<Self, Error> {
        Ok(Self::new(map.iter_at(offset)?, schema, None))
    }

    /// Read the rows of the physical entries in `[start, end)`.
    ///
    /// Every entry in the partition is expanded in full, so partitions that cover `[0, len)`
    /// without overlap emit each row exactly once. `end` is clamped to the length of the map.
    pub fn open_partition(
        map: &'a M,
        schema: &'a Schema,
        start: u64,
        end: u64,
    ) -> Result<Self, Error> {
        if start > end {
            return Err(Error::InvalidPartition(start, end));
        }
        let end = end.min(map.len());
        let start = start.min(end);
        Ok(Self::new(map.iter_at(start)?, schema, Some(end - start)))
    }

    /// Read rows starting at the first entry whose key is greater than or equal to `key`.
    pub fn open_from(map: &'a M, schema: &'a Schema, key: &Tuple) -> Result<Self, Error> {
        Ok(Self::new(map.iter_from(key)?, schema, None))
    }

    /// Read the rows of entries within `ranges`.
    ///
    /// Not supported: always returns [Error::NotImplemented] rather than risk returning rows outside
    /// of (or missing rows within) the requested ranges.
    pub fn open_range(
        _map: &'a M,
        _schema: &'a Schema,
        _ranges: &[(Bound<Tuple>, Bound<Tuple>)],
    ) -> Result<Self, Error> {
        Err(Error::NotImplemented("reading rows by key range"))
    }

    /// The schema rows are decoded with.
    pub fn schema(&self) -> &Schema {
        self.schema
    }

    /// Number of copies of the current row still to be emitted before the next entry is read.
    pub fn pending(&self) -> u64 {
        match &self.state {
            State::Emitting { remaining, .. } => *remaining,
            State::Idle | State::Exhausted => 0,
        }
    }

    /// Returns the next row along with the key of the entry it is stored in.
    ///
    /// Returns `Ok(None)` once all rows have been emitted. An error also ends the sequence.
    pub fn next_keyed(&mut self) -> Result<Option<(Tuple, Row)>, Error> {
        loop {
            match &mut self.state {
                State::Exhausted => return Ok(None),
                State::Emitting {
                    key,
                    row,
                    remaining,
                } if *remaining > 1 => {
                    *remaining -= 1;
                    return Ok(Some((key.clone(), row.clone())));
                }
                State::Emitting { .. } => {
                    // Last copy: hand over the buffered row.
                    let State::Emitting { key, row, .. } =
                        std::mem::replace(&mut self.state, State::Idle)
                    else {
                        unreachable!("state checked above");
                    };
                    return Ok(Some((key, row)));
                }
                State::Idle => self.advance()?,
            }
        }
    }

    /// Move out of [State::Idle] by reading the next entry.
    fn advance(&mut self) -> Result<(), Error> {
        let entry = match self.pull() {
            Ok(entry) => entry,
            Err(err) => {
                self.state = State::Exhausted;
                return Err(err);
            }
        };
        let Some((key, value)) = entry else {
            self.state = State::Exhausted;
            return Ok(());
        };
        match row::decode(&key, &value, self.schema) {
            Ok((row, count)) => {
                self.state = State::Emitting {
                    key,
                    row,
                    remaining: count,
                };
                Ok(())
            }
            Err(err) => {
                self.state = State::Exhausted;
                Err(err.into())
            }
        }
    }

    fn pull(&mut self) -> Result<Option<(Tuple, Tuple)>, Error> {
        if self.limit == Some(0) {
            return Ok(None);
        }
        let entry = self.cursor.next()?;
        if let (Some(_), Some(limit)) = (&entry, &mut self.limit) {
            *limit -= 1;
        }
        Ok(entry)
    }
}

impl<'a, M: Map + 'a> Iterator for Reader<'a, M> {
    type Item = Result<Row, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_keyed()
            .map(|entry| entry.map(|(_, row)| row))
            .transpose()
    }
}

/// Split `len` physical entries into at most `parts` contiguous `[start, end)` partitions of
/// (nearly) equal size.
pub fn partitions(len: u64, parts: NonZeroU64) -> Vec<(u64, u64)> {
    let parts = parts.get().min(len.max(1));
    let (size, extra) = (len / parts, len % parts);
    let mut start = 0;
    (0..parts)
        .map(|i| {
            let end = start + size + u64::from(i < extra);
            let partition = (start, end);
            start = end;
            partition
        })
        .collect()
}
