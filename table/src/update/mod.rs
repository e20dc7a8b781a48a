//! Apply a list of assignments to every row of a table that matches a predicate.
//!
//! [execute] derives a new [Snapshot] from an existing one. Every step that can fail runs before
//! anything is written, and the new map is produced by a single [Map::apply], so an update either
//! takes effect in full or not at all (the input snapshot is never modified).
//!
//! ```text
//!   validate assignments --> scan (or point lookup) --> stage changes
//!                                                            |
//!           new snapshot <-- apply diff <-- check collisions +
//! ```
//!
//! # Keyless tables
//!
//! Updating one copy of a duplicated row moves a single unit of count from the old entry to the
//! entry of the new payload: the old entry is removed once its count reaches zero, and a new row
//! identical to an existing (or another updated) row is merged into that row's entry.

use crate::{
    map::{self, Diff, Map},
    reader,
    row::{self, Row},
    schema::{Schema, Tag},
    snapshot::{self, Snapshot},
    tuple::Tuple,
    value::{Type, Value},
};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, warn};

pub mod coerce;
pub mod collision;
pub mod filter;

pub use filter::{BoundFilter, Filter, Op, Predicate};

/// The new value of a column.
pub type Assignment = (Tag, Value);

/// Errors that can occur when executing an update.
#[derive(Debug, Error)]
pub enum Error {
    #[error("column assigned more than once: {0}")]
    DuplicateAssignment(String),
    #[error("unknown column tag: {0}")]
    UnknownColumn(Tag),
    #[error("column cannot be null: {0}")]
    NullConstraint(String),
    #[error("type mismatch for {column}: expected {expected}, found {found} {value}")]
    TypeMismatch {
        column: String,
        expected: Type,
        found: String,
        value: String,
    },
    #[error("primary key collision: {0}")]
    PrimaryKeyCollision(Tuple),
    #[error("duplicate count overflow")]
    CountOverflow,
    #[error("reader error: {0}")]
    Reader(#[from] reader::Error),
    #[error("snapshot error: {0}")]
    Snapshot(#[from] snapshot::Error),
    #[error("row error: {0}")]
    Row(#[from] row::Error),
    #[error("map error: {0}")]
    Map(#[from] map::Error),
}

/// A pending modification of a single logical row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Change {
    /// The key of the entry the row is read from.
    pub old_key: Tuple,

    /// The key of the entry the updated row is written to (for keyless tables, the address of its
    /// payload under discriminator 0).
    pub new_key: Tuple,

    /// The updated row.
    pub row: Row,
}

/// The result of a successful [execute].
pub struct Outcome<M: Map> {
    /// The table after the update.
    pub snapshot: Snapshot<M>,

    /// Logical rows that matched and were modified.
    pub rows_updated: u64,

    /// Logical rows that matched but already held the assigned values.
    pub rows_unchanged: u64,

    /// Always zero: rows that fail are never skipped.
    pub errors_ignored: u64,
}

/// Set `assignments` on every row of `snapshot` accepted by `predicate`.
///
/// Assignments are validated and coerced before any row is read. If the predicate pins every
/// primary key column of a keyed table, only that row is looked up; otherwise the whole table is
/// scanned in key order.
pub fn execute<M: Map, P: Predicate + ?Sized>(
    snapshot: &Snapshot<M>,
    predicate: &P,
    assignments: &[Assignment],
) -> Result<Outcome<M>, Error> {
    let schema = snapshot.schema();
    let assignments = coerce::validate(schema, assignments)?;

    // Stage a change for every matching row
    let mut staged = Vec::new();
    let mut rows_unchanged = 0u64;
    let mut visit = |key: Tuple, row: Row| -> Result<(), Error> {
        if !predicate.matches(&row)? {
            return Ok(());
        }
        let mut updated = row.clone();
        for (tag, value) in &assignments {
            updated.set(*tag, value.clone());
        }
        if updated == row {
            rows_unchanged += 1;
            return Ok(());
        }
        let new_key = if schema.is_keyless() {
            row::keyless_key(&row::payload(&updated, schema), 0)
        } else {
            row::key(&updated, schema)?
        };
        staged.push(Change {
            old_key: key,
            new_key,
            row: updated,
        });
        Ok(())
    };
    match predicate.lookup_key(schema).filter(|_| !schema.is_keyless()) {
        Some(key) => {
            if let Some((row, _)) = snapshot.get(&key)? {
                visit(key, row)?;
            }
        }
        None => {
            let mut rows = snapshot.rows()?;
            while let Some((key, row)) = rows.next_keyed()? {
                visit(key, row)?;
            }
        }
    }
    let rows_updated = staged.len() as u64;
    debug!(rows_updated, rows_unchanged, "staged update");

    if staged.is_empty() {
        return Ok(Outcome {
            snapshot: snapshot.clone(),
            rows_updated,
            rows_unchanged,
            errors_ignored: 0,
        });
    }

    // Build the diff
    let diff = if schema.is_keyless() {
        keyless_diff(snapshot.map(), schema, &staged)?
    } else {
        collision::check(snapshot.map(), &staged)?;
        keyed_diff(schema, &staged)?
    };

    // Commit
    let entries = diff.len();
    let map = snapshot.map().apply(diff)?;
    let snapshot = snapshot.with_map(map);
    debug!(entries, digest = %snapshot.digest(), "committed update");
    Ok(Outcome {
        snapshot,
        rows_updated,
        rows_unchanged,
        errors_ignored: 0,
    })
}

/// Remove every old key, then write every updated row under its (unique) new key.
fn keyed_diff(schema: &Schema, staged: &[Change]) -> Result<Diff, Error> {
    let mut diff = Diff::new();
    for change in staged {
        diff.insert(change.old_key.clone(), None);
    }
    for change in staged {
        let (key, value) = row::encode(&change.row, 1, schema)?;
        diff.insert(key, Some(value));
    }
    Ok(diff)
}

/// The state of a keyless entry touched by an update.
struct Entry {
    count: u64,
    payload: Tuple,
}

/// Returns the entry stored at `key`, reading it from `map` the first time it is touched.
fn load<'a, M: Map>(
    map: &M,
    entries: &'a mut BTreeMap<Tuple, Entry>,
    key: &Tuple,
) -> Result<Option<&'a mut Entry>, Error> {
    if !entries.contains_key(key) {
        if let Some(value) = map.get(key)? {
            let (count, payload) = row::keyless_parts(&value)
                .ok_or_else(|| row::Error::Malformed("missing duplicate count".into()))?;
            entries.insert(key.clone(), Entry { count, payload });
        }
    }
    Ok(entries.get_mut(key))
}

/// Move one unit of count per staged change from its old entry to the entry of its new payload.
fn keyless_diff<M: Map>(map: &M, schema: &Schema, staged: &[Change]) -> Result<Diff, Error> {
    let mut entries = BTreeMap::new();
    for change in staged {
        let entry = load(map, &mut entries, &change.old_key)?
            .ok_or_else(|| row::Error::Malformed("updated row has no entry".into()))?;
        entry.count = entry
            .count
            .checked_sub(1)
            .ok_or(row::Error::InvalidCount(0))?;
    }

    for change in staged {
        let payload = row::payload(&change.row, schema);
        let mut discriminator = 0u64;
        loop {
            let key = row::keyless_key(&payload, discriminator);
            let occupied = match load(map, &mut entries, &key)? {
                Some(entry) if entry.payload == payload => {
                    entry.count = entry.count.checked_add(1).ok_or(Error::CountOverflow)?;
                    break;
                }
                Some(_) => true,
                None => false,
            };
            if !occupied {
                entries.insert(key, Entry { count: 1, payload });
                break;
            }
            warn!(discriminator, "keyless digest collision");
            discriminator = discriminator.checked_add(1).ok_or(Error::CountOverflow)?;
        }
    }

    Ok(entries
        .into_iter()
        .map(|(key, entry)| {
            let value = (entry.count > 0).then(|| row::keyless_value(entry.count, &entry.payload));
            (key, value)
        })
        .collect())
}
