//! Iterate and update immutable, content-addressed tables of tuples.
//!
//! A table is an ordered [map::Map] from key [tuple::Tuple]s to value tuples, interpreted through
//! a [schema::Schema]. [reader::Reader] turns the physical entries of a table into logical
//! [row::Row]s (expanding the duplicate count of keyless tables), and [update::execute] derives a
//! new [snapshot::Snapshot] by assigning values to the rows that match a predicate.
//!
//! # Status
//!
//! `tuplestore-table` is **ALPHA** software and is not yet recommended for production use. Developers
//! should expect breaking changes and occasional instability.

pub mod map;
pub mod reader;
pub mod row;
pub mod schema;
pub mod snapshot;
pub mod tuple;
pub mod update;
pub mod value;
