//! Column layout of a table.
//!
//! A [Schema] is an ordered list of [Column]s. Columns flagged as primary key form the key tuple
//! (in declared order) and the remaining columns form the value tuple. A schema without primary
//! key columns describes a keyless table (see [crate::row]).

use crate::value::Type;
use std::collections::HashSet;
use thiserror::Error;

/// Stable identifier of a column.
pub type Tag = u64;

/// Errors that can occur when constructing a [Schema].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("schema has no columns")]
    Empty,
    #[error("duplicate column tag: {0}")]
    DuplicateTag(Tag),
    #[error("duplicate column name: {0}")]
    DuplicateName(String),
    #[error("primary key column cannot be nullable: {0}")]
    NullablePrimaryKey(String),
}

/// A single column of a [Schema].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Column {
    /// The tag rows use to identify the column's value.
    pub tag: Tag,

    /// The name of the column (used in error messages).
    pub name: String,

    /// The declared type of the column.
    pub kind: Type,

    /// Whether the column accepts nulls.
    pub nullable: bool,

    /// Whether the column is part of the primary key.
    pub primary_key: bool,
}

impl Column {
    /// A nullable, non-key column.
    pub fn new(tag: Tag, name: impl Into<String>, kind: Type) -> Self {
        Self {
            tag,
            name: name.into(),
            kind,
            nullable: true,
            primary_key: false,
        }
    }

    /// A primary key column (implies NOT NULL).
    pub fn key(tag: Tag, name: impl Into<String>, kind: Type) -> Self {
        Self {
            tag,
            name: name.into(),
            kind,
            nullable: false,
            primary_key: true,
        }
    }

    /// Marks the column NOT NULL.
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }
}

/// An ordered, validated set of columns.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Schema {
    columns: Vec<Column>,
    keys: Vec<usize>,
    values: Vec<usize>,
}

impl Schema {
    /// Validate `columns` and build a [Schema].
    pub fn new(columns: Vec<Column>) -> Result<Self, Error> {
        if columns.is_empty() {
            return Err(Error::Empty);
        }
        let mut tags = HashSet::new();
        let mut names = HashSet::new();
        for column in &columns {
            if !tags.insert(column.tag) {
                return Err(Error::DuplicateTag(column.tag));
            }
            if !names.insert(column.name.as_str()) {
                return Err(Error::DuplicateName(column.name.clone()));
            }
            if column.primary_key && column.nullable {
                return Err(Error::NullablePrimaryKey(column.name.clone()));
            }
        }
        let (keys, values): (Vec<usize>, Vec<usize>) =
            (0..columns.len()).partition(|&i| columns[i].primary_key);

        Ok(Self {
            columns,
            keys,
            values,
        })
    }

    /// All columns in declared order.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Returns the column with `tag`, if any.
    pub fn column(&self, tag: Tag) -> Option<&Column> {
        self.columns.iter().find(|c| c.tag == tag)
    }

    /// Returns the column named `name`, if any.
    pub fn column_by_name(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Primary key columns in declared order.
    pub fn key_columns(&self) -> impl Iterator<Item = &Column> + '_ {
        self.keys.iter().map(|&i| &self.columns[i])
    }

    /// Non-key columns in declared order.
    pub fn value_columns(&self) -> impl Iterator<Item = &Column> + '_ {
        self.values.iter().map(|&i| &self.columns[i])
    }

    /// Returns true if the schema declares no primary key.
    pub fn is_keyless(&self) -> bool {
        self.keys.is_empty()
    }

    /// Returns true if `tag` is part of the primary key.
    pub fn is_key(&self, tag: Tag) -> bool {
        self.column(tag).is_some_and(|c| c.primary_key)
    }
}
