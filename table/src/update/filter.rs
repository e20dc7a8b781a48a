//! Select the rows an update applies to.
//!
//! Any `Fn(&Row) -> bool` is a [Predicate]. [Filter] is a small expression tree that must be
//! bound to a [Schema] before use: binding coerces every literal to the type of the column it is
//! compared with (so `id = 'id'` on an integer column is a type mismatch, not an empty match).
//!
//! Filters follow SQL's three-valued logic: a comparison involving null is unknown, `NOT` of
//! unknown is still unknown, and a row only matches if the whole filter is true. Neither
//! `x = NULL`, `x <> NULL`, nor `NOT (x = 1)` matches a row whose `x` is null.

use super::{coerce::coerce, Error};
use crate::{
    row::Row,
    schema::{Schema, Tag},
    tuple::Tuple,
    value::Value,
};
use std::{
    cmp::Ordering,
    collections::BTreeMap,
    fmt::{self, Display},
};

/// Decides whether a row is updated.
pub trait Predicate {
    /// Returns true if `row` should be updated.
    fn matches(&self, row: &Row) -> Result<bool, Error>;

    /// Returns the only primary key that can match, if the predicate pins every key column of
    /// `schema` to a value.
    fn lookup_key(&self, _schema: &Schema) -> Option<Tuple> {
        None
    }
}

impl<F: Fn(&Row) -> bool> Predicate for F {
    fn matches(&self, row: &Row) -> Result<bool, Error> {
        Ok(self(row))
    }
}

/// A comparison operator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Op {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Op {
    fn test(self, ordering: Ordering) -> bool {
        match self {
            Op::Eq => ordering.is_eq(),
            Op::Ne => ordering.is_ne(),
            Op::Lt => ordering.is_lt(),
            Op::Le => ordering.is_le(),
            Op::Gt => ordering.is_gt(),
            Op::Ge => ordering.is_ge(),
        }
    }
}

impl Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Op::Eq => "=",
            Op::Ne => "<>",
            Op::Lt => "<",
            Op::Le => "<=",
            Op::Gt => ">",
            Op::Ge => ">=",
        })
    }
}

/// A boolean expression over the columns of a row.
#[derive(Clone, Debug, PartialEq)]
pub enum Filter {
    /// Matches every row.
    All,

    /// Compares a column with a literal.
    Compare { tag: Tag, op: Op, value: Value },

    /// Matches if every filter matches (or there are none).
    And(Vec<Filter>),

    /// Matches if any filter matches.
    Or(Vec<Filter>),

    /// Negates the filter (unknown stays unknown).
    Not(Box<Filter>),
}

impl Filter {
    /// Compare column `tag` with `value`.
    pub fn compare(tag: Tag, op: Op, value: impl Into<Value>) -> Self {
        Self::Compare {
            tag,
            op,
            value: value.into(),
        }
    }

    /// Type-check the filter against `schema`, coercing every literal to its column's type.
    ///
    /// Literals go through the same conversions as assigned values, so a literal that cannot be
    /// stored in the column is rejected even where a comparison would be meaningful: `age > 10.5`
    /// on an `INT` column is a [Error::TypeMismatch], not a comparison against 10.5.
    pub fn bind(&self, schema: &Schema) -> Result<BoundFilter, Error> {
        Ok(BoundFilter(self.bind_inner(schema)?))
    }

    fn bind_inner(&self, schema: &Schema) -> Result<Self, Error> {
        Ok(match self {
            Self::All => Self::All,
            Self::Compare { tag, op, value } => {
                let column = schema.column(*tag).ok_or(Error::UnknownColumn(*tag))?;
                let value = if value.is_null() {
                    Value::Null
                } else {
                    coerce(column, value)?
                };
                Self::Compare {
                    tag: *tag,
                    op: *op,
                    value,
                }
            }
            Self::And(filters) => Self::And(
                filters
                    .iter()
                    .map(|f| f.bind_inner(schema))
                    .collect::<Result<_, _>>()?,
            ),
            Self::Or(filters) => Self::Or(
                filters
                    .iter()
                    .map(|f| f.bind_inner(schema))
                    .collect::<Result<_, _>>()?,
            ),
            Self::Not(filter) => Self::Not(Box::new(filter.bind_inner(schema)?)),
        })
    }

    /// Evaluate the filter against `row` (`None` is SQL's unknown).
    fn eval(&self, row: &Row) -> Option<bool> {
        match self {
            Self::All => Some(true),
            Self::Compare { tag, op, value } => {
                let field = row.get(*tag);
                if field.is_null() || value.is_null() {
                    return None;
                }
                Some(op.test(field.cmp(value)))
            }
            Self::And(filters) => {
                let mut unknown = false;
                for filter in filters {
                    match filter.eval(row) {
                        Some(false) => return Some(false),
                        Some(true) => {}
                        None => unknown = true,
                    }
                }
                (!unknown).then_some(true)
            }
            Self::Or(filters) => {
                let mut unknown = false;
                for filter in filters {
                    match filter.eval(row) {
                        Some(true) => return Some(true),
                        Some(false) => {}
                        None => unknown = true,
                    }
                }
                (!unknown).then_some(false)
            }
            Self::Not(filter) => filter.eval(row).map(|v| !v),
        }
    }

    /// Collect the columns that must equal a literal for the filter to match.
    fn pinned<'a>(&'a self, out: &mut BTreeMap<Tag, &'a Value>) {
        match self {
            Self::Compare {
                tag,
                op: Op::Eq,
                value,
            } if !value.is_null() => {
                out.insert(*tag, value);
            }
            Self::And(filters) => filters.iter().for_each(|f| f.pinned(out)),
            _ => {}
        }
    }
}

/// A [Filter] whose literals have been checked against a [Schema].
#[derive(Clone, Debug, PartialEq)]
pub struct BoundFilter(Filter);

impl BoundFilter {
    /// The bound expression.
    pub fn filter(&self) -> &Filter {
        &self.0
    }
}

impl Predicate for BoundFilter {
    fn matches(&self, row: &Row) -> Result<bool, Error> {
        Ok(self.0.eval(row).unwrap_or(false))
    }

    fn lookup_key(&self, schema: &Schema) -> Option<Tuple> {
        if schema.is_keyless() {
            return None;
        }
        let mut pinned = BTreeMap::new();
        self.0.pinned(&mut pinned);
        schema
            .key_columns()
            .map(|c| pinned.get(&c.tag).map(|v| (*v).clone()))
            .collect::<Option<Vec<_>>>()
            .map(Tuple::new)
    }
}
