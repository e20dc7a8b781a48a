//! Reject updates that would give two rows the same primary key.

use super::{Change, Error};
use crate::map::Map;
use std::collections::BTreeSet;
use tracing::warn;

/// Check the staged changes of a keyed table against each other and against `map`.
///
/// Fails with [Error::PrimaryKeyCollision] if two changes write the same key, or if a change moves
/// a row onto a key already present in `map`. The latter holds even when the row at that key is
/// itself being moved away, so updates that swap or rotate keys are rejected.
pub fn check<M: Map>(map: &M, staged: &[Change]) -> Result<(), Error> {
    let mut keys = BTreeSet::new();
    for change in staged {
        if !keys.insert(&change.new_key) {
            warn!(key = %change.new_key, "updated rows share a primary key");
            return Err(Error::PrimaryKeyCollision(change.new_key.clone()));
        }
        if change.new_key != change.old_key && map.get(&change.new_key)?.is_some() {
            warn!(key = %change.new_key, "updated row collides with an existing row");
            return Err(Error::PrimaryKeyCollision(change.new_key.clone()));
        }
    }
    Ok(())
}
