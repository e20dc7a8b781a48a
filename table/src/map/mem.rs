//! An in-memory [MapTrait] implementation backed by a shared [BTreeMap].
//!
//! Entries are held behind an [Arc], so cloning a [Map] (or handing out cursors) never copies
//! entries. [Map::apply] copies the entries once, applies the diff, and recomputes the digest.
//!
//! The digest is a SHA-256 over every encoded key and value in key order, so equal contents always
//! produce equal digests regardless of the sequence of diffs that produced them.

use super::{Cursor as CursorTrait, Diff, Error, Map as MapTrait};
use crate::tuple::Tuple;
use commonware_codec::Encode;
use commonware_cryptography::{sha256::Digest, Hasher, Sha256};
use commonware_utils::NZUsize;
use std::{
    collections::{btree_map::Range, BTreeMap, VecDeque},
    num::NonZeroUsize,
    sync::Arc,
};
use tracing::debug;

/// Default number of entries fetched per batch by a buffered cursor.
const DEFAULT_READ_AHEAD: NonZeroUsize = NZUsize!(256);

/// Configuration for an in-memory [Map].
#[derive(Clone, Copy, Debug)]
pub struct Config {
    /// The number of entries a buffered cursor fetches at a time when the caller does not ask for
    /// a specific amount.
    pub read_ahead: NonZeroUsize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            read_ahead: DEFAULT_READ_AHEAD,
        }
    }
}

/// A cursor over a [Map].
pub struct Cursor<'a> {
    range: Range<'a, Tuple, Tuple>,

    /// Entries fetched ahead of the caller (only used when buffering).
    buffer: VecDeque<(Tuple, Tuple)>,
    read_ahead: Option<NonZeroUsize>,
}

impl<'a> Cursor<'a> {
    fn new(range: Range<'a, Tuple, Tuple>, read_ahead: Option<NonZeroUsize>) -> Self {
        Self {
            range,
            buffer: VecDeque::new(),
            read_ahead,
        }
    }

    fn fill(&mut self, read_ahead: NonZeroUsize) {
        self.buffer.extend(
            self.range
                .by_ref()
                .take(read_ahead.get())
                .map(|(k, v)| (k.clone(), v.clone())),
        );
    }
}

impl CursorTrait for Cursor<'_> {
    fn next(&mut self) -> Result<Option<(Tuple, Tuple)>, Error> {
        let Some(read_ahead) = self.read_ahead else {
            return Ok(self.range.next().map(|(k, v)| (k.clone(), v.clone())));
        };
        if self.buffer.is_empty() {
            self.fill(read_ahead);
        }
        Ok(self.buffer.pop_front())
    }
}

/// An immutable, in-memory ordered map.
#[derive(Clone)]
pub struct Map {
    cfg: Config,
    entries: Arc<BTreeMap<Tuple, Tuple>>,
    digest: Digest,
}

impl Map {
    /// Create an empty map.
    pub fn new(cfg: Config) -> Self {
        Self::from_entries(cfg, std::iter::empty())
    }

    /// Create a map holding `entries`. Later duplicates of a key replace earlier ones.
    pub fn from_entries(cfg: Config, entries: impl IntoIterator<Item = (Tuple, Tuple)>) -> Self {
        let entries: BTreeMap<_, _> = entries.into_iter().collect();
        let digest = Self::compute_digest(&entries);
        Self {
            cfg,
            entries: Arc::new(entries),
            digest,
        }
    }

    fn compute_digest(entries: &BTreeMap<Tuple, Tuple>) -> Digest {
        let mut hasher = Sha256::new();
        for (key, value) in entries {
            hasher.update(&key.encode());
            hasher.update(&value.encode());
        }
        hasher.finalize()
    }
}

impl Default for Map {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl MapTrait for Map {
    type Cursor<'a> = Cursor<'a>;

    fn len(&self) -> u64 {
        self.entries.len() as u64
    }

    fn get(&self, key: &Tuple) -> Result<Option<Tuple>, Error> {
        Ok(self.entries.get(key).cloned())
    }

    fn iter(&self) -> Result<Cursor<'_>, Error> {
        Ok(Cursor::new(self.entries.range(..), None))
    }

    fn iter_buffered(&self, read_ahead: NonZeroUsize) -> Result<Cursor<'_>, Error> {
        Ok(Cursor::new(self.entries.range(..), Some(read_ahead)))
    }

    fn iter_at(&self, offset: u64) -> Result<Cursor<'_>, Error> {
        if offset > self.len() {
            return Err(Error::OffsetOutOfRange(offset, self.len()));
        }
        let mut range = self.entries.range(..);
        if offset > 0 {
            range.nth((offset - 1) as usize);
        }
        Ok(Cursor::new(range, Some(self.cfg.read_ahead)))
    }

    fn iter_from(&self, key: &Tuple) -> Result<Cursor<'_>, Error> {
        Ok(Cursor::new(self.entries.range(key.clone()..), None))
    }

    fn apply(&self, diff: Diff) -> Result<Self, Error> {
        let mut entries = BTreeMap::clone(&self.entries);
        let (mut updated, mut deleted) = (0usize, 0usize);
        for (key, value) in diff {
            match value {
                Some(value) => {
                    entries.insert(key, value);
                    updated += 1;
                }
                None => {
                    if entries.remove(&key).is_some() {
                        deleted += 1;
                    }
                }
            }
        }
        let digest = Self::compute_digest(&entries);
        debug!(updated, deleted, len = entries.len(), %digest, "applied diff");

        Ok(Self {
            cfg: self.cfg,
            entries: Arc::new(entries),
            digest,
        })
    }

    fn digest(&self) -> Digest {
        self.digest
    }
}
