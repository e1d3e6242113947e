mod hash_unique;
mod ordered_multi;
mod ordered_unique;

pub use hash_unique::HashUniqueIndex;
pub use ordered_multi::OrderedMultiMapIndex;
pub use ordered_unique::OrderedUniqueIndex;

use std::borrow::Cow;
use std::ops::Bound;
use std::sync::Arc;

use log::warn;
use storage::{RowStore, Tuple, TupleAddress, TupleSchema, Value};

use crate::cursor::{CursorState, ScanCursor};
use crate::engine::OrderedEngine;
use crate::error::{IndexError, IndexResult};
use crate::key::{KeyEncoder, prefix_successor};
use crate::scheme::{IndexCounters, IndexScheme, IndexStats};

/// The operation set a table and an executor use on any index.
///
/// Steady-state calls report misses and collisions through their return
/// values. The `move_*`/`next_*` calls drive one cursor owned by the index;
/// `scan` hands out independent cursors instead.
pub trait TableIndex: Send + Sync {
    fn name(&self) -> &str;
    fn type_name(&self) -> &'static str;
    fn scheme(&self) -> &IndexScheme;
    fn key_schema(&self) -> &Arc<TupleSchema>;
    fn stats(&self) -> IndexStats;

    /// Adds the row under its key; false on a uniqueness collision.
    fn add_entry(&mut self, tuple: &Tuple) -> bool;
    fn delete_entry(&mut self, tuple: &Tuple) -> bool;
    fn replace_entry(&mut self, old: &Tuple, new: &Tuple) -> bool;
    /// Points the entry for `tuple`'s key at a relocated row.
    fn set_entry_to_new_address(
        &mut self,
        tuple: &Tuple,
        new_address: TupleAddress,
        old_address: TupleAddress,
    ) -> bool;
    /// True when the two rows project to different keys.
    fn check_for_index_change(&self, lhs: &Tuple, rhs: &Tuple) -> bool;
    fn exists(&self, tuple: &Tuple) -> bool;

    fn move_to_key(&mut self, key: &Tuple) -> bool;
    fn move_to_tuple(&mut self, tuple: &Tuple) -> bool;
    fn move_to_key_or_greater(&mut self, key: &Tuple) -> IndexResult<()>;
    fn move_to_greater_than_key(&mut self, key: &Tuple) -> IndexResult<()>;
    /// Only `forward == true` is supported.
    fn move_to_end(&mut self, forward: bool) -> IndexResult<()>;
    fn next_value(&mut self) -> Option<Tuple>;
    fn next_value_at_key(&mut self) -> Option<Tuple>;
    fn advance_to_next_key(&mut self) -> bool;

    fn size(&self) -> usize;
    fn memory_estimate(&self) -> usize;

    fn scan(&self, _start: ScanStart<'_>) -> IndexResult<IndexScan<'_>> {
        Err(IndexError::Unsupported {
            index: self.name().to_string(),
            operation: "scan",
        })
    }

    /// Builds a search key from leading key column values.
    fn search_key(&self, values: &[Value]) -> IndexResult<Tuple> {
        let key_schema = self.key_schema();
        let schema = if values.len() < key_schema.column_count() {
            Arc::new(key_schema.prefix(values.len()))
        } else {
            key_schema.clone()
        };
        Ok(Tuple::from_values(schema, values)?)
    }
}

/// Where an independent scan starts.
#[derive(Debug, Clone, Copy)]
pub enum ScanStart<'a> {
    Begin,
    Key(&'a Tuple),
    KeyOrGreater(&'a Tuple),
    GreaterThan(&'a Tuple),
}

/// State shared by every adapter.
pub(crate) struct IndexCore {
    pub(crate) scheme: IndexScheme,
    pub(crate) encoder: KeyEncoder,
    pub(crate) rows: RowStore,
    pub(crate) counters: IndexCounters,
}

impl IndexCore {
    pub(crate) fn new(scheme: IndexScheme, encoder: KeyEncoder, rows: RowStore) -> Self {
        Self {
            scheme,
            encoder,
            rows,
            counters: IndexCounters::default(),
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.scheme.name
    }

    pub(crate) fn row_key<'a>(&self, tuple: &'a Tuple) -> Cow<'a, [u8]> {
        self.encoder.encode_row(tuple)
    }

    /// Encoded form of a full search key; `None` if the key cannot match.
    pub(crate) fn point_key<'a>(&self, key: &'a Tuple) -> Option<Cow<'a, [u8]>> {
        if !self.encoder.is_full_key(key) {
            return None;
        }
        self.encoder.encode_search_key(key).ok()
    }

    /// Engine bound for a range positioning call.
    pub(crate) fn range_bound(
        &self,
        key: &Tuple,
        inclusive: bool,
    ) -> IndexResult<Option<Bound<Vec<u8>>>> {
        let encoded = self.encoder.encode_search_key(key)?;
        let bound = if inclusive {
            Some(Bound::Included(encoded.into_owned()))
        } else if self.encoder.is_full_key(key) {
            Some(Bound::Excluded(encoded.into_owned()))
        } else {
            // skip every key sharing the prefix
            prefix_successor(&encoded).map(Bound::Included)
        };
        Ok(bound)
    }

    pub(crate) fn keys_differ(&self, lhs: &Tuple, rhs: &Tuple) -> bool {
        self.encoder.encode_row(lhs) != self.encoder.encode_row(rhs)
    }

    pub(crate) fn unsupported(&self, operation: &'static str) -> IndexError {
        IndexError::Unsupported {
            index: self.name().to_string(),
            operation,
        }
    }

    pub(crate) fn reverse_scan(&self) -> IndexError {
        warn!("index {}: reverse scans are not supported", self.name());
        self.unsupported("reverse scan")
    }

    /// Row for an address, skipping entries the store no longer holds.
    pub(crate) fn resolve(&self, address: TupleAddress) -> Option<Tuple> {
        let row = self.rows.get(address);
        if row.is_none() {
            warn!(
                "index {}: entry points at missing row {}",
                self.name(),
                address
            );
        }
        row
    }

    pub(crate) fn position<E: OrderedEngine + ?Sized>(
        &self,
        engine: &E,
        cursor: &mut ScanCursor,
        key: &[u8],
    ) -> bool {
        match engine.get(key) {
            Some(run) => {
                cursor.position_at_key(key, run);
                true
            }
            None => {
                cursor.position_exhausted();
                false
            }
        }
    }

    pub(crate) fn next_row<E: OrderedEngine + ?Sized>(
        &self,
        engine: &E,
        cursor: &mut ScanCursor,
    ) -> Option<Tuple> {
        loop {
            let address = cursor.next_address(engine)?;
            if let Some(row) = self.resolve(address) {
                return Some(row);
            }
        }
    }

    pub(crate) fn next_row_at_key(&self, cursor: &mut ScanCursor) -> Option<Tuple> {
        loop {
            let address = cursor.next_address_at_key()?;
            if let Some(row) = self.resolve(address) {
                return Some(row);
            }
        }
    }

    pub(crate) fn open_scan<'a>(
        &'a self,
        engine: &'a dyn OrderedEngine,
        start: ScanStart<'_>,
    ) -> IndexResult<IndexScan<'a>> {
        self.counters.lookup();
        let mut cursor = ScanCursor::new();
        match start {
            ScanStart::Begin => cursor.position_at_bound(Some(Bound::Unbounded)),
            ScanStart::Key(key) => match self.point_key(key) {
                Some(encoded) => {
                    self.position(engine, &mut cursor, &encoded);
                }
                None => cursor.position_exhausted(),
            },
            ScanStart::KeyOrGreater(key) => cursor.position_at_bound(self.range_bound(key, true)?),
            ScanStart::GreaterThan(key) => cursor.position_at_bound(self.range_bound(key, false)?),
        }
        Ok(IndexScan {
            core: self,
            engine,
            cursor,
        })
    }
}

/// An independent forward scan with its own cursor.
pub struct IndexScan<'a> {
    core: &'a IndexCore,
    engine: &'a dyn OrderedEngine,
    cursor: ScanCursor,
}

impl IndexScan<'_> {
    pub fn state(&self) -> CursorState {
        self.cursor.state()
    }

    /// Next row sharing the current key.
    pub fn next_at_key(&mut self) -> Option<Tuple> {
        self.core.next_row_at_key(&mut self.cursor)
    }

    pub fn advance_to_next_key(&mut self) -> bool {
        self.cursor.advance_to_next_key(self.engine)
    }
}

impl Iterator for IndexScan<'_> {
    type Item = Tuple;

    fn next(&mut self) -> Option<Tuple> {
        self.core.next_row(self.engine, &mut self.cursor)
    }
}
