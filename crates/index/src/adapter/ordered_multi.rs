use std::ops::Bound;
use std::sync::Arc;

use storage::{RowStore, Tuple, TupleAddress, TupleSchema};

use super::{IndexCore, IndexScan, ScanStart, TableIndex};
use crate::cursor::ScanCursor;
use crate::engine::OrderedEngine;
use crate::error::IndexResult;
use crate::key::KeyEncoder;
use crate::scheme::{IndexScheme, IndexStats};

/// Ordered multimap index: many rows per key, stored as one run of address
/// slots per key. Entries are (key, address) pairs, so deletes and replaces
/// never touch other rows sharing the key.
pub struct OrderedMultiMapIndex<E: OrderedEngine> {
    core: IndexCore,
    engine: E,
    cursor: ScanCursor,
    entries: usize,
}

impl<E: OrderedEngine> OrderedMultiMapIndex<E> {
    pub fn new(scheme: IndexScheme, encoder: KeyEncoder, rows: RowStore, engine: E) -> Self {
        Self {
            core: IndexCore::new(scheme, encoder, rows),
            engine,
            cursor: ScanCursor::new(),
            entries: 0,
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Number of distinct keys.
    pub fn key_count(&self) -> usize {
        self.engine.key_count()
    }
}

impl<E: OrderedEngine> TableIndex for OrderedMultiMapIndex<E> {
    fn name(&self) -> &str {
        self.core.name()
    }

    fn type_name(&self) -> &'static str {
        "OrderedMultiMapIndex"
    }

    fn scheme(&self) -> &IndexScheme {
        &self.core.scheme
    }

    fn key_schema(&self) -> &Arc<TupleSchema> {
        self.core.encoder.key_schema()
    }

    fn stats(&self) -> IndexStats {
        self.core.counters.snapshot()
    }

    fn add_entry(&mut self, tuple: &Tuple) -> bool {
        let Some(address) = tuple.address() else {
            return false;
        };
        let key = self.core.row_key(tuple);
        if !self.engine.put_duplicate(&key, address) {
            return false;
        }
        self.entries += 1;
        self.core.counters.insert();
        true
    }

    fn delete_entry(&mut self, tuple: &Tuple) -> bool {
        let Some(address) = tuple.address() else {
            return false;
        };
        let key = self.core.row_key(tuple);
        if !self.engine.remove_value(&key, address) {
            return false;
        }
        self.entries -= 1;
        self.core.counters.delete();
        true
    }

    fn replace_entry(&mut self, old: &Tuple, new: &Tuple) -> bool {
        let old_key = self.core.row_key(old);
        let new_key = self.core.row_key(new);
        if old_key == new_key {
            return true;
        }

        let removed = old
            .address()
            .is_some_and(|address| self.engine.remove_value(&old_key, address));
        if removed {
            self.entries -= 1;
        }
        let inserted = new
            .address()
            .is_some_and(|address| self.engine.put_duplicate(&new_key, address));
        if inserted {
            self.entries += 1;
        }
        let replaced = removed && inserted;
        if replaced {
            self.core.counters.update();
        }
        replaced
    }

    fn set_entry_to_new_address(
        &mut self,
        tuple: &Tuple,
        new_address: TupleAddress,
        old_address: TupleAddress,
    ) -> bool {
        let key = self.core.row_key(tuple);
        let updated = self.engine.replace_value(&key, old_address, new_address);
        if updated {
            self.core.counters.update();
        }
        updated
    }

    fn check_for_index_change(&self, lhs: &Tuple, rhs: &Tuple) -> bool {
        self.core.keys_differ(lhs, rhs)
    }

    fn exists(&self, tuple: &Tuple) -> bool {
        self.core.counters.lookup();
        self.engine.contains(&self.core.row_key(tuple))
    }

    fn move_to_key(&mut self, key: &Tuple) -> bool {
        self.core.counters.lookup();
        match self.core.point_key(key) {
            Some(encoded) => self.core.position(&self.engine, &mut self.cursor, &encoded),
            None => {
                self.cursor.position_exhausted();
                false
            }
        }
    }

    fn move_to_tuple(&mut self, tuple: &Tuple) -> bool {
        self.core.counters.lookup();
        let key = self.core.row_key(tuple);
        self.core.position(&self.engine, &mut self.cursor, &key)
    }

    fn move_to_key_or_greater(&mut self, key: &Tuple) -> IndexResult<()> {
        self.core.counters.lookup();
        let bound = self.core.range_bound(key, true)?;
        self.cursor.position_at_bound(bound);
        Ok(())
    }

    fn move_to_greater_than_key(&mut self, key: &Tuple) -> IndexResult<()> {
        self.core.counters.lookup();
        let bound = self.core.range_bound(key, false)?;
        self.cursor.position_at_bound(bound);
        Ok(())
    }

    fn move_to_end(&mut self, forward: bool) -> IndexResult<()> {
        self.core.counters.lookup();
        if !forward {
            self.cursor.reset();
            return Err(self.core.reverse_scan());
        }
        self.cursor.position_at_bound(Some(Bound::Unbounded));
        Ok(())
    }

    /// Flat scan: drains the current key's run, then moves to the next key.
    fn next_value(&mut self) -> Option<Tuple> {
        self.core.next_row(&self.engine, &mut self.cursor)
    }

    /// Next duplicate at the current key; `None` once the run is drained.
    fn next_value_at_key(&mut self) -> Option<Tuple> {
        self.core.next_row_at_key(&mut self.cursor)
    }

    fn advance_to_next_key(&mut self) -> bool {
        self.cursor.advance_to_next_key(&self.engine)
    }

    fn size(&self) -> usize {
        self.entries
    }

    fn memory_estimate(&self) -> usize {
        self.engine.memory_consumption()
    }

    fn scan(&self, start: ScanStart<'_>) -> IndexResult<IndexScan<'_>> {
        self.core.open_scan(&self.engine, start)
    }
}
