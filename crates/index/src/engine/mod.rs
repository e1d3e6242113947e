//! Backing engines: byte-keyed maps whose values are runs of 8-byte
//! address slots.

mod hash;
mod tree;

pub use hash::HashTable;
pub use tree::OrderedTree;

use std::ops::Bound;

use storage::{ADDRESS_SIZE, TupleAddress};

/// Point operations every backing engine offers.
pub trait MapEngine: Send + Sync {
    /// Inserts a single-address entry; false if the key is present.
    fn put(&self, key: &[u8], address: TupleAddress) -> bool;
    /// Appends an address to the key's run; false if that exact pair exists.
    fn put_duplicate(&self, key: &[u8], address: TupleAddress) -> bool;
    /// Removes the key with its whole run.
    fn remove(&self, key: &[u8]) -> bool;
    /// Removes one address from the key's run, dropping the key once empty.
    fn remove_value(&self, key: &[u8], address: TupleAddress) -> bool;
    /// Overwrites the value of a present key with a single address.
    fn update(&self, key: &[u8], address: TupleAddress) -> bool;
    /// Swaps one address inside the key's run.
    fn replace_value(&self, key: &[u8], old: TupleAddress, new: TupleAddress) -> bool;
    /// Owned copy of the key's run.
    fn get(&self, key: &[u8]) -> Option<Vec<u8>>;
    fn contains(&self, key: &[u8]) -> bool;
    fn key_count(&self) -> usize;
    fn memory_consumption(&self) -> usize;
}

/// Engines that can also position at a key bound in byte order.
pub trait OrderedEngine: MapEngine {
    /// First entry at or after `bound`.
    fn first_from(&self, bound: Bound<&[u8]>) -> Option<(Vec<u8>, Vec<u8>)>;
}

/// Forward-only engine cursor.
///
/// Holds the lower bound of the next fetch rather than a live iterator, so it
/// never borrows the engine between calls.
#[derive(Debug, Clone, Default)]
pub struct EngineCursor {
    next: Option<Bound<Vec<u8>>>,
}

impl EngineCursor {
    pub fn new(bound: Bound<Vec<u8>>) -> Self {
        Self { next: Some(bound) }
    }

    pub fn exhausted() -> Self {
        Self { next: None }
    }

    /// Cursor that resumes just after `key`.
    pub fn after(key: &[u8]) -> Self {
        Self::new(Bound::Excluded(key.to_vec()))
    }

    pub fn is_exhausted(&self) -> bool {
        self.next.is_none()
    }

    /// Returns the next (key, run) pair and moves past it.
    pub fn advance<E: OrderedEngine + ?Sized>(&mut self, engine: &E) -> Option<(Vec<u8>, Vec<u8>)> {
        let bound = self.next.take()?;
        let (key, run) = engine.first_from(bound.as_ref().map(Vec::as_slice))?;
        self.next = Some(Bound::Excluded(key.clone()));
        Some((key, run))
    }
}

/// Byte offset of `address` inside a run.
pub(crate) fn slot_offset(run: &[u8], address: TupleAddress) -> Option<usize> {
    let needle = address.to_bytes();
    run.chunks_exact(ADDRESS_SIZE)
        .position(|slot| slot == needle)
        .map(|slot| slot * ADDRESS_SIZE)
}

/// Addresses held in a run, in slot order.
pub fn decode_run(run: &[u8]) -> impl Iterator<Item = TupleAddress> + '_ {
    run.chunks_exact(ADDRESS_SIZE)
        .filter_map(TupleAddress::from_bytes)
}

// Rough per-structure and per-entry bookkeeping sizes for memory estimates.
pub(crate) const ENGINE_BASE_OVERHEAD: usize = 64;
pub(crate) const ENTRY_OVERHEAD: usize = 48;

pub(crate) fn entry_footprint(key: &[u8], run: &[u8]) -> usize {
    ENTRY_OVERHEAD + key.len() + run.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u64) -> TupleAddress {
        TupleAddress(n)
    }

    fn engines() -> Vec<Box<dyn MapEngine>> {
        vec![Box::new(OrderedTree::new()), Box::new(HashTable::new())]
    }

    #[test]
    fn unique_put_rejects_present_key() {
        for engine in engines() {
            assert!(engine.put(b"k1", addr(1)));
            assert!(!engine.put(b"k1", addr(2)));
            assert_eq!(engine.get(b"k1"), Some(addr(1).to_bytes().to_vec()));
            assert_eq!(engine.key_count(), 1);
        }
    }

    #[test]
    fn duplicate_runs_grow_and_shrink() {
        for engine in engines() {
            assert!(engine.put_duplicate(b"k", addr(1)));
            assert!(engine.put_duplicate(b"k", addr(2)));
            assert!(!engine.put_duplicate(b"k", addr(2)));
            assert!(engine.put_duplicate(b"k", addr(3)));
            let run = engine.get(b"k").unwrap();
            assert_eq!(decode_run(&run).collect::<Vec<_>>(), vec![addr(1), addr(2), addr(3)]);

            assert!(engine.remove_value(b"k", addr(2)));
            assert!(!engine.remove_value(b"k", addr(2)));
            let run = engine.get(b"k").unwrap();
            assert_eq!(decode_run(&run).collect::<Vec<_>>(), vec![addr(1), addr(3)]);

            assert!(engine.remove_value(b"k", addr(1)));
            assert!(engine.remove_value(b"k", addr(3)));
            assert!(!engine.contains(b"k"));
            assert_eq!(engine.key_count(), 0);
        }
    }

    #[test]
    fn address_swaps() {
        for engine in engines() {
            assert!(engine.put(b"u", addr(1)));
            assert!(engine.update(b"u", addr(9)));
            assert!(!engine.update(b"missing", addr(9)));
            assert_eq!(decode_run(&engine.get(b"u").unwrap()).collect::<Vec<_>>(), vec![addr(9)]);

            assert!(engine.put_duplicate(b"m", addr(1)));
            assert!(engine.put_duplicate(b"m", addr(2)));
            assert!(engine.replace_value(b"m", addr(1), addr(5)));
            assert!(!engine.replace_value(b"m", addr(1), addr(6)));
            assert_eq!(
                decode_run(&engine.get(b"m").unwrap()).collect::<Vec<_>>(),
                vec![addr(5), addr(2)]
            );
        }
    }

    #[test]
    fn memory_tracks_contents() {
        for engine in engines() {
            let empty = engine.memory_consumption();
            assert!(empty > 0);
            engine.put_duplicate(b"abc", addr(1));
            engine.put_duplicate(b"abc", addr(2));
            assert!(engine.memory_consumption() > empty);
            engine.remove(b"abc");
            assert_eq!(engine.memory_consumption(), empty);
        }
    }

    #[test]
    fn cursor_walks_keys_in_order() {
        let tree = OrderedTree::new();
        for (i, key) in [b"b", b"d", b"a", b"c"].iter().enumerate() {
            tree.put(*key, addr(i as u64 + 1));
        }
        let mut cursor = EngineCursor::new(Bound::Included(b"b".to_vec()));
        let mut keys = Vec::new();
        while let Some((key, _)) = cursor.advance(&tree) {
            keys.push(key);
        }
        assert_eq!(keys, vec![b"b".to_vec(), b"c".to_vec(), b"d".to_vec()]);
        assert!(cursor.is_exhausted());
        assert!(cursor.advance(&tree).is_none());

        let mut after = EngineCursor::after(b"d");
        assert!(after.advance(&tree).is_none());
    }
}
