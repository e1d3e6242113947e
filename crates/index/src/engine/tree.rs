use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::ops::Bound;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::RwLock;
use storage::{ADDRESS_SIZE, TupleAddress};

use super::{ENGINE_BASE_OVERHEAD, MapEngine, OrderedEngine, entry_footprint, slot_offset};

/// Ordered map over encoded keys. Duplicates at one key share a single run
/// blob, kept in insertion order.
#[derive(Debug, Default)]
pub struct OrderedTree {
    map: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
    memory: AtomicUsize,
}

impl OrderedTree {
    pub fn new() -> Self {
        Self::default()
    }

    fn grow(&self, bytes: usize) {
        self.memory.fetch_add(bytes, Ordering::Relaxed);
    }

    fn shrink(&self, bytes: usize) {
        self.memory.fetch_sub(bytes, Ordering::Relaxed);
    }
}

impl MapEngine for OrderedTree {
    fn put(&self, key: &[u8], address: TupleAddress) -> bool {
        let mut map = self.map.write();
        match map.entry(key.to_vec()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                let run = slot.insert(address.to_bytes().to_vec());
                self.grow(entry_footprint(key, run));
                true
            }
        }
    }

    fn put_duplicate(&self, key: &[u8], address: TupleAddress) -> bool {
        let mut map = self.map.write();
        match map.entry(key.to_vec()) {
            Entry::Occupied(mut entry) => {
                let run = entry.get_mut();
                if slot_offset(run, address).is_some() {
                    return false;
                }
                run.extend_from_slice(&address.to_bytes());
                self.grow(ADDRESS_SIZE);
                true
            }
            Entry::Vacant(slot) => {
                let run = slot.insert(address.to_bytes().to_vec());
                self.grow(entry_footprint(key, run));
                true
            }
        }
    }

    fn remove(&self, key: &[u8]) -> bool {
        let Some(run) = self.map.write().remove(key) else {
            return false;
        };
        self.shrink(entry_footprint(key, &run));
        true
    }

    fn remove_value(&self, key: &[u8], address: TupleAddress) -> bool {
        let mut map = self.map.write();
        let Some(run) = map.get_mut(key) else {
            return false;
        };
        let Some(offset) = slot_offset(run, address) else {
            return false;
        };
        run.drain(offset..offset + ADDRESS_SIZE);
        self.shrink(ADDRESS_SIZE);
        if run.is_empty() {
            map.remove(key);
            self.shrink(entry_footprint(key, &[]));
        }
        true
    }

    fn update(&self, key: &[u8], address: TupleAddress) -> bool {
        let mut map = self.map.write();
        let Some(run) = map.get_mut(key) else {
            return false;
        };
        let old_len = run.len();
        *run = address.to_bytes().to_vec();
        self.shrink(old_len);
        self.grow(ADDRESS_SIZE);
        true
    }

    fn replace_value(&self, key: &[u8], old: TupleAddress, new: TupleAddress) -> bool {
        let mut map = self.map.write();
        let Some(run) = map.get_mut(key) else {
            return false;
        };
        let Some(offset) = slot_offset(run, old) else {
            return false;
        };
        run[offset..offset + ADDRESS_SIZE].copy_from_slice(&new.to_bytes());
        true
    }

    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.map.read().get(key).cloned()
    }

    fn contains(&self, key: &[u8]) -> bool {
        self.map.read().contains_key(key)
    }

    fn key_count(&self) -> usize {
        self.map.read().len()
    }

    fn memory_consumption(&self) -> usize {
        ENGINE_BASE_OVERHEAD + self.memory.load(Ordering::Relaxed)
    }
}

impl OrderedEngine for OrderedTree {
    fn first_from(&self, bound: Bound<&[u8]>) -> Option<(Vec<u8>, Vec<u8>)> {
        self.map
            .read()
            .range::<[u8], _>((bound, Bound::Unbounded))
            .next()
            .map(|(key, run)| (key.clone(), run.clone()))
    }
}
