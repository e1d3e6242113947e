use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use storage::{ADDRESS_SIZE, TupleAddress};

use super::{ENGINE_BASE_OVERHEAD, MapEngine, entry_footprint, slot_offset};

/// Unordered engine for point lookups.
#[derive(Debug, Default)]
pub struct HashTable {
    map: DashMap<Vec<u8>, Vec<u8>>,
    memory: AtomicUsize,
}

impl HashTable {
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

impl MapEngine for HashTable {
    fn put(&self, key: &[u8], address: TupleAddress) -> bool {
        match self.map.entry(key.to_vec()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(address.to_bytes().to_vec());
                self.grow(entry_footprint(key, &address.to_bytes()));
                true
            }
        }
    }

    fn put_duplicate(&self, key: &[u8], address: TupleAddress) -> bool {
        match self.map.entry(key.to_vec()) {
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
                slot.insert(address.to_bytes().to_vec());
                self.grow(entry_footprint(key, &address.to_bytes()));
                true
            }
        }
    }

    fn remove(&self, key: &[u8]) -> bool {
        let Some((_, run)) = self.map.remove(key) else {
            return false;
        };
        self.shrink(entry_footprint(key, &run));
        true
    }

    fn remove_value(&self, key: &[u8], address: TupleAddress) -> bool {
        let emptied = {
            let Some(mut run) = self.map.get_mut(key) else {
                return false;
            };
            let Some(offset) = slot_offset(&run, address) else {
                return false;
            };
            run.drain(offset..offset + ADDRESS_SIZE);
            self.shrink(ADDRESS_SIZE);
            run.is_empty()
        };
        if emptied && self.map.remove_if(key, |_, run| run.is_empty()).is_some() {
            self.shrink(entry_footprint(key, &[]));
        }
        true
    }

    fn update(&self, key: &[u8], address: TupleAddress) -> bool {
        let Some(mut run) = self.map.get_mut(key) else {
            return false;
        };
        let old_len = run.len();
        *run = address.to_bytes().to_vec();
        self.shrink(old_len);
        self.grow(ADDRESS_SIZE);
        true
    }

    fn replace_value(&self, key: &[u8], old: TupleAddress, new: TupleAddress) -> bool {
        let Some(mut run) = self.map.get_mut(key) else {
            return false;
        };
        let Some(offset) = slot_offset(&run, old) else {
            return false;
        };
        run[offset..offset + ADDRESS_SIZE].copy_from_slice(&new.to_bytes());
        true
    }

    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.map.get(key).map(|run| run.value().clone())
    }

    fn contains(&self, key: &[u8]) -> bool {
        self.map.contains_key(key)
    }

    fn key_count(&self) -> usize {
        self.map.len()
    }

    fn memory_consumption(&self) -> usize {
        ENGINE_BASE_OVERHEAD + self.memory.load(Ordering::Relaxed)
    }
}
