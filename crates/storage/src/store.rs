use std::sync::Arc;

use log::debug;
use parking_lot::RwLock;

use crate::{StorageError, StorageResult, Tuple, TupleAddress, TupleSchema, Value};

/// A row that moved from `old` to `new`. Every index over the store must be
/// told through `set_entry_to_new_address`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relocation {
    pub old: TupleAddress,
    pub new: TupleAddress,
}

struct RowStoreState {
    slots: Vec<Option<Vec<u8>>>,
    free_list: Vec<usize>,
    live: usize,
}

impl RowStoreState {
    fn allocate(&mut self, data: Vec<u8>) -> usize {
        self.live += 1;
        if let Some(slot) = self.free_list.pop() {
            self.slots[slot] = Some(data);
            slot
        } else {
            self.slots.push(Some(data));
            self.slots.len() - 1
        }
    }

    fn slot_of(&self, address: TupleAddress) -> StorageResult<usize> {
        let slot = (address.0 as usize).wrapping_sub(1);
        match self.slots.get(slot) {
            Some(Some(_)) => Ok(slot),
            _ => Err(StorageError::UnknownAddress(address)),
        }
    }
}

fn address_of(slot: usize) -> TupleAddress {
    TupleAddress(slot as u64 + 1)
}

/// Slot-based in-memory row storage handing out stable addresses.
///
/// Rows only move when `relocate` or `compact` is called, and both report
/// every move to the caller.
#[derive(Clone)]
pub struct RowStore {
    schema: Arc<TupleSchema>,
    inner: Arc<RwLock<RowStoreState>>,
}

impl RowStore {
    /// Creates an empty store for rows of `schema`.
    pub fn new(schema: Arc<TupleSchema>) -> Self {
        let state = RowStoreState {
            slots: Vec::new(),
            free_list: Vec::new(),
            live: 0,
        };
        Self {
            schema,
            inner: Arc::new(RwLock::new(state)),
        }
    }

    pub fn schema(&self) -> &Arc<TupleSchema> {
        &self.schema
    }

    /// Encodes and stores a row, returning it tagged with its address.
    pub fn insert(&self, values: &[Value]) -> StorageResult<Tuple> {
        let tuple = Tuple::from_values(self.schema.clone(), values)?;
        let slot = self.inner.write().allocate(tuple.data().to_vec());
        Ok(tuple.with_address(address_of(slot)))
    }

    /// Returns the row stored at `address`.
    pub fn get(&self, address: TupleAddress) -> Option<Tuple> {
        let state = self.inner.read();
        let slot = state.slot_of(address).ok()?;
        let data = state.slots[slot].clone()?;
        Tuple::from_bytes(self.schema.clone(), data)
            .ok()
            .map(|t| t.with_address(address))
    }

    /// Overwrites a row in place; the address does not change.
    pub fn update(&self, address: TupleAddress, values: &[Value]) -> StorageResult<Tuple> {
        let tuple = Tuple::from_values(self.schema.clone(), values)?;
        let mut state = self.inner.write();
        let slot = state.slot_of(address)?;
        state.slots[slot] = Some(tuple.data().to_vec());
        Ok(tuple.with_address(address))
    }

    /// Removes a row and returns its last image.
    pub fn remove(&self, address: TupleAddress) -> StorageResult<Tuple> {
        let mut state = self.inner.write();
        let slot = state.slot_of(address)?;
        let data = state.slots[slot]
            .take()
            .ok_or(StorageError::UnknownAddress(address))?;
        state.free_list.push(slot);
        state.live -= 1;
        Ok(Tuple::from_bytes(self.schema.clone(), data)?.with_address(address))
    }

    /// Moves one row to a different slot.
    pub fn relocate(&self, address: TupleAddress) -> StorageResult<Relocation> {
        let mut state = self.inner.write();
        let slot = state.slot_of(address)?;
        let data = state.slots[slot]
            .take()
            .ok_or(StorageError::UnknownAddress(address))?;
        state.live -= 1;
        // allocate before freeing so the row cannot land in its own slot
        let new_slot = state.allocate(data);
        state.free_list.push(slot);
        Ok(Relocation {
            old: address,
            new: address_of(new_slot),
        })
    }

    /// Packs rows into the lowest slots and drops trailing empty slots.
    pub fn compact(&self) -> Vec<Relocation> {
        let mut state = self.inner.write();
        let holes: Vec<usize> = state
            .slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_none())
            .map(|(i, _)| i)
            .collect();

        let mut relocations = Vec::new();
        let mut high = state.slots.len();
        for hole in holes {
            while high > 0 && state.slots[high - 1].is_none() {
                high -= 1;
            }
            if hole >= high {
                break;
            }
            let row = state.slots[high - 1].take();
            state.slots[hole] = row;
            relocations.push(Relocation {
                old: address_of(high - 1),
                new: address_of(hole),
            });
            high -= 1;
        }
        while matches!(state.slots.last(), Some(None)) {
            state.slots.pop();
        }
        state.free_list.clear();
        debug!(
            "compacted row store: {} rows moved, {} live",
            relocations.len(),
            state.live
        );
        relocations
    }

    /// Returns the number of live rows.
    pub fn len(&self) -> usize {
        self.inner.read().live
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns every live address in slot order.
    pub fn addresses(&self) -> Vec<TupleAddress> {
        self.inner
            .read()
            .slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_some())
            .map(|(i, _)| address_of(i))
            .collect()
    }
}
