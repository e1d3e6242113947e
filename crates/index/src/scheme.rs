use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use storage::{StorageResult, TupleSchema};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexType {
    BalancedTree,
    HashTable,
    Array,
}

impl IndexType {
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "tree" | "btree" | "balanced_tree" => Some(IndexType::BalancedTree),
            "hash" | "hash_table" => Some(IndexType::HashTable),
            "array" => Some(IndexType::Array),
            _ => None,
        }
    }
}

/// Fixed description of an index: which columns form the key and how.
#[derive(Debug, Clone)]
pub struct IndexScheme {
    pub name: String,
    pub index_type: IndexType,
    pub column_indices: Vec<usize>,
    pub unique: bool,
    pub ints_only: bool,
    pub tuple_schema: Arc<TupleSchema>,
}

impl IndexScheme {
    pub fn new(
        name: impl Into<String>,
        index_type: IndexType,
        column_indices: Vec<usize>,
        unique: bool,
        ints_only: bool,
        tuple_schema: Arc<TupleSchema>,
    ) -> Self {
        Self {
            name: name.into(),
            index_type,
            column_indices,
            unique,
            ints_only,
            tuple_schema,
        }
    }

    /// Schema of the key columns, in key order.
    pub fn key_schema(&self) -> StorageResult<TupleSchema> {
        self.tuple_schema.project(&self.column_indices)
    }
}

/// Point-in-time copy of an index's operation counters.
///
/// `inserts`, `deletes` and `updates` count calls that changed the index: a
/// rejected `add_entry`, a missed `delete_entry` or a `replace_entry` whose
/// key did not change leaves them untouched. `lookups` counts every call
/// that searches it, successful or not: `exists`, each cursor positioning
/// call and each opened scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    pub inserts: u64,
    pub deletes: u64,
    pub updates: u64,
    pub lookups: u64,
}

#[derive(Debug, Default)]
pub(crate) struct IndexCounters {
    inserts: AtomicU64,
    deletes: AtomicU64,
    updates: AtomicU64,
    lookups: AtomicU64,
}

impl IndexCounters {
    pub(crate) fn insert(&self) {
        self.inserts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn delete(&self) {
        self.deletes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn update(&self) {
        self.updates.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn lookup(&self) {
        self.lookups.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> IndexStats {
        IndexStats {
            inserts: self.inserts.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            updates: self.updates.load(Ordering::Relaxed),
            lookups: self.lookups.load(Ordering::Relaxed),
        }
    }
}
