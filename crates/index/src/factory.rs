use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, info};
use serde::{Deserialize, Serialize};
use storage::RowStore;

use crate::adapter::{HashUniqueIndex, OrderedMultiMapIndex, OrderedUniqueIndex, TableIndex};
use crate::engine::{HashTable, OrderedTree};
use crate::error::{IndexError, IndexResult};
use crate::key::{KeyEncoder, KeyMode};
use crate::scheme::{IndexScheme, IndexType};
use crate::wrapper::TracingIndex;

/// Engine serving unique integer-only hash indexes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashBacking {
    #[default]
    HashTable,
    Tree,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub hash_backing: HashBacking,
    /// Integer-only keys wider than this use the generic encoder.
    pub max_ints_key_size: usize,
    /// Generic keys wider than this cannot be indexed.
    pub max_generic_key_size: usize,
    /// Wraps every created index in a `TracingIndex` writing here.
    pub trace_dir: Option<PathBuf>,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            hash_backing: HashBacking::HashTable,
            max_ints_key_size: 32,
            max_generic_key_size: 512,
            trace_dir: None,
        }
    }
}

impl IndexConfig {
    pub fn from_json(text: &str) -> IndexResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: &Path) -> IndexResult<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Trace file a traced index named `index` writes to.
    pub fn trace_path(&self, index: &str) -> Option<PathBuf> {
        self.trace_dir
            .as_ref()
            .map(|dir| dir.join(format!("{}.trace", index)))
    }
}

/// Picks adapter, engine and encoder mode for an index scheme.
#[derive(Debug, Clone, Default)]
pub struct IndexFactory {
    config: IndexConfig,
}

impl IndexFactory {
    pub fn new(config: IndexConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Builds the index for `scheme` over the rows of `rows`.
    pub fn create(&self, scheme: IndexScheme, rows: RowStore) -> IndexResult<Box<dyn TableIndex>> {
        let index = self.build(scheme, rows)?;
        match &self.config.trace_dir {
            Some(dir) => Ok(Box::new(TracingIndex::create(index, dir)?)),
            None => Ok(index),
        }
    }

    fn build(&self, scheme: IndexScheme, rows: RowStore) -> IndexResult<Box<dyn TableIndex>> {
        if scheme.column_indices.is_empty() {
            return Err(IndexError::Configuration(format!(
                "index {} has no key columns",
                scheme.name
            )));
        }
        if scheme.tuple_schema != *rows.schema() {
            return Err(IndexError::Configuration(format!(
                "index {} describes a different row layout than its row store",
                scheme.name
            )));
        }
        let key_schema = scheme
            .key_schema()
            .map_err(|e| IndexError::Configuration(format!("index {}: {}", scheme.name, e)))?;

        let key_length = key_schema.tuple_length();
        let ints_only = scheme.ints_only
            && key_schema.is_integer_only()
            && key_length <= self.config.max_ints_key_size;
        let mode = if ints_only {
            KeyMode::IntsOnly
        } else {
            KeyMode::Generic
        };
        let encoder = KeyEncoder::new(
            mode,
            &scheme.column_indices,
            &scheme.tuple_schema,
            Arc::new(key_schema),
        );
        if !ints_only && encoder.key_length() > self.config.max_generic_key_size {
            return Err(IndexError::KeyTooLarge {
                index: scheme.name.clone(),
                size: encoder.key_length(),
                limit: self.config.max_generic_key_size,
            });
        }

        let name = scheme.name.clone();
        let key_width = encoder.key_length();
        let index: Box<dyn TableIndex> = match (scheme.index_type, scheme.unique) {
            (IndexType::Array, _) => {
                return Err(IndexError::Configuration(format!(
                    "index {}: array indexes are not supported",
                    scheme.name
                )));
            }
            (IndexType::HashTable, true) if ints_only => match self.config.hash_backing {
                HashBacking::HashTable => Box::new(HashUniqueIndex::new(
                    scheme,
                    encoder,
                    rows,
                    HashTable::new(),
                )),
                HashBacking::Tree => Box::new(HashUniqueIndex::new(
                    scheme,
                    encoder,
                    rows,
                    OrderedTree::new(),
                )),
            },
            (index_type, unique) => {
                if index_type == IndexType::HashTable {
                    info!(
                        "index {}: hash index on {} key served by an ordered tree",
                        name,
                        if unique { "generic" } else { "non-unique" }
                    );
                }
                if unique {
                    Box::new(OrderedUniqueIndex::new(scheme, encoder, rows, OrderedTree::new()))
                } else {
                    Box::new(OrderedMultiMapIndex::new(scheme, encoder, rows, OrderedTree::new()))
                }
            }
        };
        debug!(
            "built index {} as {} ({:?} keys, {} bytes)",
            name,
            index.type_name(),
            mode,
            key_width
        );
        Ok(index)
    }
}
