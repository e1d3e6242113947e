use std::sync::Arc;

use index::{IndexConfig, IndexFactory, IndexScheme, ScanStart, TableIndex};
use log::{debug, warn};
use storage::{RowStore, Tuple, TupleAddress, TupleSchema, Value};

use crate::error::{TableError, TableResult};

/// A row store plus the indexes kept in step with it.
///
/// Every index reports failures through `false` returns. The table turns the
/// ones that mean a duplicate key into `TableError::ConstraintViolation` and
/// undoes whatever part of the change had already been applied.
pub struct PersistentTable {
    name: String,
    rows: RowStore,
    factory: IndexFactory,
    indexes: Vec<Box<dyn TableIndex>>,
    primary_key: Option<usize>,
}

impl PersistentTable {
    pub fn new(
        name: impl Into<String>,
        schema: Arc<TupleSchema>,
        primary_key: Option<IndexScheme>,
        indexes: Vec<IndexScheme>,
        config: IndexConfig,
    ) -> TableResult<Self> {
        let mut table = Self {
            name: name.into(),
            rows: RowStore::new(schema),
            factory: IndexFactory::new(config),
            indexes: Vec::new(),
            primary_key: None,
        };
        if let Some(scheme) = primary_key {
            table.create_index(scheme)?;
            table.primary_key = Some(0);
        }
        for scheme in indexes {
            table.create_index(scheme)?;
        }
        Ok(table)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Arc<TupleSchema> {
        self.rows.schema()
    }

    pub fn rows(&self) -> &RowStore {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn primary_key(&self) -> Option<&dyn TableIndex> {
        self.primary_key.map(|position| self.indexes[position].as_ref())
    }

    pub fn index(&self, name: &str) -> Option<&dyn TableIndex> {
        self.indexes
            .iter()
            .find(|index| index.name() == name)
            .map(|index| index.as_ref())
    }

    pub fn indexes(&self) -> impl Iterator<Item = &dyn TableIndex> {
        self.indexes.iter().map(|index| index.as_ref())
    }

    /// Builds another index and fills it from the rows already stored.
    /// A failed backfill leaves neither the index nor its trace file behind.
    pub fn create_index(&mut self, scheme: IndexScheme) -> TableResult<()> {
        if self.index(&scheme.name).is_some() {
            return Err(TableError::DuplicateIndex {
                table: self.name.clone(),
                index: scheme.name,
            });
        }
        let trace = self.factory.config().trace_path(&scheme.name);
        let mut index = self.factory.create(scheme, self.rows.clone())?;
        for address in self.rows.addresses() {
            let Some(tuple) = self.rows.get(address) else {
                continue;
            };
            if !index.add_entry(&tuple) {
                let error = self.violation(index.as_ref());
                drop(index);
                if let Some(path) = trace
                    && let Err(e) = std::fs::remove_file(&path)
                {
                    warn!(
                        "table {}: cannot remove trace {}: {}",
                        self.name,
                        path.display(),
                        e
                    );
                }
                return Err(error);
            }
        }
        debug!(
            "table {}: index {} ready with {} entries",
            self.name,
            index.name(),
            index.size()
        );
        self.indexes.push(index);
        Ok(())
    }

    pub fn insert(&mut self, values: &[Value]) -> TableResult<Tuple> {
        let tuple = self.rows.insert(values)?;
        for position in 0..self.indexes.len() {
            if self.indexes[position].add_entry(&tuple) {
                continue;
            }
            let error = self.violation(self.indexes[position].as_ref());
            for index in &mut self.indexes[..position] {
                index.delete_entry(&tuple);
            }
            if let Some(address) = tuple.address() {
                self.rows.remove(address)?;
            }
            return Err(error);
        }
        Ok(tuple)
    }

    pub fn delete(&mut self, address: TupleAddress) -> TableResult<Tuple> {
        let tuple = self
            .rows
            .get(address)
            .ok_or(TableError::RowNotFound(address))?;
        for index in &mut self.indexes {
            if !index.delete_entry(&tuple) {
                warn!(
                    "table {}: index {} had no entry for row {}",
                    self.name,
                    index.name(),
                    address
                );
            }
        }
        self.rows.remove(address)?;
        Ok(tuple)
    }

    /// Rewrites the row at `address` and moves its entries in every index
    /// whose key columns changed.
    pub fn update(&mut self, address: TupleAddress, values: &[Value]) -> TableResult<Tuple> {
        let old = self
            .rows
            .get(address)
            .ok_or(TableError::RowNotFound(address))?;
        let new = Tuple::from_values(self.rows.schema().clone(), values)?.with_address(address);

        let changed: Vec<usize> = (0..self.indexes.len())
            .filter(|&position| self.indexes[position].check_for_index_change(&old, &new))
            .collect();
        for &position in &changed {
            let index = self.indexes[position].as_ref();
            if index.scheme().unique && index.exists(&new) {
                return Err(self.violation(index));
            }
        }

        let new = self.rows.update(address, values)?;
        for (done, &position) in changed.iter().enumerate() {
            if self.indexes[position].replace_entry(&old, &new) {
                continue;
            }
            let error = self.violation(self.indexes[position].as_ref());
            self.indexes[position].add_entry(&old);
            for &earlier in changed[..done].iter().rev() {
                self.indexes[earlier].replace_entry(&new, &old);
            }
            self.rows.update(address, &old.values())?;
            return Err(error);
        }
        Ok(new)
    }

    /// Moves one row to a fresh slot and repoints every index at it.
    pub fn relocate(&mut self, address: TupleAddress) -> TableResult<TupleAddress> {
        let relocation = self.rows.relocate(address)?;
        self.forward(relocation.old, relocation.new)?;
        Ok(relocation.new)
    }

    /// Packs the row store and forwards each relocation to every index.
    /// Returns the number of rows that moved.
    pub fn compact(&mut self) -> TableResult<usize> {
        let relocations = self.rows.compact();
        for relocation in &relocations {
            self.forward(relocation.old, relocation.new)?;
        }
        Ok(relocations.len())
    }

    /// All rows whose key in `index` equals `key`.
    pub fn lookup(&mut self, index: &str, key: &[Value]) -> TableResult<Vec<Tuple>> {
        let position = self.position(index)?;
        let index = self.indexes[position].as_mut();
        let key = index.search_key(key)?;
        let mut found = Vec::new();
        if index.move_to_key(&key) {
            while let Some(tuple) = index.next_value_at_key() {
                found.push(tuple);
            }
        }
        Ok(found)
    }

    /// Rows in key order starting at the first key not below `from`, or at
    /// the beginning of the index when `from` is empty.
    pub fn range(&self, index: &str, from: &[Value], limit: usize) -> TableResult<Vec<Tuple>> {
        let index = self.indexes[self.position(index)?].as_ref();
        let rows = if from.is_empty() {
            index.scan(ScanStart::Begin)?.take(limit).collect()
        } else {
            let key = index.search_key(from)?;
            index.scan(ScanStart::KeyOrGreater(&key))?.take(limit).collect()
        };
        Ok(rows)
    }

    fn position(&self, name: &str) -> TableResult<usize> {
        self.indexes
            .iter()
            .position(|index| index.name() == name)
            .ok_or_else(|| TableError::UnknownIndex {
                table: self.name.clone(),
                index: name.to_string(),
            })
    }

    fn forward(&mut self, old: TupleAddress, new: TupleAddress) -> TableResult<()> {
        let tuple = self.rows.get(new).ok_or(TableError::RowNotFound(new))?;
        for index in &mut self.indexes {
            if !index.set_entry_to_new_address(&tuple, new, old) {
                warn!(
                    "table {}: index {} lost row {} while moving it to {}",
                    self.name,
                    index.name(),
                    old,
                    new
                );
            }
        }
        Ok(())
    }

    fn violation(&self, index: &dyn TableIndex) -> TableError {
        TableError::ConstraintViolation {
            table: self.name.clone(),
            index: index.name().to_string(),
        }
    }
}
