use std::borrow::Cow;
use std::ops::Range;
use std::sync::Arc;

use storage::{ColumnDef, ColumnType, Tuple, TupleSchema, VARCHAR_NULL_FLAG};

use crate::error::{IndexError, IndexResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyMode {
    /// Raw column bytes; integer columns already compare in numeric order.
    IntsOnly,
    /// Less-char transform: varchar prefix bytes stripped, NULL made explicit.
    Generic,
}

/// Turns table rows and search keys into byte strings whose lexicographic
/// order matches the typed order of the key columns.
#[derive(Debug, Clone)]
pub struct KeyEncoder {
    mode: KeyMode,
    columns: Vec<usize>,
    key_schema: Arc<TupleSchema>,
    contiguous: Option<Range<usize>>,
}

impl KeyEncoder {
    /// `columns` index into `table_schema`; `key_schema` is their projection.
    pub fn new(
        mode: KeyMode,
        columns: &[usize],
        table_schema: &TupleSchema,
        key_schema: Arc<TupleSchema>,
    ) -> Self {
        let contiguous = match mode {
            KeyMode::IntsOnly => contiguous_run(columns, table_schema, key_schema.tuple_length()),
            KeyMode::Generic => None,
        };
        Self {
            mode,
            columns: columns.to_vec(),
            key_schema,
            contiguous,
        }
    }

    pub fn mode(&self) -> KeyMode {
        self.mode
    }

    pub fn key_schema(&self) -> &Arc<TupleSchema> {
        &self.key_schema
    }

    /// Width in bytes of a full encoded key.
    pub fn key_length(&self) -> usize {
        match self.mode {
            KeyMode::IntsOnly => self.key_schema.tuple_length(),
            KeyMode::Generic => self.key_schema.columns().iter().map(less_char_width).sum(),
        }
    }

    fn buffer_capacity(&self) -> usize {
        2 * self.key_schema.tuple_length()
    }

    /// True when the key borrows straight out of the row image.
    pub fn borrows_rows(&self) -> bool {
        self.contiguous.is_some()
    }

    /// Encodes the key columns of a table row.
    pub fn encode_row<'a>(&self, row: &'a Tuple) -> Cow<'a, [u8]> {
        if let Some(range) = &self.contiguous
            && let Some(bytes) = row.data().get(range.clone())
        {
            return Cow::Borrowed(bytes);
        }
        let mut out = Vec::with_capacity(self.buffer_capacity());
        for (column, &index) in self.key_schema.columns().iter().zip(&self.columns) {
            let bytes = row.column_bytes(index).unwrap_or_default();
            self.push_column(&mut out, column, bytes);
        }
        Cow::Owned(out)
    }

    /// Encodes a search key built under the key schema or a prefix of it.
    pub fn encode_search_key<'a>(&self, key: &'a Tuple) -> IndexResult<Cow<'a, [u8]>> {
        let schema = key.schema();
        if schema.column_count() == 0 || !schema.is_prefix_of(&self.key_schema) {
            return Err(IndexError::KeyMismatch(format!(
                "{} search columns do not match a prefix of the {} key columns",
                schema.column_count(),
                self.key_schema.column_count()
            )));
        }
        if self.mode == KeyMode::IntsOnly {
            return Ok(Cow::Borrowed(key.data()));
        }
        let mut out = Vec::with_capacity(self.buffer_capacity());
        for (index, column) in schema.columns().iter().enumerate() {
            let bytes = key.column_bytes(index).unwrap_or_default();
            self.push_column(&mut out, column, bytes);
        }
        Ok(Cow::Owned(out))
    }

    /// True when `key` names every key column.
    pub fn is_full_key(&self, key: &Tuple) -> bool {
        key.schema().column_count() == self.key_schema.column_count()
    }

    fn push_column(&self, out: &mut Vec<u8>, column: &ColumnDef, bytes: &[u8]) {
        match (self.mode, column.column_type) {
            (KeyMode::Generic, ColumnType::Varchar(_)) => {
                let Some((&prefix, data)) = bytes.split_first() else {
                    out.push(0);
                    return;
                };
                if column.nullable {
                    out.push(u8::from(prefix & VARCHAR_NULL_FLAG == 0));
                }
                if data.is_empty() {
                    out.push(0);
                } else {
                    out.extend_from_slice(data);
                }
            }
            _ => out.extend_from_slice(bytes),
        }
    }
}

fn less_char_width(column: &ColumnDef) -> usize {
    match column.column_type {
        ColumnType::Varchar(len) => (len - 1).max(1) + usize::from(column.nullable),
        other => other.length(),
    }
}

fn contiguous_run(columns: &[usize], schema: &TupleSchema, length: usize) -> Option<Range<usize>> {
    let first = *columns.first()?;
    if columns.windows(2).any(|pair| pair[1] != pair[0] + 1) {
        return None;
    }
    let start = schema.offset(first)?;
    Some(start..start + length)
}

/// Smallest byte string greater than every string starting with `prefix`.
pub fn prefix_successor(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut next = prefix.to_vec();
    while let Some(last) = next.pop() {
        if last < u8::MAX {
            next.push(last + 1);
            return Some(next);
        }
    }
    None
}
