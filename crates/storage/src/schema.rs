use std::fmt;

use crate::{StorageError, StorageResult};

/// Largest declared varchar length, prefix byte included.
pub const MAX_VARCHAR_LENGTH: usize = 128;

/// Fixed-width column types understood by the row layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    TinyInt,
    SmallInt,
    Integer,
    BigInt,
    Timestamp,
    /// Declared length including the one-byte length prefix.
    Varchar(usize),
}

impl ColumnType {
    /// Returns the number of bytes the column occupies inside a row.
    pub fn length(&self) -> usize {
        match self {
            ColumnType::TinyInt => 1,
            ColumnType::SmallInt => 2,
            ColumnType::Integer => 4,
            ColumnType::BigInt | ColumnType::Timestamp => 8,
            ColumnType::Varchar(len) => *len,
        }
    }

    /// Returns true for every integer-like column (timestamps included).
    pub fn is_integer(&self) -> bool {
        !matches!(self, ColumnType::Varchar(_))
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::TinyInt => write!(f, "TINYINT"),
            ColumnType::SmallInt => write!(f, "SMALLINT"),
            ColumnType::Integer => write!(f, "INTEGER"),
            ColumnType::BigInt => write!(f, "BIGINT"),
            ColumnType::Timestamp => write!(f, "TIMESTAMP"),
            ColumnType::Varchar(len) => write!(f, "VARCHAR({})", len),
        }
    }
}

/// A named column with its type and nullability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    pub column_type: ColumnType,
    pub nullable: bool,
}

impl ColumnDef {
    /// Creates a NOT NULL column.
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            nullable: false,
        }
    }

    /// Marks the column as accepting NULL.
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }
}

/// Column layout of a fixed-length row: per-column byte offsets and total width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TupleSchema {
    columns: Vec<ColumnDef>,
    offsets: Vec<usize>,
    length: usize,
}

impl TupleSchema {
    /// Builds a schema, validating varchar lengths.
    pub fn new(columns: Vec<ColumnDef>) -> StorageResult<Self> {
        let mut offsets = Vec::with_capacity(columns.len());
        let mut length = 0;
        for column in &columns {
            if let ColumnType::Varchar(len) = column.column_type
                && !(1..=MAX_VARCHAR_LENGTH).contains(&len)
            {
                return Err(StorageError::SchemaMismatch(format!(
                    "column {} declares VARCHAR({}), allowed 1..={}",
                    column.name, len, MAX_VARCHAR_LENGTH
                )));
            }
            offsets.push(length);
            length += column.column_type.length();
        }
        Ok(Self {
            columns,
            offsets,
            length,
        })
    }

    /// Returns the number of columns.
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Returns all column definitions in order.
    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    /// Returns the column definition at `index`.
    pub fn column(&self, index: usize) -> Option<&ColumnDef> {
        self.columns.get(index)
    }

    /// Returns the byte offset of a column inside the row image.
    pub fn offset(&self, index: usize) -> Option<usize> {
        self.offsets.get(index).copied()
    }

    /// Returns the declared byte length of a column.
    pub fn column_length(&self, index: usize) -> Option<usize> {
        self.columns.get(index).map(|c| c.column_type.length())
    }

    /// Returns the total row width in bytes.
    pub fn tuple_length(&self) -> usize {
        self.length
    }

    /// True when every column is integer-like.
    pub fn is_integer_only(&self) -> bool {
        self.columns.iter().all(|c| c.column_type.is_integer())
    }

    /// Builds the schema of the given columns, in the given order.
    pub fn project(&self, indices: &[usize]) -> StorageResult<TupleSchema> {
        let mut columns = Vec::with_capacity(indices.len());
        for &index in indices {
            let column = self.columns.get(index).ok_or(StorageError::ColumnCount {
                expected: self.columns.len(),
                found: index + 1,
            })?;
            columns.push(column.clone());
        }
        TupleSchema::new(columns)
    }

    /// Schema made of the first `count` columns.
    pub fn prefix(&self, count: usize) -> TupleSchema {
        let count = count.min(self.columns.len());
        let length = self
            .offsets
            .get(count)
            .copied()
            .unwrap_or(self.length);
        TupleSchema {
            columns: self.columns[..count].to_vec(),
            offsets: self.offsets[..count].to_vec(),
            length,
        }
    }

    /// True when `other` has the same column types as a leading run of `self`.
    pub fn is_prefix_of(&self, other: &TupleSchema) -> bool {
        self.columns.len() <= other.columns.len()
            && self
                .columns
                .iter()
                .zip(other.columns.iter())
                .all(|(a, b)| a.column_type == b.column_type && a.nullable == b.nullable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TupleSchema {
        TupleSchema::new(vec![
            ColumnDef::new("id", ColumnType::SmallInt),
            ColumnDef::new("flag", ColumnType::TinyInt),
            ColumnDef::new("name", ColumnType::Varchar(30)).nullable(),
            ColumnDef::new("total", ColumnType::BigInt),
        ])
        .unwrap()
    }

    #[test]
    fn test_offsets_and_length() {
        let schema = sample();
        assert_eq!(schema.offset(0), Some(0));
        assert_eq!(schema.offset(1), Some(2));
        assert_eq!(schema.offset(2), Some(3));
        assert_eq!(schema.offset(3), Some(33));
        assert_eq!(schema.tuple_length(), 41);
        assert!(!schema.is_integer_only());
    }

    #[test]
    fn test_project_keeps_requested_order() {
        let schema = sample();
        let key = schema.project(&[3, 0]).unwrap();
        assert_eq!(key.column_count(), 2);
        assert_eq!(key.column(0).unwrap().name, "total");
        assert_eq!(key.offset(1), Some(8));
        assert_eq!(key.tuple_length(), 10);
        assert!(key.is_integer_only());
        assert!(schema.project(&[7]).is_err());
    }

    #[test]
    fn test_prefix_schema() {
        let schema = sample();
        let prefix = schema.prefix(2);
        assert_eq!(prefix.column_count(), 2);
        assert_eq!(prefix.tuple_length(), 3);
        assert!(prefix.is_prefix_of(&schema));
        assert!(!schema.is_prefix_of(&prefix));
    }

    #[test]
    fn test_rejects_oversized_varchar() {
        let err = TupleSchema::new(vec![ColumnDef::new("s", ColumnType::Varchar(129))]);
        assert!(matches!(err, Err(StorageError::SchemaMismatch(_))));
        assert!(TupleSchema::new(vec![ColumnDef::new("s", ColumnType::Varchar(0))]).is_err());
    }
}
