use std::fmt;
use std::sync::Arc;

use crate::{ColumnType, StorageError, StorageResult, TupleSchema};

/// Width of a serialized row address.
pub const ADDRESS_SIZE: usize = 8;

/// Varchar prefix flag marking a NULL value.
pub const VARCHAR_NULL_FLAG: u8 = 0x80;

/// Stable identity of a stored row. `0` is never handed out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TupleAddress(pub u64);

impl TupleAddress {
    /// Serializes the address into its fixed-width slot form.
    pub fn to_bytes(self) -> [u8; ADDRESS_SIZE] {
        self.0.to_le_bytes()
    }

    /// Reads an address slot; `None` for short input or the null address.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let slot: [u8; ADDRESS_SIZE] = bytes.get(..ADDRESS_SIZE)?.try_into().ok()?;
        match u64::from_le_bytes(slot) {
            0 => None,
            raw => Some(TupleAddress(raw)),
        }
    }
}

impl fmt::Display for TupleAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

/// A typed column value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    Null,
    Integer(i64),
    Timestamp(i64),
    String(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Integer(_) => "INTEGER",
            Value::Timestamp(_) => "TIMESTAMP",
            Value::String(_) => "VARCHAR",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Integer(v) | Value::Timestamp(v) => write!(f, "{}", v),
            Value::String(s) => write!(f, "{}", s),
        }
    }
}

/// A fixed-layout row image plus the schema describing it.
///
/// Integer and timestamp columns are stored big-endian with the sign bit
/// inverted, so raw column bytes compare in numeric order. NULL integers are
/// the all-zero pattern (the type minimum), which is not a legal value.
/// Varchar columns hold one prefix byte (`VARCHAR_NULL_FLAG` or the byte
/// length) followed by zero-padded data.
#[derive(Debug, Clone, PartialEq)]
pub struct Tuple {
    data: Vec<u8>,
    schema: Arc<TupleSchema>,
    address: Option<TupleAddress>,
}

impl Tuple {
    /// Encodes `values` under `schema`.
    pub fn from_values(schema: Arc<TupleSchema>, values: &[Value]) -> StorageResult<Self> {
        if values.len() != schema.column_count() {
            return Err(StorageError::ColumnCount {
                expected: schema.column_count(),
                found: values.len(),
            });
        }
        let mut data = vec![0u8; schema.tuple_length()];
        for (index, (column, value)) in schema.columns().iter().zip(values).enumerate() {
            let offset = schema.offset(index).unwrap_or_default();
            let width = column.column_type.length();
            let slot = &mut data[offset..offset + width];

            let mismatch = || StorageError::TypeMismatch {
                column: column.name.clone(),
                expected: column.column_type.to_string(),
                found: value.type_name().to_string(),
            };

            match (column.column_type, value) {
                (_, Value::Null) => {
                    if !column.nullable {
                        return Err(StorageError::TypeMismatch {
                            column: column.name.clone(),
                            expected: "NOT NULL".to_string(),
                            found: "NULL".to_string(),
                        });
                    }
                    if let ColumnType::Varchar(_) = column.column_type {
                        slot[0] = VARCHAR_NULL_FLAG;
                    }
                }
                (ColumnType::Varchar(len), Value::String(s)) => {
                    let bytes = s.as_bytes();
                    if bytes.contains(&0) {
                        return Err(StorageError::InvalidString {
                            column: column.name.clone(),
                        });
                    }
                    if bytes.len() > len - 1 {
                        return Err(StorageError::StringTooLong {
                            column: column.name.clone(),
                            len: bytes.len(),
                            capacity: len - 1,
                        });
                    }
                    slot[0] = bytes.len() as u8;
                    slot[1..1 + bytes.len()].copy_from_slice(bytes);
                }
                (ColumnType::Varchar(_), _) => return Err(mismatch()),
                (ColumnType::Timestamp, Value::Timestamp(v) | Value::Integer(v))
                | (
                    ColumnType::TinyInt
                    | ColumnType::SmallInt
                    | ColumnType::Integer
                    | ColumnType::BigInt,
                    Value::Integer(v),
                ) => {
                    if !int_in_range(*v, width) {
                        return Err(StorageError::ValueOutOfRange {
                            column: column.name.clone(),
                            value: *v,
                        });
                    }
                    write_int(slot, *v);
                }
                _ => return Err(mismatch()),
            }
        }
        Ok(Self {
            data,
            schema,
            address: None,
        })
    }

    /// Wraps an existing row image.
    pub fn from_bytes(schema: Arc<TupleSchema>, data: Vec<u8>) -> StorageResult<Self> {
        if data.len() != schema.tuple_length() {
            return Err(StorageError::SchemaMismatch(format!(
                "row image is {} bytes, schema expects {}",
                data.len(),
                schema.tuple_length()
            )));
        }
        Ok(Self {
            data,
            schema,
            address: None,
        })
    }

    /// Returns the same row tagged with a storage address.
    pub fn with_address(mut self, address: TupleAddress) -> Self {
        self.address = Some(address);
        self
    }

    /// Returns the storage address, if the row is stored.
    pub fn address(&self) -> Option<TupleAddress> {
        self.address
    }

    pub fn schema(&self) -> &Arc<TupleSchema> {
        &self.schema
    }

    /// Returns the raw row image.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.schema.column_count()
    }

    pub fn is_empty(&self) -> bool {
        self.schema.column_count() == 0
    }

    /// Returns the raw bytes of one column, prefix byte included.
    pub fn column_bytes(&self, index: usize) -> Option<&[u8]> {
        let offset = self.schema.offset(index)?;
        let len = self.schema.column_length(index)?;
        self.data.get(offset..offset + len)
    }

    /// Decodes one column.
    pub fn get(&self, index: usize) -> Option<Value> {
        let column = self.schema.column(index)?;
        let bytes = self.column_bytes(index)?;
        let value = match column.column_type {
            ColumnType::Varchar(_) => {
                let prefix = bytes[0];
                if prefix & VARCHAR_NULL_FLAG != 0 {
                    Value::Null
                } else {
                    let end = (1 + prefix as usize).min(bytes.len());
                    Value::String(String::from_utf8_lossy(&bytes[1..end]).into_owned())
                }
            }
            ColumnType::Timestamp => read_int(bytes).map_or(Value::Null, Value::Timestamp),
            _ => read_int(bytes).map_or(Value::Null, Value::Integer),
        };
        Some(value)
    }

    /// Decodes every column.
    pub fn values(&self) -> Vec<Value> {
        (0..self.len()).filter_map(|i| self.get(i)).collect()
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, value) in self.values().iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", value)?;
        }
        write!(f, ")")
    }
}

fn int_bias(width: usize) -> i128 {
    1i128 << (width * 8 - 1)
}

fn int_in_range(value: i64, width: usize) -> bool {
    let bias = int_bias(width);
    let value = value as i128;
    // the type minimum is the NULL pattern
    value > -bias && value < bias
}

fn write_int(slot: &mut [u8], value: i64) {
    let width = slot.len();
    let biased = (value as i128 + int_bias(width)) as u64;
    slot.copy_from_slice(&biased.to_be_bytes()[8 - width..]);
}

fn read_int(bytes: &[u8]) -> Option<i64> {
    let width = bytes.len();
    let mut buf = [0u8; 8];
    buf[8 - width..].copy_from_slice(bytes);
    match u64::from_be_bytes(buf) {
        0 => None,
        biased => Some((biased as i128 - int_bias(width)) as i64),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ColumnDef;

    fn schema() -> Arc<TupleSchema> {
        Arc::new(
            TupleSchema::new(vec![
                ColumnDef::new("a", ColumnType::SmallInt),
                ColumnDef::new("b", ColumnType::BigInt).nullable(),
                ColumnDef::new("s", ColumnType::Varchar(6)).nullable(),
                ColumnDef::new("ts", ColumnType::Timestamp),
            ])
            .unwrap(),
        )
    }

    #[test]
    fn test_values_survive_layout() {
        let values = vec![
            Value::Integer(-12),
            Value::Null,
            Value::String("hey".into()),
            Value::Timestamp(1_700_000_000),
        ];
        let tuple = Tuple::from_values(schema(), &values).unwrap();
        assert_eq!(tuple.values(), values);
        assert_eq!(tuple.column_bytes(2).unwrap()[0], 3);
        assert_eq!(tuple.column_bytes(1).unwrap(), &[0u8; 8]);
        assert_eq!(tuple.to_string(), "(-12, NULL, hey, 1700000000)");
    }

    #[test]
    fn test_integer_bytes_compare_numerically() {
        let s = schema();
        let encode = |v: i64| {
            let t = Tuple::from_values(
                s.clone(),
                &[Value::Integer(v), Value::Null, Value::Null, Value::Integer(0)],
            )
            .unwrap();
            t.column_bytes(0).unwrap().to_vec()
        };
        let samples = [-32767, -300, -1, 0, 1, 255, 256, 32767];
        for pair in samples.windows(2) {
            assert!(encode(pair[0]) < encode(pair[1]), "{:?}", pair);
        }
    }

    #[test]
    fn test_rejects_bad_values() {
        let s = schema();
        let row = |a: Value, str_val: Value| {
            Tuple::from_values(s.clone(), &[a, Value::Null, str_val, Value::Integer(1)])
        };
        assert!(matches!(
            row(Value::Integer(i16::MIN as i64), Value::Null),
            Err(StorageError::ValueOutOfRange { .. })
        ));
        assert!(matches!(
            row(Value::Integer(40_000), Value::Null),
            Err(StorageError::ValueOutOfRange { .. })
        ));
        assert!(matches!(
            row(Value::Integer(1), Value::String("toolong".into())),
            Err(StorageError::StringTooLong { .. })
        ));
        assert!(matches!(
            row(Value::Integer(1), Value::String("a\0b".into())),
            Err(StorageError::InvalidString { .. })
        ));
        assert!(matches!(
            row(Value::Null, Value::Null),
            Err(StorageError::TypeMismatch { .. })
        ));
        assert!(matches!(
            row(Value::String("x".into()), Value::Null),
            Err(StorageError::TypeMismatch { .. })
        ));
        assert!(matches!(
            Tuple::from_values(s.clone(), &[Value::Integer(1)]),
            Err(StorageError::ColumnCount { .. })
        ));
    }

    #[test]
    fn test_address_slots() {
        let address = TupleAddress(42);
        assert_eq!(TupleAddress::from_bytes(&address.to_bytes()), Some(address));
        assert_eq!(TupleAddress::from_bytes(&[0u8; 8]), None);
        assert_eq!(TupleAddress::from_bytes(&[1, 2]), None);
    }
}
