//! The seven-column benchmark table used by `index-bench` and the table tests.

use std::sync::Arc;

use rand::Rng;
use rand::distributions::Alphanumeric;
use storage::{ColumnDef, ColumnType, StorageResult, TupleSchema, Value};

// `index/tests/common` mirrors this layout; change both together.
pub const STRING_WIDTH: usize = 30;

/// Bytes per fixture row.
pub const TUPLE_LENGTH: usize = 83;

/// Largest row number whose values fit the fixture's smallint column.
pub const MAX_ROWS: i64 = i16::MAX as i64;

/// smallint, tinyint, integer, bigint, bigint, varchar(30), varchar(30)
pub fn schema() -> StorageResult<Arc<TupleSchema>> {
    let schema = TupleSchema::new(vec![
        ColumnDef::new("c0", ColumnType::SmallInt),
        ColumnDef::new("c1", ColumnType::TinyInt),
        ColumnDef::new("c2", ColumnType::Integer),
        ColumnDef::new("c3", ColumnType::BigInt),
        ColumnDef::new("c4", ColumnType::BigInt),
        ColumnDef::new("c5", ColumnType::Varchar(STRING_WIDTH)),
        ColumnDef::new("c6", ColumnType::Varchar(STRING_WIDTH)),
    ])?;
    Ok(Arc::new(schema))
}

/// Values of row `i`: `(i, i % 100, i % 3, i * 11, i + 20, s, s)`.
pub fn row(i: i64, rng: &mut impl Rng) -> Vec<Value> {
    vec![
        Value::Integer(i),
        Value::Integer(i % 100),
        Value::Integer(i % 3),
        Value::Integer(i * 11),
        Value::Integer(i + 20),
        Value::String(random_string(rng)),
        Value::String(random_string(rng)),
    ]
}

fn random_string(rng: &mut impl Rng) -> String {
    let len = rng.gen_range(1..STRING_WIDTH);
    rng.sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}
