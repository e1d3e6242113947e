#![allow(dead_code)]

use std::sync::Arc;

use index::{IndexConfig, IndexFactory, IndexScheme, IndexType, TableIndex};
use rand::distributions::Alphanumeric;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use storage::{ColumnDef, ColumnType, RowStore, Tuple, TupleSchema, Value};

pub const NUM_OF_TUPLES: i64 = 1000;
pub const SEED: u64 = 1234;

// Mirrors `db::fixture`; the two layouts must stay identical.
pub const STRING_WIDTH: usize = 30;
pub const TUPLE_LENGTH: usize = 83;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// smallint, tinyint, integer, bigint, bigint, varchar(30), varchar(30)
pub fn fixture_schema() -> Arc<TupleSchema> {
    let schema = TupleSchema::new(vec![
        ColumnDef::new("c0", ColumnType::SmallInt),
        ColumnDef::new("c1", ColumnType::TinyInt),
        ColumnDef::new("c2", ColumnType::Integer),
        ColumnDef::new("c3", ColumnType::BigInt),
        ColumnDef::new("c4", ColumnType::BigInt),
        ColumnDef::new("c5", ColumnType::Varchar(STRING_WIDTH)),
        ColumnDef::new("c6", ColumnType::Varchar(STRING_WIDTH)),
    ])
    .expect("fixture schema");
    Arc::new(schema)
}

pub fn random_string(rng: &mut StdRng, max_len: usize) -> String {
    let len = rng.gen_range(1..=max_len);
    rng.sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

pub fn fixture_values(i: i64, rng: &mut StdRng) -> Vec<Value> {
    vec![
        Value::Integer(i),
        Value::Integer(i % 100),
        Value::Integer(i % 3),
        Value::Integer(i * 11),
        Value::Integer(i + 20),
        Value::String(random_string(rng, STRING_WIDTH - 1)),
        Value::String(random_string(rng, STRING_WIDTH - 1)),
    ]
}

/// Stores rows i = 1..=NUM_OF_TUPLES and returns them with their addresses.
pub fn populate(rows: &RowStore) -> Vec<Tuple> {
    let mut rng = StdRng::seed_from_u64(SEED);
    (1..=NUM_OF_TUPLES)
        .map(|i| rows.insert(&fixture_values(i, &mut rng)).expect("insert row"))
        .collect()
}

pub fn scheme(
    rows: &RowStore,
    name: &str,
    index_type: IndexType,
    columns: &[usize],
    unique: bool,
    ints_only: bool,
) -> IndexScheme {
    IndexScheme::new(
        name,
        index_type,
        columns.to_vec(),
        unique,
        ints_only,
        rows.schema().clone(),
    )
}

pub fn build(
    rows: &RowStore,
    name: &str,
    index_type: IndexType,
    columns: &[usize],
    unique: bool,
    ints_only: bool,
) -> Box<dyn TableIndex> {
    IndexFactory::new(IndexConfig::default())
        .create(
            scheme(rows, name, index_type, columns, unique, ints_only),
            rows.clone(),
        )
        .expect("create index")
}

/// The primary key used throughout: (c0, c1), unique, integer-only tree.
pub fn primary_key(rows: &RowStore) -> Box<dyn TableIndex> {
    build(rows, "pkey", IndexType::BalancedTree, &[0, 1], true, true)
}

pub fn fill(index: &mut dyn TableIndex, tuples: &[Tuple]) {
    for tuple in tuples {
        assert!(index.add_entry(tuple), "add_entry failed for {}", tuple);
    }
}

pub fn int_at(tuple: &Tuple, column: usize) -> i64 {
    match tuple.get(column) {
        Some(Value::Integer(v)) => v,
        other => panic!("column {} is not an integer: {:?}", column, other),
    }
}

pub fn key_of(tuple: &Tuple, columns: &[usize]) -> Vec<Value> {
    columns
        .iter()
        .map(|&c| tuple.get(c).expect("key column"))
        .collect()
}

pub fn drain(index: &mut dyn TableIndex) -> Vec<Tuple> {
    std::iter::from_fn(|| index.next_value()).collect()
}

pub fn drain_at_key(index: &mut dyn TableIndex) -> Vec<Tuple> {
    std::iter::from_fn(|| index.next_value_at_key()).collect()
}
