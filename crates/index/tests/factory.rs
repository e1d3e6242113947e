mod common;

use std::fs;
use std::sync::Arc;

use common::{populate, scheme};
use index::{HashBacking, IndexConfig, IndexError, IndexFactory, IndexScheme, IndexType};
use storage::{ColumnDef, ColumnType, RowStore, TupleSchema};

fn wide_schema() -> Arc<TupleSchema> {
    let schema = TupleSchema::new(vec![
        ColumnDef::new("a", ColumnType::BigInt),
        ColumnDef::new("b", ColumnType::BigInt),
        ColumnDef::new("c", ColumnType::BigInt),
        ColumnDef::new("d", ColumnType::BigInt),
        ColumnDef::new("e", ColumnType::BigInt),
        ColumnDef::new("note", ColumnType::Varchar(128)),
    ])
    .expect("wide schema");
    Arc::new(schema)
}

fn create(
    factory: &IndexFactory,
    rows: &RowStore,
    index_type: IndexType,
    columns: &[usize],
    unique: bool,
    ints_only: bool,
) -> Result<Box<dyn index::TableIndex>, IndexError> {
    factory.create(
        scheme(rows, "candidate", index_type, columns, unique, ints_only),
        rows.clone(),
    )
}

#[test]
fn wide_integer_keys_use_the_generic_encoder() {
    let rows = RowStore::new(wide_schema());
    let factory = IndexFactory::default();

    // four bigints fill the integer key limit exactly
    let narrow = create(&factory, &rows, IndexType::HashTable, &[0, 1, 2, 3], true, true)
        .expect("32 byte key");
    assert_eq!(narrow.type_name(), "HashUniqueIndex");

    // a fifth pushes it past, so the hash request becomes a generic tree
    let wide = create(&factory, &rows, IndexType::HashTable, &[0, 1, 2, 3, 4], true, true)
        .expect("40 byte key");
    assert_eq!(wide.type_name(), "OrderedUniqueIndex");
}

#[test]
fn generic_key_limit_is_enforced() {
    let rows = RowStore::new(wide_schema());
    let config = IndexConfig {
        max_generic_key_size: 100,
        ..IndexConfig::default()
    };
    let factory = IndexFactory::new(config);

    let result = create(&factory, &rows, IndexType::BalancedTree, &[5], false, false);
    match result {
        Err(IndexError::KeyTooLarge { size, limit, .. }) => {
            assert_eq!(size, 127);
            assert_eq!(limit, 100);
        }
        Err(other) => panic!("unexpected error: {}", other),
        Ok(index) => panic!("built {} over an oversized key", index.type_name()),
    }

    // integer keys are not subject to the generic limit
    assert!(create(&factory, &rows, IndexType::BalancedTree, &[0, 1], true, true).is_ok());
}

#[test]
fn invalid_schemes_are_configuration_errors() {
    let rows = RowStore::new(common::fixture_schema());
    let factory = IndexFactory::default();

    let cases: Vec<(IndexType, Vec<usize>)> = vec![
        (IndexType::Array, vec![0]),
        (IndexType::BalancedTree, vec![]),
        (IndexType::BalancedTree, vec![0, 7]),
    ];
    for (index_type, columns) in cases {
        let result = create(&factory, &rows, index_type, &columns, true, true);
        assert!(
            matches!(result, Err(IndexError::Configuration(_))),
            "{:?} over {:?} should be rejected",
            index_type,
            columns
        );
    }

    let other_layout = IndexScheme::new(
        "mismatch",
        IndexType::BalancedTree,
        vec![0],
        true,
        true,
        wide_schema(),
    );
    assert!(matches!(
        factory.create(other_layout, rows.clone()),
        Err(IndexError::Configuration(_))
    ));
}

#[test]
fn fixture_layout_is_pinned() {
    let schema = common::fixture_schema();
    assert_eq!(schema.column_count(), 7);
    assert_eq!(schema.tuple_length(), common::TUPLE_LENGTH);
    assert_eq!(schema.column_length(5), Some(common::STRING_WIDTH));
}

#[test]
fn index_type_names_parse() {
    assert_eq!(IndexType::parse("btree"), Some(IndexType::BalancedTree));
    assert_eq!(IndexType::parse("tree"), Some(IndexType::BalancedTree));
    assert_eq!(IndexType::parse("hash"), Some(IndexType::HashTable));
    assert_eq!(IndexType::parse("array"), Some(IndexType::Array));
    assert_eq!(IndexType::parse("skiplist"), None);
}

#[test]
fn config_loads_from_json_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("index.json");
    fs::write(
        &path,
        r#"{ "hash_backing": "tree", "max_generic_key_size": 48 }"#,
    )
    .expect("write config");

    let config = IndexConfig::load(&path).expect("load config");
    assert_eq!(config.hash_backing, HashBacking::Tree);
    assert_eq!(config.max_generic_key_size, 48);
    assert_eq!(config.max_ints_key_size, 32);

    let rows = RowStore::new(common::fixture_schema());
    populate(&rows);
    let factory = IndexFactory::new(config);
    // one varchar(30) column encodes to 29 bytes, two to 58
    let single = create(&factory, &rows, IndexType::BalancedTree, &[5], false, false)
        .expect("29 byte key fits");
    assert_eq!(single.type_name(), "OrderedMultiMapIndex");
    assert!(matches!(
        create(&factory, &rows, IndexType::BalancedTree, &[5, 6], false, false),
        Err(IndexError::KeyTooLarge { size: 58, limit: 48, .. })
    ));

    assert!(matches!(
        IndexConfig::load(&dir.path().join("missing.json")),
        Err(IndexError::Io(_))
    ));
}
