mod common;

use std::collections::BTreeMap;

use common::{
    NUM_OF_TUPLES, drain, drain_at_key, fill, init_logging, int_at, key_of, populate,
    primary_key,
};
use index::{IndexError, IndexResult, ScanStart};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use storage::{RowStore, Value};

#[test]
fn primary_key_lookup_scenario() -> IndexResult<()> {
    init_logging();
    let rows = RowStore::new(common::fixture_schema());
    let tuples = populate(&rows);
    let mut index = primary_key(&rows);
    fill(index.as_mut(), &tuples);

    assert_eq!(index.type_name(), "OrderedUniqueIndex");
    assert_eq!(index.size(), NUM_OF_TUPLES as usize);
    assert!(index.memory_estimate() > 0);

    let key = index.search_key(&[Value::Integer(500), Value::Integer(0)])?;
    assert!(index.move_to_key(&key));
    let matches = drain_at_key(index.as_mut());
    assert_eq!(matches.len(), 1);
    assert_eq!(int_at(&matches[0], 0), 500);
    assert_eq!(int_at(&matches[0], 3), 5500);
    Ok(())
}

#[test]
fn every_row_round_trips_exactly_once() -> IndexResult<()> {
    let rows = RowStore::new(common::fixture_schema());
    let tuples = populate(&rows);
    let mut index = primary_key(&rows);
    fill(index.as_mut(), &tuples);

    for tuple in &tuples {
        assert!(index.move_to_tuple(tuple));
        let found = drain_at_key(index.as_mut());
        assert_eq!(found.len(), 1);
        assert_eq!(key_of(&found[0], &[0, 1]), key_of(tuple, &[0, 1]));
        assert_eq!(found[0].address(), tuple.address());
    }
    assert_eq!(index.stats().lookups, NUM_OF_TUPLES as u64);
    Ok(())
}

#[test]
fn second_row_with_same_key_is_rejected() -> IndexResult<()> {
    let rows = RowStore::new(common::fixture_schema());
    let tuples = populate(&rows);
    let mut index = primary_key(&rows);
    fill(index.as_mut(), &tuples);

    let mut values = tuples[499].values();
    values[2] = Value::Integer(77);
    values[5] = Value::String("someone else".to_string());
    let clash = rows.insert(&values)?;
    assert!(!index.add_entry(&clash));
    assert_eq!(index.size(), NUM_OF_TUPLES as usize);
    assert!(index.exists(&clash));
    Ok(())
}

#[test]
fn full_scan_is_in_key_order() -> IndexResult<()> {
    let rows = RowStore::new(common::fixture_schema());
    let tuples = populate(&rows);
    let mut index = primary_key(&rows);
    // insert back to front so order comes from the index, not from insertion
    for tuple in tuples.iter().rev() {
        assert!(index.add_entry(tuple));
    }

    index.move_to_end(true)?;
    let scanned = drain(index.as_mut());
    assert_eq!(scanned.len(), tuples.len());
    let keys: Vec<(i64, i64)> = scanned.iter().map(|t| (int_at(t, 0), int_at(t, 1))).collect();
    assert!(keys.windows(2).all(|pair| pair[0] < pair[1]));
    Ok(())
}

#[test]
fn swapped_keys_keep_scan_ordered() -> IndexResult<()> {
    let rows = RowStore::new(common::fixture_schema());
    let tuples = populate(&rows);
    let mut index = primary_key(&rows);
    fill(index.as_mut(), &tuples);

    // give rows 10 and 20 each other's key through a free intermediate key
    let a = &tuples[9];
    let b = &tuples[19];
    let mut a_values = a.values();
    let mut b_values = b.values();
    let parked = {
        let mut v = a_values.clone();
        v[0] = Value::Integer(5000);
        rows.update(a.address().unwrap(), &v)?
    };
    assert!(index.replace_entry(a, &parked));
    std::mem::swap(&mut a_values[0], &mut b_values[0]);
    std::mem::swap(&mut a_values[1], &mut b_values[1]);
    let new_b = rows.update(b.address().unwrap(), &b_values)?;
    assert!(index.replace_entry(b, &new_b));
    let new_a = rows.update(a.address().unwrap(), &a_values)?;
    assert!(index.replace_entry(&parked, &new_a));

    index.move_to_end(true)?;
    let scanned = drain(index.as_mut());
    assert_eq!(scanned.len(), tuples.len());
    let keys: Vec<i64> = scanned.iter().map(|t| int_at(t, 0)).collect();
    assert!(keys.windows(2).all(|pair| pair[0] < pair[1]));
    let row_at_10 = scanned.iter().find(|t| int_at(t, 0) == 10).unwrap();
    assert_eq!(row_at_10.address(), b.address());
    Ok(())
}

#[test]
fn delete_and_reinsert_restores_entry() -> IndexResult<()> {
    let rows = RowStore::new(common::fixture_schema());
    let tuples = populate(&rows);
    let mut index = primary_key(&rows);
    fill(index.as_mut(), &tuples);

    let mut rng = StdRng::seed_from_u64(common::SEED);
    for _ in 0..100 {
        let tuple = &tuples[rng.gen_range(0..tuples.len())];
        assert!(index.delete_entry(tuple));
        assert!(!index.exists(tuple));
        assert!(index.add_entry(tuple));
        assert!(index.exists(tuple));
    }
    assert_eq!(index.size(), NUM_OF_TUPLES as usize);
    Ok(())
}

#[test]
fn positioning_past_the_end_finds_nothing() -> IndexResult<()> {
    let rows = RowStore::new(common::fixture_schema());
    let tuples = populate(&rows);
    let mut index = primary_key(&rows);
    fill(index.as_mut(), &tuples);

    let beyond = index.search_key(&[Value::Integer(1001), Value::Integer(0)])?;
    index.move_to_key_or_greater(&beyond)?;
    assert!(index.next_value().is_none());

    let max = index.search_key(&[Value::Integer(1000), Value::Integer(0)])?;
    index.move_to_greater_than_key(&max)?;
    assert!(index.next_value().is_none());

    index.move_to_key_or_greater(&max)?;
    let last = index.next_value().expect("max key row");
    assert_eq!(int_at(&last, 0), 1000);
    assert!(index.next_value().is_none());
    Ok(())
}

#[test]
fn prefix_range_on_leading_column() -> IndexResult<()> {
    let rows = RowStore::new(common::fixture_schema());
    let tuples = populate(&rows);
    let mut index = primary_key(&rows);
    fill(index.as_mut(), &tuples);

    let prefix = index.search_key(&[Value::Integer(998)])?;
    index.move_to_key_or_greater(&prefix)?;
    let ids: Vec<i64> = drain(index.as_mut()).iter().map(|t| int_at(t, 0)).collect();
    assert_eq!(ids, vec![998, 999, 1000]);

    index.move_to_greater_than_key(&prefix)?;
    let ids: Vec<i64> = drain(index.as_mut()).iter().map(|t| int_at(t, 0)).collect();
    assert_eq!(ids, vec![999, 1000]);
    Ok(())
}

#[test]
fn reverse_scan_reports_unsupported() -> IndexResult<()> {
    init_logging();
    let rows = RowStore::new(common::fixture_schema());
    let tuples = populate(&rows);
    let mut index = primary_key(&rows);
    fill(index.as_mut(), &tuples);
    assert!(matches!(
        index.move_to_end(false),
        Err(IndexError::Unsupported { .. })
    ));
    Ok(())
}

#[test]
fn random_workload_matches_reference_map() -> IndexResult<()> {
    let rows = RowStore::new(common::fixture_schema());
    let tuples = populate(&rows);
    let mut index = primary_key(&rows);
    let mut reference = BTreeMap::new();
    let mut rng = StdRng::seed_from_u64(99);

    for _ in 0..5000 {
        let tuple = &tuples[rng.gen_range(0..tuples.len())];
        let key = (int_at(tuple, 0), int_at(tuple, 1));
        if rng.gen_bool(0.6) {
            let added = index.add_entry(tuple);
            assert_eq!(added, reference.insert(key, tuple.address()).is_none());
        } else {
            let deleted = index.delete_entry(tuple);
            assert_eq!(deleted, reference.remove(&key).is_some());
        }
    }
    assert_eq!(index.size(), reference.len());

    let scanned: Vec<(i64, i64)> = index
        .scan(ScanStart::Begin)?
        .map(|t| (int_at(&t, 0), int_at(&t, 1)))
        .collect();
    let expected: Vec<(i64, i64)> = reference.keys().copied().collect();
    assert_eq!(scanned, expected);
    Ok(())
}
