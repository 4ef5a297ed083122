#![cfg(feature = "dev")]

use lwpr_rs::internals::primitives::buffer::Slot;
use lwpr_rs::internals::primitives::columns::ColumnStore;

// ============================================================================
// ColumnStore Tests
// ============================================================================

#[test]
fn test_zeros_layout() {
    let store: ColumnStore<f64> = ColumnStore::zeros(3, 2, 4);
    assert_eq!(store.cols(), 2);
    assert!(store.capacity_cols() >= 4);
    assert_eq!(store.col(0), &[0.0, 0.0, 0.0]);
    assert_eq!(store.col(1), &[0.0, 0.0, 0.0]);
}

#[test]
fn test_columns_are_independent() {
    let mut store: ColumnStore<f64> = ColumnStore::zeros(2, 3, 3);
    store.col_mut(1).copy_from_slice(&[1.0, 2.0]);
    assert_eq!(store.col(0), &[0.0, 0.0]);
    assert_eq!(store.col(1), &[1.0, 2.0]);
    assert_eq!(store.col(2), &[0.0, 0.0]);
}

#[test]
#[should_panic]
fn test_column_out_of_range_panics() {
    let store: ColumnStore<f64> = ColumnStore::zeros(2, 2, 4);
    let _ = store.col(2);
}

#[test]
fn test_push_zero_column_grows_in_steps() {
    let mut store: ColumnStore<f64> = ColumnStore::zeros(4, 1, 1);
    store.col_mut(0).copy_from_slice(&[1.0, 2.0, 3.0, 4.0]);

    store.push_zero_column(2).unwrap();
    assert_eq!(store.cols(), 2);
    assert!(store.capacity_cols() >= 3);
    assert_eq!(store.col(0), &[1.0, 2.0, 3.0, 4.0]);
    assert_eq!(store.col(1), &[0.0; 4]);

    // Within the reserved step no reallocation is needed.
    let cap = store.capacity_cols();
    store.push_zero_column(2).unwrap();
    assert_eq!(store.cols(), 3);
    assert_eq!(store.capacity_cols(), cap);
}

#[test]
fn test_try_reserve_cols_keeps_contents() {
    let mut store: ColumnStore<f64> = ColumnStore::zeros(2, 2, 2);
    store.col_mut(1).copy_from_slice(&[7.0, 8.0]);
    store.try_reserve_cols(5).unwrap();
    assert!(store.capacity_cols() >= 7);
    assert_eq!(store.cols(), 2);
    assert_eq!(store.col(1), &[7.0, 8.0]);
}

// ============================================================================
// Slot Tests
// ============================================================================

#[test]
fn test_slot_reset_zeroes() {
    let mut slot: Slot<f64> = Slot::new(4);
    slot.reset(3);
    slot[0] = 1.0;
    slot[2] = 3.0;
    slot.reset(3);
    assert_eq!(&slot[..], &[0.0, 0.0, 0.0]);

    slot.reset(5);
    assert_eq!(slot.len(), 5);
    assert!(slot.iter().all(|&v| v == 0.0));
}
