//! SecondaryStore interface tests.
//!
//! These tests verify the contract of the SecondaryStore trait.
//! Each storage implementation should run these tests.

use brewpos::interfaces::{ErrorKind, SecondaryStore, StoreError};
use brewpos::model::{RecordId, SalesFilter};

use super::{make_sale, sale_time};

fn id(raw: i64) -> RecordId {
    RecordId::new(raw).unwrap()
}

/// Ids written by `insert_with_id` tests, far from anything `insert` allocates
/// in a fresh table.
const MIRRORED_BASE: i64 = 1_000_000;

// =============================================================================
// insert_with_id
// =============================================================================

pub async fn test_insert_with_id_keeps_caller_id<S: SecondaryStore>(store: &S) {
    let key = id(MIRRORED_BASE + 1);
    let sale = make_sale("test_secondary_mirror", 2, 350, 9);

    store
        .insert_with_id(key, &sale)
        .await
        .expect("insert_with_id should succeed");

    let stored = store
        .get(key)
        .await
        .expect("get should succeed")
        .expect("mirrored sale should exist");
    assert_eq!(stored, sale.into_record(key));
    assert_eq!(stored.sale_date, sale_time(9));
}

pub async fn test_insert_with_duplicate_id_is_rejected<S: SecondaryStore>(store: &S) {
    let key = id(MIRRORED_BASE + 2);
    store
        .insert_with_id(key, &make_sale("test_secondary_dup", 1, 100, 9))
        .await
        .expect("first insert should succeed");

    let err = store
        .insert_with_id(key, &make_sale("test_secondary_dup_other", 5, 100, 9))
        .await
        .expect_err("duplicate id should fail");

    assert_eq!(err.kind(), ErrorKind::Validation);
    let stored = store.get(key).await.unwrap().unwrap();
    assert_eq!(stored.product_name, "test_secondary_dup");
}

// =============================================================================
// insert (standalone id allocation)
// =============================================================================

pub async fn test_insert_allocates_after_current_max<S: SecondaryStore>(store: &S) {
    let high = id(MIRRORED_BASE + 500);
    store
        .insert_with_id(high, &make_sale("test_secondary_alloc", 1, 100, 9))
        .await
        .unwrap();

    let first = store
        .insert(&make_sale("test_secondary_alloc", 1, 100, 10))
        .await
        .expect("insert should succeed");
    let second = store
        .insert(&make_sale("test_secondary_alloc", 1, 100, 11))
        .await
        .expect("insert should succeed");

    assert!(first > high, "allocated {first} should follow {high}");
    assert_eq!(second.get(), first.get() + 1);
    assert!(store.get(second).await.unwrap().is_some());
}

// =============================================================================
// update / delete
// =============================================================================

pub async fn test_update_replaces_fields<S: SecondaryStore>(store: &S) {
    let key = id(MIRRORED_BASE + 10);
    store
        .insert_with_id(key, &make_sale("test_secondary_update", 1, 400, 8))
        .await
        .unwrap();

    let replacement = make_sale("test_secondary_update_new", 2, 425, 10);
    store
        .update(key, &replacement)
        .await
        .expect("update should succeed");

    assert_eq!(
        store.get(key).await.unwrap().unwrap(),
        replacement.into_record(key)
    );
}

pub async fn test_update_missing_is_not_found<S: SecondaryStore>(store: &S) {
    let key = id(MIRRORED_BASE + 11);
    let err = store
        .update(key, &make_sale("test_secondary_missing", 1, 100, 9))
        .await
        .expect_err("update of a missing id should fail");

    assert_eq!(err, StoreError::NotFound(key));
}

pub async fn test_delete_removes_row<S: SecondaryStore>(store: &S) {
    let key = id(MIRRORED_BASE + 12);
    store
        .insert_with_id(key, &make_sale("test_secondary_delete", 1, 100, 9))
        .await
        .unwrap();

    store.delete(key).await.expect("delete should succeed");
    assert!(store.get(key).await.unwrap().is_none());

    let err = store
        .delete(key)
        .await
        .expect_err("second delete should fail");
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

// =============================================================================
// query
// =============================================================================

pub async fn test_query_orders_newest_first<S: SecondaryStore>(store: &S) {
    let product = "test_secondary_query";
    for (offset, hour) in [(20, 7), (21, 11), (22, 9)] {
        store
            .insert_with_id(id(MIRRORED_BASE + offset), &make_sale(product, 1, 100, hour))
            .await
            .unwrap();
    }

    let found = store
        .query(&SalesFilter::all().product(product))
        .await
        .expect("query should succeed");
    let ids: Vec<i64> = found.iter().map(|r| r.id.get() - MIRRORED_BASE).collect();
    assert_eq!(ids, vec![21, 22, 20]);

    let limited = store
        .query(&SalesFilter::all().product(product).limit(1))
        .await
        .unwrap();
    assert_eq!(limited.len(), 1);
}

/// Run all SecondaryStore interface tests against a store implementation.
#[macro_export]
macro_rules! run_secondary_store_tests {
    ($store:expr) => {
        use $crate::storage::secondary_store_tests::*;

        // insert_with_id tests
        test_insert_with_id_keeps_caller_id($store).await;
        println!("  test_insert_with_id_keeps_caller_id: PASSED");

        test_insert_with_duplicate_id_is_rejected($store).await;
        println!("  test_insert_with_duplicate_id_is_rejected: PASSED");

        // insert tests
        test_insert_allocates_after_current_max($store).await;
        println!("  test_insert_allocates_after_current_max: PASSED");

        // update / delete tests
        test_update_replaces_fields($store).await;
        println!("  test_update_replaces_fields: PASSED");

        test_update_missing_is_not_found($store).await;
        println!("  test_update_missing_is_not_found: PASSED");

        test_delete_removes_row($store).await;
        println!("  test_delete_removes_row: PASSED");

        // query tests
        test_query_orders_newest_first($store).await;
        println!("  test_query_orders_newest_first: PASSED");
    };
}
