//! PrimaryStore interface tests.
//!
//! These tests verify the contract of the PrimaryStore and PrimaryTx traits.
//! Each storage implementation should run these tests.

use rust_decimal::Decimal;

use brewpos::interfaces::{ErrorKind, PrimaryStore, StoreError};
use brewpos::model::{RecordId, SalesFilter};

use super::{make_sale, sale_time};

/// An id no test ever reaches.
fn missing_id() -> RecordId {
    RecordId::new(9_000_000_000).unwrap()
}

// =============================================================================
// insert
// =============================================================================

pub async fn test_insert_commit_is_visible<S: PrimaryStore>(store: &S) {
    let sale = make_sale("test_primary_insert", 3, 450, 9);

    let mut tx = store.begin().await.expect("begin should succeed");
    let id = tx.insert(&sale).await.expect("insert should succeed");
    tx.commit().await.expect("commit should succeed");

    let stored = store
        .get(id)
        .await
        .expect("get should succeed")
        .expect("committed sale should exist");
    assert_eq!(stored, sale.into_record(id));
}

pub async fn test_insert_assigns_increasing_ids<S: PrimaryStore>(store: &S) {
    let mut tx = store.begin().await.expect("begin should succeed");
    let first = tx
        .insert(&make_sale("test_primary_ids", 1, 100, 9))
        .await
        .expect("insert should succeed");
    let second = tx
        .insert(&make_sale("test_primary_ids", 1, 100, 9))
        .await
        .expect("insert should succeed");
    tx.commit().await.expect("commit should succeed");

    assert!(second > first, "ids should increase: {first} then {second}");
}

pub async fn test_insert_preserves_price_and_timestamp<S: PrimaryStore>(store: &S) {
    let sale = make_sale("test_primary_precision", 1, 1999, 14);

    let mut tx = store.begin().await.expect("begin should succeed");
    let id = tx.insert(&sale).await.expect("insert should succeed");
    tx.commit().await.expect("commit should succeed");

    let stored = store.get(id).await.unwrap().unwrap();
    assert_eq!(stored.price_per_item, Decimal::new(1999, 2));
    assert_eq!(stored.price_per_item.to_string(), "19.99");
    assert_eq!(stored.sale_date, sale_time(14));
}

// =============================================================================
// rollback
// =============================================================================

pub async fn test_rollback_discards_insert<S: PrimaryStore>(store: &S) {
    let mut tx = store.begin().await.expect("begin should succeed");
    let id = tx
        .insert(&make_sale("test_primary_rollback", 1, 100, 9))
        .await
        .expect("insert should succeed");
    tx.rollback().await.expect("rollback should succeed");

    assert!(store.get(id).await.unwrap().is_none());
}

pub async fn test_drop_without_commit_discards_insert<S: PrimaryStore>(store: &S) {
    let id = {
        let mut tx = store.begin().await.expect("begin should succeed");
        tx.insert(&make_sale("test_primary_dropped", 1, 100, 9))
            .await
            .expect("insert should succeed")
    };

    assert!(store.get(id).await.unwrap().is_none());
}

pub async fn test_rollback_does_not_reuse_id<S: PrimaryStore>(store: &S) {
    let mut tx = store.begin().await.expect("begin should succeed");
    let discarded = tx
        .insert(&make_sale("test_primary_reuse", 1, 100, 9))
        .await
        .expect("insert should succeed");
    tx.rollback().await.expect("rollback should succeed");

    let mut tx = store.begin().await.expect("begin should succeed");
    let next = tx
        .insert(&make_sale("test_primary_reuse", 1, 100, 10))
        .await
        .expect("insert should succeed");
    tx.commit().await.expect("commit should succeed");

    assert!(
        next > discarded,
        "id {discarded} was rolled back and must not be handed out again, got {next}"
    );
}

pub async fn test_rollback_discards_update<S: PrimaryStore>(store: &S) {
    let mut tx = store.begin().await.unwrap();
    let id = tx
        .insert(&make_sale("test_primary_rollback_update", 1, 100, 9))
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let mut tx = store.begin().await.unwrap();
    tx.update(id, &make_sale("test_primary_rollback_update", 7, 100, 9))
        .await
        .expect("update should succeed");
    tx.rollback().await.unwrap();

    assert_eq!(store.get(id).await.unwrap().unwrap().quantity, 1);
}

// =============================================================================
// update / delete
// =============================================================================

pub async fn test_update_replaces_fields<S: PrimaryStore>(store: &S) {
    let mut tx = store.begin().await.unwrap();
    let id = tx
        .insert(&make_sale("test_primary_update", 1, 400, 8))
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let replacement = make_sale("test_primary_update_new", 2, 425, 10);
    let mut tx = store.begin().await.unwrap();
    tx.update(id, &replacement).await.expect("update should succeed");
    tx.commit().await.unwrap();

    assert_eq!(
        store.get(id).await.unwrap().unwrap(),
        replacement.into_record(id)
    );
}

pub async fn test_update_missing_is_not_found<S: PrimaryStore>(store: &S) {
    let mut tx = store.begin().await.unwrap();
    let err = tx
        .update(missing_id(), &make_sale("test_primary_missing", 1, 100, 9))
        .await
        .expect_err("update of a missing id should fail");
    tx.rollback().await.unwrap();

    assert_eq!(err, StoreError::NotFound(missing_id()));
}

pub async fn test_delete_removes_row<S: PrimaryStore>(store: &S) {
    let mut tx = store.begin().await.unwrap();
    let id = tx
        .insert(&make_sale("test_primary_delete", 1, 100, 9))
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let mut tx = store.begin().await.unwrap();
    tx.delete(id).await.expect("delete should succeed");
    tx.commit().await.unwrap();

    assert!(store.get(id).await.unwrap().is_none());
}

pub async fn test_delete_missing_is_not_found<S: PrimaryStore>(store: &S) {
    let mut tx = store.begin().await.unwrap();
    let err = tx
        .delete(missing_id())
        .await
        .expect_err("delete of a missing id should fail");
    tx.rollback().await.unwrap();

    assert_eq!(err.kind(), ErrorKind::NotFound);
}

// =============================================================================
// query
// =============================================================================

pub async fn test_query_filters_and_orders_newest_first<S: PrimaryStore>(store: &S) {
    let product = "test_primary_query";
    let mut tx = store.begin().await.unwrap();
    let early = tx.insert(&make_sale(product, 1, 100, 7)).await.unwrap();
    let late = tx.insert(&make_sale(product, 1, 100, 11)).await.unwrap();
    let middle = tx.insert(&make_sale(product, 1, 100, 9)).await.unwrap();
    tx.insert(&make_sale("test_primary_query_other", 1, 100, 12))
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let found = store
        .query(&SalesFilter::all().product(product))
        .await
        .expect("query should succeed");
    let ids: Vec<RecordId> = found.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![late, middle, early]);

    let limited = store
        .query(&SalesFilter::all().product(product).limit(2))
        .await
        .unwrap();
    assert_eq!(limited.len(), 2);
    assert_eq!(limited[0].id, late);

    let since = store
        .query(&SalesFilter::all().product(product).since(sale_time(9)))
        .await
        .unwrap();
    let ids: Vec<RecordId> = since.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![late, middle]);
}

/// Run all PrimaryStore interface tests against a store implementation.
#[macro_export]
macro_rules! run_primary_store_tests {
    ($store:expr) => {
        use $crate::storage::primary_store_tests::*;

        // insert tests
        test_insert_commit_is_visible($store).await;
        println!("  test_insert_commit_is_visible: PASSED");

        test_insert_assigns_increasing_ids($store).await;
        println!("  test_insert_assigns_increasing_ids: PASSED");

        test_insert_preserves_price_and_timestamp($store).await;
        println!("  test_insert_preserves_price_and_timestamp: PASSED");

        // rollback tests
        test_rollback_discards_insert($store).await;
        println!("  test_rollback_discards_insert: PASSED");

        test_drop_without_commit_discards_insert($store).await;
        println!("  test_drop_without_commit_discards_insert: PASSED");

        test_rollback_does_not_reuse_id($store).await;
        println!("  test_rollback_does_not_reuse_id: PASSED");

        test_rollback_discards_update($store).await;
        println!("  test_rollback_discards_update: PASSED");

        // update / delete tests
        test_update_replaces_fields($store).await;
        println!("  test_update_replaces_fields: PASSED");

        test_update_missing_is_not_found($store).await;
        println!("  test_update_missing_is_not_found: PASSED");

        test_delete_removes_row($store).await;
        println!("  test_delete_removes_row: PASSED");

        test_delete_missing_is_not_found($store).await;
        println!("  test_delete_missing_is_not_found: PASSED");

        // query tests
        test_query_filters_and_orders_newest_first($store).await;
        println!("  test_query_filters_and_orders_newest_first: PASSED");
    };
}
