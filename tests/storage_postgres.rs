//! PostgreSQL storage integration tests using testcontainers.
//!
//! Run with: cargo test --test storage_postgres --features postgres -- --nocapture
//!
//! These tests spin up PostgreSQL in a container using testcontainers-rs,
//! create the schema, and test both store roles. The secondary role runs
//! the same DDL and SQL that Cloud Spanner receives through PGAdapter.

mod storage;

use std::time::Duration;

use brewpos::storage::{PostgresPrimaryStore, SpannerSecondaryStore};
use testcontainers::{
    core::{IntoContainerPort, WaitFor},
    runners::AsyncRunner,
    GenericImage, ImageExt,
};

/// Start PostgreSQL container.
///
/// Returns (container, connection_string) where connection_string is suitable
/// for sqlx PgPool connection.
async fn start_postgres() -> (testcontainers::ContainerAsync<GenericImage>, String) {
    // PostgreSQL prints "database system is ready to accept connections" twice:
    // once during initial setup and once when fully ready.
    // We wait for the message but add a small delay to ensure full readiness.
    let image = GenericImage::new("postgres", "16")
        .with_exposed_port(5432.tcp())
        .with_wait_for(WaitFor::message_on_stdout(
            "database system is ready to accept connections",
        ));

    let container = image
        .with_env_var("POSTGRES_USER", "brewpos")
        .with_env_var("POSTGRES_PASSWORD", "brewpos")
        .with_env_var("POSTGRES_DB", "sales")
        .with_startup_timeout(Duration::from_secs(60))
        .start()
        .await
        .expect("Failed to start postgres container");

    // Brief delay to ensure PostgreSQL is fully ready to accept connections
    tokio::time::sleep(Duration::from_secs(1)).await;

    let host_port = container
        .get_host_port_ipv4(5432)
        .await
        .expect("Failed to get mapped port");

    let host = container
        .get_host()
        .await
        .expect("Failed to get container host");

    let connection_string = format!("postgres://brewpos:brewpos@{}:{}/sales", host, host_port);

    println!("PostgreSQL available at: {}", connection_string);

    (container, connection_string)
}

async fn connect(connection_string: &str) -> sqlx::PgPool {
    sqlx::PgPool::connect(connection_string)
        .await
        .expect("Failed to connect to PostgreSQL")
}

async fn cleanup(pool: &sqlx::PgPool) {
    let _ = sqlx::query("DELETE FROM sales_orders WHERE product_name LIKE 'test_%'")
        .execute(pool)
        .await;
}

#[tokio::test]
async fn test_postgres_primary_store() {
    println!("=== PostgreSQL PrimaryStore Tests ===");
    println!("Starting PostgreSQL container...");

    let (_container, connection_string) = start_postgres().await;
    let pool = connect(&connection_string).await;
    let store = PostgresPrimaryStore::new(pool.clone());
    store.init().await.expect("Failed to create schema");

    cleanup(&pool).await;
    run_primary_store_tests!(&store);
    cleanup(&pool).await;

    println!("=== All PostgreSQL PrimaryStore tests PASSED ===");
}

#[tokio::test]
async fn test_postgres_primary_rejects_out_of_range_price() {
    use brewpos::interfaces::{ErrorKind, PrimaryStore};
    use brewpos::model::SaleDraft;
    use rust_decimal::Decimal;

    let (_container, connection_string) = start_postgres().await;
    let pool = connect(&connection_string).await;
    let store = PostgresPrimaryStore::new(pool);
    store.init().await.expect("Failed to create schema");

    // NUMERIC(10, 2) holds at most 8 integer digits.
    let sale = SaleDraft::new("test_overflow", 1, Decimal::new(123_456_789_00, 2))
        .validate(chrono::Utc::now())
        .expect("sale should validate");

    let mut tx = store.begin().await.unwrap();
    let err = tx.insert(&sale).await.expect_err("overflowing price should fail");
    tx.rollback().await.unwrap();

    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn test_spanner_secondary_store_over_postgres_wire() {
    println!("=== PostgreSQL-wire SecondaryStore Tests ===");
    println!("Starting PostgreSQL container...");

    let (_container, connection_string) = start_postgres().await;
    let pool = connect(&connection_string).await;
    let store = SpannerSecondaryStore::new(pool.clone());
    store.init().await.expect("Failed to create schema");

    cleanup(&pool).await;
    run_secondary_store_tests!(&store);
    cleanup(&pool).await;

    println!("=== All PostgreSQL-wire SecondaryStore tests PASSED ===");
}
