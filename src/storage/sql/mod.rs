//! Unified SQL storage implementations.
//!
//! This module provides shared implementations for SQL-based storage backends
//! (PostgreSQL, SQLite). The implementations are parameterized by database type
//! using the `SqlDatabase` trait. Cloud Spanner is served by the PostgreSQL
//! backend through its PostgreSQL wire interface.

mod primary;
mod query;
mod reader;
mod secondary;
mod statements;

pub use primary::{SqlPrimaryStore, SqlPrimaryTx};
pub use query::SqlDatabase;
pub use secondary::SqlSecondaryStore;

#[cfg(feature = "postgres")]
pub mod postgres {
    //! PostgreSQL database backend.

    use chrono::{DateTime, Utc};
    use rust_decimal::Decimal;
    use sea_query::PostgresQueryBuilder;
    use sqlx::postgres::PgRow;
    use sqlx::Row;

    use crate::interfaces::Result;
    use crate::model::SalesRecord;
    use crate::storage::helpers::record_from_columns;
    use crate::storage::schema::{POSTGRES_PRIMARY_SCHEMA, SPANNER_SECONDARY_SCHEMA};

    /// PostgreSQL database marker type.
    pub struct Postgres;

    impl super::SqlDatabase for Postgres {
        type Db = sqlx::Postgres;

        const PRIMARY_SCHEMA: &'static [&'static str] = POSTGRES_PRIMARY_SCHEMA;
        const SECONDARY_SCHEMA: &'static [&'static str] = SPANNER_SECONDARY_SCHEMA;
        const RETIRE_IDS: &'static [&'static str] = &[];

        fn build_select(stmt: sea_query::SelectStatement) -> String {
            stmt.to_string(PostgresQueryBuilder)
        }

        fn build_insert(stmt: sea_query::InsertStatement) -> String {
            stmt.to_string(PostgresQueryBuilder)
        }

        fn build_update(stmt: sea_query::UpdateStatement) -> String {
            stmt.to_string(PostgresQueryBuilder)
        }

        fn build_delete(stmt: sea_query::DeleteStatement) -> String {
            stmt.to_string(PostgresQueryBuilder)
        }

        fn decode_sale(row: &PgRow) -> Result<SalesRecord> {
            let id: i64 = row.try_get("id")?;
            let product_name: String = row.try_get("product_name")?;
            let quantity: i64 = row.try_get("quantity")?;
            let price_per_item: Decimal = row.try_get("price_per_item")?;
            let sale_date: DateTime<Utc> = row.try_get("sale_date")?;
            record_from_columns(id, product_name, quantity, price_per_item, sale_date)
        }
    }

    /// PostgreSQL primary store (Cloud SQL).
    pub type PostgresPrimaryStore = super::SqlPrimaryStore<Postgres>;

    /// Cloud Spanner secondary store, spoken to through PGAdapter.
    pub type SpannerSecondaryStore = super::SqlSecondaryStore<Postgres>;
}

#[cfg(feature = "sqlite")]
pub mod sqlite {
    //! SQLite database backend.

    use sea_query::SqliteQueryBuilder;
    use sqlx::sqlite::SqliteRow;
    use sqlx::Row;

    use crate::interfaces::Result;
    use crate::model::SalesRecord;
    use crate::storage::helpers::{parse_price, parse_timestamp, record_from_columns};
    use crate::storage::schema::{
        SQLITE_PRIMARY_SCHEMA, SQLITE_RETIRE_IDS, SQLITE_SECONDARY_SCHEMA,
    };

    /// SQLite database marker type.
    pub struct Sqlite;

    impl super::SqlDatabase for Sqlite {
        type Db = sqlx::Sqlite;

        const PRIMARY_SCHEMA: &'static [&'static str] = SQLITE_PRIMARY_SCHEMA;
        const SECONDARY_SCHEMA: &'static [&'static str] = SQLITE_SECONDARY_SCHEMA;
        const RETIRE_IDS: &'static [&'static str] = SQLITE_RETIRE_IDS;

        fn build_select(stmt: sea_query::SelectStatement) -> String {
            stmt.to_string(SqliteQueryBuilder)
        }

        fn build_insert(stmt: sea_query::InsertStatement) -> String {
            stmt.to_string(SqliteQueryBuilder)
        }

        fn build_update(stmt: sea_query::UpdateStatement) -> String {
            stmt.to_string(SqliteQueryBuilder)
        }

        fn build_delete(stmt: sea_query::DeleteStatement) -> String {
            stmt.to_string(SqliteQueryBuilder)
        }

        fn decode_sale(row: &SqliteRow) -> Result<SalesRecord> {
            let id: i64 = row.try_get("id")?;
            let product_name: String = row.try_get("product_name")?;
            let quantity: i64 = row.try_get("quantity")?;
            let price: String = row.try_get("price_per_item")?;
            let sale_date: String = row.try_get("sale_date")?;
            record_from_columns(
                id,
                product_name,
                quantity,
                parse_price(&price)?,
                parse_timestamp(&sale_date)?,
            )
        }
    }

    /// SQLite primary store.
    pub type SqlitePrimaryStore = super::SqlPrimaryStore<Sqlite>;

    /// SQLite secondary store.
    pub type SqliteSecondaryStore = super::SqlSecondaryStore<Sqlite>;
}
