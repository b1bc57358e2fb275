//! Unified SQL SecondaryStore implementation.
//!
//! Every write commits on its own. Mirrored inserts carry the primary's id;
//! standalone inserts allocate `MAX(id) + 1` inside their transaction.

use std::marker::PhantomData;

use super::SqlDatabase;

/// SQL-based implementation of SecondaryStore.
///
/// Serves Cloud Spanner through its PostgreSQL interface, and SQLite for
/// local runs.
pub struct SqlSecondaryStore<DB: SqlDatabase> {
    pub(super) pool: sqlx::Pool<DB::Db>,
    _marker: PhantomData<DB>,
}

impl<DB: SqlDatabase> SqlSecondaryStore<DB> {
    /// Create a new SQL secondary store with the given pool.
    pub fn new(pool: sqlx::Pool<DB::Db>) -> Self {
        Self {
            pool,
            _marker: PhantomData,
        }
    }

    /// Get the underlying pool.
    pub fn pool(&self) -> &sqlx::Pool<DB::Db> {
        &self.pool
    }
}

/// Macro to implement SecondaryStore for a specific SQL backend.
macro_rules! impl_secondary_store {
    ($db_type:ty, $feature:literal) => {
        #[cfg(feature = $feature)]
        impl SqlSecondaryStore<$db_type> {
            /// Create the sales table if missing.
            pub async fn init(&self) -> crate::interfaces::Result<()> {
                for ddl in <$db_type as SqlDatabase>::SECONDARY_SCHEMA {
                    sqlx::query(ddl).execute(&self.pool).await?;
                }
                Ok(())
            }
        }

        #[cfg(feature = $feature)]
        #[async_trait::async_trait]
        impl crate::interfaces::SecondaryStore for SqlSecondaryStore<$db_type> {
            async fn insert(
                &self,
                sale: &crate::model::ValidSale,
            ) -> crate::interfaces::Result<crate::model::RecordId> {
                use sqlx::Row;

                use super::statements;
                use crate::storage::helpers::assigned_id;

                let mut tx = self.pool.begin().await?;

                let sql = <$db_type as SqlDatabase>::build_select(statements::select_max_id());
                let row = sqlx::query(&sql).fetch_one(&mut *tx).await?;
                let max_id: Option<i64> = row.try_get(0)?;
                let next = max_id.unwrap_or(0).checked_add(1).ok_or_else(|| {
                    crate::interfaces::StoreError::Fatal("sale ids exhausted".to_string())
                })?;
                let id = assigned_id(next)?;

                let sql =
                    <$db_type as SqlDatabase>::build_insert(statements::insert(Some(id), sale));
                sqlx::query(&sql).execute(&mut *tx).await?;

                tx.commit().await?;
                Ok(id)
            }

            async fn insert_with_id(
                &self,
                id: crate::model::RecordId,
                sale: &crate::model::ValidSale,
            ) -> crate::interfaces::Result<()> {
                use super::statements;

                let sql =
                    <$db_type as SqlDatabase>::build_insert(statements::insert(Some(id), sale));
                sqlx::query(&sql).execute(&self.pool).await?;
                Ok(())
            }

            async fn update(
                &self,
                id: crate::model::RecordId,
                sale: &crate::model::ValidSale,
            ) -> crate::interfaces::Result<()> {
                use super::statements;

                let sql = <$db_type as SqlDatabase>::build_update(statements::update(id, sale));
                let done = sqlx::query(&sql).execute(&self.pool).await?;
                if done.rows_affected() == 0 {
                    return Err(crate::interfaces::StoreError::NotFound(id));
                }
                Ok(())
            }

            async fn delete(&self, id: crate::model::RecordId) -> crate::interfaces::Result<()> {
                use super::statements;

                let sql = <$db_type as SqlDatabase>::build_delete(statements::delete(id));
                let done = sqlx::query(&sql).execute(&self.pool).await?;
                if done.rows_affected() == 0 {
                    return Err(crate::interfaces::StoreError::NotFound(id));
                }
                Ok(())
            }
        }
    };
}

impl_secondary_store!(super::postgres::Postgres, "postgres");
impl_secondary_store!(super::sqlite::Sqlite, "sqlite");
