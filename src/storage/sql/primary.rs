//! Unified SQL PrimaryStore implementation.
//!
//! Uses a macro to generate implementations for each SQL backend,
//! eliminating code duplication while maintaining type safety.

use std::marker::PhantomData;

use super::SqlDatabase;

/// SQL-based implementation of PrimaryStore.
///
/// This generic implementation works with any SQL database that implements
/// the `SqlDatabase` trait (PostgreSQL, SQLite). Ids come from the table's
/// own sequence.
pub struct SqlPrimaryStore<DB: SqlDatabase> {
    pub(super) pool: sqlx::Pool<DB::Db>,
    _marker: PhantomData<DB>,
}

impl<DB: SqlDatabase> SqlPrimaryStore<DB> {
    /// Create a new SQL primary store with the given pool.
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

/// An open primary transaction. Dropping it without `commit` rolls back.
///
/// An explicit `rollback` also retires the ids the transaction was handed,
/// so a later insert never reuses one. Dropping it does not.
pub struct SqlPrimaryTx<DB: SqlDatabase> {
    tx: sqlx::Transaction<'static, DB::Db>,
    pool: sqlx::Pool<DB::Db>,
    highest_assigned: Option<i64>,
    _marker: PhantomData<DB>,
}

/// Macro to implement PrimaryStore and PrimaryTx for a specific SQL backend.
macro_rules! impl_primary_store {
    ($db_type:ty, $feature:literal) => {
        #[cfg(feature = $feature)]
        impl SqlPrimaryStore<$db_type> {
            /// Create the sales table and its index if missing.
            pub async fn init(&self) -> crate::interfaces::Result<()> {
                for ddl in <$db_type as SqlDatabase>::PRIMARY_SCHEMA {
                    sqlx::query(ddl).execute(&self.pool).await?;
                }
                Ok(())
            }

            /// Keep the id counter past `id` once the transaction that used it
            /// has rolled back.
            async fn retire_ids(
                pool: &sqlx::Pool<<$db_type as SqlDatabase>::Db>,
                id: i64,
            ) -> crate::interfaces::Result<()> {
                let statements = <$db_type as SqlDatabase>::RETIRE_IDS;
                if statements.is_empty() {
                    return Ok(());
                }
                let mut tx = pool.begin().await?;
                for sql in statements {
                    sqlx::query(sql).bind(id).execute(&mut *tx).await?;
                }
                tx.commit().await?;
                Ok(())
            }
        }

        #[cfg(feature = $feature)]
        #[async_trait::async_trait]
        impl crate::interfaces::PrimaryStore for SqlPrimaryStore<$db_type> {
            async fn begin(
                &self,
            ) -> crate::interfaces::Result<Box<dyn crate::interfaces::PrimaryTx>> {
                let tx = self.pool.begin().await?;
                Ok(Box::new(SqlPrimaryTx::<$db_type> {
                    tx,
                    pool: self.pool.clone(),
                    highest_assigned: None,
                    _marker: PhantomData,
                }))
            }
        }

        #[cfg(feature = $feature)]
        #[async_trait::async_trait]
        impl crate::interfaces::PrimaryTx for SqlPrimaryTx<$db_type> {
            async fn insert(
                &mut self,
                sale: &crate::model::ValidSale,
            ) -> crate::interfaces::Result<crate::model::RecordId> {
                use sqlx::Row;

                use super::statements;
                use crate::storage::helpers::assigned_id;

                let sql = <$db_type as SqlDatabase>::build_insert(statements::insert(None, sale));
                let row = sqlx::query(&sql).fetch_one(&mut *self.tx).await?;
                let id: i64 = row.try_get("id")?;
                let assigned = assigned_id(id)?;
                self.highest_assigned = self.highest_assigned.max(Some(id));
                Ok(assigned)
            }

            async fn update(
                &mut self,
                id: crate::model::RecordId,
                sale: &crate::model::ValidSale,
            ) -> crate::interfaces::Result<()> {
                use super::statements;

                let sql = <$db_type as SqlDatabase>::build_update(statements::update(id, sale));
                let done = sqlx::query(&sql).execute(&mut *self.tx).await?;
                if done.rows_affected() == 0 {
                    return Err(crate::interfaces::StoreError::NotFound(id));
                }
                Ok(())
            }

            async fn delete(&mut self, id: crate::model::RecordId) -> crate::interfaces::Result<()> {
                use super::statements;

                let sql = <$db_type as SqlDatabase>::build_delete(statements::delete(id));
                let done = sqlx::query(&sql).execute(&mut *self.tx).await?;
                if done.rows_affected() == 0 {
                    return Err(crate::interfaces::StoreError::NotFound(id));
                }
                Ok(())
            }

            async fn commit(self: Box<Self>) -> crate::interfaces::Result<()> {
                self.tx.commit().await?;
                Ok(())
            }

            async fn rollback(self: Box<Self>) -> crate::interfaces::Result<()> {
                let SqlPrimaryTx {
                    tx,
                    pool,
                    highest_assigned,
                    ..
                } = *self;
                let rolled_back = tx.rollback().await;
                // The connection is back in the pool, so this cannot wait on itself.
                let retired = match highest_assigned {
                    Some(id) => SqlPrimaryStore::<$db_type>::retire_ids(&pool, id).await,
                    None => Ok(()),
                };
                rolled_back?;
                retired
            }
        }
    };
}

impl_primary_store!(super::postgres::Postgres, "postgres");
impl_primary_store!(super::sqlite::Sqlite, "sqlite");
