//! Read path shared by both SQL store roles.

use super::{SqlDatabase, SqlPrimaryStore, SqlSecondaryStore};

macro_rules! impl_sales_reader {
    ($store:ident, $db_type:ty, $feature:literal) => {
        #[cfg(feature = $feature)]
        #[async_trait::async_trait]
        impl crate::interfaces::SalesReader for $store<$db_type> {
            async fn get(
                &self,
                id: crate::model::RecordId,
            ) -> crate::interfaces::Result<Option<crate::model::SalesRecord>> {
                use super::statements;

                let sql = <$db_type as SqlDatabase>::build_select(statements::select_by_id(id));
                let row = sqlx::query(&sql).fetch_optional(&self.pool).await?;
                row.as_ref()
                    .map(<$db_type as SqlDatabase>::decode_sale)
                    .transpose()
            }

            async fn query(
                &self,
                filter: &crate::model::SalesFilter,
            ) -> crate::interfaces::Result<Vec<crate::model::SalesRecord>> {
                use super::statements;

                let sql =
                    <$db_type as SqlDatabase>::build_select(statements::select_matching(filter));
                let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
                rows.iter()
                    .map(<$db_type as SqlDatabase>::decode_sale)
                    .collect()
            }
        }
    };
}

impl_sales_reader!(SqlPrimaryStore, super::postgres::Postgres, "postgres");
impl_sales_reader!(SqlPrimaryStore, super::sqlite::Sqlite, "sqlite");
impl_sales_reader!(SqlSecondaryStore, super::postgres::Postgres, "postgres");
impl_sales_reader!(SqlSecondaryStore, super::sqlite::Sqlite, "sqlite");
