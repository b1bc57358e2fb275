//! SQL database abstraction trait.

use crate::interfaces::Result;
use crate::model::SalesRecord;

/// Trait for SQL database backends.
///
/// This trait abstracts over different SQL databases (PostgreSQL, SQLite)
/// by providing the driver type, query building, the DDL for each store
/// role, and how a sales row decodes.
pub trait SqlDatabase: Send + Sync + 'static {
    /// The sqlx driver for this database.
    type Db: sqlx::Database;

    /// DDL run by the primary store's `init`.
    const PRIMARY_SCHEMA: &'static [&'static str];

    /// DDL run by the secondary store's `init`.
    const SECONDARY_SCHEMA: &'static [&'static str];

    /// Statements, each binding one id, that keep the primary's id counter
    /// past that id after a rollback. Empty where the counter is not
    /// transactional (PostgreSQL sequences).
    const RETIRE_IDS: &'static [&'static str];

    /// Build a SQL query string from a sea-query SELECT statement.
    fn build_select(stmt: sea_query::SelectStatement) -> String;

    /// Build a SQL query string from a sea-query INSERT statement.
    fn build_insert(stmt: sea_query::InsertStatement) -> String;

    /// Build a SQL query string from a sea-query UPDATE statement.
    fn build_update(stmt: sea_query::UpdateStatement) -> String;

    /// Build a SQL query string from a sea-query DELETE statement.
    fn build_delete(stmt: sea_query::DeleteStatement) -> String;

    /// Decode one `sales_orders` row.
    fn decode_sale(row: &<Self::Db as sqlx::Database>::Row) -> Result<SalesRecord>;
}
