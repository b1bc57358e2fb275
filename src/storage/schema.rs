//! Database schema definitions using sea-query.
//!
//! These define the table and column identifiers for type-safe query building,
//! plus the DDL each backend runs when `init_schema` is enabled.

use sea_query::Iden;

/// Sales table schema.
#[derive(Iden)]
pub enum SalesOrders {
    Table,
    #[iden = "id"]
    Id,
    #[iden = "product_name"]
    ProductName,
    #[iden = "quantity"]
    Quantity,
    #[iden = "price_per_item"]
    PricePerItem,
    #[iden = "sale_date"]
    SaleDate,
}

/// PostgreSQL primary: the store assigns ids.
pub const POSTGRES_PRIMARY_SCHEMA: &[&str] = &[
    r#"
CREATE TABLE IF NOT EXISTS sales_orders (
    id BIGSERIAL PRIMARY KEY,
    product_name TEXT NOT NULL CHECK (product_name <> ''),
    quantity BIGINT NOT NULL CHECK (quantity > 0),
    price_per_item NUMERIC(10, 2) NOT NULL CHECK (price_per_item >= 0),
    sale_date TIMESTAMPTZ NOT NULL
)"#,
    "CREATE INDEX IF NOT EXISTS idx_sales_orders_sale_date ON sales_orders (sale_date)",
];

/// Spanner (PostgreSQL dialect) secondary: ids come from the primary, or
/// from `MAX(id) + 1` when written alone. Also valid on plain PostgreSQL.
pub const SPANNER_SECONDARY_SCHEMA: &[&str] = &[
    r#"
CREATE TABLE IF NOT EXISTS sales_orders (
    id BIGINT NOT NULL,
    product_name VARCHAR NOT NULL,
    quantity BIGINT NOT NULL,
    price_per_item NUMERIC NOT NULL,
    sale_date TIMESTAMPTZ NOT NULL,
    PRIMARY KEY (id)
)"#,
];

/// SQLite primary. Prices and timestamps are stored as text
/// (`"4.00"`, RFC 3339 UTC with microseconds) so they sort and compare exactly.
pub const SQLITE_PRIMARY_SCHEMA: &[&str] = &[
    r#"
CREATE TABLE IF NOT EXISTS sales_orders (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    product_name TEXT NOT NULL CHECK (product_name <> ''),
    quantity INTEGER NOT NULL CHECK (quantity > 0),
    price_per_item TEXT NOT NULL,
    sale_date TEXT NOT NULL
)"#,
    "CREATE INDEX IF NOT EXISTS idx_sales_orders_sale_date ON sales_orders (sale_date)",
];

/// SQLite secondary.
pub const SQLITE_SECONDARY_SCHEMA: &[&str] = &[
    r#"
CREATE TABLE IF NOT EXISTS sales_orders (
    id INTEGER PRIMARY KEY,
    product_name TEXT NOT NULL,
    quantity INTEGER NOT NULL,
    price_per_item TEXT NOT NULL,
    sale_date TEXT NOT NULL
)"#,
];

/// Moves SQLite's `AUTOINCREMENT` counter for `sales_orders` up to `?1`.
///
/// `sqlite_sequence` is written by the inserting transaction and rolls back
/// with it; these run afterwards, in their own transaction, so a rolled-back
/// id is never handed out again.
pub const SQLITE_RETIRE_IDS: &[&str] = &[
    "UPDATE sqlite_sequence SET seq = ?1 WHERE name = 'sales_orders' AND seq < ?1",
    "INSERT INTO sqlite_sequence (name, seq) SELECT 'sales_orders', ?1 \
     WHERE NOT EXISTS (SELECT 1 FROM sqlite_sequence WHERE name = 'sales_orders')",
];
