//! sea-query statements shared by every SQL backend.
//!
//! Values are inlined as literals when the statement is rendered, so prices
//! travel as decimal strings and dates as RFC 3339 text; each backend's
//! column type decides how they are stored.

use sea_query::{
    DeleteStatement, Expr, InsertStatement, Order, Query, SelectStatement, SimpleExpr,
    UpdateStatement,
};

use crate::model::{RecordId, SalesFilter, ValidSale};
use crate::storage::helpers::format_timestamp;
use crate::storage::schema::SalesOrders;

fn columns() -> [SalesOrders; 5] {
    [
        SalesOrders::Id,
        SalesOrders::ProductName,
        SalesOrders::Quantity,
        SalesOrders::PricePerItem,
        SalesOrders::SaleDate,
    ]
}

fn sale_values(sale: &ValidSale) -> [SimpleExpr; 4] {
    [
        sale.product_name().into(),
        i64::from(sale.quantity()).into(),
        sale.price_per_item().to_string().into(),
        format_timestamp(sale.sale_date()).into(),
    ]
}

pub fn select_by_id(id: RecordId) -> SelectStatement {
    Query::select()
        .columns(columns())
        .from(SalesOrders::Table)
        .and_where(Expr::col(SalesOrders::Id).eq(id.get()))
        .to_owned()
}

/// Newest first; ties on `sale_date` break by id, also descending.
pub fn select_matching(filter: &SalesFilter) -> SelectStatement {
    let mut stmt = Query::select();
    stmt.columns(columns()).from(SalesOrders::Table);

    if let Some(name) = &filter.product_name {
        stmt.and_where(Expr::col(SalesOrders::ProductName).eq(name.as_str()));
    }
    if let Some(since) = filter.since {
        stmt.and_where(Expr::col(SalesOrders::SaleDate).gte(format_timestamp(since)));
    }

    stmt.order_by(SalesOrders::SaleDate, Order::Desc)
        .order_by(SalesOrders::Id, Order::Desc);

    if let Some(limit) = filter.limit {
        stmt.limit(u64::from(limit));
    }
    stmt
}

pub fn select_max_id() -> SelectStatement {
    Query::select()
        .expr(Expr::col(SalesOrders::Id).max())
        .from(SalesOrders::Table)
        .to_owned()
}

/// Insert a sale. Without `id` the store assigns one and returns it.
pub fn insert(id: Option<RecordId>, sale: &ValidSale) -> InsertStatement {
    let mut stmt = Query::insert();
    stmt.into_table(SalesOrders::Table);

    match id {
        Some(id) => {
            let [name, quantity, price, date] = sale_values(sale);
            stmt.columns(columns())
                .values_panic([id.get().into(), name, quantity, price, date]);
        }
        None => {
            stmt.columns([
                SalesOrders::ProductName,
                SalesOrders::Quantity,
                SalesOrders::PricePerItem,
                SalesOrders::SaleDate,
            ])
            .values_panic(sale_values(sale))
            .returning_col(SalesOrders::Id);
        }
    }
    stmt
}

/// Replace every field of the sale stored under `id`.
pub fn update(id: RecordId, sale: &ValidSale) -> UpdateStatement {
    let [name, quantity, price, date] = sale_values(sale);
    Query::update()
        .table(SalesOrders::Table)
        .values([
            (SalesOrders::ProductName, name),
            (SalesOrders::Quantity, quantity),
            (SalesOrders::PricePerItem, price),
            (SalesOrders::SaleDate, date),
        ])
        .and_where(Expr::col(SalesOrders::Id).eq(id.get()))
        .to_owned()
}

pub fn delete(id: RecordId) -> DeleteStatement {
    Query::delete()
        .from_table(SalesOrders::Table)
        .and_where(Expr::col(SalesOrders::Id).eq(id.get()))
        .to_owned()
}
