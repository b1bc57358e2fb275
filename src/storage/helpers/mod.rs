//! Shared storage helper functions.
//!
//! Column codecs and error classification used across the SQL backends.

use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;

use crate::interfaces::{Result, StoreError};
use crate::model::{RecordId, SalesRecord};

/// Render a sale date the way text-typed columns store it.
///
/// Fixed-width RFC 3339 in UTC with microseconds, so lexical order is
/// chronological order.
pub fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a stored sale date.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Fatal(format!("stored sale_date {raw:?} is not RFC 3339: {e}")))
}

/// Parse a stored price.
pub fn parse_price(raw: &str) -> Result<Decimal> {
    Decimal::from_str(raw.trim())
        .map_err(|e| StoreError::Fatal(format!("stored price {raw:?} is not a decimal: {e}")))
}

/// Assemble a record from raw column values.
///
/// Rows that break the record invariants are corrupt, not invalid input.
pub fn record_from_columns(
    id: i64,
    product_name: String,
    quantity: i64,
    price_per_item: Decimal,
    sale_date: DateTime<Utc>,
) -> Result<SalesRecord> {
    let id = RecordId::new(id).map_err(|e| StoreError::Fatal(format!("stored row: {e}")))?;
    let quantity = u32::try_from(quantity)
        .ok()
        .filter(|q| *q > 0)
        .ok_or_else(|| StoreError::Fatal(format!("stored row id={id}: quantity {quantity}")))?;
    Ok(SalesRecord {
        id,
        product_name,
        quantity,
        price_per_item,
        sale_date,
    })
}

/// Turn a store-assigned key into a `RecordId`.
pub fn assigned_id(raw: i64) -> Result<RecordId> {
    RecordId::new(raw).map_err(|e| StoreError::Fatal(format!("store assigned {e}")))
}

/// Filesystem path behind a `sqlite:` URI, if it names a file.
///
/// `None` for in-memory databases.
pub fn sqlite_file_path(uri: &str) -> Option<PathBuf> {
    let rest = uri
        .strip_prefix("sqlite://")
        .or_else(|| uri.strip_prefix("sqlite:"))?;
    let path = rest.split('?').next().unwrap_or_default();
    if path.is_empty() || path.contains(":memory:") {
        return None;
    }
    Some(PathBuf::from(path))
}

/// Whether a URI names an in-memory SQLite database.
pub fn is_sqlite_memory(uri: &str) -> bool {
    uri.starts_with("sqlite:") && (uri.contains(":memory:") || uri.contains("mode=memory"))
}

/// SQLSTATE and SQLite result codes that mean "try again later".
///
/// PostgreSQL (and Spanner through PGAdapter): connection exceptions (08xxx),
/// serialization failures and aborted transactions (40001), deadlocks (40P01),
/// shutdowns (57P0x), lock timeouts (55P03), too many connections (53300).
/// SQLite: BUSY (5) and LOCKED (6), including their extended codes.
pub fn is_transient_code(code: &str) -> bool {
    if code.starts_with("08") {
        return true;
    }
    if matches!(
        code,
        "40001" | "40P01" | "57P01" | "57P02" | "57P03" | "55P03" | "53300"
    ) {
        return true;
    }
    // SQLSTATEs are always five characters; SQLite codes are shorter.
    if code.len() >= 5 {
        return false;
    }
    match code.parse::<i32>() {
        Ok(n) => matches!(n & 0xff, 5 | 6),
        Err(_) => false,
    }
}

/// Codes for values the store refused: PostgreSQL data exceptions (22xxx)
/// and integrity violations (23xxx), SQLite CONSTRAINT (19) and its
/// extended codes.
pub fn is_rejected_value_code(code: &str) -> bool {
    if code.len() == 5 {
        return code.starts_with("22") || code.starts_with("23");
    }
    matches!(code.parse::<i32>(), Ok(n) if n & 0xff == 19)
}

/// Map a driver error onto the store error taxonomy.
#[cfg(any(feature = "postgres", feature = "sqlite"))]
pub fn classify(err: &sqlx::Error) -> StoreError {
    use sqlx::error::ErrorKind as DbErrorKind;

    match err {
        sqlx::Error::Database(db) => {
            match db.kind() {
                DbErrorKind::UniqueViolation
                | DbErrorKind::ForeignKeyViolation
                | DbErrorKind::NotNullViolation
                | DbErrorKind::CheckViolation => {
                    return StoreError::Validation(db.message().to_string());
                }
                _ => {}
            }
            let code = db.code();
            match code.as_deref() {
                Some(code) if is_transient_code(code) => StoreError::Transient(err.to_string()),
                Some(code) if is_rejected_value_code(code) => {
                    StoreError::Validation(db.message().to_string())
                }
                _ => StoreError::Fatal(err.to_string()),
            }
        }
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => StoreError::Transient(err.to_string()),
        _ => StoreError::Fatal(err.to_string()),
    }
}

#[cfg(any(feature = "postgres", feature = "sqlite"))]
impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        classify(&err)
    }
}
