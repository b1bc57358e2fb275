//! Shared storage integration tests.
//!
//! Tests the PrimaryStore and SecondaryStore interfaces against all
//! implementations. Each backend test binary imports these test functions
//! and runs them.
//!
//! Every test writes sales whose product name starts with `test_`, so a
//! backend can clear them with one `DELETE` before and after a run.

pub mod primary_store_tests;
pub mod secondary_store_tests;

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;

use brewpos::model::{SaleDraft, ValidSale};

/// Product names used by the contract tests share this prefix.
pub const TEST_PRODUCT_PREFIX: &str = "test_";

/// A fixed sale time with a sub-second part, to check precision survives.
pub fn sale_time(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, hour, 15, 30).unwrap()
        + chrono::Duration::microseconds(123_456)
}

/// A validated sale for `product` at `hour`.
pub fn make_sale(product: &str, quantity: i64, cents: i64, hour: u32) -> ValidSale {
    let at = sale_time(hour);
    SaleDraft::new(product, quantity, Decimal::new(cents, 2))
        .with_sale_date(at)
        .validate(at)
        .expect("test sale should be valid")
}
