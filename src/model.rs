//! Sales record model and validation.
//!
//! `SaleDraft` is what callers hand in, `ValidSale` is what stores receive,
//! and `SalesRecord` is a stored row. A `Mutation` is validated into a
//! `ValidMutation` before any store is touched.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SubsecRound, Utc};
use rust_decimal::Decimal;

/// Fractional digits kept for `price_per_item`.
pub const PRICE_SCALE: u32 = 2;

/// Sub-second digits kept for `sale_date` (PostgreSQL and Spanner store microseconds).
pub const TIMESTAMP_SUBSEC_DIGITS: u16 = 6;

/// Errors raised while validating a mutation, before any store is called.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Product name must not be empty")]
    EmptyProductName,

    #[error("Quantity must be positive")]
    NonPositiveQuantity,

    #[error("Price per item must not be negative, got {0}")]
    NegativePrice(Decimal),

    #[error("Price per item allows at most 2 decimal places, got {0}")]
    PriceScale(Decimal),

    #[error("Invalid sale id: {0:?}")]
    InvalidId(String),

    #[error("{0} requires a sale id")]
    MissingId(Operation),

    #[error("{0} requires a sale record")]
    MissingRecord(Operation),
}

/// Identifier of a sale, assigned by the primary store on insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordId(i64);

impl RecordId {
    /// Wrap a raw store key. Keys are always positive.
    pub fn new(raw: i64) -> Result<Self, ValidationError> {
        if raw > 0 {
            Ok(Self(raw))
        } else {
            Err(ValidationError::InvalidId(raw.to_string()))
        }
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RecordId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let raw = trimmed
            .parse::<i64>()
            .map_err(|_| ValidationError::InvalidId(s.to_string()))?;
        Self::new(raw)
    }
}

/// Kind of write a mutation performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Insert,
    Update,
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Insert => "insert",
            Operation::Update => "update",
            Operation::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// A sale as supplied by a caller. Not yet validated.
#[derive(Debug, Clone, PartialEq)]
pub struct SaleDraft {
    pub product_name: String,
    pub quantity: i64,
    pub price_per_item: Decimal,
    /// Stamped with the mutation time when absent.
    pub sale_date: Option<DateTime<Utc>>,
}

impl SaleDraft {
    pub fn new(product_name: impl Into<String>, quantity: i64, price_per_item: Decimal) -> Self {
        Self {
            product_name: product_name.into(),
            quantity,
            price_per_item,
            sale_date: None,
        }
    }

    pub fn with_sale_date(mut self, sale_date: DateTime<Utc>) -> Self {
        self.sale_date = Some(sale_date);
        self
    }

    /// Validate and normalise the draft.
    ///
    /// `now` is used when no sale date was supplied. The product name is
    /// trimmed, the price rescaled to two places and the timestamp
    /// truncated to microseconds, so every store persists identical values.
    pub fn validate(self, now: DateTime<Utc>) -> Result<ValidSale, ValidationError> {
        let product_name = self.product_name.trim().to_string();
        if product_name.is_empty() {
            return Err(ValidationError::EmptyProductName);
        }

        let quantity = u32::try_from(self.quantity)
            .ok()
            .filter(|q| *q > 0)
            .ok_or(ValidationError::NonPositiveQuantity)?;

        if self.price_per_item.is_sign_negative() && !self.price_per_item.is_zero() {
            return Err(ValidationError::NegativePrice(self.price_per_item));
        }
        let normalized = self.price_per_item.normalize();
        if normalized.scale() > PRICE_SCALE {
            return Err(ValidationError::PriceScale(self.price_per_item));
        }
        let mut price_per_item = normalized.abs();
        price_per_item.rescale(PRICE_SCALE);

        let sale_date = self
            .sale_date
            .unwrap_or(now)
            .trunc_subsecs(TIMESTAMP_SUBSEC_DIGITS);

        Ok(ValidSale {
            product_name,
            quantity,
            price_per_item,
            sale_date,
        })
    }
}

/// A validated sale, ready to be written to any store.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidSale {
    product_name: String,
    quantity: u32,
    price_per_item: Decimal,
    sale_date: DateTime<Utc>,
}

impl ValidSale {
    pub fn product_name(&self) -> &str {
        &self.product_name
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn price_per_item(&self) -> Decimal {
        self.price_per_item
    }

    pub fn sale_date(&self) -> DateTime<Utc> {
        self.sale_date
    }

    /// The row a store holds after writing this sale under `id`.
    pub fn into_record(self, id: RecordId) -> SalesRecord {
        SalesRecord {
            id,
            product_name: self.product_name,
            quantity: self.quantity,
            price_per_item: self.price_per_item,
            sale_date: self.sale_date,
        }
    }
}

/// A stored sale.
#[derive(Debug, Clone, PartialEq)]
pub struct SalesRecord {
    pub id: RecordId,
    pub product_name: String,
    pub quantity: u32,
    pub price_per_item: Decimal,
    pub sale_date: DateTime<Utc>,
}

impl SalesRecord {
    /// Line total (`quantity * price_per_item`).
    pub fn total_price(&self) -> Decimal {
        self.price_per_item * Decimal::from(self.quantity)
    }
}

/// Read-path filter. All fields optional.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SalesFilter {
    /// Exact product name match.
    pub product_name: Option<String>,
    /// Inclusive lower bound on `sale_date`.
    pub since: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
}

impl SalesFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn product(mut self, name: impl Into<String>) -> Self {
        self.product_name = Some(name.into());
        self
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// In-memory evaluation, used by the mock stores.
    pub fn matches(&self, record: &SalesRecord) -> bool {
        let name_ok = self
            .product_name
            .as_deref()
            .map_or(true, |name| record.product_name == name);
        let since_ok = self.since.map_or(true, |since| record.sale_date >= since);
        name_ok && since_ok
    }
}

/// One logical write against the sales ledger.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    Insert(SaleDraft),
    Update { id: RecordId, sale: SaleDraft },
    Delete { id: RecordId },
}

impl Mutation {
    /// Assemble a mutation from loosely-typed parts, as a routing layer
    /// receives them. Update and delete need an id; insert and update need
    /// a record.
    pub fn from_parts(
        op: Operation,
        sale: Option<SaleDraft>,
        id: Option<RecordId>,
    ) -> Result<Self, ValidationError> {
        match op {
            Operation::Insert => sale
                .map(Mutation::Insert)
                .ok_or(ValidationError::MissingRecord(op)),
            Operation::Update => {
                let id = id.ok_or(ValidationError::MissingId(op))?;
                let sale = sale.ok_or(ValidationError::MissingRecord(op))?;
                Ok(Mutation::Update { id, sale })
            }
            Operation::Delete => id
                .map(|id| Mutation::Delete { id })
                .ok_or(ValidationError::MissingId(op)),
        }
    }

    pub fn operation(&self) -> Operation {
        match self {
            Mutation::Insert(_) => Operation::Insert,
            Mutation::Update { .. } => Operation::Update,
            Mutation::Delete { .. } => Operation::Delete,
        }
    }

    /// Target id, when the mutation names one.
    pub fn id(&self) -> Option<RecordId> {
        match self {
            Mutation::Insert(_) => None,
            Mutation::Update { id, .. } | Mutation::Delete { id } => Some(*id),
        }
    }

    pub fn validate(self, now: DateTime<Utc>) -> Result<ValidMutation, ValidationError> {
        Ok(match self {
            Mutation::Insert(sale) => ValidMutation::Insert(sale.validate(now)?),
            Mutation::Update { id, sale } => ValidMutation::Update {
                id,
                sale: sale.validate(now)?,
            },
            Mutation::Delete { id } => ValidMutation::Delete { id },
        })
    }
}

/// A mutation whose record passed validation.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidMutation {
    Insert(ValidSale),
    Update { id: RecordId, sale: ValidSale },
    Delete { id: RecordId },
}

impl ValidMutation {
    pub fn operation(&self) -> Operation {
        match self {
            ValidMutation::Insert(_) => Operation::Insert,
            ValidMutation::Update { .. } => Operation::Update,
            ValidMutation::Delete { .. } => Operation::Delete,
        }
    }
}
