//! Sales store interfaces.
//!
//! A store plays one of two roles. The primary is transactional: writes go
//! through a `PrimaryTx` and only become visible on `commit`. The secondary
//! commits every write on its own before returning.

use std::fmt;

use async_trait::async_trait;

use crate::model::{RecordId, SalesFilter, SalesRecord, ValidSale};

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Failure classes shared by every layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed input or a constraint the store refused. Never retried.
    Validation,
    /// The mutation targets an id no store row has.
    NotFound,
    /// Network, timeout or availability problem. The caller may retry.
    Transient,
    /// Anything unclassified. Treated as requiring rollback.
    Fatal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Transient => "transient",
            ErrorKind::Fatal => "fatal",
        };
        f.write_str(name)
    }
}

/// Errors that can occur during store operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("Store rejected sale: {0}")]
    Validation(String),

    #[error("Sale not found: id={0}")]
    NotFound(RecordId),

    #[error("Store unavailable: {0}")]
    Transient(String),

    #[error("Store failure: {0}")]
    Fatal(String),
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::Validation(_) => ErrorKind::Validation,
            StoreError::NotFound(_) => ErrorKind::NotFound,
            StoreError::Transient(_) => ErrorKind::Transient,
            StoreError::Fatal(_) => ErrorKind::Fatal,
        }
    }

    /// Only transient failures are worth retrying, and only by the caller.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Transient
    }
}

/// Read access to stored sales.
#[async_trait]
pub trait SalesReader: Send + Sync {
    /// Fetch one sale by id.
    async fn get(&self, id: RecordId) -> Result<Option<SalesRecord>>;

    /// Sales matching `filter`, newest `sale_date` first.
    async fn query(&self, filter: &SalesFilter) -> Result<Vec<SalesRecord>>;
}

/// The transactional store. Source of truth for reads and id assignment.
///
/// Implementations:
/// - `PostgresPrimaryStore`: PostgreSQL storage
/// - `SqlitePrimaryStore`: SQLite storage
/// - `MockPrimaryStore`: In-memory mock for testing
#[async_trait]
pub trait PrimaryStore: SalesReader {
    /// Open a transaction. Dropping the handle without `commit` discards its writes.
    async fn begin(&self) -> Result<Box<dyn PrimaryTx>>;
}

/// A primary-store transaction.
#[async_trait]
pub trait PrimaryTx: Send {
    /// Insert a sale; the store assigns and returns its id.
    async fn insert(&mut self, sale: &ValidSale) -> Result<RecordId>;

    /// Replace every field of sale `id`. `NotFound` if no such row.
    async fn update(&mut self, id: RecordId, sale: &ValidSale) -> Result<()>;

    /// Remove sale `id`. `NotFound` if no such row.
    async fn delete(&mut self, id: RecordId) -> Result<()>;

    /// Make the transaction's writes durable and visible.
    async fn commit(self: Box<Self>) -> Result<()>;

    /// Discard the transaction's writes.
    async fn rollback(self: Box<Self>) -> Result<()>;
}

/// The self-committing store kept in step with the primary.
///
/// Implementations:
/// - `SpannerSecondaryStore`: Cloud Spanner over its PostgreSQL interface
/// - `SqliteSecondaryStore`: SQLite storage
/// - `MockSecondaryStore`: In-memory mock for testing
#[async_trait]
pub trait SecondaryStore: SalesReader {
    /// Insert a sale under an id the store allocates itself.
    ///
    /// Only used when the secondary is written alone; under dual-write the
    /// primary's id is passed to `insert_with_id` instead.
    async fn insert(&self, sale: &ValidSale) -> Result<RecordId>;

    /// Insert a sale keyed by an id assigned elsewhere.
    async fn insert_with_id(&self, id: RecordId, sale: &ValidSale) -> Result<()>;

    /// Replace every field of sale `id`. `NotFound` if no such row.
    async fn update(&self, id: RecordId, sale: &ValidSale) -> Result<()>;

    /// Remove sale `id`. `NotFound` if no such row.
    async fn delete(&self, id: RecordId) -> Result<()>;
}
