//! Dual-write coordinator.
//!
//! Applies one sales mutation to the primary store, then the secondary,
//! and resolves to exactly one outcome:
//!
//! ```text
//! validate ──✗──> Invalid                 (no store touched)
//!    │
//! begin primary tx ──✗──> Primary
//!    │
//! primary write ──✗──> rollback ──> Primary
//!    │
//! secondary write ──✗──> rollback primary ──> Secondary
//!    │
//! commit primary ──✗──> Diverged          (secondary already holds the write)
//!    │
//! Ok(id)
//! ```
//!
//! The primary transaction is the only undo available: the secondary
//! commits on its own, so it goes second and a rejection there can still
//! be reversed on the primary. The coordinator never retries and holds no
//! state across calls; concurrent mutations of the same id are not
//! serialized.

mod mode;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::config::StorageConfig;
use crate::interfaces::{
    ErrorKind, PrimaryStore, PrimaryTx, Result as StoreResult, SecondaryStore, StoreError,
};
use crate::model::{
    Mutation, Operation, RecordId, SaleDraft, SalesFilter, SalesRecord, ValidMutation,
    ValidationError,
};

pub use mode::{StoreMode, UnknownStoreMode};

/// Default bound on any single store call.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

/// Outcome of a rejected mutation.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("Invalid mutation: {0}")]
    Invalid(#[from] ValidationError),

    #[error("Primary store failed to {op}: {source}")]
    Primary { op: Operation, source: StoreError },

    #[error("Secondary store failed to {op}: {source}")]
    Secondary { op: Operation, source: StoreError },

    #[error("Primary commit failed after secondary applied {op} of id={id}: {source}")]
    Diverged {
        op: Operation,
        id: RecordId,
        source: StoreError,
    },
}

impl SyncError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::Invalid(_) => ErrorKind::Validation,
            SyncError::Primary { source, .. } | SyncError::Secondary { source, .. } => {
                source.kind()
            }
            SyncError::Diverged { .. } => ErrorKind::Fatal,
        }
    }

    /// Whether the caller may retry the whole mutation.
    ///
    /// Retrying an insert without an idempotency key can duplicate it, so
    /// callers should only act on this for updates and deletes.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Transient
    }

    /// The store error behind this outcome, if a store produced it.
    pub fn store_error(&self) -> Option<&StoreError> {
        match self {
            SyncError::Invalid(_) => None,
            SyncError::Primary { source, .. }
            | SyncError::Secondary { source, .. }
            | SyncError::Diverged { source, .. } => Some(source),
        }
    }
}

/// Per-store bound applied to every call the coordinator makes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreTimeouts {
    pub primary: Duration,
    pub secondary: Duration,
}

impl Default for StoreTimeouts {
    fn default() -> Self {
        Self {
            primary: DEFAULT_STORE_TIMEOUT,
            secondary: DEFAULT_STORE_TIMEOUT,
        }
    }
}

/// Run a store call under `limit`. Expiry is a transient failure, never success.
async fn bounded<T, F>(limit: Duration, what: &str, call: F) -> StoreResult<T>
where
    F: Future<Output = StoreResult<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Transient(format!(
            "{what} timed out after {}ms",
            limit.as_millis()
        ))),
    }
}

async fn write_primary(tx: &mut dyn PrimaryTx, mutation: &ValidMutation) -> StoreResult<RecordId> {
    match mutation {
        ValidMutation::Insert(sale) => tx.insert(sale).await,
        ValidMutation::Update { id, sale } => tx.update(*id, sale).await.map(|()| *id),
        ValidMutation::Delete { id } => tx.delete(*id).await.map(|()| *id),
    }
}

/// Mirror a primary write. `id` is the key the primary used.
async fn mirror_secondary(
    store: &dyn SecondaryStore,
    id: RecordId,
    mutation: &ValidMutation,
) -> StoreResult<()> {
    match mutation {
        ValidMutation::Insert(sale) => store.insert_with_id(id, sale).await,
        ValidMutation::Update { sale, .. } => store.update(id, sale).await,
        ValidMutation::Delete { .. } => store.delete(id).await,
    }
}

async fn write_secondary_alone(
    store: &dyn SecondaryStore,
    mutation: &ValidMutation,
) -> StoreResult<RecordId> {
    match mutation {
        ValidMutation::Insert(sale) => store.insert(sale).await,
        ValidMutation::Update { id, sale } => store.update(*id, sale).await.map(|()| *id),
        ValidMutation::Delete { id } => store.delete(*id).await.map(|()| *id),
    }
}

/// Applies sales mutations to the primary and secondary stores.
///
/// Cheap to clone; clones share the underlying store pools.
#[derive(Clone)]
pub struct DualWriteCoordinator {
    primary: Arc<dyn PrimaryStore>,
    secondary: Arc<dyn SecondaryStore>,
    timeouts: StoreTimeouts,
}

impl DualWriteCoordinator {
    /// Create a coordinator with default timeouts.
    pub fn new(primary: Arc<dyn PrimaryStore>, secondary: Arc<dyn SecondaryStore>) -> Self {
        Self::with_timeouts(primary, secondary, StoreTimeouts::default())
    }

    pub fn with_timeouts(
        primary: Arc<dyn PrimaryStore>,
        secondary: Arc<dyn SecondaryStore>,
        timeouts: StoreTimeouts,
    ) -> Self {
        Self {
            primary,
            secondary,
            timeouts,
        }
    }

    /// Connect both stores described by `config`.
    pub async fn connect(config: &StorageConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let (primary, secondary) = crate::storage::init_stores(config).await?;
        Ok(Self::with_timeouts(
            primary,
            secondary,
            config.timeouts.store_timeouts(),
        ))
    }

    pub fn timeouts(&self) -> StoreTimeouts {
        self.timeouts
    }

    /// Apply one mutation under `mode`.
    ///
    /// Returns the id of the affected sale: the newly assigned one for
    /// inserts, the targeted one otherwise.
    #[tracing::instrument(name = "sales.apply", skip_all, fields(%mode, op = %mutation.operation()))]
    pub async fn apply(&self, mode: StoreMode, mutation: Mutation) -> Result<RecordId, SyncError> {
        let mutation = mutation.validate(Utc::now()).map_err(|e| {
            debug!(error = %e, "Mutation failed validation");
            SyncError::Invalid(e)
        })?;

        match mode {
            StoreMode::Primary => self.apply_primary(&mutation).await,
            StoreMode::Secondary => self.apply_secondary(&mutation).await,
            StoreMode::Dual => self.apply_dual(&mutation).await,
        }
    }

    pub async fn insert(&self, mode: StoreMode, sale: SaleDraft) -> Result<RecordId, SyncError> {
        self.apply(mode, Mutation::Insert(sale)).await
    }

    /// Replace every field of sale `id`.
    ///
    /// A draft without `sale_date` is stamped with the update time, which
    /// overwrites the stored date. Pass the existing `sale_date` to keep it.
    pub async fn update(
        &self,
        mode: StoreMode,
        id: RecordId,
        sale: SaleDraft,
    ) -> Result<(), SyncError> {
        self.apply(mode, Mutation::Update { id, sale }).await.map(|_| ())
    }

    pub async fn delete(&self, mode: StoreMode, id: RecordId) -> Result<(), SyncError> {
        self.apply(mode, Mutation::Delete { id }).await.map(|_| ())
    }

    /// Fetch one sale from the store `mode` reads from.
    pub async fn get(&self, mode: StoreMode, id: RecordId) -> StoreResult<Option<SalesRecord>> {
        if mode.reads_secondary() {
            bounded(self.timeouts.secondary, "secondary read", self.secondary.get(id)).await
        } else {
            bounded(self.timeouts.primary, "primary read", self.primary.get(id)).await
        }
    }

    /// List sales from the store `mode` reads from, newest first.
    pub async fn list(&self, mode: StoreMode, filter: &SalesFilter) -> StoreResult<Vec<SalesRecord>> {
        if mode.reads_secondary() {
            bounded(self.timeouts.secondary, "secondary read", self.secondary.query(filter)).await
        } else {
            bounded(self.timeouts.primary, "primary read", self.primary.query(filter)).await
        }
    }

    async fn begin_primary(&self, op: Operation) -> Result<Box<dyn PrimaryTx>, SyncError> {
        bounded(self.timeouts.primary, "primary begin", self.primary.begin())
            .await
            .map_err(|source| {
                warn!(%op, error = %source, "Could not open primary transaction");
                SyncError::Primary { op, source }
            })
    }

    async fn apply_primary(&self, mutation: &ValidMutation) -> Result<RecordId, SyncError> {
        let op = mutation.operation();
        let mut tx = self.begin_primary(op).await?;

        let id = match bounded(
            self.timeouts.primary,
            "primary write",
            write_primary(tx.as_mut(), mutation),
        )
        .await
        {
            Ok(id) => id,
            Err(source) => {
                warn!(%op, error = %source, "Primary write failed, rolling back");
                self.roll_back(tx, op).await;
                return Err(SyncError::Primary { op, source });
            }
        };

        bounded(self.timeouts.primary, "primary commit", tx.commit())
            .await
            .map_err(|source| {
                warn!(%op, %id, error = %source, "Primary commit failed");
                SyncError::Primary { op, source }
            })?;

        info!(%op, %id, "Primary write committed");
        Ok(id)
    }

    async fn apply_secondary(&self, mutation: &ValidMutation) -> Result<RecordId, SyncError> {
        let op = mutation.operation();
        let id = bounded(
            self.timeouts.secondary,
            "secondary write",
            write_secondary_alone(self.secondary.as_ref(), mutation),
        )
        .await
        .map_err(|source| {
            warn!(%op, error = %source, "Secondary write failed");
            SyncError::Secondary { op, source }
        })?;

        info!(%op, %id, "Secondary write committed");
        Ok(id)
    }

    async fn apply_dual(&self, mutation: &ValidMutation) -> Result<RecordId, SyncError> {
        let op = mutation.operation();
        let mut tx = self.begin_primary(op).await?;

        let id = match bounded(
            self.timeouts.primary,
            "primary write",
            write_primary(tx.as_mut(), mutation),
        )
        .await
        {
            Ok(id) => id,
            Err(source) => {
                warn!(%op, error = %source, "Primary write failed, secondary not attempted");
                self.roll_back(tx, op).await;
                return Err(SyncError::Primary { op, source });
            }
        };
        debug!(%op, %id, "Primary write staged, mirroring to secondary");

        if let Err(source) = bounded(
            self.timeouts.secondary,
            "secondary write",
            mirror_secondary(self.secondary.as_ref(), id, mutation),
        )
        .await
        {
            warn!(%op, %id, error = %source, "Secondary write failed, rolling back primary");
            self.roll_back(tx, op).await;
            return Err(SyncError::Secondary { op, source });
        }

        if let Err(source) = bounded(self.timeouts.primary, "primary commit", tx.commit()).await {
            error!(
                %op,
                %id,
                error = %source,
                "Primary commit failed after secondary write; stores have diverged"
            );
            return Err(SyncError::Diverged { op, id, source });
        }

        info!(%op, %id, "Dual write committed");
        Ok(id)
    }

    async fn roll_back(&self, tx: Box<dyn PrimaryTx>, op: Operation) {
        if let Err(e) = bounded(self.timeouts.primary, "primary rollback", tx.rollback()).await {
            // The uncommitted writes die with the transaction handle either way.
            warn!(%op, error = %e, "Primary rollback failed");
        }
    }
}
