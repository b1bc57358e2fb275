//! Mock storage implementations for testing.
//!
//! Both mocks keep rows in memory, can be told to fail or stall on a given
//! call, and append every call they receive to a `CallLog` that can be
//! shared between them to check cross-store ordering.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};

use crate::interfaces::{PrimaryStore, PrimaryTx, Result, SalesReader, SecondaryStore, StoreError};
use crate::model::{RecordId, SalesFilter, SalesRecord, ValidSale};

/// Which mock produced a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreRole {
    Primary,
    Secondary,
}

/// A store call a mock can log, fail, or delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOp {
    Begin,
    Insert,
    /// Secondary insert under a caller-supplied id.
    InsertWithId,
    Update,
    Delete,
    Commit,
    Rollback,
    Get,
    Query,
}

/// One logged call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub role: StoreRole,
    pub op: MockOp,
    pub id: Option<RecordId>,
}

impl Call {
    pub fn new(role: StoreRole, op: MockOp, id: Option<RecordId>) -> Self {
        Self { role, op, id }
    }
}

/// Ordered record of calls, shareable between mocks.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    calls: Arc<Mutex<Vec<Call>>>,
}

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    async fn push(&self, call: Call) {
        self.calls.lock().await.push(call);
    }

    /// Every call so far, oldest first.
    pub async fn calls(&self) -> Vec<Call> {
        self.calls.lock().await.clone()
    }

    /// Calls so far as `(role, op)` pairs.
    pub async fn ops(&self) -> Vec<(StoreRole, MockOp)> {
        self.calls
            .lock()
            .await
            .iter()
            .map(|c| (c.role, c.op))
            .collect()
    }

    pub async fn clear(&self) {
        self.calls.lock().await.clear();
    }
}

/// Failure injection and latency shared by both mocks.
#[derive(Default)]
struct Faults {
    fail_on: RwLock<HashMap<MockOp, StoreError>>,
    delay_on: RwLock<HashMap<MockOp, Duration>>,
}

impl Faults {
    /// Sleep if `op` is delayed, then fail if `op` is set to fail.
    async fn check(&self, op: MockOp) -> Result<()> {
        let delay = self.delay_on.read().await.get(&op).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match self.fail_on.read().await.get(&op) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

fn sorted_matches(rows: &BTreeMap<RecordId, SalesRecord>, filter: &SalesFilter) -> Vec<SalesRecord> {
    let mut matched: Vec<SalesRecord> = rows
        .values()
        .filter(|r| filter.matches(r))
        .cloned()
        .collect();
    matched.sort_by(|a, b| b.sale_date.cmp(&a.sale_date).then(b.id.cmp(&a.id)));
    if let Some(limit) = filter.limit {
        matched.truncate(limit as usize);
    }
    matched
}

struct PrimaryState {
    rows: RwLock<BTreeMap<RecordId, SalesRecord>>,
    next_id: Mutex<i64>,
    faults: Faults,
    log: CallLog,
}

/// Mock primary store.
///
/// Writes are staged in the transaction and land on `commit`. Ids come from
/// a counter and are consumed even if the transaction rolls back, like a
/// database sequence. Clones share state.
#[derive(Clone)]
pub struct MockPrimaryStore {
    state: Arc<PrimaryState>,
}

impl Default for MockPrimaryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPrimaryStore {
    pub fn new() -> Self {
        Self::with_log(CallLog::new())
    }

    /// Log calls into `log`.
    pub fn with_log(log: CallLog) -> Self {
        Self {
            state: Arc::new(PrimaryState {
                rows: RwLock::new(BTreeMap::new()),
                next_id: Mutex::new(1),
                faults: Faults::default(),
                log,
            }),
        }
    }

    /// Make the next insert receive `id`.
    pub async fn set_next_id(&self, id: i64) {
        *self.state.next_id.lock().await = id;
    }

    pub async fn fail_on(&self, op: MockOp, err: StoreError) {
        self.state.faults.fail_on.write().await.insert(op, err);
    }

    pub async fn delay_on(&self, op: MockOp, delay: Duration) {
        self.state.faults.delay_on.write().await.insert(op, delay);
    }

    pub async fn clear_faults(&self) {
        self.state.faults.fail_on.write().await.clear();
        self.state.faults.delay_on.write().await.clear();
    }

    /// Put a committed row in place without going through a transaction.
    pub async fn seed(&self, record: SalesRecord) {
        self.state.rows.write().await.insert(record.id, record);
    }

    /// Committed rows, ordered by id.
    pub async fn records(&self) -> Vec<SalesRecord> {
        self.state.rows.read().await.values().cloned().collect()
    }

    pub fn log(&self) -> &CallLog {
        &self.state.log
    }

    async fn enter(&self, op: MockOp, id: Option<RecordId>) -> Result<()> {
        self.state
            .log
            .push(Call::new(StoreRole::Primary, op, id))
            .await;
        self.state.faults.check(op).await
    }
}

#[async_trait]
impl SalesReader for MockPrimaryStore {
    async fn get(&self, id: RecordId) -> Result<Option<SalesRecord>> {
        self.enter(MockOp::Get, Some(id)).await?;
        Ok(self.state.rows.read().await.get(&id).cloned())
    }

    async fn query(&self, filter: &SalesFilter) -> Result<Vec<SalesRecord>> {
        self.enter(MockOp::Query, None).await?;
        Ok(sorted_matches(&*self.state.rows.read().await, filter))
    }
}

#[async_trait]
impl PrimaryStore for MockPrimaryStore {
    async fn begin(&self) -> Result<Box<dyn PrimaryTx>> {
        self.enter(MockOp::Begin, None).await?;
        Ok(Box::new(MockPrimaryTx {
            store: self.clone(),
            staged: Vec::new(),
        }))
    }
}

enum Staged {
    Put(SalesRecord),
    Remove(RecordId),
}

/// Transaction handed out by `MockPrimaryStore::begin`.
pub struct MockPrimaryTx {
    store: MockPrimaryStore,
    staged: Vec<Staged>,
}

impl MockPrimaryTx {
    /// Whether `id` exists as seen from inside this transaction.
    async fn visible(&self, id: RecordId) -> bool {
        let staged = self.staged.iter().rev().find_map(|s| match s {
            Staged::Put(r) if r.id == id => Some(true),
            Staged::Remove(removed) if *removed == id => Some(false),
            _ => None,
        });
        match staged {
            Some(visible) => visible,
            None => self.store.state.rows.read().await.contains_key(&id),
        }
    }
}

#[async_trait]
impl PrimaryTx for MockPrimaryTx {
    async fn insert(&mut self, sale: &ValidSale) -> Result<RecordId> {
        self.store.enter(MockOp::Insert, None).await?;
        let id = {
            let mut next = self.store.state.next_id.lock().await;
            let id = RecordId::new(*next)
                .map_err(|e| StoreError::Fatal(format!("mock sequence: {e}")))?;
            *next = next
                .checked_add(1)
                .ok_or_else(|| StoreError::Fatal("sale ids exhausted".to_string()))?;
            id
        };
        self.staged.push(Staged::Put(sale.clone().into_record(id)));
        Ok(id)
    }

    async fn update(&mut self, id: RecordId, sale: &ValidSale) -> Result<()> {
        self.store.enter(MockOp::Update, Some(id)).await?;
        if !self.visible(id).await {
            return Err(StoreError::NotFound(id));
        }
        self.staged.push(Staged::Put(sale.clone().into_record(id)));
        Ok(())
    }

    async fn delete(&mut self, id: RecordId) -> Result<()> {
        self.store.enter(MockOp::Delete, Some(id)).await?;
        if !self.visible(id).await {
            return Err(StoreError::NotFound(id));
        }
        self.staged.push(Staged::Remove(id));
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let MockPrimaryTx { store, staged } = *self;
        store.enter(MockOp::Commit, None).await?;
        let mut rows = store.state.rows.write().await;
        for staged in staged {
            match staged {
                Staged::Put(record) => {
                    rows.insert(record.id, record);
                }
                Staged::Remove(id) => {
                    rows.remove(&id);
                }
            }
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.store.enter(MockOp::Rollback, None).await
    }
}

struct SecondaryState {
    rows: RwLock<BTreeMap<RecordId, SalesRecord>>,
    faults: Faults,
    log: CallLog,
}

/// Mock secondary store.
///
/// Each write commits immediately. Standalone inserts take `MAX(id) + 1`;
/// inserting an id that already exists is rejected like a unique violation.
/// Clones share state.
#[derive(Clone)]
pub struct MockSecondaryStore {
    state: Arc<SecondaryState>,
}

impl Default for MockSecondaryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSecondaryStore {
    pub fn new() -> Self {
        Self::with_log(CallLog::new())
    }

    pub fn with_log(log: CallLog) -> Self {
        Self {
            state: Arc::new(SecondaryState {
                rows: RwLock::new(BTreeMap::new()),
                faults: Faults::default(),
                log,
            }),
        }
    }

    pub async fn fail_on(&self, op: MockOp, err: StoreError) {
        self.state.faults.fail_on.write().await.insert(op, err);
    }

    pub async fn delay_on(&self, op: MockOp, delay: Duration) {
        self.state.faults.delay_on.write().await.insert(op, delay);
    }

    pub async fn clear_faults(&self) {
        self.state.faults.fail_on.write().await.clear();
        self.state.faults.delay_on.write().await.clear();
    }

    pub async fn seed(&self, record: SalesRecord) {
        self.state.rows.write().await.insert(record.id, record);
    }

    /// Stored rows, ordered by id.
    pub async fn records(&self) -> Vec<SalesRecord> {
        self.state.rows.read().await.values().cloned().collect()
    }

    pub fn log(&self) -> &CallLog {
        &self.state.log
    }

    async fn enter(&self, op: MockOp, id: Option<RecordId>) -> Result<()> {
        self.state
            .log
            .push(Call::new(StoreRole::Secondary, op, id))
            .await;
        self.state.faults.check(op).await
    }
}

#[async_trait]
impl SalesReader for MockSecondaryStore {
    async fn get(&self, id: RecordId) -> Result<Option<SalesRecord>> {
        self.enter(MockOp::Get, Some(id)).await?;
        Ok(self.state.rows.read().await.get(&id).cloned())
    }

    async fn query(&self, filter: &SalesFilter) -> Result<Vec<SalesRecord>> {
        self.enter(MockOp::Query, None).await?;
        Ok(sorted_matches(&*self.state.rows.read().await, filter))
    }
}

#[async_trait]
impl SecondaryStore for MockSecondaryStore {
    async fn insert(&self, sale: &ValidSale) -> Result<RecordId> {
        self.enter(MockOp::Insert, None).await?;
        let mut rows = self.state.rows.write().await;
        let max = rows.keys().next_back().map_or(0, |id| id.get());
        let next = max
            .checked_add(1)
            .ok_or_else(|| StoreError::Fatal("sale ids exhausted".to_string()))?;
        let id = RecordId::new(next)
            .map_err(|e| StoreError::Fatal(format!("mock allocation: {e}")))?;
        rows.insert(id, sale.clone().into_record(id));
        Ok(id)
    }

    async fn insert_with_id(&self, id: RecordId, sale: &ValidSale) -> Result<()> {
        self.enter(MockOp::InsertWithId, Some(id)).await?;
        let mut rows = self.state.rows.write().await;
        if rows.contains_key(&id) {
            return Err(StoreError::Validation(format!("duplicate key id={id}")));
        }
        rows.insert(id, sale.clone().into_record(id));
        Ok(())
    }

    async fn update(&self, id: RecordId, sale: &ValidSale) -> Result<()> {
        self.enter(MockOp::Update, Some(id)).await?;
        let mut rows = self.state.rows.write().await;
        match rows.get_mut(&id) {
            Some(row) => {
                *row = sale.clone().into_record(id);
                Ok(())
            }
            None => Err(StoreError::NotFound(id)),
        }
    }

    async fn delete(&self, id: RecordId) -> Result<()> {
        self.enter(MockOp::Delete, Some(id)).await?;
        match self.state.rows.write().await.remove(&id) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound(id)),
        }
    }
}
