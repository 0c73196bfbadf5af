use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use crossbeam_skiplist::SkipMap;
use item::{AttributeValue, Item, ItemKey, OperationKind};
use parking_lot::Mutex;
use tokio::{
    sync::{Semaphore, SemaphorePermit},
    time::Instant,
};

use crate::{
    client::StoreClient,
    error::StoreError,
    fault::FaultPlan,
    lifecycle::{TableAdmin, TableSpec, TableStatus},
};

/// DynamoDB's item size ceiling.
pub const MAX_ITEM_BYTES: usize = 400 * 1024;

fn not_found(table: &str) -> StoreError {
    StoreError::NotFound(format!("requested resource not found: {}", table))
}

#[derive(Debug)]
struct MemoryTable {
    spec: TableSpec,
    items: SkipMap<ItemKey, Item>,
    created_at: Instant,
    deleting_since: Mutex<Option<Instant>>,
}

impl MemoryTable {
    // None once a delete has fully gone through
    fn status(&self, provisioning_delay: Duration) -> Option<TableStatus> {
        if let Some(since) = *self.deleting_since.lock() {
            return (since.elapsed() < provisioning_delay).then_some(TableStatus::Deleting);
        }
        if self.created_at.elapsed() < provisioning_delay {
            Some(TableStatus::Creating)
        } else {
            Some(TableStatus::Active)
        }
    }
}

pub struct MemoryStoreBuilder {
    max_connections: usize,
    latency: Option<Duration>,
    provisioning_delay: Duration,
    faults: FaultPlan,
    max_item_bytes: usize,
}

impl Default for MemoryStoreBuilder {
    fn default() -> Self {
        Self {
            max_connections: 1000,
            latency: None,
            provisioning_delay: Duration::ZERO,
            faults: FaultPlan::default(),
            max_item_bytes: MAX_ITEM_BYTES,
        }
    }
}

impl MemoryStoreBuilder {
    pub fn max_connections(mut self, max_connections: usize) -> Self {
        self.max_connections = max_connections.max(1);
        self
    }

    pub fn latency(mut self, latency: Option<Duration>) -> Self {
        self.latency = latency.filter(|l| !l.is_zero());
        self
    }

    pub fn provisioning_delay(mut self, delay: Duration) -> Self {
        self.provisioning_delay = delay;
        self
    }

    pub fn faults(mut self, faults: FaultPlan) -> Self {
        self.faults = faults;
        self
    }

    pub fn max_item_bytes(mut self, max_item_bytes: usize) -> Self {
        self.max_item_bytes = max_item_bytes;
        self
    }

    pub fn build(self) -> MemoryStore {
        MemoryStore {
            tables: SkipMap::new(),
            connections: Semaphore::new(self.max_connections),
            max_connections: self.max_connections,
            latency: self.latency,
            provisioning_delay: self.provisioning_delay,
            faults: self.faults,
            max_item_bytes: self.max_item_bytes,
        }
    }
}

/// In-process stand-in for the remote store. Requests share a bounded pool of
/// "connections" and may be slowed down or failed on purpose.
#[derive(Debug)]
pub struct MemoryStore {
    tables: SkipMap<String, Arc<MemoryTable>>,
    connections: Semaphore,
    max_connections: usize,
    latency: Option<Duration>,
    provisioning_delay: Duration,
    faults: FaultPlan,
    max_item_bytes: usize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        MemoryStoreBuilder::default().build()
    }
}

impl MemoryStore {
    pub fn builder() -> MemoryStoreBuilder {
        MemoryStoreBuilder::default()
    }

    pub fn max_connections(&self) -> usize {
        self.max_connections
    }

    /// Number of items in an active table.
    pub fn item_count(&self, table: &str) -> Option<usize> {
        self.active_table(table).ok().map(|t| t.items.len())
    }

    fn table_status(&self, name: &str) -> Option<TableStatus> {
        let entry = self.tables.get(name)?;
        let status = entry.value().status(self.provisioning_delay);
        if status.is_none() {
            entry.remove();
        }
        status
    }

    fn active_table(&self, name: &str) -> Result<Arc<MemoryTable>, StoreError> {
        let table = self
            .tables
            .get(name)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| not_found(name))?;

        match table.status(self.provisioning_delay) {
            Some(TableStatus::Active) => Ok(table),
            Some(status) => Err(StoreError::Unavailable(format!(
                "table {} is {:?}",
                table.spec.name, status
            ))),
            None => Err(not_found(name)),
        }
    }

    // connection, latency and fault injection shared by every item request
    async fn begin(
        &self,
        operation: OperationKind,
        table: &str,
    ) -> Result<(SemaphorePermit<'_>, Arc<MemoryTable>), StoreError> {
        let permit = self
            .connections
            .acquire()
            .await
            .map_err(|_| StoreError::Unavailable("connection pool closed".into()))?;

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        if let Some(err) = self.faults.roll(operation, &mut rand::thread_rng()) {
            return Err(err);
        }

        let table = self.active_table(table)?;
        Ok((permit, table))
    }

    fn check_size(&self, data: &AttributeValue) -> Result<(), StoreError> {
        if data.size_hint() > self.max_item_bytes {
            return Err(StoreError::Other(format!(
                "item size {} exceeds the maximum of {} bytes",
                data.size_hint(),
                self.max_item_bytes
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl StoreClient for MemoryStore {
    async fn put(&self, table: &str, key: ItemKey, data: AttributeValue) -> Result<(), StoreError> {
        let (_permit, table) = self.begin(OperationKind::Put, table).await?;
        self.check_size(&data)?;
        table.items.insert(key, Item { key, data });
        Ok(())
    }

    async fn get(&self, table: &str, key: ItemKey) -> Result<Option<Item>, StoreError> {
        let (_permit, table) = self.begin(OperationKind::Get, table).await?;
        Ok(table.items.get(&key).map(|entry| entry.value().clone()))
    }

    async fn update(
        &self,
        table: &str,
        key: ItemKey,
        data: AttributeValue,
    ) -> Result<(), StoreError> {
        let (_permit, table) = self.begin(OperationKind::Update, table).await?;
        self.check_size(&data)?;
        table.items.insert(key, Item { key, data });
        Ok(())
    }

    async fn delete(&self, table: &str, key: ItemKey) -> Result<(), StoreError> {
        let (_permit, table) = self.begin(OperationKind::Delete, table).await?;
        table.items.remove(&key);
        Ok(())
    }
}

#[async_trait]
impl TableAdmin for MemoryStore {
    async fn describe_table(&self, name: &str) -> Result<Option<TableStatus>, StoreError> {
        Ok(self.table_status(name))
    }

    async fn create_table(&self, spec: &TableSpec) -> Result<(), StoreError> {
        if let Some(status) = self.table_status(&spec.name) {
            return Err(StoreError::Other(format!(
                "table {} already exists ({:?})",
                spec.name, status
            )));
        }
        tracing::debug!(table = %spec.name, "creating in-memory table");
        self.tables.insert(
            spec.name.clone(),
            Arc::new(MemoryTable {
                spec: spec.clone(),
                items: SkipMap::new(),
                created_at: Instant::now(),
                deleting_since: Mutex::new(None),
            }),
        );
        Ok(())
    }

    async fn delete_table(&self, name: &str) -> Result<(), StoreError> {
        let entry = self
            .tables
            .get(name)
            .ok_or_else(|| not_found(name))?;

        if self.provisioning_delay.is_zero() {
            entry.remove();
            return Ok(());
        }

        let table = entry.value();
        let mut deleting_since = table.deleting_since.lock();
        if deleting_since.is_some() {
            return Err(StoreError::Other(format!("table {} is being deleted", name)));
        }
        *deleting_since = Some(Instant::now());
        table.items.clear();
        Ok(())
    }
}
