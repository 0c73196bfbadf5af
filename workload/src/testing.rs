//! In-process doubles for the store and the table lifecycle.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use async_trait::async_trait;
use item::{AttributeValue, Item, ItemKey, OperationKind};
use parking_lot::Mutex;
use store::{
    ProvisionError, StoreClient, StoreError, StoreErrorKind, TableLifecycleManager, TableSpec,
};
use tokio_util::sync::CancellationToken;

/// Succeeds at everything unless told otherwise. Counts calls per kind and
/// keeps the order they arrived in.
#[derive(Default)]
pub struct StubStore {
    failures: [Option<StoreErrorKind>; 4],
    calls: [AtomicU64; 4],
    log: Mutex<Vec<OperationKind>>,
    cancel_after_puts: Option<(u64, CancellationToken)>,
    panic_on_get: Option<u64>,
}

impl StubStore {
    pub fn failing(kind: OperationKind, error: StoreErrorKind) -> Self {
        let mut store = Self::default();
        store.failures[kind.index()] = Some(error);
        store
    }

    /// Cancels `token` while serving the nth put.
    pub fn cancel_after_puts(mut self, puts: u64, token: CancellationToken) -> Self {
        self.cancel_after_puts = Some((puts, token));
        self
    }

    /// Panics the calling task on the nth get.
    pub fn panic_on_get(mut self, nth: u64) -> Self {
        self.panic_on_get = Some(nth);
        self
    }

    pub fn calls(&self, kind: OperationKind) -> u64 {
        self.calls[kind.index()].load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> u64 {
        OperationKind::ALL.iter().map(|k| self.calls(*k)).sum()
    }

    pub fn log(&self) -> Vec<OperationKind> {
        self.log.lock().clone()
    }

    fn serve(&self, kind: OperationKind, key: ItemKey) -> Result<(), StoreError> {
        let seen = self.calls[kind.index()].fetch_add(1, Ordering::SeqCst) + 1;
        self.log.lock().push(kind);

        if kind == OperationKind::Put {
            if let Some((puts, token)) = &self.cancel_after_puts {
                if seen == *puts {
                    token.cancel();
                }
            }
        }
        if kind == OperationKind::Get && self.panic_on_get == Some(seen) {
            panic!("stub store exploded on get {}", seen);
        }
        match self.failures[kind.index()] {
            Some(error) => Err(StoreError::synthetic(error, format!("stub {} on {}", kind, key))),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl StoreClient for StubStore {
    async fn put(
        &self,
        _table: &str,
        key: ItemKey,
        _data: AttributeValue,
    ) -> Result<(), StoreError> {
        self.serve(OperationKind::Put, key)
    }

    async fn get(&self, _table: &str, key: ItemKey) -> Result<Option<Item>, StoreError> {
        self.serve(OperationKind::Get, key)?;
        Ok(Some(Item::seeded(key)))
    }

    async fn update(
        &self,
        _table: &str,
        key: ItemKey,
        _data: AttributeValue,
    ) -> Result<(), StoreError> {
        self.serve(OperationKind::Update, key)
    }

    async fn delete(&self, _table: &str, key: ItemKey) -> Result<(), StoreError> {
        self.serve(OperationKind::Delete, key)
    }
}

#[derive(Default)]
pub struct StubLifecycle {
    fail: bool,
    calls: AtomicUsize,
}

impl StubLifecycle {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TableLifecycleManager for StubLifecycle {
    async fn ensure_clean_table(&self, spec: &TableSpec) -> Result<(), ProvisionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ProvisionError::store(
                &spec.name,
                StoreError::Unavailable("control plane offline".into()),
            ));
        }
        Ok(())
    }
}
