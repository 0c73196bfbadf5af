use std::{fmt, time::SystemTime};

use item::{ItemKey, OperationKind};
use parking_lot::Mutex;
use store::{StoreError, StoreErrorKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorRecord {
    pub operation: OperationKind,
    pub key: ItemKey,
    pub class: StoreErrorKind,
    pub message: String,
    pub timestamp: SystemTime,
    pub worker: usize,
}

impl ErrorRecord {
    pub fn new(operation: OperationKind, key: ItemKey, error: &StoreError) -> Self {
        Self {
            operation,
            key,
            class: error.kind(),
            message: error.to_string(),
            timestamp: SystemTime::now(),
            worker: 0,
        }
    }

    pub fn on_worker(mut self, worker: usize) -> Self {
        self.worker = worker;
        self
    }
}

/// Failure count per operation kind; every kind is present, zero or not.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ErrorCounts([u64; 4]);

impl ErrorCounts {
    pub fn get(&self, kind: OperationKind) -> u64 {
        self.0[kind.index()]
    }

    pub fn total(&self) -> u64 {
        self.0.iter().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (OperationKind, u64)> + '_ {
        OperationKind::ALL.into_iter().map(|kind| (kind, self.get(kind)))
    }

    fn increment(&mut self, kind: OperationKind) {
        self.0[kind.index()] += 1;
    }
}

impl fmt::Display for ErrorCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, (kind, count)) in self.iter().enumerate() {
            if idx > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", kind, count)?;
        }
        Ok(())
    }
}

/// Failure count per error class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ErrorClassCounts([u64; 5]);

impl ErrorClassCounts {
    pub fn get(&self, kind: StoreErrorKind) -> u64 {
        self.0[kind.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (StoreErrorKind, u64)> + '_ {
        StoreErrorKind::ALL.into_iter().map(|kind| (kind, self.get(kind)))
    }

    fn increment(&mut self, kind: StoreErrorKind) {
        self.0[kind.index()] += 1;
    }
}

#[derive(Debug, Default)]
struct CollectorState {
    records: Vec<ErrorRecord>,
    by_kind: ErrorCounts,
    by_class: ErrorClassCounts,
}

/// Append-only failure log shared by every worker of a run.
#[derive(Debug, Default)]
pub struct ErrorCollector {
    inner: Mutex<CollectorState>,
}

impl ErrorCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, record: ErrorRecord) {
        tracing::debug!(
            operation = %record.operation,
            key = %record.key,
            class = %record.class,
            worker = record.worker,
            "error on {} of item {}: {}",
            record.operation,
            record.key,
            record.message
        );
        let mut state = self.inner.lock();
        state.by_kind.increment(record.operation);
        state.by_class.increment(record.class);
        state.records.push(record);
    }

    pub fn summary(&self) -> ErrorCounts {
        self.inner.lock().by_kind
    }

    pub fn class_summary(&self) -> ErrorClassCounts {
        self.inner.lock().by_class
    }

    pub fn records(&self) -> Vec<ErrorRecord> {
        self.inner.lock().records.clone()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
