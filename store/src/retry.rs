//! Transport-side retries. The orchestrator never retries on its own; a client
//! wrapped in [`RetryingClient`] does it below the orchestrator's line of sight.

use std::{future::Future, time::Duration};

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use item::{AttributeValue, Item, ItemKey, OperationKind};

use crate::{client::StoreClient, error::StoreError};

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, the first one included.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub multiplier: f32,
    /// Bound on a single attempt; an attempt over it fails with `Timeout`.
    pub attempt_timeout: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            initial_backoff: Duration::from_millis(50),
            max_backoff: Duration::from_secs(2),
            multiplier: 2.0,
            attempt_timeout: Some(Duration::from_secs(10)),
        }
    }
}

impl RetryPolicy {
    pub fn no_retries() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.initial_backoff)
            .with_max_delay(self.max_backoff)
            .with_factor(self.multiplier)
            .with_jitter()
            // backon counts retries, not attempts
            .with_max_times(self.max_attempts.saturating_sub(1) as usize)
    }
}

pub struct RetryingClient<C> {
    inner: C,
    policy: RetryPolicy,
}

impl<C: StoreClient> RetryingClient<C> {
    pub fn new(inner: C, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    async fn call<T, F, Fut>(
        &self,
        operation: OperationKind,
        key: ItemKey,
        mut attempt: F,
    ) -> Result<T, StoreError>
    where
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = Result<T, StoreError>> + Send,
        T: Send,
    {
        let attempt_timeout = self.policy.attempt_timeout;
        let bounded = || {
            let fut = attempt();
            async move {
                match attempt_timeout {
                    Some(limit) => tokio::time::timeout(limit, fut)
                        .await
                        .unwrap_or(Err(StoreError::Timeout(limit))),
                    None => fut.await,
                }
            }
        };

        bounded
            .retry(self.policy.backoff())
            .sleep(tokio::time::sleep)
            .when(StoreError::is_retryable)
            .notify(|err: &StoreError, backoff: Duration| {
                tracing::debug!(
                    %operation,
                    %key,
                    backoff_ms = backoff.as_millis() as u64,
                    error = %err,
                    "retrying after backoff"
                );
            })
            .await
    }
}

#[async_trait]
impl<C: StoreClient> StoreClient for RetryingClient<C> {
    async fn put(&self, table: &str, key: ItemKey, data: AttributeValue) -> Result<(), StoreError> {
        self.call(OperationKind::Put, key, || self.inner.put(table, key, data.clone()))
            .await
    }

    async fn get(&self, table: &str, key: ItemKey) -> Result<Option<Item>, StoreError> {
        self.call(OperationKind::Get, key, || self.inner.get(table, key))
            .await
    }

    async fn update(
        &self,
        table: &str,
        key: ItemKey,
        data: AttributeValue,
    ) -> Result<(), StoreError> {
        self.call(OperationKind::Update, key, || {
            self.inner.update(table, key, data.clone())
        })
        .await
    }

    async fn delete(&self, table: &str, key: ItemKey) -> Result<(), StoreError> {
        self.call(OperationKind::Delete, key, || self.inner.delete(table, key))
            .await
    }
}
