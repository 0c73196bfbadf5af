use std::{fmt, str::FromStr, sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::time::Instant;

use crate::error::{ProvisionError, StoreError};

pub const DEFAULT_TABLE_NAME: &str = "test_table";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableStatus {
    Creating,
    Active,
    Deleting,
}

/// Shape of the table under test: a single numeric hash key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSpec {
    pub name: String,
    pub hash_key: String,
    pub read_capacity: u64,
    pub write_capacity: u64,
}

impl TableSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ProvisionError> {
        let name_ok = (3..=255).contains(&self.name.len())
            && self
                .name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
        if !name_ok {
            return Err(ProvisionError::InvalidSpec(format!(
                "table name {:?} must be 3-255 characters of [a-zA-Z0-9_.-]",
                self.name
            )));
        }
        if self.hash_key.is_empty() {
            return Err(ProvisionError::InvalidSpec("hash key must be named".into()));
        }
        if self.read_capacity == 0 || self.write_capacity == 0 {
            return Err(ProvisionError::InvalidSpec(
                "provisioned throughput must be positive".into(),
            ));
        }
        Ok(())
    }
}

impl Default for TableSpec {
    fn default() -> Self {
        Self {
            name: DEFAULT_TABLE_NAME.to_string(),
            hash_key: "id".to_string(),
            // placeholders, most DynamoDB-compatible stores don't enforce them
            read_capacity: 10,
            write_capacity: 10,
        }
    }
}

/// Table-level admin calls the provisioner is built on.
#[async_trait]
pub trait TableAdmin: Send + Sync {
    /// `None` when the table does not exist.
    async fn describe_table(&self, name: &str) -> Result<Option<TableStatus>, StoreError>;
    async fn create_table(&self, spec: &TableSpec) -> Result<(), StoreError>;
    async fn delete_table(&self, name: &str) -> Result<(), StoreError>;
}

#[async_trait]
impl<T: TableAdmin + ?Sized> TableAdmin for Arc<T> {
    async fn describe_table(&self, name: &str) -> Result<Option<TableStatus>, StoreError> {
        (**self).describe_table(name).await
    }

    async fn create_table(&self, spec: &TableSpec) -> Result<(), StoreError> {
        (**self).create_table(spec).await
    }

    async fn delete_table(&self, name: &str) -> Result<(), StoreError> {
        (**self).delete_table(name).await
    }
}

/// Gets the target table into a known state before load starts. Runs once.
#[async_trait]
pub trait TableLifecycleManager: Send + Sync {
    async fn ensure_clean_table(&self, spec: &TableSpec) -> Result<(), ProvisionError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProvisionMode {
    /// Drop the table if present, then create it empty.
    #[default]
    Recreate,
    /// Keep an existing table and its items.
    CreateIfAbsent,
}

impl FromStr for ProvisionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "recreate" => Ok(ProvisionMode::Recreate),
            "create-if-absent" | "create_if_absent" => Ok(ProvisionMode::CreateIfAbsent),
            _ => Err(format!("unknown provision mode: {}", s)),
        }
    }
}

impl fmt::Display for ProvisionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProvisionMode::Recreate => f.write_str("recreate"),
            ProvisionMode::CreateIfAbsent => f.write_str("create-if-absent"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProvisionStep {
    Inspect,
    Delete,
    AwaitAbsent,
    Create,
    AwaitActive,
    Done,
}

pub struct Provisioner<A> {
    admin: A,
    mode: ProvisionMode,
    poll_interval: Duration,
    timeout: Duration,
}

impl<A: TableAdmin> Provisioner<A> {
    pub fn new(admin: A) -> Self {
        Self {
            admin,
            mode: ProvisionMode::default(),
            poll_interval: Duration::from_millis(200),
            timeout: Duration::from_secs(300),
        }
    }

    pub fn mode(mut self, mode: ProvisionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn describe(&self, name: &str) -> Result<Option<TableStatus>, ProvisionError> {
        self.admin
            .describe_table(name)
            .await
            .map_err(|e| ProvisionError::store(name, e))
    }

    // polls until the table reaches `target` (None = gone)
    async fn wait_for(
        &self,
        name: &str,
        target: Option<TableStatus>,
    ) -> Result<(), ProvisionError> {
        let started = Instant::now();
        loop {
            if self.describe(name).await? == target {
                return Ok(());
            }
            let waited = started.elapsed();
            if waited >= self.timeout {
                return Err(ProvisionError::WaitTimeout {
                    table: name.to_string(),
                    target: if target.is_some() { "active" } else { "deleted" },
                    waited,
                });
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    fn next_after_inspect(&self, status: Option<TableStatus>) -> ProvisionStep {
        match (status, self.mode) {
            (None, _) => ProvisionStep::Create,
            (Some(TableStatus::Deleting), _) => ProvisionStep::AwaitAbsent,
            (Some(_), ProvisionMode::Recreate) => ProvisionStep::Delete,
            (Some(TableStatus::Active), ProvisionMode::CreateIfAbsent) => ProvisionStep::Done,
            (Some(TableStatus::Creating), ProvisionMode::CreateIfAbsent) => {
                ProvisionStep::AwaitActive
            }
        }
    }
}

#[async_trait]
impl<A: TableAdmin> TableLifecycleManager for Provisioner<A> {
    #[tracing::instrument(skip(self, spec), fields(table = %spec.name, mode = %self.mode))]
    async fn ensure_clean_table(&self, spec: &TableSpec) -> Result<(), ProvisionError> {
        spec.validate()?;
        let name = spec.name.as_str();
        let started = Instant::now();

        let mut step = ProvisionStep::Inspect;
        while step != ProvisionStep::Done {
            tracing::debug!(?step, "provisioning step");
            step = match step {
                ProvisionStep::Inspect => {
                    let status = self.describe(name).await?;
                    match status {
                        Some(status) => tracing::info!(?status, "table {} exists", name),
                        None => tracing::info!("table {} does not exist, creating it", name),
                    }
                    self.next_after_inspect(status)
                }
                ProvisionStep::Delete => {
                    tracing::info!("deleting table {}", name);
                    self.admin
                        .delete_table(name)
                        .await
                        .map_err(|e| ProvisionError::store(name, e))?;
                    ProvisionStep::AwaitAbsent
                }
                ProvisionStep::AwaitAbsent => {
                    self.wait_for(name, None).await?;
                    tracing::info!("table {} deleted", name);
                    ProvisionStep::Create
                }
                ProvisionStep::Create => {
                    self.admin
                        .create_table(spec)
                        .await
                        .map_err(|e| ProvisionError::store(name, e))?;
                    ProvisionStep::AwaitActive
                }
                ProvisionStep::AwaitActive => {
                    self.wait_for(name, Some(TableStatus::Active)).await?;
                    ProvisionStep::Done
                }
                ProvisionStep::Done => ProvisionStep::Done,
            };
        }

        tracing::info!(
            "table {} ready in {:.2} seconds",
            name,
            started.elapsed().as_secs_f64()
        );
        Ok(())
    }
}
