use store::TableSpec;

use crate::error::WorkloadError;

pub const DEFAULT_ID_SPACE_MAX: u64 = 1_000_000;
pub const DEFAULT_REPORTING_INTERVAL_OPS: u64 = 1000;

/// Knobs that stay fixed for a run. Iteration count and concurrency are passed
/// to `run` directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StressConfig {
    pub table: TableSpec,
    /// Keys are drawn from `[1, id_space_max]`.
    pub id_space_max: u64,
    pub reporting_interval_ops: u64,
    /// Worker `i` seeds its generator with `seed + i` when set.
    pub seed: Option<u64>,
}

impl StressConfig {
    pub fn builder() -> StressConfigBuilder {
        StressConfigBuilder::default()
    }
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            table: TableSpec::default(),
            id_space_max: DEFAULT_ID_SPACE_MAX,
            reporting_interval_ops: DEFAULT_REPORTING_INTERVAL_OPS,
            seed: None,
        }
    }
}

pub struct StressConfigBuilder {
    inner: StressConfig,
}

impl Default for StressConfigBuilder {
    fn default() -> Self {
        Self {
            inner: StressConfig::default(),
        }
    }
}

impl StressConfigBuilder {
    pub fn table(mut self, name: impl Into<String>) -> Self {
        self.inner.table.name = name.into();
        self
    }

    pub fn table_spec(mut self, spec: TableSpec) -> Self {
        self.inner.table = spec;
        self
    }

    pub fn id_space_max(mut self, id_space_max: u64) -> Self {
        self.inner.id_space_max = id_space_max;
        self
    }

    pub fn reporting_interval_ops(mut self, reporting_interval_ops: u64) -> Self {
        self.inner.reporting_interval_ops = reporting_interval_ops;
        self
    }

    pub fn seed(mut self, seed: Option<u64>) -> Self {
        self.inner.seed = seed;
        self
    }

    pub fn build(self) -> Result<StressConfig, WorkloadError> {
        if self.inner.id_space_max == 0 {
            return Err(WorkloadError::InvalidConfig(
                "id_space_max must be positive".into(),
            ));
        }
        if self.inner.reporting_interval_ops == 0 {
            return Err(WorkloadError::InvalidConfig(
                "reporting_interval_ops must be positive".into(),
            ));
        }
        self.inner
            .table
            .validate()
            .map_err(|e| WorkloadError::InvalidConfig(e.to_string()))?;
        Ok(self.inner)
    }
}
