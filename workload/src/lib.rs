pub mod collector;
pub mod config;
pub mod error;
pub mod generator;
pub mod latency;
pub mod orchestrator;
pub mod partition;
pub mod progress;
pub mod summary;

#[cfg(test)]
mod testing;

pub use collector::{ErrorClassCounts, ErrorCollector, ErrorCounts, ErrorRecord};
pub use config::{DEFAULT_ID_SPACE_MAX, DEFAULT_REPORTING_INTERVAL_OPS, StressConfig};
pub use error::WorkloadError;
pub use generator::{OperationMixGenerator, OperationUnit};
pub use latency::{LatencyRecorder, LatencyReport, OperationLatency};
pub use orchestrator::{RunPhase, WorkloadOrchestrator};
pub use partition::{MAX_WORKERS, WorkRange, partition};
pub use progress::{ProgressAggregator, ProgressState, ThroughputSample};
pub use summary::RunSummary;
