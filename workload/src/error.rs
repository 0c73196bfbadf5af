use store::ProvisionError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkloadError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("table provisioning failed: {0}")]
    Provisioning(#[from] ProvisionError),

    #[error("run cancelled before it started")]
    Cancelled,

    #[error("latency histogram error: {0}")]
    Histogram(#[from] hdrhistogram::CreationError),
}
