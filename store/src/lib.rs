pub mod client;
pub mod error;
pub mod fault;
pub mod lifecycle;
pub mod memory;
pub mod retry;

pub use client::StoreClient;
pub use error::{ProvisionError, StoreError, StoreErrorKind};
pub use fault::{FaultParseError, FaultPlan, FaultRule};
pub use lifecycle::{
    ProvisionMode, Provisioner, TableAdmin, TableLifecycleManager, TableSpec, TableStatus,
};
pub use memory::{MemoryStore, MemoryStoreBuilder};
pub use retry::{RetryPolicy, RetryingClient};
