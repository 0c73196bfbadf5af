use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use store::{FaultPlan, FaultRule, MemoryStore, ProvisionMode, RetryPolicy};
use tracing::Level;

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Concurrent CRUD stress driver for key-value tables",
    long_about = None
)]
pub struct Cli {
    #[command(flatten)]
    pub store: StoreArgs,

    /// Seeds every worker's key generator; unset draws from entropy.
    #[arg(long, global = true, env = "STAMPEDE_SEED")]
    pub seed: Option<u64>,

    /// -v for debug, -vv for trace.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args)]
pub struct StoreArgs {
    #[arg(
        long,
        global = true,
        env = "STAMPEDE_TABLE",
        default_value = store::lifecycle::DEFAULT_TABLE_NAME
    )]
    pub table: String,

    /// Connection pool size of the store.
    #[arg(long, global = true, env = "STAMPEDE_MAX_CONNECTIONS", default_value_t = 1000)]
    pub max_connections: usize,

    /// Simulated per-request latency.
    #[arg(long, global = true, env = "STAMPEDE_LATENCY_MS")]
    pub latency_ms: Option<u64>,

    /// Injected failure, `op:kind:rate`, e.g. `get:throttled:0.05`. Repeatable.
    #[arg(long = "fault", global = true, env = "STAMPEDE_FAULTS", value_delimiter = ',')]
    pub faults: Vec<FaultRule>,

    /// Extra attempts for retryable failures.
    #[arg(long, global = true, env = "STAMPEDE_RETRIES", default_value_t = 9)]
    pub retries: u32,

    #[arg(long, global = true, env = "STAMPEDE_ATTEMPT_TIMEOUT_MS", default_value_t = 10_000)]
    pub attempt_timeout_ms: u64,
}

impl StoreArgs {
    pub fn memory_store(&self) -> MemoryStore {
        MemoryStore::builder()
            .max_connections(self.max_connections)
            .latency(self.latency_ms.map(Duration::from_millis))
            .faults(FaultPlan::new(self.faults.clone()))
            .build()
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retries.saturating_add(1),
            attempt_timeout: match self.attempt_timeout_ms {
                0 => None,
                ms => Some(Duration::from_millis(ms)),
            },
            ..RetryPolicy::default()
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Mixed put/get/update/delete iterations on random keys.
    Run {
        #[arg(long, env = "STAMPEDE_ITERATIONS", default_value_t = 100_000)]
        iterations: u64,

        #[arg(long, env = "STAMPEDE_CONCURRENCY", default_value_t = 100)]
        concurrency: usize,

        /// Keys are drawn from `[1, id-space]`.
        #[arg(long, env = "STAMPEDE_ID_SPACE", default_value_t = workload::DEFAULT_ID_SPACE_MAX)]
        id_space: u64,

        #[arg(
            long,
            env = "STAMPEDE_REPORT_EVERY",
            default_value_t = workload::DEFAULT_REPORTING_INTERVAL_OPS
        )]
        report_every: u64,

        #[arg(
            long,
            env = "STAMPEDE_PROVISION",
            default_value_t = ProvisionMode::Recreate,
            conflicts_with = "preload"
        )]
        provision: ProvisionMode,

        /// Bulk load items `1..=N` into a recreated table before the mix
        /// starts; the mix then keeps that table.
        #[arg(long, env = "STAMPEDE_PRELOAD")]
        preload: Option<u64>,
    },
    /// Write items `1..=N` with deterministic payloads.
    Load {
        #[arg(long, env = "STAMPEDE_ITEMS", default_value_t = 100_000)]
        items: u64,

        #[arg(long, env = "STAMPEDE_CONCURRENCY", default_value_t = 100)]
        concurrency: usize,

        #[arg(
            long,
            env = "STAMPEDE_REPORT_EVERY",
            default_value_t = workload::DEFAULT_REPORTING_INTERVAL_OPS
        )]
        report_every: u64,
    },
}

impl Commands {
    pub fn concurrency(&self) -> usize {
        match self {
            Commands::Run { concurrency, .. } | Commands::Load { concurrency, .. } => *concurrency,
        }
    }
}

pub fn log_level(verbose: u8) -> Level {
    match verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    }
}
