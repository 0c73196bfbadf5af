use std::{sync::Arc, time::Instant};

use item::{Item, ItemKey, OperationKind};
use rand::rngs::StdRng;
use store::{StoreClient, StoreError, TableLifecycleManager};
use tokio::{
    sync::{mpsc::UnboundedSender, watch},
    task::JoinSet,
};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use crate::{
    collector::{ErrorCollector, ErrorRecord},
    config::StressConfig,
    error::WorkloadError,
    generator::OperationMixGenerator,
    latency::LatencyRecorder,
    partition::{WorkRange, partition},
    progress::{ProgressAggregator, ThroughputSample},
    summary::RunSummary,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    NotStarted,
    Provisioning,
    Running,
    Draining,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scenario {
    /// put, get, update, delete on independent random keys
    Mixed,
    /// one put of `Item::seeded(index)` per index
    Load,
}

impl Scenario {
    fn name(self) -> &'static str {
        match self {
            Scenario::Mixed => "mixed",
            Scenario::Load => "load",
        }
    }

    fn operations_per_iteration(self) -> u64 {
        match self {
            Scenario::Mixed => OperationKind::ALL.len() as u64,
            Scenario::Load => 1,
        }
    }
}

pub struct WorkloadOrchestrator {
    client: Arc<dyn StoreClient>,
    lifecycle: Arc<dyn TableLifecycleManager>,
    config: StressConfig,
    cancel: CancellationToken,
    sample_sink: Option<UnboundedSender<ThroughputSample>>,
    phase: watch::Sender<RunPhase>,
}

impl WorkloadOrchestrator {
    pub fn new(
        client: Arc<dyn StoreClient>,
        lifecycle: Arc<dyn TableLifecycleManager>,
        config: StressConfig,
    ) -> Self {
        let (phase, _) = watch::channel(RunPhase::NotStarted);
        Self {
            client,
            lifecycle,
            config,
            cancel: CancellationToken::new(),
            sample_sink: None,
            phase,
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_sample_sink(mut self, sink: UnboundedSender<ThroughputSample>) -> Self {
        self.sample_sink = Some(sink);
        self
    }

    pub fn config(&self) -> &StressConfig {
        &self.config
    }

    /// Cancelling stops workers from starting new iterations.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn phase(&self) -> RunPhase {
        *self.phase.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<RunPhase> {
        self.phase.subscribe()
    }

    /// Provisions the table, then runs `total_iterations` CRUD iterations
    /// spread over `concurrency` workers.
    pub async fn run(
        &mut self,
        total_iterations: u64,
        concurrency: usize,
    ) -> Result<RunSummary, WorkloadError> {
        self.execute(Scenario::Mixed, total_iterations, concurrency)
            .await
    }

    /// Provisions the table, then writes items `1..=total_items`.
    pub async fn load(
        &mut self,
        total_items: u64,
        concurrency: usize,
    ) -> Result<RunSummary, WorkloadError> {
        self.execute(Scenario::Load, total_items, concurrency).await
    }

    fn set_phase(&self, phase: RunPhase) {
        tracing::debug!(?phase, "phase change");
        self.phase.send_replace(phase);
    }

    async fn execute(
        &mut self,
        scenario: Scenario,
        total_iterations: u64,
        concurrency: usize,
    ) -> Result<RunSummary, WorkloadError> {
        // nothing below may fail once the table has been touched
        let ranges = partition(total_iterations, concurrency)?;
        if self.cancel.is_cancelled() {
            return Err(WorkloadError::Cancelled);
        }
        let lanes = self.prepare_lanes(ranges)?;
        let merged = LatencyRecorder::new()?;

        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("run", %run_id, scenario = scenario.name());
        self.drive(scenario, run_id, total_iterations, lanes, merged)
            .instrument(span)
            .await
    }

    fn prepare_lanes(&self, ranges: Vec<WorkRange>) -> Result<Vec<Lane>, WorkloadError> {
        let mut lanes = Vec::new();
        for (id, range) in ranges.into_iter().enumerate() {
            if range.is_empty() {
                continue;
            }
            lanes.push(Lane {
                id,
                range,
                generator: OperationMixGenerator::for_worker(
                    self.config.id_space_max,
                    self.config.seed,
                    id,
                )?,
                latency: LatencyRecorder::new()?,
            });
        }
        Ok(lanes)
    }

    async fn drive(
        &mut self,
        scenario: Scenario,
        run_id: Uuid,
        total_iterations: u64,
        lanes: Vec<Lane>,
        mut latency: LatencyRecorder,
    ) -> Result<RunSummary, WorkloadError> {
        self.set_phase(RunPhase::Provisioning);
        if let Err(e) = self.lifecycle.ensure_clean_table(&self.config.table).await {
            tracing::error!("provisioning failed, no workers launched: {}", e);
            self.set_phase(RunPhase::Failed);
            return Err(WorkloadError::Provisioning(e));
        }

        self.set_phase(RunPhase::Running);
        let progress = Arc::new(
            ProgressAggregator::new(
                scenario.operations_per_iteration(),
                self.config.reporting_interval_ops,
            )
            .with_sink(self.sample_sink.clone()),
        );
        let errors = Arc::new(ErrorCollector::new());
        let table: Arc<str> = Arc::from(self.config.table.name.as_str());

        let started = Instant::now();
        let mut workers = JoinSet::new();
        for lane in lanes {
            let worker = Worker {
                id: lane.id,
                range: lane.range,
                scenario,
                client: self.client.clone(),
                table: table.clone(),
                progress: progress.clone(),
                errors: errors.clone(),
                cancel: self.cancel.clone(),
                generator: lane.generator,
                latency: lane.latency,
            };
            workers.spawn(worker.run().in_current_span());
        }
        let launched = workers.len();
        tracing::info!(
            "launched {} workers for {} iterations",
            launched,
            total_iterations
        );

        self.set_phase(RunPhase::Draining);
        let mut worker_failures = 0;
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(outcome) => {
                    tracing::debug!(
                        worker = outcome.id,
                        completed = outcome.completed,
                        "worker finished"
                    );
                    latency.merge(&outcome.latency);
                }
                Err(e) => {
                    worker_failures += 1;
                    tracing::warn!("a worker task failed: {}", e);
                }
            }
        }
        let elapsed = started.elapsed();

        let state = progress.snapshot();
        let summary = RunSummary {
            run_id,
            scenario: scenario.name(),
            total_iterations,
            completed_iterations: state.completed_iterations,
            total_operations: state.completed_operations,
            elapsed,
            error_counts: errors.summary(),
            error_classes: errors.class_summary(),
            latency: latency.report(),
            workers: launched,
            worker_failures,
            cancelled: self.cancel.is_cancelled()
                && state.completed_iterations < total_iterations,
        };
        self.set_phase(RunPhase::Completed);

        tracing::info!(
            "finished {} iterations ({} operations) in {:.2} seconds, {} errors",
            summary.completed_iterations,
            summary.total_operations,
            summary.elapsed_seconds(),
            summary.error_counts.total()
        );
        Ok(summary)
    }
}

// per-worker state built before provisioning
struct Lane {
    id: usize,
    range: WorkRange,
    generator: OperationMixGenerator<StdRng>,
    latency: LatencyRecorder,
}

struct WorkerOutcome {
    id: usize,
    completed: u64,
    latency: LatencyRecorder,
}

struct Worker {
    id: usize,
    range: WorkRange,
    scenario: Scenario,
    client: Arc<dyn StoreClient>,
    table: Arc<str>,
    progress: Arc<ProgressAggregator>,
    errors: Arc<ErrorCollector>,
    cancel: CancellationToken,
    generator: OperationMixGenerator<StdRng>,
    latency: LatencyRecorder,
}

impl Worker {
    async fn run(mut self) -> WorkerOutcome {
        tracing::debug!(
            worker = self.id,
            start = self.range.start,
            end = self.range.end,
            "worker started"
        );
        let mut completed = 0;
        for index in self.range.indices() {
            if self.cancel.is_cancelled() {
                tracing::debug!(worker = self.id, index, "cancelled, stopping");
                break;
            }
            match self.scenario {
                Scenario::Mixed => self.mixed_iteration().await,
                Scenario::Load => self.load_iteration(index).await,
            }
            // counts the iteration whether or not its requests succeeded
            self.progress.record_completion(1);
            completed += 1;
        }

        WorkerOutcome {
            id: self.id,
            completed,
            latency: self.latency,
        }
    }

    async fn mixed_iteration(&mut self) {
        let unit = self.generator.next_unit();

        let (key, data) = unit.put;
        let started = Instant::now();
        let result = self.client.put(&self.table, key, data).await;
        self.settle(OperationKind::Put, key, started, result);

        let key = unit.get;
        let started = Instant::now();
        let result = self.client.get(&self.table, key).await.map(|_| ());
        self.settle(OperationKind::Get, key, started, result);

        let (key, data) = unit.update;
        let started = Instant::now();
        let result = self.client.update(&self.table, key, data).await;
        self.settle(OperationKind::Update, key, started, result);

        let key = unit.delete;
        let started = Instant::now();
        let result = self.client.delete(&self.table, key).await;
        self.settle(OperationKind::Delete, key, started, result);
    }

    async fn load_iteration(&mut self, index: u64) {
        let Item { key, data } = Item::seeded(ItemKey(index));
        let started = Instant::now();
        let result = self.client.put(&self.table, key, data).await;
        self.settle(OperationKind::Put, key, started, result);
    }

    // failures become records; the iteration carries on either way
    fn settle(
        &mut self,
        kind: OperationKind,
        key: ItemKey,
        started: Instant,
        result: Result<(), StoreError>,
    ) {
        self.latency.record(kind, started.elapsed());
        if let Err(error) = result {
            self.errors
                .record(ErrorRecord::new(kind, key, &error).on_worker(self.id));
        }
    }
}
