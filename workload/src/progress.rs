use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::{Duration, Instant},
};

use tokio::sync::mpsc::UnboundedSender;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThroughputSample {
    pub completed_operations: u64,
    pub elapsed: Duration,
    pub ops_per_sec: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct ProgressState {
    pub completed_iterations: u64,
    pub completed_operations: u64,
    pub start_time: Instant,
    pub elapsed: Duration,
}

/// Shared completion counter. Workers report iterations; reporting happens in
/// operations (iterations * operations per iteration).
#[derive(Debug)]
pub struct ProgressAggregator {
    completed: AtomicU64,
    samples: AtomicU64,
    ops_per_iteration: u64,
    reporting_interval_ops: u64,
    start_time: Instant,
    sink: Option<UnboundedSender<ThroughputSample>>,
}

impl ProgressAggregator {
    pub fn new(ops_per_iteration: u64, reporting_interval_ops: u64) -> Self {
        Self {
            completed: AtomicU64::new(0),
            samples: AtomicU64::new(0),
            ops_per_iteration: ops_per_iteration.max(1),
            reporting_interval_ops: reporting_interval_ops.max(1),
            start_time: Instant::now(),
            sink: None,
        }
    }

    pub fn with_sink(mut self, sink: Option<UnboundedSender<ThroughputSample>>) -> Self {
        self.sink = sink;
        self
    }

    pub fn record_completion(&self, count: u64) {
        if count == 0 {
            return;
        }
        let before = self.completed.fetch_add(count, Ordering::Relaxed);
        let before_ops = before.saturating_mul(self.ops_per_iteration);
        let after_ops = (before + count).saturating_mul(self.ops_per_iteration);

        // at most one sample per call, even if several thresholds were crossed
        if after_ops / self.reporting_interval_ops > before_ops / self.reporting_interval_ops {
            self.emit(after_ops);
        }
    }

    fn emit(&self, completed_operations: u64) {
        let elapsed = self.start_time.elapsed();
        let ops_per_sec = completed_operations as f64 / elapsed.as_secs_f64().max(f64::EPSILON);
        let sample = ThroughputSample {
            completed_operations,
            elapsed,
            ops_per_sec,
        };
        self.samples.fetch_add(1, Ordering::Relaxed);

        tracing::info!(
            completed_operations,
            ops_per_sec,
            "{} operations completed in {:.2} seconds",
            completed_operations,
            elapsed.as_secs_f64()
        );
        if let Some(sink) = &self.sink {
            // the receiver may have gone away; progress must not care
            let _ = sink.send(sample);
        }
    }

    pub fn samples_emitted(&self) -> u64 {
        self.samples.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> ProgressState {
        let completed_iterations = self.completed.load(Ordering::Acquire);
        ProgressState {
            completed_iterations,
            completed_operations: completed_iterations.saturating_mul(self.ops_per_iteration),
            start_time: self.start_time,
            elapsed: self.start_time.elapsed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::sync::mpsc;

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_concurrent_completions_are_not_lost() {
        let workers = 50;
        let per_worker = 200;
        let progress = Arc::new(ProgressAggregator::new(4, 1000));

        let mut handles = Vec::new();
        for _ in 0..workers {
            let progress = progress.clone();
            handles.push(tokio::spawn(async move {
                for _ in 0..per_worker {
                    progress.record_completion(1);
                    tokio::task::yield_now().await;
                }
            }));
        }
        for handle in handles {
            assert!(handle.await.is_ok());
        }

        let state = progress.snapshot();
        assert_eq!(state.completed_iterations, 10_000);
        assert_eq!(state.completed_operations, 40_000);
    }

    #[test]
    fn test_samples_on_threshold_crossings() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let progress = ProgressAggregator::new(4, 1000).with_sink(Some(tx));

        // 4 ops per iteration: thresholds at 250, 500, 750 iterations
        for _ in 0..800 {
            progress.record_completion(1);
        }

        let mut reported = Vec::new();
        while let Ok(sample) = rx.try_recv() {
            reported.push(sample.completed_operations);
        }
        assert_eq!(reported, vec![1000, 2000, 3000]);
        assert_eq!(progress.samples_emitted(), 3);
    }

    #[test]
    fn test_batch_crossing_several_thresholds_emits_once() {
        let progress = ProgressAggregator::new(1, 10);
        progress.record_completion(35);
        assert_eq!(progress.samples_emitted(), 1);
        progress.record_completion(0);
        assert_eq!(progress.snapshot().completed_iterations, 35);
    }

    #[test]
    fn test_dropped_sink_is_harmless() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let progress = ProgressAggregator::new(1, 1).with_sink(Some(tx));
        progress.record_completion(3);
        assert_eq!(progress.snapshot().completed_operations, 3);
    }
}
