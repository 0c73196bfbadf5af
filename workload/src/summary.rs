use std::{fmt, time::Duration};

use uuid::Uuid;

use crate::{
    collector::{ErrorClassCounts, ErrorCounts},
    latency::LatencyReport,
};

/// Outcome of one run. Built once after the workers drain.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub scenario: &'static str,
    /// Iterations asked for.
    pub total_iterations: u64,
    /// Iterations that finished, failed sub-operations included.
    pub completed_iterations: u64,
    pub total_operations: u64,
    pub elapsed: Duration,
    pub error_counts: ErrorCounts,
    pub error_classes: ErrorClassCounts,
    pub latency: LatencyReport,
    pub workers: usize,
    pub worker_failures: usize,
    pub cancelled: bool,
}

impl RunSummary {
    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }

    /// Operations per second over the whole run.
    pub fn throughput(&self) -> f64 {
        self.total_operations as f64 / self.elapsed_seconds().max(f64::EPSILON)
    }

    pub fn error_rate(&self) -> f64 {
        if self.total_operations == 0 {
            return 0.0;
        }
        self.error_counts.total() as f64 / self.total_operations as f64
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "\n=== Workload Summary ===")?;
        writeln!(f, "Run:                    {} ({})", self.run_id, self.scenario)?;
        writeln!(
            f,
            "Iterations:             {} / {}{}",
            self.completed_iterations,
            self.total_iterations,
            if self.cancelled { " (cancelled)" } else { "" }
        )?;
        writeln!(f, "Operations:             {}", self.total_operations)?;
        writeln!(f, "Elapsed:                {:.2} seconds", self.elapsed_seconds())?;
        writeln!(f, "Throughput:             {:.1} ops/s", self.throughput())?;
        writeln!(f, "Workers:                {}", self.workers)?;
        if self.worker_failures > 0 {
            writeln!(f, "Failed workers:         {}", self.worker_failures)?;
        }
        for (kind, count) in self.error_counts.iter() {
            writeln!(f, "{:<7} errors:         {}", kind.as_str().to_uppercase(), count)?;
        }
        let classes: Vec<String> = self
            .error_classes
            .iter()
            .filter(|(_, count)| *count > 0)
            .map(|(class, count)| format!("{}={}", class, count))
            .collect();
        if !classes.is_empty() {
            writeln!(f, "Error classes:          {}", classes.join(", "))?;
        }
        write!(f, "{}", self.latency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(total_operations: u64, elapsed: Duration) -> RunSummary {
        RunSummary {
            run_id: Uuid::nil(),
            scenario: "mixed",
            total_iterations: total_operations / 4,
            completed_iterations: total_operations / 4,
            total_operations,
            elapsed,
            error_counts: ErrorCounts::default(),
            error_classes: ErrorClassCounts::default(),
            latency: LatencyReport::default(),
            workers: 4,
            worker_failures: 0,
            cancelled: false,
        }
    }

    #[test]
    fn test_throughput() {
        let s = summary(400, Duration::from_secs(2));
        assert_eq!(s.throughput(), 200.0);
        assert_eq!(s.error_rate(), 0.0);
    }

    #[test]
    fn test_zero_elapsed_still_positive() {
        let s = summary(400, Duration::ZERO);
        assert!(s.throughput() > 0.0);
        assert!(s.throughput().is_finite());
    }

    #[test]
    fn test_report_layout() {
        let text = summary(400, Duration::from_secs(1)).to_string();
        assert!(text.contains("=== Workload Summary ==="));
        assert!(text.contains("Operations:             400"));
        assert!(text.contains("GET     errors:         0"));
        assert!(!text.contains("Failed workers"));
    }
}
