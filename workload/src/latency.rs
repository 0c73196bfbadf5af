use std::{fmt, time::Duration};

use hdrhistogram::{CreationError, Histogram};
use item::OperationKind;

const SIGNIFICANT_FIGURES: u8 = 3;

/// Per-worker latency histograms, one per operation kind, in microseconds.
/// Each worker owns one; they are merged after the workers finish.
#[derive(Debug, Clone)]
pub struct LatencyRecorder {
    histograms: [Histogram<u64>; 4],
}

impl LatencyRecorder {
    pub fn new() -> Result<Self, CreationError> {
        Ok(Self {
            histograms: [
                Histogram::new(SIGNIFICANT_FIGURES)?,
                Histogram::new(SIGNIFICANT_FIGURES)?,
                Histogram::new(SIGNIFICANT_FIGURES)?,
                Histogram::new(SIGNIFICANT_FIGURES)?,
            ],
        })
    }

    pub fn record(&mut self, kind: OperationKind, latency: Duration) {
        let micros = u64::try_from(latency.as_micros()).unwrap_or(u64::MAX);
        self.histograms[kind.index()].saturating_record(micros);
    }

    pub fn merge(&mut self, other: &LatencyRecorder) {
        for (mine, theirs) in self.histograms.iter_mut().zip(other.histograms.iter()) {
            if let Err(e) = mine.add(theirs) {
                tracing::warn!("dropping latency samples while merging: {}", e);
            }
        }
    }

    pub fn report(&self) -> LatencyReport {
        let mut report = LatencyReport::default();
        for kind in OperationKind::ALL {
            let histogram = &self.histograms[kind.index()];
            if histogram.is_empty() {
                continue;
            }
            report.0[kind.index()] = Some(OperationLatency {
                count: histogram.len(),
                mean: Duration::from_micros(histogram.mean() as u64),
                p50: Duration::from_micros(histogram.value_at_quantile(0.50)),
                p99: Duration::from_micros(histogram.value_at_quantile(0.99)),
                max: Duration::from_micros(histogram.max()),
            });
        }
        report
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationLatency {
    pub count: u64,
    pub mean: Duration,
    pub p50: Duration,
    pub p99: Duration,
    pub max: Duration,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LatencyReport([Option<OperationLatency>; 4]);

impl LatencyReport {
    pub fn get(&self, kind: OperationKind) -> Option<&OperationLatency> {
        self.0[kind.index()].as_ref()
    }
}

impl fmt::Display for LatencyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for kind in OperationKind::ALL {
            if let Some(l) = self.get(kind) {
                writeln!(
                    f,
                    "{:<7} n={:<9} mean={:?} p50={:?} p99={:?} max={:?}",
                    kind.as_str().to_uppercase(),
                    l.count,
                    l.mean,
                    l.p50,
                    l.p99,
                    l.max
                )?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_and_report() -> Result<(), CreationError> {
        let mut a = LatencyRecorder::new()?;
        let mut b = LatencyRecorder::new()?;
        for ms in 1..=100 {
            a.record(OperationKind::Put, Duration::from_millis(ms));
        }
        b.record(OperationKind::Put, Duration::from_millis(500));
        b.record(OperationKind::Get, Duration::from_micros(250));

        a.merge(&b);
        let report = a.report();

        let put = report.get(OperationKind::Put).copied();
        assert_eq!(put.map(|p| p.count), Some(101));
        assert!(put.is_some_and(|p| p.max >= Duration::from_millis(499)));
        assert!(put.is_some_and(|p| p.p50 <= Duration::from_millis(52)));

        assert_eq!(report.get(OperationKind::Get).map(|g| g.count), Some(1));
        assert!(report.get(OperationKind::Update).is_none());
        assert!(report.get(OperationKind::Delete).is_none());
        Ok(())
    }

    #[test]
    fn test_display_lists_recorded_kinds_only() -> Result<(), CreationError> {
        let mut recorder = LatencyRecorder::new()?;
        recorder.record(OperationKind::Delete, Duration::from_millis(3));
        let text = recorder.report().to_string();
        assert!(text.starts_with("DELETE"));
        assert_eq!(text.lines().count(), 1);
        Ok(())
    }
}
