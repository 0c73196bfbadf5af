use std::ops::Range;

use crate::error::WorkloadError;

/// Upper bound on the worker count accepted by [`partition`].
pub const MAX_WORKERS: usize = 1 << 16;

/// Half-open slice `[start, end)` of the 1-based iteration indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkRange {
    pub start: u64,
    pub end: u64,
}

impl WorkRange {
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn indices(&self) -> Range<u64> {
        self.start..self.end
    }
}

/// Splits `[1, total]` into `workers` contiguous ranges. The first
/// `total % workers` ranges carry one extra index; with fewer indices than
/// workers the trailing ranges are empty.
///
/// `total` must leave room for the exclusive end `total + 1`, so `u64::MAX`
/// is rejected, as is a worker count above [`MAX_WORKERS`].
pub fn partition(total: u64, workers: usize) -> Result<Vec<WorkRange>, WorkloadError> {
    if total == 0 {
        return Err(WorkloadError::InvalidArgument(
            "total iterations must be positive".into(),
        ));
    }
    if workers == 0 {
        return Err(WorkloadError::InvalidArgument(
            "worker count must be positive".into(),
        ));
    }
    if total == u64::MAX {
        return Err(WorkloadError::InvalidArgument(format!(
            "total iterations must be below {}",
            u64::MAX
        )));
    }
    if workers > MAX_WORKERS {
        return Err(WorkloadError::InvalidArgument(format!(
            "worker count {} exceeds the maximum of {}",
            workers, MAX_WORKERS
        )));
    }

    let base = total / workers as u64;
    let remainder = total % workers as u64;

    let mut ranges = Vec::with_capacity(workers);
    let mut start = 1;
    for worker in 0..workers as u64 {
        let len = if worker < remainder { base + 1 } else { base };
        ranges.push(WorkRange {
            start,
            end: start + len,
        });
        start += len;
    }
    Ok(ranges)
}
