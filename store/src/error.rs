use std::{fmt, str::FromStr, time::Duration};

use thiserror::Error;

/// Coarse classification of a failed store request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StoreErrorKind {
    Throttled,
    Timeout,
    NotFound,
    Unavailable,
    Other,
}

impl StoreErrorKind {
    pub const ALL: [StoreErrorKind; 5] = [
        StoreErrorKind::Throttled,
        StoreErrorKind::Timeout,
        StoreErrorKind::NotFound,
        StoreErrorKind::Unavailable,
        StoreErrorKind::Other,
    ];

    pub fn index(self) -> usize {
        match self {
            StoreErrorKind::Throttled => 0,
            StoreErrorKind::Timeout => 1,
            StoreErrorKind::NotFound => 2,
            StoreErrorKind::Unavailable => 3,
            StoreErrorKind::Other => 4,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StoreErrorKind::Throttled => "throttled",
            StoreErrorKind::Timeout => "timeout",
            StoreErrorKind::NotFound => "not_found",
            StoreErrorKind::Unavailable => "unavailable",
            StoreErrorKind::Other => "other",
        }
    }
}

impl fmt::Display for StoreErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StoreErrorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "throttled" | "throttle" => Ok(StoreErrorKind::Throttled),
            "timeout" => Ok(StoreErrorKind::Timeout),
            "not_found" | "notfound" => Ok(StoreErrorKind::NotFound),
            "unavailable" => Ok(StoreErrorKind::Unavailable),
            "other" => Ok(StoreErrorKind::Other),
            _ => Err(format!("unknown store error kind: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("request throttled: {0}")]
    Throttled(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("service unavailable: {0}")]
    Unavailable(String),

    #[error("store error: {0}")]
    Other(String),
}

impl StoreError {
    pub fn kind(&self) -> StoreErrorKind {
        match self {
            StoreError::Throttled(_) => StoreErrorKind::Throttled,
            StoreError::Timeout(_) => StoreErrorKind::Timeout,
            StoreError::NotFound(_) => StoreErrorKind::NotFound,
            StoreError::Unavailable(_) => StoreErrorKind::Unavailable,
            StoreError::Other(_) => StoreErrorKind::Other,
        }
    }

    /// Errors a transport-level retry can reasonably expect to clear.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            StoreErrorKind::Throttled | StoreErrorKind::Timeout | StoreErrorKind::Unavailable
        )
    }

    /// Builds an error of the given class, e.g. for fault injection.
    pub fn synthetic(kind: StoreErrorKind, message: impl Into<String>) -> Self {
        let message = message.into();
        match kind {
            StoreErrorKind::Throttled => StoreError::Throttled(message),
            StoreErrorKind::Timeout => StoreError::Timeout(Duration::ZERO),
            StoreErrorKind::NotFound => StoreError::NotFound(message),
            StoreErrorKind::Unavailable => StoreError::Unavailable(message),
            StoreErrorKind::Other => StoreError::Other(message),
        }
    }
}

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("store error while provisioning table {table}: {source}")]
    Store {
        table: String,
        #[source]
        source: StoreError,
    },

    #[error("timed out after {waited:?} waiting for table {table} to become {target}")]
    WaitTimeout {
        table: String,
        target: &'static str,
        waited: Duration,
    },

    #[error("invalid table spec: {0}")]
    InvalidSpec(String),
}

impl ProvisionError {
    pub fn store(table: &str, source: StoreError) -> Self {
        ProvisionError::Store {
            table: table.to_string(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_roundtrips_through_synthetic() {
        for kind in StoreErrorKind::ALL {
            assert_eq!(StoreError::synthetic(kind, "injected").kind(), kind);
        }
    }

    #[test]
    fn test_retryable_classes() {
        assert!(StoreError::Throttled("slow down".into()).is_retryable());
        assert!(StoreError::Timeout(Duration::from_secs(1)).is_retryable());
        assert!(StoreError::Unavailable("node down".into()).is_retryable());
        assert!(!StoreError::NotFound("test_table".into()).is_retryable());
        assert!(!StoreError::Other("validation".into()).is_retryable());
    }

    #[test]
    fn test_parse_kind() {
        assert_eq!("Not-Found".parse::<StoreErrorKind>(), Ok(StoreErrorKind::NotFound));
        assert_eq!("throttled".parse::<StoreErrorKind>(), Ok(StoreErrorKind::Throttled));
        assert!("boom".parse::<StoreErrorKind>().is_err());
    }
}
