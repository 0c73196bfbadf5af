use std::{fmt, str::FromStr};

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OperationKind {
    Put,
    Get,
    Update,
    Delete,
}

impl OperationKind {
    /// Order in which one iteration issues its sub-operations.
    pub const ALL: [OperationKind; 4] = [
        OperationKind::Put,
        OperationKind::Get,
        OperationKind::Update,
        OperationKind::Delete,
    ];

    pub fn index(self) -> usize {
        match self {
            OperationKind::Put => 0,
            OperationKind::Get => 1,
            OperationKind::Update => 2,
            OperationKind::Delete => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OperationKind::Put => "put",
            OperationKind::Get => "get",
            OperationKind::Update => "update",
            OperationKind::Delete => "delete",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown operation kind: {0}")]
pub struct ParseOperationKindError(pub String);

impl FromStr for OperationKind {
    type Err = ParseOperationKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "put" | "p" => Ok(OperationKind::Put),
            "get" | "g" => Ok(OperationKind::Get),
            "update" | "u" => Ok(OperationKind::Update),
            "delete" | "d" => Ok(OperationKind::Delete),
            _ => Err(ParseOperationKindError(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_follows_issue_order() {
        for (idx, kind) in OperationKind::ALL.iter().enumerate() {
            assert_eq!(kind.index(), idx);
        }
    }

    #[test]
    fn test_parse_kinds() {
        assert_eq!("GET".parse::<OperationKind>(), Ok(OperationKind::Get));
        assert_eq!("d".parse::<OperationKind>(), Ok(OperationKind::Delete));
        assert!("scan".parse::<OperationKind>().is_err());
    }
}
