use std::{fmt, str::FromStr};

use item::OperationKind;
use rand::Rng;
use thiserror::Error;

use crate::error::{StoreError, StoreErrorKind};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FaultParseError {
    #[error("expected <operation>:<error>:<rate>, got {0:?}")]
    Malformed(String),

    #[error("{0}")]
    UnknownOperation(String),

    #[error("{0}")]
    UnknownErrorKind(String),

    #[error("rate must be a number in [0, 1], got {0:?}")]
    InvalidRate(String),
}

/// Fails `rate` of the requests of one operation kind with a given error class.
#[derive(Debug, Clone, PartialEq)]
pub struct FaultRule {
    pub operation: OperationKind,
    pub error: StoreErrorKind,
    pub rate: f64,
}

impl FromStr for FaultRule {
    type Err = FaultParseError;

    /// `get:throttled:0.05`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        let [operation, error, rate] = parts.as_slice() else {
            return Err(FaultParseError::Malformed(s.to_string()));
        };

        let operation = operation
            .parse::<OperationKind>()
            .map_err(|e| FaultParseError::UnknownOperation(e.to_string()))?;
        let error = error
            .parse::<StoreErrorKind>()
            .map_err(FaultParseError::UnknownErrorKind)?;
        let rate = rate
            .parse::<f64>()
            .ok()
            .filter(|r| (0.0..=1.0).contains(r))
            .ok_or_else(|| FaultParseError::InvalidRate(rate.to_string()))?;

        Ok(FaultRule {
            operation,
            error,
            rate,
        })
    }
}

impl fmt::Display for FaultRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.operation, self.error, self.rate)
    }
}

#[derive(Debug, Clone, Default)]
pub struct FaultPlan {
    rules: Vec<FaultRule>,
}

impl FaultPlan {
    pub fn new(rules: Vec<FaultRule>) -> Self {
        Self { rules }
    }

    pub fn with_rule(mut self, rule: FaultRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn rules(&self) -> &[FaultRule] {
        &self.rules
    }

    /// First matching rule that fires wins.
    pub fn roll<R: Rng>(&self, operation: OperationKind, rng: &mut R) -> Option<StoreError> {
        self.rules
            .iter()
            .filter(|rule| rule.operation == operation)
            .find(|rule| rule.rate >= 1.0 || (rule.rate > 0.0 && rng.gen_bool(rule.rate)))
            .map(|rule| {
                StoreError::synthetic(rule.error, format!("injected {} fault", rule.operation))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};

    #[test]
    fn test_parse_rule() -> Result<(), FaultParseError> {
        let rule: FaultRule = "get:throttled:0.25".parse()?;
        assert_eq!(rule.operation, OperationKind::Get);
        assert_eq!(rule.error, StoreErrorKind::Throttled);
        assert_eq!(rule.rate, 0.25);
        assert_eq!(rule.to_string(), "get:throttled:0.25");
        Ok(())
    }

    #[test]
    fn test_parse_rejects_bad_rules() {
        assert!(matches!(
            "get:throttled".parse::<FaultRule>(),
            Err(FaultParseError::Malformed(_))
        ));
        assert!(matches!(
            "scan:timeout:0.1".parse::<FaultRule>(),
            Err(FaultParseError::UnknownOperation(_))
        ));
        assert!(matches!(
            "put:exploded:0.1".parse::<FaultRule>(),
            Err(FaultParseError::UnknownErrorKind(_))
        ));
        assert!(matches!(
            "put:timeout:1.5".parse::<FaultRule>(),
            Err(FaultParseError::InvalidRate(_))
        ));
    }

    #[test]
    fn test_roll_only_hits_matching_operation() -> Result<(), FaultParseError> {
        let plan = FaultPlan::default().with_rule("get:timeout:1".parse()?);
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..100 {
            let fired = plan.roll(OperationKind::Get, &mut rng);
            assert_eq!(fired.map(|e| e.kind()), Some(StoreErrorKind::Timeout));
            assert!(plan.roll(OperationKind::Put, &mut rng).is_none());
        }
        Ok(())
    }

    #[test]
    fn test_zero_rate_never_fires() -> Result<(), FaultParseError> {
        let plan = FaultPlan::new(vec!["delete:other:0".parse()?]);
        let mut rng = StdRng::seed_from_u64(1);
        assert!((0..1000).all(|_| plan.roll(OperationKind::Delete, &mut rng).is_none()));
        Ok(())
    }
}
