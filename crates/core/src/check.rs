//! Check results as returned by check providers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Terminal status of a single check.
///
/// `Error` means the provider itself could not complete (timeout, transport
/// failure, malformed response) and is distinct from a semantic `Fail` — only
/// `Error` is eligible for retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckStatus {
    Pass,
    Fail,
    Review,
    Error,
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pass => "PASS",
            Self::Fail => "FAIL",
            Self::Review => "REVIEW",
            Self::Error => "ERROR",
        };
        write!(f, "{}", s)
    }
}

/// Result of one check, produced by a [`CheckProvider`](crate::CheckProvider)
/// or synthesized by the engine (timeouts, cascade skips).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResult {
    /// Name of the check this result answers.
    pub check_name: String,
    /// Agent group the check belongs to.
    pub agent: String,
    /// Terminal status.
    pub status: CheckStatus,
    /// Confidence in the result, within [0, 1].
    pub confidence: f64,
    /// Provider-specific detail payload. Opaque to the engine except for the
    /// documented `dti_ratio` key consumed by the DTI approval predicate.
    #[serde(default)]
    pub details: Map<String, Value>,
    /// When the result was produced.
    pub timestamp: DateTime<Utc>,
}

impl CheckResult {
    /// Build a result with an empty detail payload.
    pub fn new(
        check_name: impl Into<String>,
        agent: impl Into<String>,
        status: CheckStatus,
        confidence: f64,
    ) -> Self {
        Self {
            check_name: check_name.into(),
            agent: agent.into(),
            status,
            confidence,
            details: Map::new(),
            timestamp: Utc::now(),
        }
    }

    /// Attach a detail entry.
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    /// Numeric DTI outcome carried by this result, if any.
    pub fn dti_ratio(&self) -> Option<f64> {
        self.details.get("dti_ratio").and_then(Value::as_f64)
    }

    pub fn passed(&self) -> bool {
        self.status == CheckStatus::Pass
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_serde() {
        let json = serde_json::to_string(&CheckStatus::Error).unwrap();
        assert_eq!(json, "\"ERROR\"");
        let back: CheckStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, CheckStatus::Error);
    }

    #[test]
    fn dti_ratio_reads_numeric_detail() {
        let result = CheckResult::new("dti_calculation", "income", CheckStatus::Pass, 0.9)
            .with_detail("dti_ratio", 0.38);
        assert_eq!(result.dti_ratio(), Some(0.38));
    }

    #[test]
    fn dti_ratio_ignores_non_numeric_detail() {
        let result = CheckResult::new("dti_calculation", "income", CheckStatus::Pass, 0.9)
            .with_detail("dti_ratio", "high");
        assert_eq!(result.dti_ratio(), None);
    }
}
