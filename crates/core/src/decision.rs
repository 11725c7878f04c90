//! Agent findings and the final underwriting decision.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::time::Duration;

use crate::check::{CheckResult, CheckStatus};

/// Risk level attached to rules and findings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        };
        write!(f, "{}", s)
    }
}

/// Synthesized status of one agent's checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FindingStatus {
    Pass,
    Fail,
    Review,
}

impl FindingStatus {
    /// Severity ordering used when findings for the same agent are merged
    /// across rules: FAIL dominates REVIEW dominates PASS.
    pub fn worse(self, other: FindingStatus) -> FindingStatus {
        use FindingStatus::*;
        match (self, other) {
            (Fail, _) | (_, Fail) => Fail,
            (Review, _) | (_, Review) => Review,
            _ => Pass,
        }
    }
}

impl fmt::Display for FindingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pass => "PASS",
            Self::Fail => "FAIL",
            Self::Review => "REVIEW",
        };
        write!(f, "{}", s)
    }
}

/// One agent's synthesis over its own check results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentFinding {
    /// Agent that produced the finding.
    pub agent_name: String,
    /// Rolled-up status across the agent's checks.
    pub overall_status: FindingStatus,
    /// Risk level of the owning rule (max across rules after merging).
    pub risk_level: RiskLevel,
    /// Minimum confidence across the agent's check results.
    pub confidence: f64,
    /// Individual check results, in execution-plan order.
    pub check_results: Vec<CheckResult>,
    /// Free-form detail payload.
    #[serde(default)]
    pub details: Map<String, Value>,
    /// When the finding was synthesized.
    pub timestamp: DateTime<Utc>,
}

impl AgentFinding {
    /// True if any of the agent's checks ended in the given status.
    pub fn has_status(&self, status: CheckStatus) -> bool {
        self.check_results.iter().any(|r| r.status == status)
    }
}

/// Final decision for one application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionStatus {
    Approved,
    Denied,
    PendingReview,
}

impl fmt::Display for DecisionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Approved => "APPROVED",
            Self::Denied => "DENIED",
            Self::PendingReview => "PENDING_REVIEW",
        };
        write!(f, "{}", s)
    }
}

/// The underwriting decision returned by the orchestration facade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnderwritingDecision {
    /// Application the decision is for.
    pub application_id: String,
    /// Final decision.
    pub decision: DecisionStatus,
    /// Minimum confidence across all evaluated rules.
    pub confidence_score: f64,
    /// One finding per distinct agent touched, in first-touch order.
    pub findings: Vec<AgentFinding>,
    /// Deterministic one-line-per-rule explanation, in activation order.
    pub reasoning: String,
    /// Rules that were evaluated, in activation order.
    pub rules_applied: Vec<String>,
    /// Whether the decision requires a manual reviewer.
    pub requires_manual_review: bool,
    /// Wall-clock time the evaluation took.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_time: Option<Duration>,
    /// When the decision was produced.
    pub timestamp: DateTime<Utc>,
}

impl UnderwritingDecision {
    /// Findings with a specific status.
    pub fn findings_by_status(&self, status: FindingStatus) -> Vec<&AgentFinding> {
        self.findings
            .iter()
            .filter(|f| f.overall_status == status)
            .collect()
    }

    /// True if every finding passed.
    pub fn all_findings_passed(&self) -> bool {
        self.findings
            .iter()
            .all(|f| f.overall_status == FindingStatus::Pass)
    }

    /// True if any finding failed at CRITICAL risk.
    pub fn has_critical_failures(&self) -> bool {
        self.findings.iter().any(|f| {
            f.overall_status == FindingStatus::Fail && f.risk_level == RiskLevel::Critical
        })
    }
}
