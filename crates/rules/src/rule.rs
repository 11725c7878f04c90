//! Rule model: checks, decision criteria, execution configuration.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use underwriter_core::{ConfigError, RiskLevel};

/// One atomic verification unit within a rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckSpec {
    /// Check name, unique within the rule (snake_case, e.g. "ofac_screening").
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Agent group that owns this check.
    pub agent: String,
    /// If true, inability to run the check is fatal to the rule, not merely
    /// a non-pass.
    #[serde(default = "default_true")]
    pub required: bool,
    /// If true, any non-pass result is an immediate, non-overridable fail
    /// for the whole application regardless of confidence.
    #[serde(default)]
    pub zero_tolerance: bool,
    /// Optional numeric bound whose semantics are owned by the check itself
    /// (e.g. a ratio ceiling).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
}

fn default_true() -> bool {
    true
}

/// How a rule's checks are executed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Run the rule's checks concurrently rather than in declared order.
    #[serde(default)]
    pub parallel: bool,
    /// Per-check upper bound on provider wait, in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
    /// Retry exactly once on a transient failure (never on a semantic FAIL).
    #[serde(default)]
    pub retry_on_failure: bool,
    /// If the rule spans multiple agents, run each agent's checks only if the
    /// prior agent's required checks all passed.
    #[serde(default)]
    pub cascade_mode: bool,
}

fn default_timeout() -> u64 {
    30
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            parallel: false,
            timeout_seconds: default_timeout(),
            retry_on_failure: false,
            cascade_mode: false,
        }
    }
}

/// Named approval predicate, closed set.
///
/// Unrecognized names fail at load time, never at decision time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalCondition {
    /// Every check under the rule is PASS.
    AllChecksPass,
    /// Every fraud-category check is PASS.
    NoFraudIndicators,
    /// The income checks are PASS and the DTI outcome is below the rule's
    /// `dti_threshold`.
    IncomeVerifiedAndDtiValid,
    /// Every agent finding touched by the rule is PASS.
    AllAgentsPass,
}

/// How a rule's check results combine into a verdict.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionCriteria {
    /// Approval predicate, evaluated after the zero-tolerance gate.
    pub approval_condition: ApprovalCondition,
    /// Aggregate confidence (minimum over required checks) must meet this
    /// for the rule to pass.
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,
    /// DTI ceiling, used only by income-shaped rules.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dti_threshold: Option<f64>,
    /// Check names whose failure vetoes approval unconditionally.
    #[serde(default)]
    pub zero_tolerance_checks: Vec<String>,
    /// Force the rule's verdict to REVIEW even on a clean pass.
    #[serde(default)]
    pub requires_manual_signoff: bool,
}

fn default_min_confidence() -> f64 {
    0.8
}

/// One named underwriting policy: checks, decision criteria, and execution
/// configuration. Immutable once loaded; identified by `name`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredRule {
    /// Unique rule name (e.g. "FRAUD_CHECK").
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Risk level of the rule.
    pub risk_level: RiskLevel,
    /// Agent identifiers in cascade/execution order. May include agents with
    /// zero checks (pure cascade markers).
    pub required_agents: Vec<String>,
    /// Checks in declaration order.
    #[serde(default)]
    pub checks: Vec<CheckSpec>,
    /// Verdict criteria.
    pub decision_criteria: DecisionCriteria,
    /// Execution configuration.
    #[serde(default)]
    pub execution_config: ExecutionConfig,
}

impl StructuredRule {
    /// Validate the rule. Runs at load time so a bad rule never reaches the
    /// execution engine.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.is_empty() {
            return Err(self.invalid("name", "must not be empty"));
        }
        if self.required_agents.is_empty() {
            return Err(self.invalid("required_agents", "must name at least one agent"));
        }

        let agents: BTreeSet<&str> = self.required_agents.iter().map(String::as_str).collect();
        let mut seen = BTreeSet::new();
        for check in &self.checks {
            if !agents.contains(check.agent.as_str()) {
                return Err(self.invalid(
                    "checks",
                    &format!(
                        "check '{}' references agent '{}' not in required_agents",
                        check.name, check.agent
                    ),
                ));
            }
            if !seen.insert(check.name.as_str()) {
                return Err(self.invalid(
                    "checks",
                    &format!("duplicate check name '{}'", check.name),
                ));
            }
            if let Some(threshold) = check.threshold {
                if threshold <= 0.0 {
                    return Err(self.invalid(
                        "checks",
                        &format!("check '{}' threshold must be positive", check.name),
                    ));
                }
            }
        }

        let criteria = &self.decision_criteria;
        if !(0.0..=1.0).contains(&criteria.min_confidence) {
            return Err(self.invalid("min_confidence", "must be within [0, 1]"));
        }
        if let Some(dti) = criteria.dti_threshold {
            if !(0.0..=1.0).contains(&dti) || dti == 0.0 {
                return Err(self.invalid("dti_threshold", "must be within (0, 1]"));
            }
        }
        for name in &criteria.zero_tolerance_checks {
            if !self.checks.iter().any(|c| &c.name == name) {
                return Err(self.invalid(
                    "zero_tolerance_checks",
                    &format!("references unknown check '{}'", name),
                ));
            }
        }
        if self.execution_config.timeout_seconds == 0 {
            return Err(self.invalid("timeout_seconds", "must be positive"));
        }

        Ok(())
    }

    /// Effective zero-tolerance set: the union of per-check `zero_tolerance`
    /// flags and `decision_criteria.zero_tolerance_checks`. The declaration
    /// on the check is authoritative even when the criteria list omits it.
    pub fn zero_tolerance_set(&self) -> BTreeSet<&str> {
        let mut set: BTreeSet<&str> = self
            .decision_criteria
            .zero_tolerance_checks
            .iter()
            .map(String::as_str)
            .collect();
        set.extend(
            self.checks
                .iter()
                .filter(|c| c.zero_tolerance)
                .map(|c| c.name.as_str()),
        );
        set
    }

    /// Checks owned by one agent, in declaration order.
    pub fn checks_for_agent(&self, agent: &str) -> Vec<&CheckSpec> {
        self.checks.iter().filter(|c| c.agent == agent).collect()
    }

    fn invalid(&self, field: &str, message: &str) -> ConfigError {
        ConfigError::InvalidRule {
            rule: self.name.clone(),
            field: field.to_string(),
            message: message.to_string(),
        }
    }
}
