//! Execution engine.
//!
//! Runs an [`ExecutionPlan`] against the check provider: bounded per-check
//! waits, retry-on-transient-failure, concurrent stage dispatch, cascade
//! short-circuiting, and the roll-up of check results into one finding per
//! declared agent. The engine always drives a plan to a full result set —
//! skipped checks are synthesized, never silently dropped — because the
//! aggregator needs complete coverage for explainability.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use tokio::time::timeout;

use underwriter_core::{
    AgentFinding, CheckProvider, CheckResult, CheckStatus, CreditApplication, EngineError,
    FindingStatus, ProviderError,
};
use underwriter_rules::{CheckSpec, ExecutionConfig, StructuredRule};

use crate::planner::ExecutionPlan;

/// Everything the executor learned about one rule for one application.
#[derive(Debug)]
pub struct RuleEvaluation {
    pub rule: Arc<StructuredRule>,
    /// Terminal results for every planned check, in canonical order.
    pub check_results: Vec<CheckResult>,
    /// One finding per declared agent, in `required_agents` order.
    pub findings: Vec<AgentFinding>,
    /// Set when the provider broke its contract under this rule. The rule is
    /// then judged FAIL with this reason; other rules are unaffected.
    pub contract_violation: Option<String>,
}

impl RuleEvaluation {
    /// Result for a named check, if it was planned.
    pub fn result_for(&self, check_name: &str) -> Option<&CheckResult> {
        self.check_results.iter().find(|r| r.check_name == check_name)
    }
}

/// Executes plans against the check provider.
///
/// Holds no mutable state: each `execute` call owns its own results, so one
/// engine is safely shared across concurrent evaluations.
pub struct ExecutionEngine {
    provider: Arc<dyn CheckProvider>,
}

impl ExecutionEngine {
    pub fn new(provider: Arc<dyn CheckProvider>) -> Self {
        Self { provider }
    }

    /// Run a plan to completion. Never errors: transient provider failures
    /// become `CheckStatus::Error` results and contract violations are
    /// captured on the returned evaluation.
    pub async fn execute(
        &self,
        plan: &ExecutionPlan,
        application: &CreditApplication,
    ) -> RuleEvaluation {
        let rule = &plan.rule;
        let config = &rule.execution_config;
        let mut results: Vec<CheckResult> = Vec::with_capacity(rule.checks.len());
        let mut violation: Option<String> = None;
        let mut skipping = false;

        for stage in &plan.stages {
            if skipping || violation.is_some() {
                let reason = if violation.is_some() {
                    "provider contract violation"
                } else {
                    "upstream stage failed"
                };
                for spec in &stage.checks {
                    results.push(skipped_result(spec, reason));
                }
                continue;
            }

            let stage_results = if stage.parallel {
                let futures = stage
                    .checks
                    .iter()
                    .map(|spec| self.run_with_retry(spec, config, application));
                // All checks are dispatched together and the stage waits out
                // every unit; there is no first-failure cancellation.
                join_all(futures).await
            } else {
                let mut out = Vec::with_capacity(stage.checks.len());
                for spec in &stage.checks {
                    out.push(self.run_with_retry(spec, config, application).await);
                }
                out
            };

            for (spec, outcome) in stage.checks.iter().zip(stage_results) {
                match outcome {
                    Ok(result) => results.push(result),
                    Err(err) => {
                        tracing::error!(rule = %rule.name, check = %spec.name, %err, "provider contract violation");
                        let message = err.to_string();
                        if violation.is_none() {
                            violation = Some(message.clone());
                        }
                        results.push(
                            CheckResult::new(&spec.name, &spec.agent, CheckStatus::Error, 0.0)
                                .with_detail("contract_violation", message),
                        );
                    }
                }
            }

            if stage.short_circuit && !stage_passed(stage.checks.iter(), &results) {
                tracing::info!(
                    rule = %rule.name,
                    agent = stage.agent.as_deref().unwrap_or("-"),
                    "cascade stage failed, skipping downstream stages"
                );
                skipping = true;
            }
        }

        let findings = roll_up_findings(rule, &results);
        RuleEvaluation {
            rule: Arc::clone(rule),
            check_results: results,
            findings,
            contract_violation: violation,
        }
    }

    /// Run one check, retrying exactly once on a transient failure when the
    /// rule asks for it. A semantic FAIL is terminal and never retried.
    async fn run_with_retry(
        &self,
        spec: &CheckSpec,
        config: &ExecutionConfig,
        application: &CreditApplication,
    ) -> Result<CheckResult, EngineError> {
        let mut result = self.attempt(spec, config, application).await?;
        if config.retry_on_failure && result.status == CheckStatus::Error {
            tracing::warn!(check = %spec.name, "transient check failure, retrying once");
            result = self.attempt(spec, config, application).await?;
        }
        Ok(result)
    }

    /// One bounded provider call. `Err` is always a contract violation.
    async fn attempt(
        &self,
        spec: &CheckSpec,
        config: &ExecutionConfig,
        application: &CreditApplication,
    ) -> Result<CheckResult, EngineError> {
        let deadline = Duration::from_secs(config.timeout_seconds);
        let call = self
            .provider
            .run_check(&spec.name, &spec.agent, application);

        match timeout(deadline, call).await {
            Err(_elapsed) => Ok(error_result(
                spec,
                format!("timed out after {}s", config.timeout_seconds),
            )),
            Ok(Err(ProviderError::Timeout(_))) => Ok(error_result(spec, "provider timeout")),
            Ok(Err(ProviderError::Data { message, .. })) => {
                // Aggregated like a timeout, logged distinctly.
                tracing::warn!(check = %spec.name, %message, "malformed provider response");
                Ok(error_result(spec, format!("malformed response: {message}")))
            }
            Ok(Err(ProviderError::Configuration(message))) => {
                Err(EngineError::ContractViolation {
                    check: spec.name.clone(),
                    message,
                })
            }
            Ok(Ok(result)) => {
                if !(0.0..=1.0).contains(&result.confidence) {
                    return Err(EngineError::ContractViolation {
                        check: spec.name.clone(),
                        message: format!("confidence {} out of range", result.confidence),
                    });
                }
                if result.check_name != spec.name {
                    return Err(EngineError::ContractViolation {
                        check: spec.name.clone(),
                        message: format!(
                            "provider answered check '{}' instead",
                            result.check_name
                        ),
                    });
                }
                Ok(result)
            }
        }
    }
}

fn error_result(spec: &CheckSpec, reason: impl Into<String>) -> CheckResult {
    CheckResult::new(&spec.name, &spec.agent, CheckStatus::Error, 0.0)
        .with_detail("error", reason.into())
}

fn skipped_result(spec: &CheckSpec, reason: &str) -> CheckResult {
    CheckResult::new(&spec.name, &spec.agent, CheckStatus::Review, 0.0)
        .with_detail("skipped", format!("skipped: {reason}"))
}

/// Short-circuit predicate: every required check in the stage passed.
fn stage_passed<'a>(
    specs: impl Iterator<Item = &'a CheckSpec>,
    results: &[CheckResult],
) -> bool {
    specs.filter(|s| s.required).all(|spec| {
        results
            .iter()
            .find(|r| r.check_name == spec.name)
            .map(CheckResult::passed)
            .unwrap_or(false)
    })
}

/// Roll per-check results into one finding per declared agent.
///
/// FAIL if any required check is FAIL or ERROR (post-retry); REVIEW if the
/// required checks all passed but anything else is FAIL/REVIEW/ERROR; PASS
/// otherwise. A declared agent with zero checks yields a trivial PASS
/// finding so coverage stays complete.
fn roll_up_findings(rule: &StructuredRule, results: &[CheckResult]) -> Vec<AgentFinding> {
    rule.required_agents
        .iter()
        .map(|agent| {
            let agent_results: Vec<CheckResult> = results
                .iter()
                .filter(|r| r.agent == *agent)
                .cloned()
                .collect();

            let required_bad = agent_results.iter().any(|r| {
                matches!(r.status, CheckStatus::Fail | CheckStatus::Error)
                    && is_required(rule, &r.check_name)
            });
            let any_nonpass = agent_results.iter().any(|r| r.status != CheckStatus::Pass);

            let overall_status = if required_bad {
                FindingStatus::Fail
            } else if any_nonpass {
                FindingStatus::Review
            } else {
                FindingStatus::Pass
            };

            let confidence = agent_results
                .iter()
                .map(|r| r.confidence)
                .fold(f64::INFINITY, f64::min);
            let confidence = if confidence.is_finite() { confidence } else { 1.0 };

            AgentFinding {
                agent_name: agent.clone(),
                overall_status,
                risk_level: rule.risk_level,
                confidence,
                check_results: agent_results,
                details: serde_json::Map::new(),
                timestamp: Utc::now(),
            }
        })
        .collect()
}

fn is_required(rule: &StructuredRule, check_name: &str) -> bool {
    rule.checks
        .iter()
        .find(|c| c.name == check_name)
        .map(|c| c.required)
        .unwrap_or(false)
}
