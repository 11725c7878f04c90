//! Aggregator / decision engine.
//!
//! Judges each rule from its collected results (zero-tolerance gate, then
//! approval predicate, then confidence gate), combines the verdicts into one
//! decision for the application, and builds the deterministic reasoning
//! trace. Confidence aggregates by minimum throughout: the worst check
//! governs, a single weak signal is never masked by strong ones.

use std::fmt;

use chrono::Utc;

use underwriter_core::{
    AgentFinding, CheckResult, CheckStatus, CreditApplication, DecisionStatus, FindingStatus,
    UnderwritingDecision,
};
use underwriter_rules::ApprovalCondition;

use crate::executor::RuleEvaluation;

/// Per-rule verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleVerdict {
    Pass,
    Fail,
    Review,
}

impl fmt::Display for RuleVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pass => "PASS",
            Self::Fail => "FAIL",
            Self::Review => "REVIEW",
        };
        write!(f, "{}", s)
    }
}

/// One rule's judged outcome, with its one-line justification.
#[derive(Debug, Clone)]
pub struct RuleOutcome {
    pub rule_name: String,
    pub verdict: RuleVerdict,
    /// Minimum confidence over the rule's required checks.
    pub confidence: f64,
    pub reason: String,
}

/// Judge one rule's evaluation against its decision criteria.
pub fn judge_rule(eval: &RuleEvaluation, application: &CreditApplication) -> RuleOutcome {
    let rule = &eval.rule;
    let criteria = &rule.decision_criteria;

    // The violation message carries its own "provider contract violation on
    // check .." prefix from the engine error display.
    if let Some(message) = &eval.contract_violation {
        return RuleOutcome {
            rule_name: rule.name.clone(),
            verdict: RuleVerdict::Fail,
            confidence: 0.0,
            reason: message.clone(),
        };
    }

    let confidence = rule_confidence(eval);
    let outcome = |verdict, reason: String| RuleOutcome {
        rule_name: rule.name.clone(),
        verdict,
        confidence,
        reason,
    };

    // Zero-tolerance gate dominates every other signal.
    for name in rule.zero_tolerance_set() {
        if let Some(result) = eval.result_for(name) {
            if result.status != CheckStatus::Pass {
                return outcome(
                    RuleVerdict::Fail,
                    format!("zero-tolerance check '{}' returned {}", name, result.status),
                );
            }
        }
    }

    // Approval predicate, only once the zero-tolerance gate is clear.
    if let Err(reason) = approval_predicate(eval, application) {
        return outcome(RuleVerdict::Fail, reason);
    }

    // Confidence gate: predicate held, but the evidence may be too weak.
    if confidence < criteria.min_confidence {
        return outcome(
            RuleVerdict::Review,
            format!(
                "confidence {:.2} below required minimum {:.2}",
                confidence, criteria.min_confidence
            ),
        );
    }

    if criteria.requires_manual_signoff {
        return outcome(
            RuleVerdict::Review,
            "manual sign-off required by policy".to_string(),
        );
    }

    outcome(
        RuleVerdict::Pass,
        format!("all criteria satisfied at confidence {:.2}", confidence),
    )
}

/// Combine per-rule outcomes into the application's decision.
///
/// DENIED if any rule failed; PENDING_REVIEW if none failed but at least one
/// needs review; APPROVED only when every rule passed. Findings are
/// deduplicated per agent (worst status wins), in first-touch order.
pub fn decide(
    application: &CreditApplication,
    evaluations: &[RuleEvaluation],
) -> UnderwritingDecision {
    let outcomes: Vec<RuleOutcome> = evaluations
        .iter()
        .map(|eval| judge_rule(eval, application))
        .collect();

    let decision = if outcomes.iter().any(|o| o.verdict == RuleVerdict::Fail) {
        DecisionStatus::Denied
    } else if outcomes.iter().any(|o| o.verdict == RuleVerdict::Review) {
        DecisionStatus::PendingReview
    } else {
        DecisionStatus::Approved
    };

    let confidence_score = outcomes
        .iter()
        .map(|o| o.confidence)
        .fold(f64::INFINITY, f64::min);
    let confidence_score = if confidence_score.is_finite() {
        confidence_score
    } else {
        1.0
    };

    let reasoning = outcomes
        .iter()
        .map(|o| format!("{}: {} ({})", o.rule_name, o.verdict, o.reason))
        .collect::<Vec<_>>()
        .join("; ");

    tracing::info!(
        application = %application.application_id,
        decision = %decision,
        confidence = confidence_score,
        "underwriting decision"
    );

    UnderwritingDecision {
        application_id: application.application_id.clone(),
        decision,
        confidence_score,
        findings: merge_findings(evaluations),
        reasoning,
        rules_applied: outcomes.into_iter().map(|o| o.rule_name).collect(),
        requires_manual_review: decision == DecisionStatus::PendingReview,
        processing_time: None,
        timestamp: Utc::now(),
    }
}

/// Minimum confidence over the rule's required checks; over all checks when
/// the rule declares none as required; 1.0 for the degenerate no-check rule.
fn rule_confidence(eval: &RuleEvaluation) -> f64 {
    let required: Vec<&CheckResult> = eval
        .rule
        .checks
        .iter()
        .filter(|c| c.required)
        .filter_map(|c| eval.result_for(&c.name))
        .collect();

    let pool: Vec<&CheckResult> = if required.is_empty() {
        eval.check_results.iter().collect()
    } else {
        required
    };

    // Folding an empty pool yields +inf; the clamp turns that into 1.0.
    pool.iter()
        .map(|r| r.confidence)
        .fold(f64::INFINITY, f64::min)
        .min(1.0)
        .max(0.0)
}

/// Evaluate the rule's named approval predicate. `Err` carries the reason.
fn approval_predicate(
    eval: &RuleEvaluation,
    application: &CreditApplication,
) -> Result<(), String> {
    let rule = &eval.rule;
    match rule.decision_criteria.approval_condition {
        ApprovalCondition::AllChecksPass => {
            let failing: Vec<&str> = eval
                .check_results
                .iter()
                .filter(|r| !r.passed())
                .map(|r| r.check_name.as_str())
                .collect();
            if failing.is_empty() {
                Ok(())
            } else {
                Err(format!("checks did not pass: {}", failing.join(", ")))
            }
        }
        ApprovalCondition::NoFraudIndicators => {
            let failing: Vec<&str> = eval
                .check_results
                .iter()
                .filter(|r| r.agent == "fraud" && !r.passed())
                .map(|r| r.check_name.as_str())
                .collect();
            if failing.is_empty() {
                Ok(())
            } else {
                Err(format!("fraud indicators present: {}", failing.join(", ")))
            }
        }
        ApprovalCondition::IncomeVerifiedAndDtiValid => {
            let failing: Vec<&str> = eval
                .check_results
                .iter()
                .filter(|r| r.agent == "income" && !r.passed())
                .map(|r| r.check_name.as_str())
                .collect();
            if !failing.is_empty() {
                return Err(format!("income not verified: {}", failing.join(", ")));
            }
            if let Some(threshold) = rule.decision_criteria.dti_threshold {
                // Prefer the DTI outcome reported by a check; fall back to
                // the application's stated ratio.
                let dti = eval
                    .check_results
                    .iter()
                    .find_map(CheckResult::dti_ratio)
                    .or(application.dti_ratio);
                match dti {
                    Some(dti) if dti < threshold => Ok(()),
                    Some(dti) => Err(format!(
                        "DTI {:.3} at or above threshold {:.3}",
                        dti, threshold
                    )),
                    None => Err("no DTI outcome available to verify".to_string()),
                }
            } else {
                Ok(())
            }
        }
        ApprovalCondition::AllAgentsPass => {
            let failing: Vec<&str> = eval
                .findings
                .iter()
                .filter(|f| f.overall_status != FindingStatus::Pass)
                .map(|f| f.agent_name.as_str())
                .collect();
            if failing.is_empty() {
                Ok(())
            } else {
                Err(format!("agents did not pass: {}", failing.join(", ")))
            }
        }
    }
}

/// One finding per distinct agent across all rules, first-touch order.
/// Worst status wins, confidence is the minimum, risk level the maximum.
fn merge_findings(evaluations: &[RuleEvaluation]) -> Vec<AgentFinding> {
    let mut merged: Vec<AgentFinding> = Vec::new();
    for eval in evaluations {
        for finding in &eval.findings {
            match merged.iter_mut().find(|f| f.agent_name == finding.agent_name) {
                Some(existing) => {
                    existing.overall_status =
                        existing.overall_status.worse(finding.overall_status);
                    existing.confidence = existing.confidence.min(finding.confidence);
                    existing.risk_level = existing.risk_level.max(finding.risk_level);
                    existing
                        .check_results
                        .extend(finding.check_results.iter().cloned());
                }
                None => merged.push(finding.clone()),
            }
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use underwriter_core::RiskLevel;
    use underwriter_rules::{
        CheckSpec, DecisionCriteria, ExecutionConfig, StructuredRule,
    };

    fn spec(name: &str, agent: &str, required: bool, zero_tolerance: bool) -> CheckSpec {
        CheckSpec {
            name: name.into(),
            description: String::new(),
            agent: agent.into(),
            required,
            zero_tolerance,
            threshold: None,
        }
    }

    fn rule(
        condition: ApprovalCondition,
        min_confidence: f64,
        checks: Vec<CheckSpec>,
        agents: &[&str],
    ) -> Arc<StructuredRule> {
        Arc::new(StructuredRule {
            name: "TEST_RULE".into(),
            description: String::new(),
            risk_level: RiskLevel::High,
            required_agents: agents.iter().map(|a| a.to_string()).collect(),
            checks,
            decision_criteria: DecisionCriteria {
                approval_condition: condition,
                min_confidence,
                dti_threshold: None,
                zero_tolerance_checks: vec![],
                requires_manual_signoff: false,
            },
            execution_config: ExecutionConfig::default(),
        })
    }

    fn result(name: &str, agent: &str, status: CheckStatus, confidence: f64) -> CheckResult {
        CheckResult::new(name, agent, status, confidence)
    }

    fn evaluation(
        rule: Arc<StructuredRule>,
        check_results: Vec<CheckResult>,
    ) -> RuleEvaluation {
        // Findings mirror what the executor would roll up; tests that need
        // them precise use the executor itself.
        let findings = rule
            .required_agents
            .iter()
            .map(|agent| {
                let agent_results: Vec<CheckResult> = check_results
                    .iter()
                    .filter(|r| &r.agent == agent)
                    .cloned()
                    .collect();
                let status = if agent_results.iter().any(|r| {
                    matches!(r.status, CheckStatus::Fail | CheckStatus::Error)
                }) {
                    FindingStatus::Fail
                } else if agent_results.iter().any(|r| r.status != CheckStatus::Pass) {
                    FindingStatus::Review
                } else {
                    FindingStatus::Pass
                };
                let confidence = agent_results
                    .iter()
                    .map(|r| r.confidence)
                    .fold(1.0f64, f64::min);
                AgentFinding {
                    agent_name: agent.clone(),
                    overall_status: status,
                    risk_level: rule.risk_level,
                    confidence,
                    check_results: agent_results,
                    details: serde_json::Map::new(),
                    timestamp: Utc::now(),
                }
            })
            .collect();
        RuleEvaluation {
            rule,
            check_results,
            findings,
            contract_violation: None,
        }
    }

    fn app() -> CreditApplication {
        CreditApplication::new("APP-1", "John Doe", "111-22-3333", 85_000.0, 720, vec![])
    }

    #[test]
    fn zero_tolerance_failure_dominates_high_confidence() {
        let r = rule(
            ApprovalCondition::NoFraudIndicators,
            0.9,
            vec![
                spec("ofac_screening", "fraud", true, true),
                spec("velocity_check", "fraud", true, false),
            ],
            &["fraud"],
        );
        let eval = evaluation(
            r,
            vec![
                result("ofac_screening", "fraud", CheckStatus::Fail, 0.99),
                result("velocity_check", "fraud", CheckStatus::Pass, 0.99),
            ],
        );
        let outcome = judge_rule(&eval, &app());
        assert_eq!(outcome.verdict, RuleVerdict::Fail);
        assert!(outcome.reason.contains("zero-tolerance"));
        assert!(outcome.reason.contains("ofac_screening"));
    }

    #[test]
    fn zero_tolerance_review_also_fails_the_rule() {
        let r = rule(
            ApprovalCondition::AllChecksPass,
            0.5,
            vec![spec("ofac_screening", "fraud", true, true)],
            &["fraud"],
        );
        let eval = evaluation(
            r,
            vec![result("ofac_screening", "fraud", CheckStatus::Review, 0.9)],
        );
        assert_eq!(judge_rule(&eval, &app()).verdict, RuleVerdict::Fail);
    }

    #[test]
    fn confidence_gate_uses_minimum_not_average() {
        let r = rule(
            ApprovalCondition::AllChecksPass,
            0.8,
            vec![
                spec("a", "identity", true, false),
                spec("b", "identity", true, false),
                spec("c", "identity", true, false),
            ],
            &["identity"],
        );
        let eval = evaluation(
            r,
            vec![
                result("a", "identity", CheckStatus::Pass, 0.99),
                result("b", "identity", CheckStatus::Pass, 0.99),
                result("c", "identity", CheckStatus::Pass, 0.40),
            ],
        );
        let outcome = judge_rule(&eval, &app());
        // Average would be 0.79+, comfortably misleading; the minimum rules.
        assert_eq!(outcome.verdict, RuleVerdict::Review);
        assert!((outcome.confidence - 0.40).abs() < f64::EPSILON);
    }

    #[test]
    fn predicate_pass_with_weak_confidence_is_review_not_fail() {
        let r = rule(
            ApprovalCondition::AllChecksPass,
            0.9,
            vec![spec("a", "identity", true, false)],
            &["identity"],
        );
        let eval = evaluation(r, vec![result("a", "identity", CheckStatus::Pass, 0.7)]);
        assert_eq!(judge_rule(&eval, &app()).verdict, RuleVerdict::Review);
    }

    #[test]
    fn predicate_failure_is_fail() {
        let r = rule(
            ApprovalCondition::AllChecksPass,
            0.5,
            vec![spec("a", "identity", true, false)],
            &["identity"],
        );
        let eval = evaluation(r, vec![result("a", "identity", CheckStatus::Fail, 0.9)]);
        let outcome = judge_rule(&eval, &app());
        assert_eq!(outcome.verdict, RuleVerdict::Fail);
        assert!(outcome.reason.contains('a'));
    }

    #[test]
    fn manual_signoff_forces_review_on_clean_pass() {
        let mut r = (*rule(
            ApprovalCondition::AllAgentsPass,
            0.8,
            vec![spec("a", "identity", true, false)],
            &["identity"],
        ))
        .clone();
        r.decision_criteria.requires_manual_signoff = true;
        let eval = evaluation(
            Arc::new(r),
            vec![result("a", "identity", CheckStatus::Pass, 0.95)],
        );
        let outcome = judge_rule(&eval, &app());
        assert_eq!(outcome.verdict, RuleVerdict::Review);
        assert!(outcome.reason.contains("sign-off"));
    }

    #[test]
    fn dti_predicate_reads_check_detail() {
        let mut r = (*rule(
            ApprovalCondition::IncomeVerifiedAndDtiValid,
            0.75,
            vec![spec("dti_calculation", "income", true, false)],
            &["income"],
        ))
        .clone();
        r.decision_criteria.dti_threshold = Some(0.43);
        let eval = evaluation(
            Arc::new(r),
            vec![
                result("dti_calculation", "income", CheckStatus::Pass, 0.9)
                    .with_detail("dti_ratio", 0.38),
            ],
        );
        assert_eq!(judge_rule(&eval, &app()).verdict, RuleVerdict::Pass);
    }

    #[test]
    fn dti_at_threshold_fails_the_predicate() {
        let mut r = (*rule(
            ApprovalCondition::IncomeVerifiedAndDtiValid,
            0.5,
            vec![spec("dti_calculation", "income", true, false)],
            &["income"],
        ))
        .clone();
        r.decision_criteria.dti_threshold = Some(0.43);
        let eval = evaluation(
            Arc::new(r),
            vec![
                result("dti_calculation", "income", CheckStatus::Pass, 0.9)
                    .with_detail("dti_ratio", 0.43),
            ],
        );
        assert_eq!(judge_rule(&eval, &app()).verdict, RuleVerdict::Fail);
    }

    #[test]
    fn dti_predicate_falls_back_to_stated_ratio() {
        let mut r = (*rule(
            ApprovalCondition::IncomeVerifiedAndDtiValid,
            0.5,
            vec![spec("employment_verification", "income", true, false)],
            &["income"],
        ))
        .clone();
        r.decision_criteria.dti_threshold = Some(0.43);
        let eval = evaluation(
            Arc::new(r),
            vec![result(
                "employment_verification",
                "income",
                CheckStatus::Pass,
                0.9,
            )],
        );
        let mut application = app();
        application.dti_ratio = Some(0.35);
        assert_eq!(judge_rule(&eval, &application).verdict, RuleVerdict::Pass);

        application.dti_ratio = None;
        let outcome = judge_rule(&eval, &application);
        assert_eq!(outcome.verdict, RuleVerdict::Fail);
        assert!(outcome.reason.contains("no DTI outcome"));
    }

    #[test]
    fn contract_violation_fails_rule_with_reason() {
        let r = rule(
            ApprovalCondition::AllChecksPass,
            0.5,
            vec![spec("a", "identity", true, false)],
            &["identity"],
        );
        let mut eval = evaluation(r, vec![result("a", "identity", CheckStatus::Error, 0.0)]);
        eval.contract_violation =
            Some("provider contract violation on check 'a': confidence 1.7 out of range".into());
        let outcome = judge_rule(&eval, &app());
        assert_eq!(outcome.verdict, RuleVerdict::Fail);
        assert_eq!(outcome.confidence, 0.0);
        assert!(outcome.reason.contains("contract violation"));
    }

    #[test]
    fn decision_combines_verdicts_worst_first() {
        let pass_rule = rule(
            ApprovalCondition::AllChecksPass,
            0.5,
            vec![spec("a", "identity", true, false)],
            &["identity"],
        );
        let fail_rule = {
            let mut r = (*pass_rule).clone();
            r.name = "FAILING".into();
            Arc::new(r)
        };
        let passing = evaluation(
            pass_rule.clone(),
            vec![result("a", "identity", CheckStatus::Pass, 0.9)],
        );
        let failing = evaluation(
            fail_rule,
            vec![result("a", "identity", CheckStatus::Fail, 0.9)],
        );
        let decision = decide(&app(), &[passing, failing]);
        assert_eq!(decision.decision, DecisionStatus::Denied);
        assert_eq!(decision.rules_applied, vec!["TEST_RULE", "FAILING"]);
        assert!(decision.reasoning.contains("TEST_RULE: PASS"));
        assert!(decision.reasoning.contains("FAILING: FAIL"));
    }

    #[test]
    fn findings_are_deduplicated_per_agent() {
        let r1 = rule(
            ApprovalCondition::AllChecksPass,
            0.5,
            vec![spec("a", "identity", true, false)],
            &["identity"],
        );
        let r2 = {
            let mut r = (*r1).clone();
            r.name = "SECOND".into();
            r.risk_level = RiskLevel::Critical;
            r.checks = vec![spec("b", "identity", true, false)];
            Arc::new(r)
        };
        let e1 = evaluation(r1, vec![result("a", "identity", CheckStatus::Pass, 0.9)]);
        let e2 = evaluation(r2, vec![result("b", "identity", CheckStatus::Fail, 0.6)]);
        let decision = decide(&app(), &[e1, e2]);
        assert_eq!(decision.findings.len(), 1);
        let finding = &decision.findings[0];
        assert_eq!(finding.overall_status, FindingStatus::Fail);
        assert_eq!(finding.risk_level, RiskLevel::Critical);
        assert_eq!(finding.confidence, 0.6);
        assert_eq!(finding.check_results.len(), 2);
    }

    #[test]
    fn overall_confidence_is_minimum_across_rules() {
        let r1 = rule(
            ApprovalCondition::AllChecksPass,
            0.5,
            vec![spec("a", "identity", true, false)],
            &["identity"],
        );
        let r2 = {
            let mut r = (*r1).clone();
            r.name = "SECOND".into();
            Arc::new(r)
        };
        let e1 = evaluation(r1, vec![result("a", "identity", CheckStatus::Pass, 0.95)]);
        let e2 = evaluation(r2, vec![result("a", "identity", CheckStatus::Pass, 0.8)]);
        let decision = decide(&app(), &[e1, e2]);
        assert_eq!(decision.decision, DecisionStatus::Approved);
        assert!((decision.confidence_score - 0.8).abs() < f64::EPSILON);
    }
}
