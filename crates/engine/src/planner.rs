//! Execution planner.
//!
//! Compiles a rule's check list and agent groupings into an ordered plan of
//! stages. A stage's checks may run concurrently; stages themselves always
//! run in order, and cascade stages carry a short-circuit predicate.

use std::sync::Arc;

use underwriter_rules::{CheckSpec, StructuredRule};

/// One execution stage: a set of checks that may run together.
#[derive(Debug, Clone)]
pub struct Stage {
    /// Agent group the stage belongs to (set for cascade stages).
    pub agent: Option<String>,
    /// Checks in this stage, in declaration order. Declaration order is the
    /// canonical order for sequential execution and reasoning text.
    pub checks: Vec<CheckSpec>,
    /// Dispatch the stage's checks concurrently.
    pub parallel: bool,
    /// Advance past this stage only if every `required` check in it passed.
    pub short_circuit: bool,
}

impl Stage {
    /// A stage with no checks trivially satisfies its own predicate.
    pub fn is_noop(&self) -> bool {
        self.checks.is_empty()
    }
}

/// Ordered stages compiled from one rule.
#[derive(Debug, Clone)]
pub struct ExecutionPlan {
    pub rule: Arc<StructuredRule>,
    pub stages: Vec<Stage>,
}

impl ExecutionPlan {
    /// Compile a rule into its execution plan.
    ///
    /// - `parallel` without `cascade_mode`: a single concurrent stage.
    /// - sequential without `cascade_mode`: one stage per check, in
    ///   declaration order.
    /// - `cascade_mode`: one stage per agent in `required_agents` order; the
    ///   rule's `parallel` flag governs execution within each stage, and each
    ///   stage short-circuits the rest when a required check does not pass.
    pub fn compile(rule: Arc<StructuredRule>) -> Self {
        let config = &rule.execution_config;

        let stages = if config.cascade_mode {
            rule.required_agents
                .iter()
                .map(|agent| Stage {
                    agent: Some(agent.clone()),
                    checks: rule.checks_for_agent(agent).into_iter().cloned().collect(),
                    parallel: config.parallel,
                    short_circuit: true,
                })
                .collect()
        } else if config.parallel {
            vec![Stage {
                agent: None,
                checks: rule.checks.clone(),
                parallel: true,
                short_circuit: false,
            }]
        } else {
            rule.checks
                .iter()
                .map(|check| Stage {
                    agent: None,
                    checks: vec![check.clone()],
                    parallel: false,
                    short_circuit: false,
                })
                .collect()
        };

        tracing::debug!(rule = %rule.name, stages = stages.len(), "compiled execution plan");
        Self { rule, stages }
    }

    /// All planned checks in canonical order.
    pub fn checks(&self) -> impl Iterator<Item = &CheckSpec> {
        self.stages.iter().flat_map(|s| s.checks.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use underwriter_core::RiskLevel;
    use underwriter_rules::{ApprovalCondition, DecisionCriteria, ExecutionConfig};

    fn check(name: &str, agent: &str) -> CheckSpec {
        CheckSpec {
            name: name.into(),
            description: String::new(),
            agent: agent.into(),
            required: true,
            zero_tolerance: false,
            threshold: None,
        }
    }

    fn rule(parallel: bool, cascade: bool, agents: &[&str], checks: Vec<CheckSpec>) -> Arc<StructuredRule> {
        Arc::new(StructuredRule {
            name: "TEST_RULE".into(),
            description: String::new(),
            risk_level: RiskLevel::Medium,
            required_agents: agents.iter().map(|a| a.to_string()).collect(),
            checks,
            decision_criteria: DecisionCriteria {
                approval_condition: ApprovalCondition::AllChecksPass,
                min_confidence: 0.8,
                dti_threshold: None,
                zero_tolerance_checks: vec![],
                requires_manual_signoff: false,
            },
            execution_config: ExecutionConfig {
                parallel,
                timeout_seconds: 10,
                retry_on_failure: false,
                cascade_mode: cascade,
            },
        })
    }

    #[test]
    fn parallel_rule_compiles_to_single_stage() {
        let r = rule(
            true,
            false,
            &["identity"],
            vec![check("a", "identity"), check("b", "identity")],
        );
        let plan = ExecutionPlan::compile(r);
        assert_eq!(plan.stages.len(), 1);
        assert!(plan.stages[0].parallel);
        assert!(!plan.stages[0].short_circuit);
        assert_eq!(plan.stages[0].checks.len(), 2);
    }

    #[test]
    fn sequential_rule_compiles_to_stage_per_check() {
        let r = rule(
            false,
            false,
            &["identity"],
            vec![check("a", "identity"), check("b", "identity")],
        );
        let plan = ExecutionPlan::compile(r);
        assert_eq!(plan.stages.len(), 2);
        assert_eq!(plan.stages[0].checks[0].name, "a");
        assert_eq!(plan.stages[1].checks[0].name, "b");
    }

    #[test]
    fn cascade_rule_compiles_to_stage_per_agent() {
        let r = rule(
            true,
            true,
            &["identity", "income", "fraud"],
            vec![
                check("ssn_validation", "identity"),
                check("employment_verification", "income"),
                check("ofac_screening", "fraud"),
                check("velocity_check", "fraud"),
            ],
        );
        let plan = ExecutionPlan::compile(r);
        assert_eq!(plan.stages.len(), 3);
        assert_eq!(plan.stages[0].agent.as_deref(), Some("identity"));
        assert_eq!(plan.stages[2].agent.as_deref(), Some("fraud"));
        assert_eq!(plan.stages[2].checks.len(), 2);
        assert!(plan.stages.iter().all(|s| s.short_circuit));
        assert!(plan.stages.iter().all(|s| s.parallel));
    }

    #[test]
    fn cascade_agent_without_checks_is_noop_stage() {
        let r = rule(
            false,
            true,
            &["identity", "fraud"],
            vec![check("ofac_screening", "fraud")],
        );
        let plan = ExecutionPlan::compile(r);
        assert_eq!(plan.stages.len(), 2);
        assert!(plan.stages[0].is_noop());
        assert!(!plan.stages[1].is_noop());
    }

    #[test]
    fn canonical_check_order_follows_declaration() {
        let r = rule(
            false,
            false,
            &["identity"],
            vec![check("b", "identity"), check("a", "identity")],
        );
        let plan = ExecutionPlan::compile(r);
        let names: Vec<_> = plan.checks().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a"]);
    }
}
