//! Policy-driven workflow execution engine for underwriting decisions.
//!
//! Given an application and a set of structured rules, the engine compiles
//! each rule into a staged execution plan, runs the plan's checks against a
//! [`CheckProvider`], and aggregates the collected results into a single
//! [`UnderwritingDecision`]. Business outcomes (denied, pending review) are
//! normal return values; only configuration problems and provider contract
//! violations surface as errors.
//!
//! [`Underwriter`] is the single entry point external callers use.

pub mod aggregator;
pub mod executor;
pub mod planner;

pub use aggregator::{RuleOutcome, RuleVerdict};
pub use executor::{ExecutionEngine, RuleEvaluation};
pub use planner::{ExecutionPlan, Stage};

use std::sync::Arc;
use std::time::Instant;

use underwriter_core::{
    CheckProvider, ConfigError, CreditApplication, EngineError, UnderwritingDecision,
};
use underwriter_rules::{RuleSet, StructuredRule};

/// Orchestration facade: `evaluate(application) -> decision`.
///
/// Owns the loaded rule set and the check provider; holds no per-evaluation
/// state, so one `Underwriter` serves concurrent evaluations of different
/// applications.
pub struct Underwriter {
    rules: Arc<RuleSet>,
    engine: ExecutionEngine,
}

impl Underwriter {
    pub fn new(rules: Arc<RuleSet>, provider: Arc<dyn CheckProvider>) -> Self {
        Self {
            rules,
            engine: ExecutionEngine::new(provider),
        }
    }

    /// Evaluate an application against the rules it names in `review_rules`.
    pub async fn evaluate(
        &self,
        application: &CreditApplication,
    ) -> Result<UnderwritingDecision, EngineError> {
        let names = application.review_rules.clone();
        self.evaluate_rules(application, &names).await
    }

    /// Evaluate an application against an explicit, ordered rule set.
    ///
    /// Fails before any check runs if the application is malformed, the
    /// active set is empty, or any rule name is unknown.
    pub async fn evaluate_rules(
        &self,
        application: &CreditApplication,
        rule_names: &[String],
    ) -> Result<UnderwritingDecision, EngineError> {
        let started = Instant::now();
        application.validate().map_err(EngineError::Config)?;

        if rule_names.is_empty() {
            return Err(ConfigError::EmptyRuleSet(application.application_id.clone()).into());
        }

        // Resolve every rule up front so a bad name costs no provider calls.
        let rules: Vec<Arc<StructuredRule>> = rule_names
            .iter()
            .map(|name| {
                self.rules
                    .get(name)
                    .ok_or_else(|| ConfigError::UnknownRule(name.clone()))
            })
            .collect::<Result<_, _>>()?;

        tracing::info!(
            application = %application.application_id,
            rules = rule_names.len(),
            "evaluating application"
        );

        let mut evaluations = Vec::with_capacity(rules.len());
        for rule in rules {
            let span = tracing::debug_span!("rule", name = %rule.name);
            let _guard = span.enter();
            let plan = ExecutionPlan::compile(rule);
            let evaluation = self.engine.execute(&plan, application).await;
            evaluations.push(evaluation);
        }

        let mut decision = aggregator::decide(application, &evaluations);
        decision.processing_time = Some(started.elapsed());
        Ok(decision)
    }

    /// The rule set this underwriter evaluates against.
    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }
}
