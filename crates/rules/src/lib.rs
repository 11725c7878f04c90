//! Structured underwriting rules.
//!
//! A rule bundles the checks to run, how to run them (parallel/sequential,
//! timeout, retry, cascade), and how to turn their results into a verdict.
//! Rules are validated on load and immutable afterwards, so they can be
//! shared freely across concurrent evaluations.
//!
//! The rule source is format-agnostic: [`RuleSet`] loads the same
//! name-to-rule mapping from JSON or YAML, and in-memory construction is a
//! first-class path for tests.

pub mod rule;
pub mod ruleset;

pub use rule::{
    ApprovalCondition, CheckSpec, DecisionCriteria, ExecutionConfig, StructuredRule,
};
pub use ruleset::{RuleSet, RuleSetStats};
