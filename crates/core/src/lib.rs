//! Core domain types for the underwriting engine.
//!
//! This crate defines the value types shared by every other crate in the
//! workspace (applications, check results, findings, decisions), the error
//! taxonomy, and the `CheckProvider` capability trait the execution engine
//! depends on. No engine behavior lives here.

pub mod application;
pub mod check;
pub mod decision;
pub mod error;
pub mod provider;

pub use application::CreditApplication;
pub use check::{CheckResult, CheckStatus};
pub use decision::{
    AgentFinding, DecisionStatus, FindingStatus, RiskLevel, UnderwritingDecision,
};
pub use error::{ConfigError, EngineError, ProviderError};
pub use provider::CheckProvider;

/// Agent identifier (e.g. "identity", "income", "fraud").
///
/// Agents are data-driven: new agent groups are additive configuration, not
/// structural changes to the engine.
pub type AgentId = String;

/// Check identifier, unique within a rule (e.g. "ofac_screening").
pub type CheckId = String;
