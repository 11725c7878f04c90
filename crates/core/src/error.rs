//! Error taxonomy for the underwriting engine.
//!
//! Business-level outcomes (a failed check, a denied application) are never
//! errors: they flow through `CheckResult` and `UnderwritingDecision`. Only
//! configuration problems and provider contract violations surface as `Err`.

use thiserror::Error;

/// Configuration errors: bad or missing rules, unknown agents, malformed
/// criteria, invalid applications.
///
/// Always raised before any check runs, and never retried.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A rule failed construction-time validation.
    #[error("invalid rule '{rule}': {field}: {message}")]
    InvalidRule {
        rule: String,
        field: String,
        message: String,
    },

    /// An application referenced a rule that is not loaded.
    #[error("unknown review rule: {0}")]
    UnknownRule(String),

    /// The active rule set for an evaluation was empty.
    #[error("no active review rules for application {0}")]
    EmptyRuleSet(String),

    /// An application field was out of its documented range.
    #[error("invalid application '{application_id}': {field}: {message}")]
    InvalidApplication {
        application_id: String,
        field: String,
        message: String,
    },

    /// A rule file could not be read or parsed.
    #[error("failed to load rules from {path}: {message}")]
    Load { path: String, message: String },
}

/// Errors produced by a [`CheckProvider`](crate::CheckProvider).
///
/// `Timeout` and `Data` are transient: the engine folds them into a
/// `CheckStatus::Error` result (and retries once when configured).
/// `Configuration` is unrecoverable and is never retried.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider did not answer within its deadline.
    #[error("provider timed out running check '{0}'")]
    Timeout(String),

    /// The provider answered with a response the caller could not use.
    #[error("provider returned malformed data for check '{check}': {message}")]
    Data { check: String, message: String },

    /// The provider does not know how to run the requested check.
    #[error("provider configuration error: {0}")]
    Configuration(String),
}

/// Engine-level failures: configuration problems detected at the facade, and
/// provider contract violations (out-of-range confidence, mismatched check
/// names) detected mid-evaluation.
///
/// A contract violation aborts only the rule it occurred under; the rule is
/// marked FAIL with an explicit reason and the remaining rules still run.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The provider broke its contract for one check.
    #[error("provider contract violation on check '{check}': {message}")]
    ContractViolation { check: String, message: String },
}
