//! Check provider capability trait.

use async_trait::async_trait;

use crate::application::CreditApplication;
use crate::check::CheckResult;
use crate::error::ProviderError;

/// Capability the execution engine depends on to run checks.
///
/// Implementations own the actual verification work (credit bureau calls,
/// sanctions screening, mock fixtures). They must be safe to call from many
/// evaluations concurrently — the engine holds no lock across this await.
///
/// Contract: `confidence` on the returned result must lie within [0, 1] and
/// `check_name` must echo the requested check. Violations are treated as
/// engine errors, not underwriting outcomes.
#[async_trait]
pub trait CheckProvider: Send + Sync {
    /// Run one named check for an application.
    ///
    /// Transient failures (timeouts, malformed upstream responses) are
    /// reported as `ProviderError::Timeout` / `ProviderError::Data`; the
    /// engine maps them to `CheckStatus::Error` and may retry once.
    /// `ProviderError::Configuration` is unrecoverable and never retried.
    async fn run_check(
        &self,
        check_name: &str,
        agent: &str,
        application: &CreditApplication,
    ) -> Result<CheckResult, ProviderError>;
}
