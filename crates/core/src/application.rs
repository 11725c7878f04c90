//! Credit application model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// A credit card application as submitted for underwriting.
///
/// The engine treats this as read-only input; provider implementations pull
/// whatever fields their checks need from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditApplication {
    /// Unique application identifier.
    pub application_id: String,
    /// Customer full name.
    pub customer_name: String,
    /// Social Security Number.
    pub ssn: String,
    /// Stated annual income in USD (must be positive).
    pub annual_income: f64,
    /// Credit score (300-850).
    pub credit_score: u16,
    /// Stated debt-to-income ratio, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dti_ratio: Option<f64>,
    /// Review rules to apply, in activation order.
    pub review_rules: Vec<String>,
    /// Current address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// Employment status (e.g. "full_time").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employment_status: Option<String>,
    /// Requested credit limit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_credit_limit: Option<f64>,
    /// Existing debt amount.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub existing_debt: Option<f64>,
    /// Submission timestamp.
    #[serde(default = "Utc::now")]
    pub submitted_at: DateTime<Utc>,
}

impl CreditApplication {
    /// Minimal constructor for the fields every application must carry.
    pub fn new(
        application_id: impl Into<String>,
        customer_name: impl Into<String>,
        ssn: impl Into<String>,
        annual_income: f64,
        credit_score: u16,
        review_rules: Vec<String>,
    ) -> Self {
        Self {
            application_id: application_id.into(),
            customer_name: customer_name.into(),
            ssn: ssn.into(),
            annual_income,
            credit_score,
            dti_ratio: None,
            review_rules,
            address: None,
            employment_status: None,
            requested_credit_limit: None,
            existing_debt: None,
            submitted_at: Utc::now(),
        }
    }

    /// Validate documented field ranges.
    ///
    /// Runs before any check is dispatched; a malformed application is a
    /// configuration problem, not an underwriting outcome.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.annual_income <= 0.0 {
            return Err(self.invalid("annual_income", "must be positive"));
        }
        if !(300..=850).contains(&self.credit_score) {
            return Err(self.invalid("credit_score", "must be within 300-850"));
        }
        if let Some(dti) = self.dti_ratio {
            if !(0.0..=1.0).contains(&dti) {
                return Err(self.invalid("dti_ratio", "must be within [0, 1]"));
            }
        }
        Ok(())
    }

    fn invalid(&self, field: &str, message: &str) -> ConfigError {
        ConfigError::InvalidApplication {
            application_id: self.application_id.clone(),
            field: field.to_string(),
            message: message.to_string(),
        }
    }
}
