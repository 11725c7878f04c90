//! Rule source: an immutable, validated name-to-rule mapping.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

use underwriter_core::{ConfigError, RiskLevel};

use crate::rule::StructuredRule;

/// Immutable collection of validated rules, keyed by rule name.
///
/// Loaded once per process and shared (`Arc`) across all evaluations. The
/// on-disk format mirrors the generated `structured_rules.json` layout:
/// a map from rule name to rule body, with the name repeated inside the body
/// being optional.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: HashMap<String, Arc<StructuredRule>>,
    /// Insertion order, for deterministic listing.
    order: Vec<String>,
}

impl RuleSet {
    /// Build a rule set from rules already in memory, validating each.
    pub fn new(rules: Vec<StructuredRule>) -> Result<Self, ConfigError> {
        let mut set = Self::default();
        for rule in rules {
            rule.validate()?;
            if set.rules.contains_key(&rule.name) {
                return Err(ConfigError::InvalidRule {
                    rule: rule.name.clone(),
                    field: "name".into(),
                    message: "duplicate rule name".into(),
                });
            }
            set.order.push(rule.name.clone());
            set.rules.insert(rule.name.clone(), Arc::new(rule));
        }
        Ok(set)
    }

    /// Parse a JSON map of rule name to rule body.
    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        let raw: BTreeMap<String, serde_json::Value> =
            serde_json::from_str(content).map_err(|e| ConfigError::Load {
                path: "<json>".into(),
                message: e.to_string(),
            })?;
        Self::from_named_values(raw)
    }

    /// Parse a YAML map of rule name to rule body.
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        let raw: BTreeMap<String, serde_json::Value> =
            serde_yaml::from_str(content).map_err(|e| ConfigError::Load {
                path: "<yaml>".into(),
                message: e.to_string(),
            })?;
        Self::from_named_values(raw)
    }

    /// Load rules from a file, dispatching on extension (`.json`, `.yaml`,
    /// `.yml`).
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Load {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let set = match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml_str(&content),
            _ => Self::from_json_str(&content),
        }?;
        tracing::info!(rules = set.len(), path = %path.display(), "loaded rule set");
        Ok(set)
    }

    fn from_named_values(
        raw: BTreeMap<String, serde_json::Value>,
    ) -> Result<Self, ConfigError> {
        let mut rules = Vec::with_capacity(raw.len());
        for (name, mut body) in raw {
            // The map key is authoritative; the body's own name field may be
            // absent in generated files.
            if let Some(obj) = body.as_object_mut() {
                obj.insert("name".into(), serde_json::Value::String(name.clone()));
            }
            let rule: StructuredRule =
                serde_json::from_value(body).map_err(|e| ConfigError::InvalidRule {
                    rule: name.clone(),
                    field: "<body>".into(),
                    message: e.to_string(),
                })?;
            rules.push(rule);
        }
        Self::new(rules)
    }

    /// Look up a rule by name.
    pub fn get(&self, name: &str) -> Option<Arc<StructuredRule>> {
        self.rules.get(name).cloned()
    }

    /// Rule names in load order.
    pub fn names(&self) -> Vec<&str> {
        self.order.iter().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Summary statistics over the loaded rules.
    pub fn stats(&self) -> RuleSetStats {
        let mut risk_levels: BTreeMap<RiskLevel, usize> = BTreeMap::new();
        let mut total_checks = 0;
        for rule in self.rules.values() {
            total_checks += rule.checks.len();
            *risk_levels.entry(rule.risk_level).or_default() += 1;
        }
        RuleSetStats {
            total_rules: self.rules.len(),
            total_checks,
            risk_levels,
        }
    }
}

/// Statistics over a loaded rule set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSetStats {
    pub total_rules: usize,
    pub total_checks: usize,
    pub risk_levels: BTreeMap<RiskLevel, usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const RULES_JSON: &str = r#"{
        "INCOME_VALIDATION": {
            "description": "Validate stated income and DTI",
            "risk_level": "MEDIUM",
            "required_agents": ["income"],
            "checks": [
                {"name": "employment_verification", "agent": "income"},
                {"name": "dti_calculation", "agent": "income", "threshold": 0.43}
            ],
            "decision_criteria": {
                "approval_condition": "income_verified_and_dti_valid",
                "min_confidence": 0.75,
                "dti_threshold": 0.43
            },
            "execution_config": {"parallel": true, "timeout_seconds": 10}
        },
        "FRAUD_CHECK": {
            "description": "Screen for fraud and sanctions",
            "risk_level": "CRITICAL",
            "required_agents": ["identity", "income", "fraud"],
            "checks": [
                {"name": "ssn_validation", "agent": "identity"},
                {"name": "employment_verification", "agent": "income"},
                {"name": "ofac_screening", "agent": "fraud", "zero_tolerance": true}
            ],
            "decision_criteria": {
                "approval_condition": "no_fraud_indicators",
                "min_confidence": 0.9,
                "zero_tolerance_checks": ["ofac_screening"]
            },
            "execution_config": {"cascade_mode": true, "timeout_seconds": 10}
        }
    }"#;

    #[test]
    fn loads_rules_from_json() {
        let set = RuleSet::from_json_str(RULES_JSON).unwrap();
        assert_eq!(set.len(), 2);
        let fraud = set.get("FRAUD_CHECK").unwrap();
        assert_eq!(fraud.risk_level, RiskLevel::Critical);
        assert!(fraud.execution_config.cascade_mode);
        assert!(fraud.zero_tolerance_set().contains("ofac_screening"));
    }

    #[test]
    fn map_key_is_authoritative_for_rule_name() {
        let set = RuleSet::from_json_str(RULES_JSON).unwrap();
        assert_eq!(set.get("INCOME_VALIDATION").unwrap().name, "INCOME_VALIDATION");
    }

    #[test]
    fn loads_rules_from_yaml() {
        let yaml = r#"
IDENTITY_VERIFICATION:
  risk_level: HIGH
  required_agents: [identity]
  checks:
    - name: ssn_validation
      agent: identity
  decision_criteria:
    approval_condition: all_checks_pass
"#;
        let set = RuleSet::from_yaml_str(yaml).unwrap();
        assert_eq!(set.len(), 1);
        assert!(set.get("IDENTITY_VERIFICATION").is_some());
    }

    #[test]
    fn invalid_rule_is_rejected_at_load() {
        let json = r#"{
            "BROKEN": {
                "risk_level": "LOW",
                "required_agents": ["identity"],
                "checks": [{"name": "x", "agent": "fraud"}],
                "decision_criteria": {"approval_condition": "all_checks_pass"}
            }
        }"#;
        let err = RuleSet::from_json_str(json).unwrap_err();
        assert!(err.to_string().contains("BROKEN"));
    }

    #[test]
    fn stats_count_rules_and_checks() {
        let set = RuleSet::from_json_str(RULES_JSON).unwrap();
        let stats = set.stats();
        assert_eq!(stats.total_rules, 2);
        assert_eq!(stats.total_checks, 5);
        assert_eq!(stats.risk_levels.get(&RiskLevel::Critical), Some(&1));
    }

    #[test]
    fn missing_rule_lookup_returns_none() {
        let set = RuleSet::from_json_str(RULES_JSON).unwrap();
        assert!(set.get("NO_SUCH_RULE").is_none());
    }
}
