use std::sync::Arc;

use crate::models::{Device, IncidentType};

use super::{IncidentRule, RuleMatch, default_rules};

/// Runs every rule against a device snapshot. Rules are independent: each
/// one sees the same snapshot and the same clock reading, and any subset of
/// them may fire in the same evaluation.
pub struct RuleEngine {
    rules: Vec<Arc<dyn IncidentRule>>,
}

impl RuleEngine {
    pub fn new(rules: Vec<Arc<dyn IncidentRule>>) -> Self {
        Self { rules }
    }

    /// Evaluates all rules in registration order and collects the matches.
    pub fn evaluate(&self, device: &Device, now_seconds: i64) -> Vec<RuleMatch> {
        self.rules
            .iter()
            .filter_map(|rule| rule.evaluate(device, now_seconds))
            .collect()
    }

    /// Every incident type this engine can produce, in registration order.
    pub fn rule_types(&self) -> Vec<IncidentType> {
        self.rules.iter().map(|rule| rule.incident_type()).collect()
    }
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new(default_rules())
    }
}
