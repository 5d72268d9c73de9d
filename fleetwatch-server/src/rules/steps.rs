use std::collections::HashMap;
use std::sync::Arc;

use crate::models::{Device, IncidentType, TroubleshootingStep};

use super::{IncidentRule, RuleMatch, default_rules};

/// Produces the remediation checklist for a rule match by delegating to the
/// rule that owns the condition. Steps are snapshotted into the incident at
/// creation time so later checklist edits never rewrite history.
pub struct StepFactory {
    by_type: HashMap<IncidentType, Arc<dyn IncidentRule>>,
}

impl StepFactory {
    pub fn new(rules: Vec<Arc<dyn IncidentRule>>) -> Self {
        let by_type = rules
            .into_iter()
            .map(|rule| (rule.incident_type(), rule))
            .collect();

        Self { by_type }
    }

    pub fn build_steps(&self, matched: &RuleMatch, device: &Device) -> Vec<TroubleshootingStep> {
        match self.by_type.get(&matched.incident_type) {
            Some(rule) => rule.build_steps(device),
            None => {
                tracing::error!(
                    incident_type = %matched.incident_type,
                    "no rule registered for incident type, storing empty checklist"
                );
                Vec::new()
            }
        }
    }
}

impl Default for StepFactory {
    fn default() -> Self {
        Self::new(default_rules())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::healthy_device;
    use super::*;
    use crate::models::Severity;

    const NOW: i64 = 1_700_000_000;

    fn match_for(incident_type: IncidentType) -> RuleMatch {
        RuleMatch {
            incident_type,
            severity: Severity::High,
            summary: "test".into(),
            context: serde_json::json!({}),
        }
    }

    #[test]
    fn test_every_incident_type_has_a_checklist() {
        let factory = StepFactory::default();
        let device = healthy_device(NOW);

        for incident_type in [
            IncidentType::Offline,
            IncidentType::NoRender,
            IncidentType::DetectionStale,
            IncidentType::WeakNetwork,
        ] {
            let steps = factory.build_steps(&match_for(incident_type), &device);

            assert!(!steps.is_empty());
            for (index, step) in steps.iter().enumerate() {
                assert_eq!(step.order, index as u32 + 1);
            }
        }
    }

    #[test]
    fn test_unregistered_type_yields_empty_checklist() {
        let factory = StepFactory::new(Vec::new());
        let device = healthy_device(NOW);

        let steps = factory.build_steps(&match_for(IncidentType::Offline), &device);
        assert!(steps.is_empty());
    }
}
