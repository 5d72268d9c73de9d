use serde_json::json;

use crate::models::{Device, IncidentType, Severity, TroubleshootingStep};

use super::{IncidentRule, OFFLINE_THRESHOLD_SECONDS, RuleMatch};

/// Fires when a device has stopped sending heartbeats. Because a heartbeat
/// always refreshes `last_heartbeat_at`, this rule can only match a stored
/// snapshot, which is why the fleet sweep exists.
pub struct OfflineRule;

impl IncidentRule for OfflineRule {
    fn incident_type(&self) -> IncidentType {
        IncidentType::Offline
    }

    fn severity(&self) -> Severity {
        Severity::Critical
    }

    fn evaluate(&self, device: &Device, now_seconds: i64) -> Option<RuleMatch> {
        let seconds_since_heartbeat = now_seconds - device.telemetry.last_heartbeat_at;

        if seconds_since_heartbeat <= OFFLINE_THRESHOLD_SECONDS {
            return None;
        }

        Some(RuleMatch {
            incident_type: self.incident_type(),
            severity: self.severity(),
            summary: format!(
                "Device \"{}\" has not sent a heartbeat in {} seconds.",
                device.label, seconds_since_heartbeat
            ),
            context: json!({
                "last_heartbeat_at": device.telemetry.last_heartbeat_at,
                "seconds_since_heartbeat": seconds_since_heartbeat,
                "threshold_seconds": OFFLINE_THRESHOLD_SECONDS,
            }),
        })
    }

    fn build_steps(&self, device: &Device) -> Vec<TroubleshootingStep> {
        vec![
            TroubleshootingStep {
                order: 1,
                title: "Check physical power".into(),
                description: format!(
                    "Confirm the box labeled \"{}\" is powered on and the power cable is secure.",
                    device.label
                ),
                requires_confirmation: true,
            },
            TroubleshootingStep {
                order: 2,
                title: "Check network connection".into(),
                description: "Verify the ethernet cable or wifi adapter is connected and the router is online.".into(),
                requires_confirmation: true,
            },
            TroubleshootingStep {
                order: 3,
                title: "Reboot the device".into(),
                description: "Unplug the power cable, wait 10 seconds, then plug it back in.".into(),
                requires_confirmation: true,
            },
            TroubleshootingStep {
                order: 4,
                title: "Wait for reconnection".into(),
                description: "Allow up to 2 minutes for the device to reconnect and send a heartbeat.".into(),
                requires_confirmation: false,
            },
            TroubleshootingStep {
                order: 5,
                title: "Escalate if still offline".into(),
                description: "If the device does not come back online after the reboot, escalate to a field technician visit.".into(),
                requires_confirmation: false,
            },
        ]
    }
}
