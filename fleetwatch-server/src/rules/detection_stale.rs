use serde_json::json;

use crate::models::{Device, IncidentType, Severity, TroubleshootingStep};

use super::{DETECTION_STALE_THRESHOLD_SECONDS, IncidentRule, RuleMatch, is_offline};

/// Fires when the detection camera stopped reporting events. A missing
/// detection timestamp counts as an immediate match: a device that never
/// detected anything is just as blind as one that stopped.
pub struct DetectionStaleRule;

impl IncidentRule for DetectionStaleRule {
    fn incident_type(&self) -> IncidentType {
        IncidentType::DetectionStale
    }

    fn severity(&self) -> Severity {
        Severity::Medium
    }

    fn evaluate(&self, device: &Device, now_seconds: i64) -> Option<RuleMatch> {
        // the offline rule covers devices that went silent
        if is_offline(device, now_seconds) {
            return None;
        }

        let Some(last_detection_at) = device.telemetry.last_detection_at else {
            return Some(RuleMatch {
                incident_type: self.incident_type(),
                severity: self.severity(),
                summary: format!(
                    "Device \"{}\" has never reported a detection event.",
                    device.label
                ),
                context: json!({
                    "last_detection_at": null,
                    "threshold_seconds": DETECTION_STALE_THRESHOLD_SECONDS,
                }),
            });
        };

        let seconds_since_detection = now_seconds - last_detection_at;

        if seconds_since_detection <= DETECTION_STALE_THRESHOLD_SECONDS {
            return None;
        }

        Some(RuleMatch {
            incident_type: self.incident_type(),
            severity: self.severity(),
            summary: format!(
                "Device \"{}\" has not reported a detection event in {} seconds.",
                device.label, seconds_since_detection
            ),
            context: json!({
                "last_detection_at": last_detection_at,
                "seconds_since_detection": seconds_since_detection,
                "threshold_seconds": DETECTION_STALE_THRESHOLD_SECONDS,
            }),
        })
    }

    fn build_steps(&self, device: &Device) -> Vec<TroubleshootingStep> {
        vec![
            TroubleshootingStep {
                order: 1,
                title: "Check camera placement".into(),
                description: format!(
                    "Confirm the camera on \"{}\" is not obstructed, unplugged, or pointed away from the room.",
                    device.label
                ),
                requires_confirmation: true,
            },
            TroubleshootingStep {
                order: 2,
                title: "Verify venue activity".into(),
                description: "If the venue is closed or empty, stale detections may be expected. Confirm opening hours.".into(),
                requires_confirmation: true,
            },
            TroubleshootingStep {
                order: 3,
                title: "Inspect the detection service logs".into(),
                description: "Check the detection pipeline logs for camera read errors or model failures.".into(),
                requires_confirmation: false,
            },
            TroubleshootingStep {
                order: 4,
                title: "Restart detection service".into(),
                description: "Restart the detection process on the device.".into(),
                requires_confirmation: true,
            },
            TroubleshootingStep {
                order: 5,
                title: "Confirm detections resume".into(),
                description: "Wait 10 minutes and confirm the device reports new detection events.".into(),
                requires_confirmation: false,
            },
        ]
    }
}
