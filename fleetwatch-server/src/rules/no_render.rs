use serde_json::json;

use crate::models::{Device, IncidentType, Severity, TroubleshootingStep};

use super::{IncidentRule, NO_RENDER_THRESHOLD_SECONDS, RuleMatch, is_offline};

/// Fires when the device stopped rendering content. A device can be online
/// yet show nothing, which is a revenue problem in its own right. A render
/// timestamp that was never reported counts as an immediate match.
pub struct NoRenderRule;

impl IncidentRule for NoRenderRule {
    fn incident_type(&self) -> IncidentType {
        IncidentType::NoRender
    }

    fn severity(&self) -> Severity {
        Severity::High
    }

    fn evaluate(&self, device: &Device, now_seconds: i64) -> Option<RuleMatch> {
        // the offline rule covers devices that went silent
        if is_offline(device, now_seconds) {
            return None;
        }

        let Some(last_render_at) = device.telemetry.last_render_at else {
            return Some(RuleMatch {
                incident_type: self.incident_type(),
                severity: self.severity(),
                summary: format!(
                    "Device \"{}\" has never reported a render event.",
                    device.label
                ),
                context: json!({
                    "last_render_at": null,
                    "threshold_seconds": NO_RENDER_THRESHOLD_SECONDS,
                }),
            });
        };

        let seconds_since_render = now_seconds - last_render_at;

        if seconds_since_render <= NO_RENDER_THRESHOLD_SECONDS {
            return None;
        }

        Some(RuleMatch {
            incident_type: self.incident_type(),
            severity: self.severity(),
            summary: format!(
                "Device \"{}\" has not rendered any content in {} seconds.",
                device.label, seconds_since_render
            ),
            context: json!({
                "last_render_at": last_render_at,
                "seconds_since_render": seconds_since_render,
                "threshold_seconds": NO_RENDER_THRESHOLD_SECONDS,
            }),
        })
    }

    fn build_steps(&self, device: &Device) -> Vec<TroubleshootingStep> {
        vec![
            TroubleshootingStep {
                order: 1,
                title: "Confirm device is online".into(),
                description: format!(
                    "Check that \"{}\" is sending heartbeats and is not marked offline.",
                    device.label
                ),
                requires_confirmation: true,
            },
            TroubleshootingStep {
                order: 2,
                title: "Check content scheduling".into(),
                description: "Verify there is active content scheduled for this venue in the content management system.".into(),
                requires_confirmation: true,
            },
            TroubleshootingStep {
                order: 3,
                title: "Inspect the render service logs".into(),
                description: "SSH into the device and check the render service logs for errors or exceptions.".into(),
                requires_confirmation: false,
            },
            TroubleshootingStep {
                order: 4,
                title: "Restart render service".into(),
                description: "Restart the rendering process on the device and watch it come back up.".into(),
                requires_confirmation: true,
            },
            TroubleshootingStep {
                order: 5,
                title: "Confirm render resumes".into(),
                description: "Wait 5 minutes and confirm the device reports a new render event.".into(),
                requires_confirmation: false,
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::healthy_device;
    use super::*;

    const NOW: i64 = 1_700_000_000;

    #[test]
    fn test_recent_render_does_not_fire() {
        let device = healthy_device(NOW);
        assert!(NoRenderRule.evaluate(&device, NOW).is_none());
    }

    #[test]
    fn test_boundary_does_not_fire() {
        let mut device = healthy_device(NOW);
        device.telemetry.last_render_at = Some(NOW - NO_RENDER_THRESHOLD_SECONDS);
        assert!(NoRenderRule.evaluate(&device, NOW).is_none());
    }

    #[test]
    fn test_stale_render_fires_high() {
        let mut device = healthy_device(NOW);
        device.telemetry.last_render_at = Some(NOW - 500);

        let matched = NoRenderRule.evaluate(&device, NOW).unwrap();
        assert_eq!(matched.incident_type, IncidentType::NoRender);
        assert_eq!(matched.severity, Severity::High);
    }

    #[test]
    fn test_never_rendered_fires_immediately() {
        let mut device = healthy_device(NOW);
        device.telemetry.last_render_at = None;

        let matched = NoRenderRule.evaluate(&device, NOW).unwrap();
        assert!(matched.summary.contains("never reported a render event"));
    }

    #[test]
    fn test_skipped_while_device_is_offline() {
        let mut device = healthy_device(NOW);
        device.telemetry.last_heartbeat_at = NOW - 200;
        device.telemetry.last_render_at = None;

        assert!(NoRenderRule.evaluate(&device, NOW).is_none());
    }
}
