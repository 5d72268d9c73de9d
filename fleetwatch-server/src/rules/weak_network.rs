use serde_json::json;

use crate::models::{Device, IncidentType, Severity, TroubleshootingStep};

use super::{
    IncidentRule, RuleMatch, WEAK_NETWORK_RSSI_THRESHOLD_DBM,
    WEAK_NETWORK_SIGNAL_PERCENT_THRESHOLD, is_offline,
};

/// Fires when either network metric reports a weak link. Unlike the staleness
/// rules, absent metrics mean "not measured" rather than "broken", so a device
/// that reports neither metric never matches.
pub struct WeakNetworkRule;

impl IncidentRule for WeakNetworkRule {
    fn incident_type(&self) -> IncidentType {
        IncidentType::WeakNetwork
    }

    fn severity(&self) -> Severity {
        Severity::Low
    }

    fn evaluate(&self, device: &Device, now_seconds: i64) -> Option<RuleMatch> {
        // the offline rule covers devices that went silent
        if is_offline(device, now_seconds) {
            return None;
        }

        let signal = device.telemetry.signal_strength_percent;
        let rssi = device.telemetry.rssi_dbm;

        let weak_signal = signal.is_some_and(|s| s < WEAK_NETWORK_SIGNAL_PERCENT_THRESHOLD);
        let weak_rssi = rssi.is_some_and(|r| r < WEAK_NETWORK_RSSI_THRESHOLD_DBM);

        if !weak_signal && !weak_rssi {
            return None;
        }

        let signal_text = signal.map_or_else(|| "N/A".to_string(), |s| s.to_string());
        let rssi_text = rssi.map_or_else(|| "N/A".to_string(), |r| r.to_string());

        Some(RuleMatch {
            incident_type: self.incident_type(),
            severity: self.severity(),
            summary: format!(
                "Device \"{}\" has a weak network signal ({}% / {} dBm).",
                device.label, signal_text, rssi_text
            ),
            context: json!({
                "signal_strength_percent": signal,
                "rssi_dbm": rssi,
                "signal_threshold_percent": WEAK_NETWORK_SIGNAL_PERCENT_THRESHOLD,
                "rssi_threshold_dbm": WEAK_NETWORK_RSSI_THRESHOLD_DBM,
            }),
        })
    }

    fn build_steps(&self, device: &Device) -> Vec<TroubleshootingStep> {
        vec![
            TroubleshootingStep {
                order: 1,
                title: "Check wifi router distance".into(),
                description: format!(
                    "Note how far \"{}\" is from the nearest access point and whether walls or equipment sit in between.",
                    device.label
                ),
                requires_confirmation: true,
            },
            TroubleshootingStep {
                order: 2,
                title: "Check for interference".into(),
                description: "Look for microwaves, cordless phones, or other 2.4GHz equipment near the device.".into(),
                requires_confirmation: false,
            },
            TroubleshootingStep {
                order: 3,
                title: "Reboot the router".into(),
                description: "Power-cycle the venue router and wait for the device to reconnect.".into(),
                requires_confirmation: true,
            },
            TroubleshootingStep {
                order: 4,
                title: "Consider wired connection".into(),
                description: "If the signal stays weak, recommend running an ethernet cable to the device.".into(),
                requires_confirmation: false,
            },
            TroubleshootingStep {
                order: 5,
                title: "Monitor signal strength".into(),
                description: "Watch the reported signal over the next hour to confirm it stays above the threshold.".into(),
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
    fn test_strong_network_does_not_fire() {
        let device = healthy_device(NOW);
        assert!(WeakNetworkRule.evaluate(&device, NOW).is_none());
    }

    #[test]
    fn test_boundary_values_do_not_fire() {
        let mut device = healthy_device(NOW);
        device.telemetry.signal_strength_percent = Some(WEAK_NETWORK_SIGNAL_PERCENT_THRESHOLD);
        device.telemetry.rssi_dbm = Some(WEAK_NETWORK_RSSI_THRESHOLD_DBM);
        assert!(WeakNetworkRule.evaluate(&device, NOW).is_none());
    }

    #[test]
    fn test_weak_signal_alone_fires_low() {
        let mut device = healthy_device(NOW);
        device.telemetry.signal_strength_percent = Some(20.0);

        let matched = WeakNetworkRule.evaluate(&device, NOW).unwrap();
        assert_eq!(matched.incident_type, IncidentType::WeakNetwork);
        assert_eq!(matched.severity, Severity::Low);
        assert!(matched.summary.contains("20% / -50 dBm"));
    }

    #[test]
    fn test_weak_rssi_alone_fires() {
        let mut device = healthy_device(NOW);
        device.telemetry.rssi_dbm = Some(-80.0);

        assert!(WeakNetworkRule.evaluate(&device, NOW).is_some());
    }

    #[test]
    fn test_absent_metric_is_formatted_as_not_available() {
        let mut device = healthy_device(NOW);
        device.telemetry.signal_strength_percent = None;
        device.telemetry.rssi_dbm = Some(-80.0);

        let matched = WeakNetworkRule.evaluate(&device, NOW).unwrap();
        assert!(matched.summary.contains("N/A% / -80 dBm"));
    }

    #[test]
    fn test_no_metrics_at_all_does_not_fire() {
        let mut device = healthy_device(NOW);
        device.telemetry.signal_strength_percent = None;
        device.telemetry.rssi_dbm = None;

        assert!(WeakNetworkRule.evaluate(&device, NOW).is_none());
    }

    #[test]
    fn test_skipped_while_device_is_offline() {
        let mut device = healthy_device(NOW);
        device.telemetry.last_heartbeat_at = NOW - 200;
        device.telemetry.signal_strength_percent = Some(5.0);

        assert!(WeakNetworkRule.evaluate(&device, NOW).is_none());
    }
}
