mod detection_stale;
mod engine;
mod no_render;
mod offline;
mod steps;
mod weak_network;

pub use detection_stale::DetectionStaleRule;
pub use engine::RuleEngine;
pub use no_render::NoRenderRule;
pub use offline::OfflineRule;
pub use steps::StepFactory;
pub use weak_network::WeakNetworkRule;

use std::sync::Arc;

use serde_json::Value;

use crate::models::{Device, IncidentType, Severity, TroubleshootingStep};

/// Seconds of heartbeat silence after which a device counts as offline.
pub const OFFLINE_THRESHOLD_SECONDS: i64 = 90;

/// Seconds without a render event before a no-render incident fires.
pub const NO_RENDER_THRESHOLD_SECONDS: i64 = 300;

/// Seconds without a detection event before detection counts as stale.
pub const DETECTION_STALE_THRESHOLD_SECONDS: i64 = 600;

/// RSSI below this value (dBm) means the network signal is weak.
pub const WEAK_NETWORK_RSSI_THRESHOLD_DBM: f64 = -75.0;

/// Signal strength percentage below which the network counts as weak.
pub const WEAK_NETWORK_SIGNAL_PERCENT_THRESHOLD: f64 = 30.0;

/// Result returned when a rule decides a problem condition is present.
/// Ephemeral: consumed immediately by the heartbeat processor, never stored.
#[derive(Debug, Clone)]
pub struct RuleMatch {
    pub incident_type: IncidentType,
    pub severity: Severity,
    pub summary: String,
    /// The telemetry values that caused the match.
    pub context: Value,
}

/// Contract every detection rule follows. Rules are pure: no side effects,
/// no shared state, safe to run concurrently for different devices. Each
/// rule also owns the remediation checklist for the condition it detects.
pub trait IncidentRule: Send + Sync {
    fn incident_type(&self) -> IncidentType;

    fn severity(&self) -> Severity;

    /// Returns a match if the rule fires, or None if the device looks fine
    /// for this rule. All thresholds are strict: the boundary value does
    /// not fire.
    fn evaluate(&self, device: &Device, now_seconds: i64) -> Option<RuleMatch>;

    /// The ordered remediation checklist for this condition, 1-based.
    fn build_steps(&self, device: &Device) -> Vec<TroubleshootingStep>;
}

/// The fixed rule set. Adding a rule means adding it here; the engine and
/// the step factory are both built from this list.
pub fn default_rules() -> Vec<Arc<dyn IncidentRule>> {
    vec![
        Arc::new(OfflineRule),
        Arc::new(NoRenderRule),
        Arc::new(DetectionStaleRule),
        Arc::new(WeakNetworkRule),
    ]
}

/// Shared precondition: rules other than OFFLINE only apply while the
/// device is still heartbeating, since the offline rule covers the rest.
pub(crate) fn is_offline(device: &Device, now_seconds: i64) -> bool {
    now_seconds - device.telemetry.last_heartbeat_at > OFFLINE_THRESHOLD_SECONDS
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::models::{Device, DeviceStatus, Telemetry};

    /// A device with fully healthy telemetry as of `now`.
    pub fn healthy_device(now: i64) -> Device {
        Device {
            id: "dev-1".into(),
            venue_id: "venue-1".into(),
            label: "Bar TV 3".into(),
            status: DeviceStatus::Unknown,
            telemetry: Telemetry {
                last_heartbeat_at: now,
                last_render_at: Some(now - 10),
                last_detection_at: Some(now - 10),
                signal_strength_percent: Some(80.0),
                rssi_dbm: Some(-50.0),
                firmware_version: Some("2.4.1".into()),
            },
            created_at: now - 86_400,
            updated_at: now,
        }
    }
}
