pub mod device_handle;
pub mod heartbeat_handle;
pub mod incident_handle;

pub use device_handle::{get_device, get_devices, DeviceState};
pub use heartbeat_handle::{post_heartbeat, HeartbeatState};
pub use incident_handle::{get_incident, get_incidents, IncidentState};

/// Page sizes outside this range get clamped rather than rejected.
pub const MAX_PAGE_SIZE: i64 = 100;
pub const DEFAULT_PAGE_SIZE: i64 = 20;

pub(crate) fn clamp_page(limit: Option<i64>, offset: Option<i64>) -> (i64, i64) {
    let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let offset = offset.unwrap_or(0).max(0);
    (limit, offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_page_defaults_and_bounds() {
        assert_eq!(clamp_page(None, None), (20, 0));
        assert_eq!(clamp_page(Some(0), Some(-5)), (1, 0));
        assert_eq!(clamp_page(Some(500), Some(40)), (100, 40));
    }
}
