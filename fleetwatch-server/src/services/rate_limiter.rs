use std::collections::HashMap;
use std::sync::Mutex;

use crate::models::IncidentType;

/// Minimum seconds between notification bursts for the same venue and
/// incident type.
pub const RATE_LIMIT_WINDOW_SECONDS: i64 = 1_800;

/// Process-local throttle keyed by (venue, incident type). Keeps the same
/// problem from spamming contacts when it fires repeatedly at one venue.
/// State does not survive a restart, which is acceptable: the worst case
/// after a restart is one extra notification per key.
pub struct RateLimiter {
    last_notified: Mutex<HashMap<(String, IncidentType), i64>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self {
            last_notified: Mutex::new(HashMap::new()),
        }
    }

    /// True while the key was notified less than a full window ago.
    pub fn is_limited(&self, venue_id: &str, incident_type: IncidentType, now: i64) -> bool {
        let map = self.last_notified.lock().unwrap_or_else(|e| e.into_inner());

        match map.get(&(venue_id.to_string(), incident_type)) {
            Some(last) => now - last < RATE_LIMIT_WINDOW_SECONDS,
            None => false,
        }
    }

    /// Records a successful notification so later incidents get throttled.
    pub fn record(&self, venue_id: &str, incident_type: IncidentType, now: i64) {
        let mut map = self.last_notified.lock().unwrap_or_else(|e| e.into_inner());
        map.insert((venue_id.to_string(), incident_type), now);
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}
