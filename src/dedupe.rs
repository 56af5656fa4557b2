//! TTL-bounded set of processed inbound event ids.
//!
//! Chat platforms redeliver webhook events; the adapter consults this set
//! before starting a turn. Entries expire after the TTL so the set stays
//! bounded. Interior mutex; lock scope is one check-and-insert.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

pub const DEFAULT_TTL: Duration = Duration::from_secs(15 * 60);

pub struct EventDedupe {
    ttl: Duration,
    seen: Mutex<HashMap<String, Instant>>,
}

impl Default for EventDedupe {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl EventDedupe {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            seen: Mutex::new(HashMap::new()),
        }
    }

    /// Record `event_id` if unseen within the TTL. Returns `true` for a
    /// first delivery, `false` for a duplicate. Expired entries are pruned
    /// on every call.
    pub fn first_delivery(&self, event_id: &str) -> bool {
        let mut seen = self.seen.lock().expect("dedupe lock");
        let now = Instant::now();
        seen.retain(|_, at| now.duration_since(*at) < self.ttl);

        if seen.contains_key(event_id) {
            return false;
        }
        seen.insert(event_id.to_string(), now);
        true
    }

    pub fn len(&self) -> usize {
        self.seen.lock().expect("dedupe lock").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
