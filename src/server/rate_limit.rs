//! Per-user save throttling
//!
//! In-memory map of last-save instants, shared across handlers through
//! an `Arc`. Single-process only and reset on restart; a multi-instance
//! deployment would need a shared store behind the same interface.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Throttle allowing one save per user per window
#[derive(Clone)]
pub struct SaveRateLimiter {
    window: Duration,
    last_save: Arc<Mutex<HashMap<String, Instant>>>,
}

impl SaveRateLimiter {
    /// Create a limiter with the given minimum interval between saves
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_save: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Record a save attempt for `user_id`
    ///
    /// Returns `true` and stamps the attempt when the window has elapsed
    /// since the user's previous save, `false` when the user is throttled.
    /// Rejected attempts do not move the stamp, so a burst of rejected
    /// saves cannot extend the throttle.
    pub fn try_acquire(&self, user_id: &str) -> bool {
        let now = Instant::now();
        let mut last_save = match self.last_save.lock() {
            Ok(guard) => guard,
            // A poisoned lock only means another thread panicked while
            // holding it; the map itself is still usable.
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(previous) = last_save.get(user_id) {
            if now.duration_since(*previous) < self.window {
                return false;
            }
        }
        last_save.insert(user_id.to_string(), now);
        true
    }
}
