//! Per-user anti-spam windows for the rate-limited commands.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use teloxide::types::UserId;

/// Cooldown bucket a command belongs to. The buckets are independent:
/// using `/jadwal` does not start the `/rules` window and vice versa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandFamily {
    Query,
    Info,
}

/// Outcome of a cooldown check.
#[derive(Debug, PartialEq, Eq)]
pub enum CooldownDecision {
    Allowed,
    Denied { remaining_minutes: i64 },
}

/// Tracks the last allowed invocation per (user, command family).
///
/// State is in-memory only; a restart resets every window.
pub struct CooldownTracker {
    last_invoked: Mutex<HashMap<(UserId, CommandFamily), DateTime<Utc>>>,
}

impl CooldownTracker {
    pub fn new() -> Self {
        Self { last_invoked: Mutex::new(HashMap::new()) }
    }

    /// Check and, if allowed, immediately claim the window.
    ///
    /// The timestamp is recorded before the guarded command runs, so a
    /// command that fails downstream does not refund its cooldown. The
    /// whole read-check-write runs under one lock guard, so two racing
    /// calls for the same key can never both be allowed.
    pub fn try_acquire(
        &self,
        user: UserId,
        family: CommandFamily,
        now: DateTime<Utc>,
        cooldown_minutes: i64,
    ) -> CooldownDecision {
        let mut last_invoked = self.last_invoked.lock().unwrap();
        if let Some(last) = last_invoked.get(&(user, family)) {
            let elapsed_minutes = (now - *last).num_minutes();
            if elapsed_minutes < cooldown_minutes {
                return CooldownDecision::Denied {
                    remaining_minutes: cooldown_minutes - elapsed_minutes,
                };
            }
        }
        last_invoked.insert((user, family), now);
        CooldownDecision::Allowed
    }
}

impl Default for CooldownTracker {
    fn default() -> Self {
        Self::new()
    }
}
