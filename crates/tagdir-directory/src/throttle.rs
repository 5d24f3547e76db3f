//! Cooldown gate for background recomputation.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

/// Process-wide gate limiting how often a refresh may be scheduled.
///
/// The gate is open until [`try_open`](Self::try_open) succeeds, then stays
/// closed until the cooldown deadline elapses. Reopening is checked lazily
/// against the deadline, so no timer task is involved and a failed refresh
/// cannot keep the gate shut.
#[derive(Debug)]
pub struct RefreshThrottle {
    cooldown: Duration,
    /// `None` until the first successful `try_open`.
    reopens_at: Mutex<Option<Instant>>,
}

impl RefreshThrottle {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            reopens_at: Mutex::new(None),
        }
    }

    /// Claim the gate for one refresh.
    ///
    /// Returns `true` for exactly one caller per cooldown window and closes
    /// the gate until `now + cooldown`.
    pub fn try_open(&self) -> bool {
        let now = Instant::now();
        let mut reopens_at = self.reopens_at.lock().unwrap_or_else(PoisonError::into_inner);
        match *reopens_at {
            Some(deadline) if now < deadline => false,
            _ => {
                *reopens_at = Some(now + self.cooldown);
                true
            }
        }
    }

    /// Whether the next `try_open` would succeed.
    pub fn is_open(&self) -> bool {
        let reopens_at = self.reopens_at.lock().unwrap_or_else(PoisonError::into_inner);
        reopens_at.is_none_or(|deadline| Instant::now() >= deadline)
    }
}
