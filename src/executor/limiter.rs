use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::time::{sleep_until, Instant};

/// Aggregate request-rate gate shared by every VU.
///
/// Each admission reserves the next free slot and pushes the following slot
/// one interval later. Slots are never closer than `interval`, so a
/// half-open one-second window holds at most `rps` admissions. Idle time is
/// not banked: after a quiet period the next slot is simply "now".
#[derive(Debug)]
pub struct RateLimiter {
    interval: Option<Duration>,
    next_slot: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// `rps == 0` builds a limiter that admits everything.
    pub fn new(rps: u64) -> Self {
        let interval = (rps > 0).then(|| {
            // Round up so `rps` intervals always span at least a full second.
            Duration::from_nanos((1_000_000_000 + rps - 1) / rps)
        });
        Self {
            interval,
            next_slot: Mutex::new(None),
        }
    }

    pub fn unlimited() -> Self {
        Self::new(0)
    }

    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }

    /// Waits for an admission slot. Returns `false` without waiting when the
    /// slot would fall at or after `deadline`.
    pub async fn acquire(&self, deadline: Instant) -> bool {
        let Some(interval) = self.interval else {
            return Instant::now() < deadline;
        };

        let slot = {
            let mut next = self.next_slot.lock().unwrap_or_else(PoisonError::into_inner);
            let now = Instant::now();
            let slot = match *next {
                Some(reserved) if reserved > now => reserved,
                _ => now,
            };
            if slot >= deadline {
                return false;
            }
            *next = Some(slot + interval);
            slot
        };

        sleep_until(slot).await;
        true
    }
}
