// ── Runtime tuning ──
//
// These types describe how the cache and the job monitor behave.
// They never touch disk: `adminkit-config` builds them from the
// config file and hands them in.

use std::num::NonZeroUsize;
use std::time::Duration;

/// Size policy for a [`ResultCache`](crate::ResultCache).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CachePolicy {
    /// Maximum number of entries before least-recently-used eviction.
    /// `None` keeps every entry for the life of the process.
    pub capacity: Option<NonZeroUsize>,
}

impl CachePolicy {
    pub fn unbounded() -> Self {
        Self { capacity: None }
    }

    pub fn bounded(capacity: NonZeroUsize) -> Self {
        Self {
            capacity: Some(capacity),
        }
    }
}

/// Polling cadence for a [`JobMonitor`](crate::JobMonitor).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    /// Wait between the server accepting the job and the first poll.
    pub initial_delay: Duration,
    /// Wait between consecutive polls.
    pub interval: Duration,
    /// Number of polls after which the monitor gives up (TimedOut).
    pub max_attempts: u32,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            interval: Duration::from_secs(2),
            max_attempts: 60,
        }
    }
}

impl PollSettings {
    /// Upper bound on how long a run waits before timing out.
    pub fn max_wait(&self) -> Duration {
        self.initial_delay + self.interval.saturating_mul(self.max_attempts.saturating_sub(1))
    }
}
