use std::sync::atomic::{AtomicU64, Ordering};

use pledge_types::Timestamp;

/// Source of "now" for every time-gated check.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// Clock moved explicitly; used by tests and script replay.
#[derive(Debug, Default)]
pub struct ManualClock {
    secs: AtomicU64,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            secs: AtomicU64::new(start.as_secs()),
        }
    }

    pub fn set(&self, at: Timestamp) {
        self.secs.store(at.as_secs(), Ordering::Release);
    }

    /// Move forward by `secs`, returning the new time.
    pub fn advance(&self, secs: u64) -> Timestamp {
        let previous = self
            .secs
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                Some(current.saturating_add(secs))
            })
            .unwrap_or_else(|current| current);
        Timestamp::from_secs(previous.saturating_add(secs))
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_secs(self.secs.load(Ordering::Acquire))
    }
}
