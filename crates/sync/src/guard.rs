use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

/// Explicit per-account sync lifecycle. Replaces ad hoc boolean in-flight
/// flags with a small sequential state machine driven by begin/settle events.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncPhase {
    Idle,
    Syncing,
    CoolingDown { until: DateTime<Utc> },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SyncRejection {
    #[error("a sync for this account is already in flight")]
    InFlight,
    #[error("sync cooldown has {remaining_secs}s remaining")]
    CoolingDown { remaining_secs: i64 },
}

/// Guards one account's sync traffic: at most one fetch in flight, and a
/// minimum cooldown between the end of one sync and the start of the next.
/// The upstream reporting API is rate limited and can return incomplete data
/// when called too frequently. Rejected requests are dropped, never queued.
#[derive(Clone, Debug)]
pub struct SyncGuard {
    phase: SyncPhase,
    cooldown: Duration,
}

impl SyncGuard {
    pub fn new(cooldown: Duration) -> Self {
        Self { phase: SyncPhase::Idle, cooldown }
    }

    pub fn phase(&self) -> SyncPhase {
        self.phase
    }

    pub fn try_begin(&mut self, now: DateTime<Utc>) -> Result<(), SyncRejection> {
        match self.phase {
            SyncPhase::Syncing => Err(SyncRejection::InFlight),
            SyncPhase::CoolingDown { until } if now < until => {
                Err(SyncRejection::CoolingDown { remaining_secs: (until - now).num_seconds() })
            }
            SyncPhase::Idle | SyncPhase::CoolingDown { .. } => {
                self.phase = SyncPhase::Syncing;
                Ok(())
            }
        }
    }

    /// The fetch settled, success or failure; the cooldown applies to both
    /// since the upstream rate limit does not distinguish them.
    pub fn settle(&mut self, now: DateTime<Utc>) {
        if self.phase == SyncPhase::Syncing {
            self.phase = SyncPhase::CoolingDown { until: now + self.cooldown };
        }
    }
}
