//! Transaction rate limiting
//!
//! Two independent ceilings gate every transaction attempt: a sliding
//! one-minute window and a session-lifetime cap. The session counter
//! never resets; once the cap is hit the limiter stays exhausted for
//! the life of the process.

use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::warn;

/// Width of the sliding window
const WINDOW: Duration = Duration::from_secs(60);

/// Why a transaction attempt was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RateLimitExceeded {
    #[error("per-minute transaction cap ({0}) hit")]
    PerMinute(u32),
    #[error("session transaction cap ({0}) reached")]
    Session(u32),
}

/// Sliding-window + session-cap limiter
///
/// Single-threaded access assumed; the runner holds exactly one
/// instance per controller and ticks never overlap.
#[derive(Debug)]
pub struct TxRateLimiter {
    max_per_minute: u32,
    max_per_session: u32,
    timestamps: Vec<Instant>,
    session_count: u32,
}

impl TxRateLimiter {
    pub fn new(max_per_minute: u32, max_per_session: u32) -> Self {
        Self {
            max_per_minute,
            max_per_session,
            timestamps: Vec::new(),
            session_count: 0,
        }
    }

    /// Gate-and-record in one step
    ///
    /// On acceptance the current timestamp is recorded and the session
    /// counter incremented; on rejection state is unchanged.
    pub fn can_proceed(&mut self) -> bool {
        match self.check() {
            Ok(()) => {
                self.record();
                true
            }
            Err(_) => false,
        }
    }

    /// Pure gate: prunes the window, then tests both ceilings
    ///
    /// Split from [`record`](Self::record) so the executor can avoid
    /// counting transport failures that never reached the wallet.
    pub fn check(&mut self) -> Result<(), RateLimitExceeded> {
        self.prune();
        if self.timestamps.len() >= self.max_per_minute as usize {
            warn!(max_per_minute = self.max_per_minute, "tx rate limit per minute hit");
            return Err(RateLimitExceeded::PerMinute(self.max_per_minute));
        }
        if self.session_count >= self.max_per_session {
            warn!(max_per_session = self.max_per_session, "tx rate limit per session hit");
            return Err(RateLimitExceeded::Session(self.max_per_session));
        }
        Ok(())
    }

    /// Record one accepted transaction
    pub fn record(&mut self) {
        self.timestamps.push(Instant::now());
        self.session_count += 1;
    }

    /// Transactions recorded over the whole session
    pub fn session_count(&self) -> u32 {
        self.session_count
    }

    fn prune(&mut self) {
        let now = Instant::now();
        self.timestamps.retain(|t| now.duration_since(*t) < WINDOW);
    }

    #[cfg(test)]
    fn backdate_all(&mut self, by: Duration) {
        for t in &mut self.timestamps {
            *t = t.checked_sub(by).expect("clock too close to epoch");
        }
    }
}
