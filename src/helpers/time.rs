use std::fmt::Debug;

use chrono::Utc;
use tokio::time::Instant;

/// Source of "now" for token expiry arithmetic, in UNIX seconds.
pub trait Clock: Send + Sync + Debug {
    fn now_unix(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix(&self) -> i64 {
        now_i64()
    }
}

pub fn now_i64() -> i64 {
    Utc::now().timestamp()
}

pub fn get_instant() -> Instant {
    Instant::now()
}
