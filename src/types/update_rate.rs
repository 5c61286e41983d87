//! Update rate control for state subscriptions

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Update rate for state subscriptions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum UpdateRate {
    /// Every receipt as it is dispatched
    Native,

    /// Throttled to at most this many updates per second
    /// A rate of zero behaves like Native
    Max(u32),
}

impl UpdateRate {
    /// Collapse degenerate rates to Native
    pub fn normalize(self) -> Self {
        match self {
            UpdateRate::Max(0) => UpdateRate::Native,
            other => other,
        }
    }

    /// Check if throttling is needed
    pub fn needs_throttle(self) -> bool {
        self.throttle_interval().is_some()
    }

    /// Get throttle interval if needed
    pub fn throttle_interval(self) -> Option<Duration> {
        match self.normalize() {
            UpdateRate::Native => None,
            UpdateRate::Max(hz) => Some(Duration::from_secs_f64(1.0 / hz as f64)),
        }
    }
}
