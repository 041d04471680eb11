// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::BackoffConfigError;

/// Floor delay; the first retry waits twice this
pub const DEFAULT_FLOOR: Duration = Duration::from_millis(100);

/// Delays above this are not slept; the loop gives up instead
pub const DEFAULT_CEILING: Duration = Duration::from_secs(30);

/// Backoff limits, fixed when a reflector is built
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    /// Floor delay in milliseconds
    pub floor_ms: u64,
    /// Ceiling in milliseconds
    pub ceiling_ms: u64,
}

impl BackoffConfig {
    pub fn floor(&self) -> Duration {
        Duration::from_millis(self.floor_ms)
    }

    pub fn ceiling(&self) -> Duration {
        Duration::from_millis(self.ceiling_ms)
    }

    /// Reject limits under which the loop would either spin without
    /// sleeping or give up on the first failure
    pub fn validate(&self) -> Result<(), BackoffConfigError> {
        if self.floor_ms == 0 {
            return Err(BackoffConfigError::ZeroFloor);
        }
        if self.floor_ms > self.ceiling_ms {
            return Err(BackoffConfigError::FloorAboveCeiling {
                floor_ms: self.floor_ms,
                ceiling_ms: self.ceiling_ms,
            });
        }
        Ok(())
    }
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            floor_ms: DEFAULT_FLOOR.as_millis() as u64,
            ceiling_ms: DEFAULT_CEILING.as_millis() as u64,
        }
    }
}

/// Exponential backoff between sync failures
///
/// The delay doubles on every failure and drops back to the floor whenever
/// an event is applied successfully.
#[derive(Debug, Clone)]
pub struct Backoff {
    floor: Duration,
    ceiling: Duration,
    current: Duration,
    failures: u32,
}

impl Backoff {
    pub fn new(config: BackoffConfig) -> Self {
        Self {
            floor: config.floor(),
            ceiling: config.ceiling(),
            current: config.floor(),
            failures: 0,
        }
    }

    /// Record a failure and return how long to wait before retrying
    ///
    /// Returns `None` once the doubled delay exceeds the ceiling.
    pub fn next_delay(&mut self) -> Option<Duration> {
        self.current = self.current.saturating_mul(2);
        self.failures += 1;
        (self.current <= self.ceiling).then_some(self.current)
    }

    /// Back to the floor after a healthy event
    pub fn reset(&mut self) {
        self.current = self.floor;
        self.failures = 0;
    }

    pub fn current(&self) -> Duration {
        self.current
    }

    pub fn ceiling(&self) -> Duration {
        self.ceiling
    }

    /// Consecutive failures since the last reset
    pub fn failures(&self) -> u32 {
        self.failures
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(BackoffConfig::default())
    }
}
