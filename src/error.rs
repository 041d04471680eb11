// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Error types shared by the store, selector and reflector layers

use std::time::Duration;

/// Failure talking to the remote store (list, watch, or an event on the watch)
///
/// Every variant is transient from the reflector's point of view: the sync
/// loop backs off and re-lists on any of them.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Transport or HTTP-level failure reported by the client
    #[error("K8s API error: {0}")]
    Kube(#[from] kube::Error),

    /// The server sent an error status inside the watch stream (e.g. 410 Gone)
    #[error("watch error {code}: {message}")]
    Api { code: u16, message: String },

    /// The server ended the watch stream
    #[error("watch stream closed by server")]
    StreamClosed,
}

/// Invalid namespace or label in a selector
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectorError {
    #[error("invalid namespace '{namespace}': {reason}")]
    Namespace { namespace: String, reason: String },

    #[error("invalid label key '{key}': {reason}")]
    LabelKey { key: String, reason: String },

    #[error("invalid value '{value}' for label '{key}': {reason}")]
    LabelValue {
        key: String,
        value: String,
        reason: String,
    },
}

/// Backoff limits that would break the retry schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BackoffConfigError {
    /// A zero floor never grows, so the ceiling is never reached
    #[error("backoff floor_ms must be greater than zero")]
    ZeroFloor,

    #[error("backoff floor_ms ({floor_ms}) must not exceed ceiling_ms ({ceiling_ms})")]
    FloorAboveCeiling { floor_ms: u64, ceiling_ms: u64 },
}

/// Errors surfaced by a [`crate::reflector::Reflector`]
#[derive(Debug, thiserror::Error)]
pub enum ReflectorError {
    /// A fetch failed before the sync loop was running
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Failures kept recurring until the backoff delay passed its ceiling
    #[error("giving up after {failures} consecutive failures (next delay {next_delay:?} exceeds {ceiling:?})")]
    Exhausted {
        failures: u32,
        next_delay: Duration,
        ceiling: Duration,
        #[source]
        source: StoreError,
    },

    /// The reflector was built with unusable backoff limits
    #[error("invalid backoff configuration: {0}")]
    Backoff(#[from] BackoffConfigError),

    /// `start` was called on a reflector that is already running
    #[error("thread watching for resources is already running")]
    AlreadyStarted,

    /// `wait` was called before `start`, or twice
    #[error("reflector has no running sync loop to wait on")]
    NotStarted,

    /// The sync loop task panicked or was aborted
    #[error("sync loop task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl ReflectorError {
    /// Whether this error means the mirror has lost synchronization for good
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Exhausted { .. } | Self::Task(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exhausted_keeps_source() {
        use std::error::Error;

        let err = ReflectorError::Exhausted {
            failures: 9,
            next_delay: Duration::from_millis(51_200),
            ceiling: Duration::from_secs(30),
            source: StoreError::StreamClosed,
        };
        assert!(err.is_fatal());
        assert!(err.to_string().contains("9 consecutive failures"));
        let source = err.source().unwrap();
        assert_eq!(source.to_string(), "watch stream closed by server");
    }

    #[test]
    fn test_programming_errors_are_not_fatal() {
        assert!(!ReflectorError::AlreadyStarted.is_fatal());
        assert!(!ReflectorError::NotStarted.is_fatal());
        assert!(!ReflectorError::Store(StoreError::StreamClosed).is_fatal());
        assert!(!ReflectorError::Backoff(BackoffConfigError::ZeroFloor).is_fatal());
    }

    #[test]
    fn test_api_error_display() {
        let err = StoreError::Api {
            code: 410,
            message: "too old resource version".to_string(),
        };
        assert_eq!(err.to_string(), "watch error 410: too old resource version");
    }
}
