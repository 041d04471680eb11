// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Progress reporting for the sync loop
//!
//! Lets the hosting process follow what a reflector is doing (snapshots,
//! applied events, retries, giving up) without touching the mirror.

use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::broadcast;

use crate::kubernetes::EventKind;

/// Create a spinner with consistent styling
pub fn create_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
            .template("{spinner:.cyan} {msg} {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

/// Where the sync loop currently is
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum SyncPhase {
    Starting = 0,
    Snapshotting = 1,
    Streaming = 2,
    BackingOff = 3,
    Fatal = 4,
}

impl SyncPhase {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => SyncPhase::Snapshotting,
            2 => SyncPhase::Streaming,
            3 => SyncPhase::BackingOff,
            4 => SyncPhase::Fatal,
            _ => SyncPhase::Starting,
        }
    }
}

/// Progress update message
#[derive(Clone, Debug)]
pub enum SyncUpdate {
    /// Full list started
    Snapshotting,
    /// Full list finished and replaced the mirror
    Snapshotted {
        count: usize,
        resource_version: Option<String>,
    },
    /// Watch opened
    Streaming { resource_version: String },
    /// One event applied to the mirror
    Applied { kind: EventKind, name: String },
    /// A failure; the loop sleeps `delay` and re-lists
    BackingOff {
        delay: Duration,
        failures: u32,
        error: String,
    },
    /// Backoff exhausted; the loop has stopped
    Fatal { error: String },
}

/// Progress reporter for one reflector
pub struct SyncReporter {
    sender: broadcast::Sender<SyncUpdate>,
    phase: AtomicU8,
    snapshots: AtomicU64,
    events_applied: AtomicU64,
    failures: AtomicU64,
}

impl SyncReporter {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(100);
        Self {
            sender,
            phase: AtomicU8::new(SyncPhase::Starting as u8),
            snapshots: AtomicU64::new(0),
            events_applied: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        }
    }

    /// Subscribe to progress updates
    pub fn subscribe(&self) -> broadcast::Receiver<SyncUpdate> {
        self.sender.subscribe()
    }

    pub fn phase(&self) -> SyncPhase {
        SyncPhase::from_u8(self.phase.load(Ordering::SeqCst))
    }

    fn set_phase(&self, phase: SyncPhase) {
        self.phase.store(phase as u8, Ordering::SeqCst);
    }

    /// Report list start
    pub fn snapshotting(&self) {
        self.set_phase(SyncPhase::Snapshotting);
        let _ = self.sender.send(SyncUpdate::Snapshotting);
    }

    /// Report list complete
    pub fn snapshotted(&self, count: usize, resource_version: Option<&str>) {
        self.snapshots.fetch_add(1, Ordering::SeqCst);
        let _ = self.sender.send(SyncUpdate::Snapshotted {
            count,
            resource_version: resource_version.map(String::from),
        });
    }

    /// Report watch opened
    pub fn streaming(&self, resource_version: &str) {
        self.set_phase(SyncPhase::Streaming);
        let _ = self.sender.send(SyncUpdate::Streaming {
            resource_version: resource_version.to_string(),
        });
    }

    /// Report an event applied to the mirror
    pub fn applied(&self, kind: EventKind, name: &str) {
        self.events_applied.fetch_add(1, Ordering::SeqCst);
        let _ = self.sender.send(SyncUpdate::Applied {
            kind,
            name: name.to_string(),
        });
    }

    /// Report a failure and the delay before the next attempt
    pub fn backing_off(&self, delay: Duration, failures: u32, error: &str) {
        self.set_phase(SyncPhase::BackingOff);
        self.failures.fetch_add(1, Ordering::SeqCst);
        let _ = self.sender.send(SyncUpdate::BackingOff {
            delay,
            failures,
            error: error.to_string(),
        });
    }

    /// Report that the loop gave up
    pub fn fatal(&self, error: &str) {
        self.set_phase(SyncPhase::Fatal);
        self.failures.fetch_add(1, Ordering::SeqCst);
        let _ = self.sender.send(SyncUpdate::Fatal {
            error: error.to_string(),
        });
    }

    /// Completed full lists
    pub fn snapshots(&self) -> u64 {
        self.snapshots.load(Ordering::SeqCst)
    }

    /// Events applied to the mirror, bookmarks excluded
    pub fn events_applied(&self) -> u64 {
        self.events_applied.load(Ordering::SeqCst)
    }

    /// Failures over the reflector's lifetime, including the fatal one
    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::SeqCst)
    }
}

impl Default for SyncReporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Thread-safe handle to progress reporter
pub type SyncHandle = Arc<SyncReporter>;

/// Create a new progress reporter handle
pub fn create_sync_handle() -> SyncHandle {
    Arc::new(SyncReporter::new())
}
