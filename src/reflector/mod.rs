// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Local, continuously updated copy of a set of Kubernetes resources
//!
//! A [`Reflector`] lists every resource matching its selector, then watches
//! for changes and applies them to a [`Mirror`] that any number of readers can
//! consult without touching the API server.
//!
//! Lifecycle:
//! 1. `Reflector::new` builds an idle reflector with an empty mirror
//! 2. `start` performs one full list before returning, so readers never see
//!    an empty mirror just because the watch has not caught up yet
//! 3. A background task watches; on any failure it backs off exponentially,
//!    re-lists to close the gap, and watches again
//! 4. When the delay would exceed the ceiling the task ends and `wait`
//!    returns [`ReflectorError::Exhausted`]. Nothing restarts it; the mirror
//!    keeps its last contents and the host decides what to do.

mod backoff;
mod fetcher;
mod mirror;
mod subscriber;
mod sync_loop;
#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::info;

pub use backoff::{Backoff, BackoffConfig, DEFAULT_CEILING, DEFAULT_FLOOR};
pub use mirror::{Applied, Mirror, ResourceKey, Resources};

use crate::error::ReflectorError;
use crate::kubernetes::{ResourceStore, SelectorSpec};
use crate::progress::{SyncHandle, create_sync_handle};
use fetcher::fetch_snapshot;
use mirror::MirrorWriter;
use sync_loop::SyncLoop;

/// Keeps a [`Mirror`] in sync with the resources selected by a [`SelectorSpec`]
///
/// Create one per resource set and start it exactly once; independent
/// instances do not share anything.
pub struct Reflector {
    store: Arc<dyn ResourceStore>,
    selector: SelectorSpec,
    backoff: BackoffConfig,
    mirror: Mirror,
    /// Taken by the first successful `start`
    writer: Mutex<Option<MirrorWriter>>,
    task: Mutex<Option<JoinHandle<ReflectorError>>>,
    progress: SyncHandle,
}

impl Reflector {
    /// Create an idle reflector (no I/O until `start`)
    pub fn new(store: Arc<dyn ResourceStore>, selector: SelectorSpec, backoff: BackoffConfig) -> Self {
        let (mirror, writer) = Mirror::new();
        Self {
            store,
            selector,
            backoff,
            mirror,
            writer: Mutex::new(Some(writer)),
            task: Mutex::new(None),
            progress: create_sync_handle(),
        }
    }

    /// Start the reflection process
    ///
    /// Does a full list first and only returns once the mirror holds it, then
    /// spawns the background sync loop. Must be called from a tokio runtime.
    ///
    /// Fails with [`ReflectorError::Backoff`] if the backoff limits are
    /// unusable, and with [`ReflectorError::AlreadyStarted`] if this reflector was
    /// started before (or is starting concurrently). If the initial list fails
    /// its error is returned, nothing is spawned, and `start` may be retried.
    pub async fn start(&self) -> Result<(), ReflectorError> {
        self.backoff.validate()?;

        let mut writer = self
            .writer
            .lock()
            .await
            .take()
            .ok_or(ReflectorError::AlreadyStarted)?;

        info!(selector = %self.selector, "Starting reflector");

        let resource_version =
            match fetch_snapshot(self.store.as_ref(), &self.selector, &mut writer, &self.progress)
                .await
            {
                Ok(rv) => rv,
                Err(e) => {
                    *self.writer.lock().await = Some(writer);
                    return Err(e.into());
                }
            };

        let sync = SyncLoop {
            store: Arc::clone(&self.store),
            selector: self.selector.clone(),
            writer,
            backoff: Backoff::new(self.backoff),
            reporter: Arc::clone(&self.progress),
        };
        let handle = tokio::spawn(sync.run(resource_version));
        *self.task.lock().await = Some(handle);

        Ok(())
    }

    /// Read-only view of the mirrored resources
    pub fn mirror(&self) -> Mirror {
        self.mirror.clone()
    }

    pub fn selector(&self) -> &SelectorSpec {
        &self.selector
    }

    /// Progress reporter handle for subscribing to sync updates
    pub fn progress(&self) -> &SyncHandle {
        &self.progress
    }

    /// Whether the background loop is alive
    pub async fn is_running(&self) -> bool {
        self.task
            .lock()
            .await
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Wait for the background loop to end and return the error that ended it
    ///
    /// The loop only ends by exhausting its backoff (or by panicking), so the
    /// result is always an error. Returns [`ReflectorError::NotStarted`] if
    /// there is no loop to wait on.
    pub async fn wait(&self) -> ReflectorError {
        let Some(handle) = self.task.lock().await.take() else {
            return ReflectorError::NotStarted;
        };
        match handle.await {
            Ok(error) => error,
            Err(join_error) => ReflectorError::Task(join_error),
        }
    }
}
