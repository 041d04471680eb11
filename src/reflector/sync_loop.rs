// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

use std::convert::Infallible;
use std::sync::Arc;
use tracing::{error, info, warn};

use super::backoff::Backoff;
use super::fetcher::fetch_snapshot;
use super::mirror::MirrorWriter;
use super::subscriber::stream_changes;
use crate::error::{ReflectorError, StoreError};
use crate::kubernetes::{ResourceStore, SelectorSpec};
use crate::progress::SyncHandle;

/// The background half of a reflector: watch, and on failure back off,
/// re-list and watch again
///
/// Owns the only [`MirrorWriter`]. Ends only when the backoff is exhausted.
pub(crate) struct SyncLoop {
    pub store: Arc<dyn ResourceStore>,
    pub selector: SelectorSpec,
    pub writer: MirrorWriter,
    pub backoff: Backoff,
    pub reporter: SyncHandle,
}

impl SyncLoop {
    /// Run until giving up, starting with a watch from the version of the
    /// list the caller already applied
    pub async fn run(mut self, resource_version: String) -> ReflectorError {
        let mut resume_from = Some(resource_version);

        loop {
            let outcome = match resume_from.take() {
                Some(rv) => self.stream(&rv).await,
                None => self.resync().await,
            };
            let error = match outcome {
                Ok(never) => match never {},
                Err(e) => e,
            };

            match self.backoff.next_delay() {
                Some(delay) => {
                    warn!(
                        namespace = %self.selector.namespace(),
                        label_selector = %self.selector.label_selector(),
                        failures = self.backoff.failures(),
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "Error when watching resources, retrying in {:?}",
                        delay
                    );
                    self.reporter
                        .backing_off(delay, self.backoff.failures(), &error.to_string());
                    tokio::time::sleep(delay).await;
                }
                None => return self.give_up(error),
            }
        }
    }

    /// Full list, then watch from the list's version
    async fn resync(&mut self) -> Result<Infallible, StoreError> {
        let rv = fetch_snapshot(
            self.store.as_ref(),
            &self.selector,
            &mut self.writer,
            &self.reporter,
        )
        .await?;
        self.stream(&rv).await
    }

    async fn stream(&mut self, resource_version: &str) -> Result<Infallible, StoreError> {
        info!(
            namespace = %self.selector.namespace(),
            label_selector = %self.selector.label_selector(),
            resource_version = %resource_version,
            "Watching for resources"
        );
        stream_changes(
            self.store.as_ref(),
            &self.selector,
            resource_version,
            &mut self.writer,
            &mut self.backoff,
            &self.reporter,
        )
        .await
    }

    fn give_up(&self, source: StoreError) -> ReflectorError {
        error!(
            namespace = %self.selector.namespace(),
            label_selector = %self.selector.label_selector(),
            failures = self.backoff.failures(),
            next_delay_ms = self.backoff.current().as_millis() as u64,
            ceiling_ms = self.backoff.ceiling().as_millis() as u64,
            error = %source,
            "Backoff exhausted, mirror is no longer synchronized"
        );
        self.reporter.fatal(&source.to_string());

        ReflectorError::Exhausted {
            failures: self.backoff.failures(),
            next_delay: self.backoff.current(),
            ceiling: self.backoff.ceiling(),
            source,
        }
    }
}
