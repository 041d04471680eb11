// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

use futures::StreamExt;
use std::convert::Infallible;
use tracing::{debug, trace};

use super::backoff::Backoff;
use super::mirror::{Applied, MirrorWriter};
use crate::error::StoreError;
use crate::kubernetes::{ChangeEvent, EventStream, ResourceStore, SelectorSpec};
use crate::progress::SyncReporter;

/// An open watch. Dropping it closes the underlying connection.
pub(crate) struct Subscription {
    events: EventStream,
    namespace: String,
    resource_version: String,
}

impl Subscription {
    pub async fn open(
        store: &dyn ResourceStore,
        selector: &SelectorSpec,
        resource_version: &str,
    ) -> Result<Self, StoreError> {
        let events = store.watch(selector, resource_version).await?;
        Ok(Self {
            events,
            namespace: selector.namespace().to_string(),
            resource_version: resource_version.to_string(),
        })
    }

    /// Next event in server order; the end of the stream is an error
    pub async fn next_event(&mut self) -> Result<ChangeEvent, StoreError> {
        match self.events.next().await {
            Some(event) => event,
            None => Err(StoreError::StreamClosed),
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        debug!(
            namespace = %self.namespace,
            resource_version = %self.resource_version,
            "Released watch"
        );
    }
}

/// Watch from `resource_version` and apply every event to the mirror
///
/// Runs until the watch fails and returns that error. Each applied event
/// (bookmarks included) resets `backoff`. The subscription is dropped on
/// every return path.
pub(crate) async fn stream_changes(
    store: &dyn ResourceStore,
    selector: &SelectorSpec,
    resource_version: &str,
    writer: &mut MirrorWriter,
    backoff: &mut Backoff,
    reporter: &SyncReporter,
) -> Result<Infallible, StoreError> {
    let mut subscription = Subscription::open(store, selector, resource_version).await?;
    reporter.streaming(resource_version);

    loop {
        let event = subscription.next_event().await?;
        backoff.reset();

        let kind = event.kind();
        match writer.apply(event) {
            Applied::Upserted(name) | Applied::Removed(name) => {
                debug!(event = %kind, name = %name, "Applied event");
                reporter.applied(kind, &name);
            }
            Applied::AlreadyAbsent(name) => {
                debug!(name = %name, "Deleted resource was already absent");
            }
            Applied::Unchanged => {
                trace!(event = %kind, "Event left mirror unchanged");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflector::backoff::BackoffConfig;
    use crate::reflector::mirror::Mirror;
    use crate::reflector::testing::{FakeStore, pod, selector};
    use std::time::Duration;

    fn run_to_end(
        store: &FakeStore,
        writer: &mut MirrorWriter,
        backoff: &mut Backoff,
        reporter: &SyncReporter,
    ) -> StoreError {
        let result = futures::executor::block_on(stream_changes(
            store,
            &selector(),
            "1",
            writer,
            backoff,
            reporter,
        ));
        match result {
            Ok(never) => match never {},
            Err(e) => e,
        }
    }

    #[test]
    fn test_events_applied_in_order_until_close() {
        let store = FakeStore::new();
        store.push_watch(
            vec![
                Ok(ChangeEvent::Added(pod("a", "2"))),
                Ok(ChangeEvent::Modified(pod("a", "3"))),
                Ok(ChangeEvent::Added(pod("b", "4"))),
                Ok(ChangeEvent::Deleted(pod("a", "5"))),
            ],
            false,
        );
        let (mirror, mut writer) = Mirror::new();
        let mut backoff = Backoff::default();
        let reporter = SyncReporter::new();

        let err = run_to_end(&store, &mut writer, &mut backoff, &reporter);

        assert!(matches!(err, StoreError::StreamClosed));
        assert_eq!(mirror.names(), vec!["b"]);
        assert_eq!(reporter.events_applied(), 4);
        assert_eq!(store.released(), 1);
    }

    #[test]
    fn test_error_event_ends_stream_and_releases() {
        let store = FakeStore::new();
        store.push_watch(
            vec![
                Ok(ChangeEvent::Added(pod("a", "2"))),
                Err(StoreError::Api {
                    code: 410,
                    message: "Gone".to_string(),
                }),
                Ok(ChangeEvent::Added(pod("never", "3"))),
            ],
            true,
        );
        let (mirror, mut writer) = Mirror::new();
        let mut backoff = Backoff::default();
        let reporter = SyncReporter::new();

        let err = run_to_end(&store, &mut writer, &mut backoff, &reporter);

        assert!(matches!(err, StoreError::Api { code: 410, .. }));
        assert_eq!(mirror.names(), vec!["a"]);
        assert_eq!(store.opened(), 1);
        assert_eq!(store.released(), 1);
    }

    #[test]
    fn test_open_failure_propagates() {
        let store = FakeStore::new();
        store.push_watch_err(StoreError::Api {
            code: 403,
            message: "forbidden".to_string(),
        });
        let (_mirror, mut writer) = Mirror::new();
        let mut backoff = Backoff::default();
        let reporter = SyncReporter::new();

        let err = run_to_end(&store, &mut writer, &mut backoff, &reporter);

        assert!(matches!(err, StoreError::Api { code: 403, .. }));
        assert_eq!(store.opened(), 0);
    }

    #[test]
    fn test_events_reset_backoff() {
        let store = FakeStore::new();
        store.push_watch(
            vec![Ok(ChangeEvent::Bookmark {
                resource_version: "9".to_string(),
            })],
            false,
        );
        let (mirror, mut writer) = Mirror::new();
        let mut backoff = Backoff::new(BackoffConfig::default());
        backoff.next_delay();
        backoff.next_delay();
        assert_eq!(backoff.current(), Duration::from_millis(400));
        let reporter = SyncReporter::new();

        run_to_end(&store, &mut writer, &mut backoff, &reporter);

        assert_eq!(backoff.current(), Duration::from_millis(100));
        assert_eq!(backoff.failures(), 0);
        assert!(mirror.is_empty());
        // Bookmarks are not counted as applied events
        assert_eq!(reporter.events_applied(), 0);
    }

    #[test]
    fn test_delete_of_absent_resource_is_silent() {
        let store = FakeStore::new();
        store.push_watch(vec![Ok(ChangeEvent::Deleted(pod("ghost", "2")))], false);
        let (mirror, mut writer) = Mirror::new();
        writer.replace(vec![pod("a", "1")]);
        let mut backoff = Backoff::default();
        let reporter = SyncReporter::new();

        let err = run_to_end(&store, &mut writer, &mut backoff, &reporter);

        assert!(matches!(err, StoreError::StreamClosed));
        assert_eq!(mirror.names(), vec!["a"]);
        assert_eq!(reporter.events_applied(), 0);
    }
}
