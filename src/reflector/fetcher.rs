// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

use std::time::Instant;
use tracing::info;

use super::mirror::MirrorWriter;
use crate::error::StoreError;
use crate::kubernetes::{ResourceStore, SelectorSpec};
use crate::progress::SyncReporter;

/// Version to watch from when the list carried none ("any version")
const ANY_VERSION: &str = "0";

/// Full fetch: list everything matching `selector` and replace the mirror
///
/// The mirror is overwritten, not merged, so resources deleted remotely since
/// the last fetch disappear. No retries here. Returns the resourceVersion the
/// following watch should start from.
pub(crate) async fn fetch_snapshot(
    store: &dyn ResourceStore,
    selector: &SelectorSpec,
    writer: &mut MirrorWriter,
    reporter: &SyncReporter,
) -> Result<String, StoreError> {
    reporter.snapshotting();
    let start = Instant::now();

    let snapshot = store.list(selector).await?;
    let count = writer.replace(snapshot.items);
    reporter.snapshotted(count, snapshot.resource_version.as_deref());

    info!(
        namespace = %selector.namespace(),
        label_selector = %selector.label_selector(),
        resources = count,
        resource_version = ?snapshot.resource_version,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Replaced mirror from full list"
    );

    Ok(snapshot
        .resource_version
        .filter(|rv| !rv.is_empty())
        .unwrap_or_else(|| ANY_VERSION.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflector::mirror::Mirror;
    use crate::reflector::testing::{FakeStore, pod, selector};

    #[tokio::test]
    async fn test_fetch_replaces_mirror() {
        let store = FakeStore::new();
        store.push_list(vec![pod("a", "1"), pod("b", "2")], Some("7"));
        store.push_list(vec![pod("b", "3")], None);
        let (mirror, mut writer) = Mirror::new();
        let reporter = SyncReporter::new();

        let rv = fetch_snapshot(&store, &selector(), &mut writer, &reporter)
            .await
            .unwrap();
        assert_eq!(rv, "7");
        assert_eq!(mirror.names(), vec!["a", "b"]);

        let rv = fetch_snapshot(&store, &selector(), &mut writer, &reporter)
            .await
            .unwrap();
        assert_eq!(rv, ANY_VERSION);
        assert_eq!(mirror.names(), vec!["b"]);
        assert_eq!(reporter.snapshots(), 2);
    }

    #[tokio::test]
    async fn test_fetch_error_leaves_mirror_untouched() {
        let store = FakeStore::new();
        store.push_list(vec![pod("a", "1")], Some("1"));
        store.push_list_err(StoreError::Api {
            code: 503,
            message: "unavailable".to_string(),
        });
        let (mirror, mut writer) = Mirror::new();
        let reporter = SyncReporter::new();

        fetch_snapshot(&store, &selector(), &mut writer, &reporter)
            .await
            .unwrap();
        let err = fetch_snapshot(&store, &selector(), &mut writer, &reporter)
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::Api { code: 503, .. }));
        assert_eq!(mirror.names(), vec!["a"]);
        assert_eq!(store.list_calls(), 2);
    }
}
