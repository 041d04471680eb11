// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

mod client;
pub mod discovery;
pub mod selector;

use async_trait::async_trait;
use futures::stream::BoxStream;
use kube::api::DynamicObject;

pub use client::{KubeStore, connect, default_namespace};
pub use selector::SelectorSpec;

use crate::error::StoreError;

/// Result of one full list: every matching object plus the list's resourceVersion
#[derive(Debug, Clone, Default)]
pub struct ListSnapshot {
    pub items: Vec<DynamicObject>,
    /// Version to resume a watch from; `None` if the server did not report one
    pub resource_version: Option<String>,
}

/// Kind of change delivered on a watch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Added,
    Modified,
    Deleted,
    Bookmark,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EventKind::Added => "ADDED",
            EventKind::Modified => "MODIFIED",
            EventKind::Deleted => "DELETED",
            EventKind::Bookmark => "BOOKMARK",
        };
        f.write_str(s)
    }
}

/// One event from the change feed
#[derive(Debug, Clone)]
pub enum ChangeEvent {
    Added(DynamicObject),
    Modified(DynamicObject),
    Deleted(DynamicObject),
    /// Progress marker from the server; carries no object
    Bookmark { resource_version: String },
}

impl ChangeEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            ChangeEvent::Added(_) => EventKind::Added,
            ChangeEvent::Modified(_) => EventKind::Modified,
            ChangeEvent::Deleted(_) => EventKind::Deleted,
            ChangeEvent::Bookmark { .. } => EventKind::Bookmark,
        }
    }
}

/// Ordered, non-restartable feed of changes. Dropping it closes the watch.
pub type EventStream = BoxStream<'static, Result<ChangeEvent, StoreError>>;

/// The remote store a reflector mirrors
///
/// Implementations do not retry; the reflector owns retry policy.
#[async_trait]
pub trait ResourceStore: Send + Sync + 'static {
    /// Fetch every resource matching the selector in one consistent list
    async fn list(&self, selector: &SelectorSpec) -> Result<ListSnapshot, StoreError>;

    /// Open a watch for changes after `resource_version`
    async fn watch(
        &self,
        selector: &SelectorSpec,
        resource_version: &str,
    ) -> Result<EventStream, StoreError>;
}
