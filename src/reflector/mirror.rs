// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! The in-memory mirror of remote resources
//!
//! Readers load an immutable `Arc<HashMap>` snapshot through `ArcSwap`, so
//! reads never block and never see a half-applied change. The single writer
//! builds the next map and publishes it with one pointer swap.
//!
//! Each applied event clones the whole map, so one event costs O(n) in the
//! number of mirrored resources. That is cheap for the few thousand objects a
//! namespace and label selector usually match; a much larger set would want a
//! persistent map instead.

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use kube::Resource;
use kube::api::DynamicObject;
use kube::core::dynamic::ParseDynamicObjectError;
use serde::de::DeserializeOwned;

use crate::kubernetes::ChangeEvent;

/// Name of a resource within its namespace
pub type ResourceKey = String;

/// One published state of the mirror
pub type Resources = HashMap<ResourceKey, Arc<DynamicObject>>;

/// Read-only, cheaply cloneable view of the mirror
#[derive(Clone)]
pub struct Mirror {
    inner: Arc<ArcSwap<Resources>>,
}

impl Mirror {
    /// Create an empty mirror and the only writer that can update it
    pub(crate) fn new() -> (Mirror, MirrorWriter) {
        let inner = Arc::new(ArcSwap::from_pointee(Resources::new()));
        (
            Mirror {
                inner: Arc::clone(&inner),
            },
            MirrorWriter { inner },
        )
    }

    /// Current contents. The returned map never changes; load again for newer state.
    pub fn snapshot(&self) -> Arc<Resources> {
        self.inner.load_full()
    }

    pub fn get(&self, name: &str) -> Option<Arc<DynamicObject>> {
        self.inner.load().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.load().contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.inner.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.load().is_empty()
    }

    /// Resource names, sorted
    pub fn names(&self) -> Vec<ResourceKey> {
        let mut names: Vec<_> = self.inner.load().keys().cloned().collect();
        names.sort_unstable();
        names
    }

    /// Look up a resource and decode it into a typed k8s-openapi object
    pub fn get_typed<K>(&self, name: &str) -> Option<Result<K, ParseDynamicObjectError>>
    where
        K: Resource + DeserializeOwned,
    {
        self.get(name)
            .map(|obj| DynamicObject::clone(&obj).try_parse::<K>())
    }
}

impl std::fmt::Debug for Mirror {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mirror").field("len", &self.len()).finish()
    }
}

/// What applying one event did to the mirror
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    /// ADDED or MODIFIED stored the object under its name
    Upserted(ResourceKey),
    /// DELETED removed the entry
    Removed(ResourceKey),
    /// DELETED for a name that was not in the mirror
    AlreadyAbsent(ResourceKey),
    /// Bookmark, or an object without a name
    Unchanged,
}

/// Exclusive write handle; not `Clone`, so there is exactly one writer
pub(crate) struct MirrorWriter {
    inner: Arc<ArcSwap<Resources>>,
}

impl MirrorWriter {
    /// Replace the whole mirror with `items`; anything not in `items` is gone
    pub fn replace(&mut self, items: Vec<DynamicObject>) -> usize {
        let resources: Resources = items
            .into_iter()
            .filter_map(|obj| key_of(&obj).map(|key| (key, Arc::new(obj))))
            .collect();
        let count = resources.len();
        self.inner.store(Arc::new(resources));
        count
    }

    /// Apply one change event
    pub fn apply(&mut self, event: ChangeEvent) -> Applied {
        match event {
            ChangeEvent::Added(obj) | ChangeEvent::Modified(obj) => {
                let Some(key) = key_of(&obj) else {
                    return Applied::Unchanged;
                };
                let mut next = Resources::clone(&self.inner.load());
                next.insert(key.clone(), Arc::new(obj));
                self.inner.store(Arc::new(next));
                Applied::Upserted(key)
            }
            ChangeEvent::Deleted(obj) => {
                let Some(key) = key_of(&obj) else {
                    return Applied::Unchanged;
                };
                let current = self.inner.load();
                if !current.contains_key(&key) {
                    return Applied::AlreadyAbsent(key);
                }
                let mut next = Resources::clone(&current);
                drop(current);
                next.remove(&key);
                self.inner.store(Arc::new(next));
                Applied::Removed(key)
            }
            ChangeEvent::Bookmark { .. } => Applied::Unchanged,
        }
    }
}

fn key_of(obj: &DynamicObject) -> Option<ResourceKey> {
    obj.metadata.name.clone().filter(|name| !name.is_empty())
}
