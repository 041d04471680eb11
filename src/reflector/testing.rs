// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Scripted in-memory store for tests

use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::task::{Context, Poll};

use async_trait::async_trait;
use futures::{Stream, StreamExt, stream};
use k8s_openapi::api::core::v1::Pod;
use kube::api::DynamicObject;
use kube::discovery::ApiResource;

use crate::error::StoreError;
use crate::kubernetes::{ChangeEvent, EventStream, ListSnapshot, ResourceStore, SelectorSpec};

pub(crate) fn selector() -> SelectorSpec {
    SelectorSpec::new(
        "default",
        [("heritage", "jupyterhub"), ("component", "singleuser-server")],
    )
    .unwrap()
}

pub(crate) fn pod(name: &str, resource_version: &str) -> DynamicObject {
    let ar = ApiResource::erase::<Pod>(&());
    let mut obj = DynamicObject::new(name, &ar)
        .within("default")
        .data(serde_json::json!({
            "spec": { "containers": [{ "name": "notebook", "image": "jupyter/base" }] },
            "status": { "phase": "Running" },
        }));
    obj.metadata.resource_version = Some(resource_version.to_string());
    obj
}

fn unavailable() -> StoreError {
    StoreError::Api {
        code: 503,
        message: "script exhausted".to_string(),
    }
}

enum WatchScript {
    Fail(StoreError),
    Events {
        events: Vec<Result<ChangeEvent, StoreError>>,
        hang: bool,
    },
}

/// Replays queued list and watch results; fails with 503 once a queue is empty
#[derive(Default)]
pub(crate) struct FakeStore {
    lists: Mutex<VecDeque<Result<ListSnapshot, StoreError>>>,
    watches: Mutex<VecDeque<WatchScript>>,
    watch_versions: Mutex<Vec<String>>,
    list_calls: AtomicUsize,
    opened: AtomicUsize,
    released: Arc<AtomicUsize>,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_list(&self, items: Vec<DynamicObject>, resource_version: Option<&str>) {
        self.lists.lock().unwrap().push_back(Ok(ListSnapshot {
            items,
            resource_version: resource_version.map(String::from),
        }));
    }

    pub fn push_list_err(&self, error: StoreError) {
        self.lists.lock().unwrap().push_back(Err(error));
    }

    /// Queue a watch that yields `events`, then either ends or stays open forever
    pub fn push_watch(&self, events: Vec<Result<ChangeEvent, StoreError>>, hang: bool) {
        self.watches
            .lock()
            .unwrap()
            .push_back(WatchScript::Events { events, hang });
    }

    pub fn push_watch_err(&self, error: StoreError) {
        self.watches
            .lock()
            .unwrap()
            .push_back(WatchScript::Fail(error));
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Watches that were successfully opened
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// Opened watches whose stream has been dropped
    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    pub fn watch_versions(&self) -> Vec<String> {
        self.watch_versions.lock().unwrap().clone()
    }
}

#[async_trait]
impl ResourceStore for FakeStore {
    async fn list(&self, _selector: &SelectorSpec) -> Result<ListSnapshot, StoreError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.lists
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(unavailable()))
    }

    async fn watch(
        &self,
        _selector: &SelectorSpec,
        resource_version: &str,
    ) -> Result<EventStream, StoreError> {
        self.watch_versions
            .lock()
            .unwrap()
            .push(resource_version.to_string());
        let script = self.watches.lock().unwrap().pop_front();
        match script {
            None => Err(unavailable()),
            Some(WatchScript::Fail(e)) => Err(e),
            Some(WatchScript::Events { events, hang }) => {
                self.opened.fetch_add(1, Ordering::SeqCst);
                let events = stream::iter(events);
                let inner = if hang {
                    events.chain(stream::pending()).boxed()
                } else {
                    events.boxed()
                };
                Ok(Guarded {
                    inner,
                    released: Arc::clone(&self.released),
                }
                .boxed())
            }
        }
    }
}

/// Counts its own drop so tests can check the watch was released
struct Guarded {
    inner: EventStream,
    released: Arc<AtomicUsize>,
}

impl Stream for Guarded {
    type Item = Result<ChangeEvent, StoreError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}

impl Drop for Guarded {
    fn drop(&mut self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}
