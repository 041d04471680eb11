// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::StreamExt;
use kube::api::{Api, DynamicObject, ListParams, WatchEvent, WatchParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::discovery::ApiResource;
use kube::{Client, Config};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, trace};

use super::{ChangeEvent, EventStream, ListSnapshot, ResourceStore, SelectorSpec};
use crate::error::StoreError;

/// Timeout for connecting to K8s API
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeout for reading K8s API responses
/// Must outlive the server-side watch timeout, or idle watches get cut client-side
const READ_TIMEOUT: Duration = Duration::from_secs(295);

/// Server-side timeout for a single watch request (API server caps this below 295s)
const WATCH_TIMEOUT_SECS: u32 = 290;

/// Page size for paginated list requests
const PAGE_SIZE: u32 = 500;

/// Namespace file mounted into pods that run with a service account
const SERVICE_ACCOUNT_NAMESPACE: &str = "/var/run/secrets/kubernetes.io/serviceaccount/namespace";

/// Create an authenticated client
///
/// Without an explicit context, in-cluster service-account credentials are
/// tried first and the local kubeconfig is the fallback. An explicit context
/// always goes to the kubeconfig.
pub async fn connect(context: Option<&str>) -> Result<Client> {
    let mut config = match context {
        None => match Config::incluster() {
            Ok(config) => {
                info!("Using in-cluster service account credentials");
                config
            }
            Err(e) => {
                debug!(error = %e, "No in-cluster config, falling back to kubeconfig");
                from_kubeconfig(None).await?
            }
        },
        Some(ctx) => from_kubeconfig(Some(ctx)).await?,
    };

    // Set timeouts for reliability
    config.connect_timeout = Some(CONNECT_TIMEOUT);
    config.read_timeout = Some(READ_TIMEOUT);

    Client::try_from(config).context("Failed to create Kubernetes client")
}

async fn from_kubeconfig(context: Option<&str>) -> Result<Config> {
    let kubeconfig = Kubeconfig::read().context("Failed to read kubeconfig")?;
    Config::from_custom_kubeconfig(
        kubeconfig,
        &KubeConfigOptions {
            context: context.map(String::from),
            ..Default::default()
        },
    )
    .await
    .with_context(|| match context {
        Some(ctx) => format!("Failed to load kubeconfig for context '{}'", ctx),
        None => "Failed to load kubeconfig for current context".to_string(),
    })
}

/// Namespace to use when none is configured
///
/// The pod's own namespace when running in-cluster, otherwise "default".
pub fn default_namespace() -> String {
    namespace_from_file(Path::new(SERVICE_ACCOUNT_NAMESPACE)).unwrap_or_else(|| "default".into())
}

fn namespace_from_file(path: &Path) -> Option<String> {
    std::fs::read_to_string(path)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// [`ResourceStore`] backed by the Kubernetes API for one resource kind
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
    resource: ApiResource,
}

impl KubeStore {
    pub fn new(client: Client, resource: ApiResource) -> Self {
        Self { client, resource }
    }

    fn api(&self, selector: &SelectorSpec) -> Api<DynamicObject> {
        Api::namespaced_with(self.client.clone(), selector.namespace(), &self.resource)
    }

    /// Build ListParams from the label selector
    fn list_params(selector: &SelectorSpec) -> ListParams {
        let mut params = ListParams::default();
        let labels = selector.label_selector();
        if !labels.is_empty() {
            params = params.labels(&labels);
        }
        trace!(label_selector = %labels, "Built ListParams");
        params
    }

    fn watch_params(selector: &SelectorSpec) -> WatchParams {
        let mut params = WatchParams::default().timeout(WATCH_TIMEOUT_SECS);
        let labels = selector.label_selector();
        if !labels.is_empty() {
            params = params.labels(&labels);
        }
        trace!(label_selector = %labels, timeout = WATCH_TIMEOUT_SECS, "Built WatchParams");
        params
    }
}

#[async_trait]
impl ResourceStore for KubeStore {
    /// List with pagination
    /// Uses continue tokens; every page belongs to the same consistent list
    async fn list(&self, selector: &SelectorSpec) -> Result<ListSnapshot, StoreError> {
        let api = self.api(selector);
        let base_params = Self::list_params(selector);
        let kind = &self.resource.plural;

        let mut items: Vec<DynamicObject> = Vec::new();
        let mut resource_version: Option<String> = None;
        let mut continue_token: Option<String> = None;
        let mut page_count = 0u32;

        loop {
            let mut params = base_params.clone().limit(PAGE_SIZE);
            if let Some(ref token) = continue_token {
                params = params.continue_token(token);
            }

            let list = api.list(&params).await?;
            let items_count = list.items.len();
            items.extend(list.items);
            page_count += 1;

            if resource_version.is_none() {
                resource_version = list.metadata.resource_version;
            }

            match list.metadata.continue_ {
                Some(token) if !token.is_empty() => {
                    debug!(
                        kind = %kind,
                        page = page_count,
                        items_this_page = items_count,
                        total_so_far = items.len(),
                        "Fetched page, continuing"
                    );
                    continue_token = Some(token);
                }
                _ => break,
            }
        }

        debug!(
            kind = %kind,
            namespace = %selector.namespace(),
            pages = page_count,
            total_items = items.len(),
            resource_version = ?resource_version,
            "List complete"
        );

        Ok(ListSnapshot {
            items,
            resource_version,
        })
    }

    async fn watch(
        &self,
        selector: &SelectorSpec,
        resource_version: &str,
    ) -> Result<EventStream, StoreError> {
        let api = self.api(selector);
        let params = Self::watch_params(selector);

        debug!(
            kind = %self.resource.plural,
            namespace = %selector.namespace(),
            resource_version = %resource_version,
            "Opening watch"
        );

        let stream = api.watch(&params, resource_version).await?;

        Ok(stream
            .map(|event| match event {
                Ok(WatchEvent::Added(obj)) => Ok(ChangeEvent::Added(obj)),
                Ok(WatchEvent::Modified(obj)) => Ok(ChangeEvent::Modified(obj)),
                Ok(WatchEvent::Deleted(obj)) => Ok(ChangeEvent::Deleted(obj)),
                Ok(WatchEvent::Bookmark(bookmark)) => Ok(ChangeEvent::Bookmark {
                    resource_version: bookmark.metadata.resource_version,
                }),
                Ok(WatchEvent::Error(status)) => Err(StoreError::Api {
                    code: status.code,
                    message: status.message,
                }),
                Err(e) => Err(StoreError::Kube(e)),
            })
            .boxed())
    }
}
