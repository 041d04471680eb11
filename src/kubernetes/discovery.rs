// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Registry of namespaced resource kinds a reflector can mirror.
//!
//! Built from compile-time type information in k8s-openapi, so it stays in
//! sync with the Kubernetes API version we build against. No discovery
//! requests are made against the cluster.

use std::collections::HashMap;
use std::sync::LazyLock;

use kube::discovery::ApiResource;

/// A mirrorable resource kind
#[derive(Debug, Clone)]
pub struct ResourceKind {
    /// Plural name used in API paths (e.g., "pods")
    pub plural: String,
    /// Short names and singular forms (e.g., "pod", "po")
    pub aliases: Vec<String>,
    pub api_resource: ApiResource,
}

impl ResourceKind {
    /// Full apiVersion string (e.g., "v1", "apps/v1")
    pub fn api_version(&self) -> &str {
        &self.api_resource.api_version
    }

    pub fn kind(&self) -> &str {
        &self.api_resource.kind
    }
}

/// Lookup table from plural name or alias to kind
#[derive(Debug, Clone, Default)]
pub struct KindRegistry {
    by_plural: HashMap<String, ResourceKind>,
    alias_map: HashMap<String, String>,
}

/// Built-in kinds, initialized once on first access
pub static KIND_REGISTRY: LazyLock<KindRegistry> = LazyLock::new(KindRegistry::builtin);

impl KindRegistry {
    pub fn add(&mut self, kind: ResourceKind) {
        for alias in &kind.aliases {
            self.alias_map.insert(alias.clone(), kind.plural.clone());
        }
        self.by_plural.insert(kind.plural.clone(), kind);
    }

    /// Resolve a plural name or alias (case-insensitive)
    pub fn get(&self, name: &str) -> Option<&ResourceKind> {
        let name = name.to_lowercase();
        self.by_plural.get(&name).or_else(|| {
            self.alias_map
                .get(&name)
                .and_then(|plural| self.by_plural.get(plural))
        })
    }

    /// Plural names, sorted
    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.by_plural.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    fn builtin() -> Self {
        use k8s_openapi::api::{
            apps::v1::{DaemonSet, Deployment, ReplicaSet, StatefulSet},
            batch::v1::{CronJob, Job},
            core::v1::{
                ConfigMap, Endpoints, PersistentVolumeClaim, Pod, Secret, Service, ServiceAccount,
            },
            networking::v1::Ingress,
        };
        use kube::Resource;

        let mut registry = KindRegistry::default();

        // Uses compile-time type info from k8s-openapi via kube::Resource
        macro_rules! add_kind {
            ($type:ty, [$($alias:expr),* $(,)?]) => {{
                registry.add(ResourceKind {
                    plural: <$type>::plural(&()).to_string(),
                    aliases: vec![$($alias.to_string()),*],
                    api_resource: ApiResource::erase::<$type>(&()),
                });
            }};
        }

        // Core API (v1)
        add_kind!(Pod, ["pod", "po"]);
        add_kind!(Service, ["service", "svc"]);
        add_kind!(Endpoints, ["endpoint", "ep"]);
        add_kind!(ConfigMap, ["configmap", "cm"]);
        add_kind!(Secret, ["secret"]);
        add_kind!(ServiceAccount, ["serviceaccount", "sa"]);
        add_kind!(PersistentVolumeClaim, ["persistentvolumeclaim", "pvc"]);

        // Apps API (apps/v1)
        add_kind!(Deployment, ["deployment", "deploy"]);
        add_kind!(StatefulSet, ["statefulset", "sts"]);
        add_kind!(DaemonSet, ["daemonset", "ds"]);
        add_kind!(ReplicaSet, ["replicaset", "rs"]);

        // Batch API (batch/v1)
        add_kind!(Job, ["job"]);
        add_kind!(CronJob, ["cronjob", "cj"]);

        // Networking API (networking.k8s.io/v1)
        add_kind!(Ingress, ["ingress", "ing"]);

        registry
    }
}
