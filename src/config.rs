// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Configuration for kube-reflector
//!
//! Settings come from an optional JSON file, overridden by command-line flags.
//! Default locations under ~/.kube-reflector/:
//! - ~/.kube-reflector/config.json - configuration
//! - ~/.kube-reflector/log/ - log files (when file logging is enabled)

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::reflector::BackoffConfig;

/// Get the base kube-reflector directory (~/.kube-reflector/)
pub fn base_dir() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|p| p.join(".kube-reflector"))
        .context("Could not determine home directory")
}

/// kube-reflector configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Kubeconfig context; unset means in-cluster first, then current context
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,

    /// Namespace to mirror; unset means the pod's namespace or "default"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    /// Resource kind (plural name or alias, e.g. "pods", "svc")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    /// Label equality constraints
    #[serde(default)]
    pub labels: BTreeMap<String, String>,

    #[serde(default)]
    pub backoff: BackoffConfig,
}

impl Config {
    /// Load config from `path`, or from the default location
    ///
    /// A missing file at the default location yields the default config; a
    /// missing file that was asked for explicitly is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from(path),
            None => {
                let path = Self::config_path()?;
                if path.exists() {
                    Self::load_from(&path)
                } else {
                    Ok(Config::default())
                }
            }
        }
    }

    fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config
            .backoff
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;
        Ok(config)
    }

    /// Save config to `path`
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }

        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Get the config file path (~/.kube-reflector/config.json)
    pub fn config_path() -> Result<PathBuf> {
        Ok(base_dir()?.join("config.json"))
    }

    /// Fill kind and labels from a preset; labels already set win
    pub fn apply_preset(&mut self, preset: Preset) {
        if self.kind.is_none() {
            self.kind = Some(preset.kind().to_string());
        }
        for (key, value) in preset.labels() {
            self.labels
                .entry(key.to_string())
                .or_insert_with(|| value.to_string());
        }
    }
}

/// Ready-made reflectors for the resources a JupyterHub deployment tracks
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Preset {
    /// Single-user notebook server pods
    SingleuserPods,
    /// Services routed by the proxy
    ProxyServices,
    /// Endpoints routed by the proxy
    ProxyEndpoints,
    /// Ingresses routed by the proxy
    ProxyIngresses,
}

impl Preset {
    pub fn kind(&self) -> &'static str {
        match self {
            Preset::SingleuserPods => "pods",
            Preset::ProxyServices => "services",
            Preset::ProxyEndpoints => "endpoints",
            Preset::ProxyIngresses => "ingresses",
        }
    }

    pub fn labels(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            Preset::SingleuserPods => &[
                ("heritage", "jupyterhub"),
                ("component", "singleuser-server"),
            ],
            Preset::ProxyServices | Preset::ProxyEndpoints | Preset::ProxyIngresses => &[
                ("component", "singleuser-server"),
                ("hub.jupyter.org/proxy-route", "true"),
            ],
        }
    }
}
