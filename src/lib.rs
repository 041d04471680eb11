// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Live local mirrors of Kubernetes resources
//!
//! ```no_run
//! use std::sync::Arc;
//! use kube_reflector::kubernetes::{KubeStore, SelectorSpec, connect, discovery::KIND_REGISTRY};
//! use kube_reflector::reflector::{BackoffConfig, Reflector};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let client = connect(None).await?;
//! let pods = KIND_REGISTRY.get("pods").expect("builtin kind");
//! let store = KubeStore::new(client, pods.api_resource.clone());
//! let selector = SelectorSpec::new("jhub", [("component", "singleuser-server")])?;
//!
//! let reflector = Reflector::new(Arc::new(store), selector, BackoffConfig::default());
//! reflector.start().await?;
//! println!("{} pods", reflector.mirror().len());
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod kubernetes;
pub mod output;
pub mod progress;
pub mod reflector;
