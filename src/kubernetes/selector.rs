// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Namespace + label selector that scopes a reflector
//!
//! Label selectors sent to the API are plain strings (`"app=web,tier=front"`),
//! so every key and value is validated against the Kubernetes label syntax
//! before it is joined. A value like `"x,other=y"` would otherwise widen or
//! change the selector.
//!
//! ## Label Syntax
//!
//! - Keys are `[prefix/]name`; the prefix is a DNS subdomain (max 253 chars)
//! - Names and values are max 63 chars of `[A-Za-z0-9_.-]`, starting and
//!   ending with an alphanumeric
//! - Values may be empty
//!
//! See https://kubernetes.io/docs/concepts/overview/working-with-objects/labels/#syntax-and-character-set

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::SelectorError;

const MAX_NAME_LEN: usize = 63;
const MAX_PREFIX_LEN: usize = 253;

static LABEL_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9]([-A-Za-z0-9_.]*[A-Za-z0-9])?$").unwrap());

static DNS_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?$").unwrap());

static DNS_SUBDOMAIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?(\.[a-z0-9]([-a-z0-9]*[a-z0-9])?)*$").unwrap()
});

/// Which resources a reflector tracks: one namespace, label equality constraints
///
/// Immutable once built. Labels are kept sorted so the selector string is
/// stable across runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorSpec {
    namespace: String,
    labels: BTreeMap<String, String>,
}

impl SelectorSpec {
    /// Validate and build a selector
    pub fn new<I, K, V>(namespace: impl Into<String>, labels: I) -> Result<Self, SelectorError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let namespace = namespace.into();
        validate_namespace(&namespace)?;

        let mut validated = BTreeMap::new();
        for (key, value) in labels {
            let (key, value) = (key.into(), value.into());
            validate_key(&key)?;
            validate_value(&key, &value)?;
            validated.insert(key, value);
        }

        Ok(Self {
            namespace,
            labels: validated,
        })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn labels(&self) -> &BTreeMap<String, String> {
        &self.labels
    }

    /// Convert to Kubernetes label selector string format
    ///
    /// Examples:
    /// - `{component: singleuser-server, heritage: jupyterhub}`
    ///   → `"component=singleuser-server,heritage=jupyterhub"`
    /// - `{}` → `""` (matches everything in the namespace)
    pub fn label_selector(&self) -> String {
        self.labels
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl fmt::Display for SelectorSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let selector = self.label_selector();
        if selector.is_empty() {
            write!(f, "<all> in namespace {}", self.namespace)
        } else {
            write!(f, "{} in namespace {}", selector, self.namespace)
        }
    }
}

fn validate_namespace(namespace: &str) -> Result<(), SelectorError> {
    let reason = if namespace.is_empty() {
        Some("must not be empty")
    } else if namespace.len() > MAX_NAME_LEN {
        Some("must be at most 63 characters")
    } else if !DNS_LABEL.is_match(namespace) {
        Some("must be a lowercase RFC 1123 label")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(SelectorError::Namespace {
            namespace: namespace.to_string(),
            reason: reason.to_string(),
        }),
        None => Ok(()),
    }
}

fn validate_key(key: &str) -> Result<(), SelectorError> {
    let invalid = |reason: &str| SelectorError::LabelKey {
        key: key.to_string(),
        reason: reason.to_string(),
    };

    let name = match key.split_once('/') {
        Some((prefix, name)) => {
            if prefix.is_empty() || prefix.len() > MAX_PREFIX_LEN {
                return Err(invalid("prefix must be 1-253 characters"));
            }
            if !DNS_SUBDOMAIN.is_match(prefix) {
                return Err(invalid("prefix must be a DNS subdomain"));
            }
            name
        }
        None => key,
    };

    if name.is_empty() || name.len() > MAX_NAME_LEN {
        return Err(invalid("name must be 1-63 characters"));
    }
    if !LABEL_NAME.is_match(name) {
        return Err(invalid(
            "name must be alphanumeric, '-', '_' or '.', starting and ending with an alphanumeric",
        ));
    }
    Ok(())
}

fn validate_value(key: &str, value: &str) -> Result<(), SelectorError> {
    if value.is_empty() {
        return Ok(());
    }
    let reason = if value.len() > MAX_NAME_LEN {
        "must be at most 63 characters"
    } else if !LABEL_NAME.is_match(value) {
        "must be alphanumeric, '-', '_' or '.', starting and ending with an alphanumeric"
    } else {
        return Ok(());
    };
    Err(SelectorError::LabelValue {
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    })
}

/// Parse a `key=value` pair as given on the command line
pub fn parse_label(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", raw))?;
    Ok((key.trim().to_string(), value.trim().to_string()))
}
