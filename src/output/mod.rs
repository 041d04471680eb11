// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Rendering of mirror contents for the command line

mod json;
mod table;
mod yaml;

pub use json::JsonFormatter;
pub use table::TableFormatter;
pub use yaml::YamlFormatter;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use kube::api::DynamicObject;

use crate::cli::OutputFormat;
use crate::kubernetes::EventKind;
use crate::progress::SyncUpdate;
use crate::reflector::{Mirror, Resources};

/// Mirror contents in display order (sorted by name)
#[derive(Debug, Clone)]
pub struct MirrorListing {
    pub objects: Vec<Arc<DynamicObject>>,
}

impl MirrorListing {
    pub fn from_snapshot(snapshot: &Resources) -> Self {
        let mut objects: Vec<_> = snapshot.values().cloned().collect();
        objects.sort_by(|a, b| a.metadata.name.cmp(&b.metadata.name));
        Self { objects }
    }

    pub fn format(&self, format: OutputFormat, no_headers: bool) -> String {
        match format {
            OutputFormat::Table => TableFormatter::format(self, no_headers, Utc::now()),
            OutputFormat::Json => JsonFormatter::format(self),
            OutputFormat::Yaml => YamlFormatter::format(self),
        }
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

/// One line for a change seen while watching, e.g. `MODIFIED jupyter-alice (rv 1234, Running)`
pub fn format_change(kind: EventKind, name: &str, current: Option<&DynamicObject>) -> String {
    match current {
        Some(obj) => {
            let rv = obj.metadata.resource_version.as_deref().unwrap_or("-");
            match phase_of(obj) {
                Some(phase) => format!("{} {} (rv {}, {})", kind, name, rv, phase),
                None => format!("{} {} (rv {})", kind, name, rv),
            }
        }
        None => format!("{} {}", kind, name),
    }
}

/// Line printed while watching, for the updates that change the mirror
pub fn format_update(update: &SyncUpdate, mirror: &Mirror) -> Option<String> {
    match update {
        SyncUpdate::Applied { kind, name } => {
            let current = mirror.get(name);
            Some(format_change(*kind, name, current.as_deref()))
        }
        SyncUpdate::Snapshotted { count, .. } => Some(format!("RESYNCED {} resources", count)),
        _ => None,
    }
}

/// `status.phase`, for kinds that have one
pub(crate) fn phase_of(obj: &DynamicObject) -> Option<&str> {
    obj.data.get("status")?.get("phase")?.as_str()
}

/// Creation timestamp as the RFC 3339 string the API sent
pub(crate) fn created_at(obj: &DynamicObject) -> Option<String> {
    let ts = obj.metadata.creation_timestamp.as_ref()?;
    serde_json::to_value(ts).ok()?.as_str().map(String::from)
}

/// Human-readable age like kubectl's (`45s`, `12m`, `3h`, `7d`)
pub(crate) fn format_age(timestamp: &str, now: DateTime<Utc>) -> String {
    let Ok(created) = DateTime::parse_from_rfc3339(timestamp) else {
        return timestamp.to_string();
    };

    let secs = now.signed_duration_since(created).num_seconds().max(0);
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m", secs / 60)
    } else if secs < 86400 {
        format!("{}h", secs / 3600)
    } else {
        format!("{}d", secs / 86400)
    }
}
