// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

use std::borrow::Cow;

use chrono::{DateTime, Utc};
use comfy_table::{Table, presets::ASCII_BORDERS_ONLY_CONDENSED};

use super::{MirrorListing, created_at, format_age, phase_of};

const COLUMNS: [&str; 4] = ["NAME", "RESOURCE VERSION", "PHASE", "AGE"];

/// Pod names generated from user names can get long
const MAX_NAME_WIDTH: usize = 63;

/// Truncate a string to max_len chars, adding "..." if truncated
fn truncate_value(s: &str, max_len: usize) -> Cow<'_, str> {
    if s.chars().count() <= max_len {
        Cow::Borrowed(s)
    } else {
        let truncated: String = s.chars().take(max_len.saturating_sub(3)).collect();
        Cow::Owned(format!("{}...", truncated))
    }
}

pub struct TableFormatter;

impl TableFormatter {
    pub fn format(listing: &MirrorListing, no_headers: bool, now: DateTime<Utc>) -> String {
        if listing.is_empty() {
            return "(0 resources)".to_string();
        }

        let mut table = Table::new();
        table.load_preset(ASCII_BORDERS_ONLY_CONDENSED);

        if !no_headers {
            table.set_header(COLUMNS);
        }

        for obj in &listing.objects {
            let name = obj.metadata.name.as_deref().unwrap_or_default();
            let age = created_at(obj)
                .map(|ts| format_age(&ts, now))
                .unwrap_or_else(|| "-".to_string());
            table.add_row(vec![
                truncate_value(name, MAX_NAME_WIDTH).into_owned(),
                obj.metadata.resource_version.clone().unwrap_or_default(),
                phase_of(obj).unwrap_or("-").to_string(),
                age,
            ]);
        }

        format!("{}\n({} resources)", table, listing.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::tests::{now, object};
    use std::sync::Arc;

    #[test]
    fn test_truncate_value_short() {
        let result = truncate_value("hello", 10);
        assert_eq!(result, "hello");
        assert!(matches!(result, Cow::Borrowed(_)));
    }

    #[test]
    fn test_truncate_value_too_long() {
        let long = "jupyter-a-user-with-an-unreasonably-long-name-that-keeps-going-on";
        let result = truncate_value(long, 20);
        assert!(result.ends_with("..."));
        assert_eq!(result.chars().count(), 20);
    }

    #[test]
    fn test_truncate_value_unicode() {
        let unicode = "日本語テストです長い文字列";
        let result = truncate_value(unicode, 8);
        assert!(result.chars().count() <= 8);
        assert!(result.ends_with("..."));
    }

    #[test]
    fn test_empty_listing() {
        let listing = MirrorListing { objects: vec![] };
        assert_eq!(TableFormatter::format(&listing, false, now()), "(0 resources)");
    }

    #[test]
    fn test_table_rows() {
        let listing = MirrorListing {
            objects: vec![
                Arc::new(object("jupyter-alice", "101", "2025-06-01T09:00:00Z", Some("Running"))),
                Arc::new(object("jupyter-bob", "102", "2025-06-01T11:59:30Z", None)),
            ],
        };
        let output = TableFormatter::format(&listing, false, now());

        assert!(output.contains("RESOURCE VERSION"));
        assert!(output.contains("jupyter-alice"));
        assert!(output.contains("Running"));
        assert!(output.contains("3h"));
        assert!(output.contains("30s"));
        assert!(output.ends_with("(2 resources)"));
    }

    #[test]
    fn test_no_headers() {
        let listing = MirrorListing {
            objects: vec![Arc::new(object("a", "1", "2025-06-01T11:00:00Z", None))],
        };
        let output = TableFormatter::format(&listing, true, now());
        assert!(!output.contains("NAME"));
        assert!(output.contains("1h"));
    }
}
