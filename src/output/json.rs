// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

use super::MirrorListing;

pub struct JsonFormatter;

impl JsonFormatter {
    /// Full objects as a JSON array
    pub fn format(listing: &MirrorListing) -> String {
        serde_json::to_string_pretty(&listing.objects).unwrap_or_else(|_| "[]".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::tests::object;
    use std::sync::Arc;

    #[test]
    fn test_json_contains_full_objects() {
        let listing = MirrorListing {
            objects: vec![Arc::new(object("a", "7", "2025-06-01T11:00:00Z", Some("Pending")))],
        };
        let parsed: serde_json::Value = serde_json::from_str(&JsonFormatter::format(&listing)).unwrap();
        let items = parsed.as_array().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["kind"], "Pod");
        assert_eq!(items[0]["metadata"]["resourceVersion"], "7");
        assert_eq!(items[0]["status"]["phase"], "Pending");
    }

    #[test]
    fn test_json_empty() {
        let listing = MirrorListing { objects: vec![] };
        assert_eq!(JsonFormatter::format(&listing), "[]");
    }
}
