// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

use super::MirrorListing;

pub struct YamlFormatter;

impl YamlFormatter {
    pub fn format(listing: &MirrorListing) -> String {
        serde_yaml::to_string(&listing.objects).unwrap_or_else(|_| "[]".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::tests::object;
    use std::sync::Arc;

    #[test]
    fn test_yaml_lists_objects() {
        let listing = MirrorListing {
            objects: vec![
                Arc::new(object("a", "1", "2025-06-01T11:00:00Z", None)),
                Arc::new(object("b", "2", "2025-06-01T11:00:00Z", None)),
            ],
        };
        let output = YamlFormatter::format(&listing);
        let parsed: serde_yaml::Value = serde_yaml::from_str(&output).unwrap();
        let items = parsed.as_sequence().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1]["metadata"]["name"].as_str(), Some("b"));
    }
}
