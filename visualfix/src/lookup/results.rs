// This file is part of the product VisualFix.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagResult {
    pub id: u64,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub more: bool,
}

/// One page of tag matches in the shape the selection widget consumes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResultPage {
    #[serde(default)]
    pub results: Vec<TagResult>,
    #[serde(default)]
    pub pagination: Pagination,
}

impl SearchResultPage {
    /// Display names that occur more than once in this page.
    pub fn duplicate_names(&self) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        let mut duplicates = Vec::new();
        for result in &self.results {
            let key = result.text.trim().to_lowercase();
            if !seen.insert(key.clone()) && !duplicates.contains(&key) {
                duplicates.push(key);
            }
        }
        duplicates
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_are_tolerated() {
        let page: SearchResultPage =
            serde_json::from_str(r#"{"results": [{"id": 4, "text": "Ops", "color": null}]}"#)
                .expect("page");
        assert_eq!(page.results[0].color, None);
        assert!(!page.pagination.more);
    }

    #[test]
    fn absent_color_is_not_serialized() {
        let page = SearchResultPage {
            results: vec![TagResult {
                id: 1,
                text: "Urgent".to_string(),
                color: None,
            }],
            pagination: Pagination { more: true },
        };
        let json = serde_json::to_value(&page).expect("json");
        assert_eq!(
            json,
            serde_json::json!({"results": [{"id": 1, "text": "Urgent"}], "pagination": {"more": true}})
        );
    }

    #[test]
    fn reports_duplicate_display_names() {
        let page = SearchResultPage {
            results: vec![
                TagResult { id: 1, text: "Ops".to_string(), color: None },
                TagResult { id: 2, text: "ops ".to_string(), color: None },
                TagResult { id: 3, text: "Infra".to_string(), color: None },
            ],
            pagination: Pagination::default(),
        };
        assert_eq!(page.duplicate_names(), vec!["ops".to_string()]);
    }
}
