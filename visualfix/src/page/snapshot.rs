// This file is part of the product VisualFix.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::fmt;

use super::filter::normalize_tag_name;

#[derive(Debug)]
pub enum SnapshotError {
    Parse(serde_json::Error),
    Shape(String),
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotError::Parse(err) => write!(f, "Board refresh payload is not JSON: {}", err),
            SnapshotError::Shape(msg) => write!(f, "Unexpected board refresh payload: {}", msg),
        }
    }
}

impl std::error::Error for SnapshotError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SnapshotError::Parse(err) => Some(err),
            SnapshotError::Shape(_) => None,
        }
    }
}

/// Card metadata captured from the host's board refresh response.
///
/// The payload is a collection of columns, each holding `items`; every item
/// carries its card identifier in `id` and its tag names in
/// `_metadata.tags` (or `_metadata.tag`, as some host versions name it).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoardSnapshot {
    cards: HashMap<String, BTreeSet<String>>,
}

impl BoardSnapshot {
    pub fn from_json(body: &str) -> Result<Self, SnapshotError> {
        let value: Value = serde_json::from_str(body).map_err(SnapshotError::Parse)?;
        Self::from_value(&value)
    }

    pub fn from_value(value: &Value) -> Result<Self, SnapshotError> {
        let columns: Vec<&Value> = match value {
            Value::Object(map) => map.values().collect(),
            Value::Array(list) => list.iter().collect(),
            _ => {
                return Err(SnapshotError::Shape(
                    "expected an object or array of columns".to_string(),
                ));
            }
        };

        let mut cards = HashMap::new();
        for column in columns {
            let items: Vec<&Value> = match column.get("items") {
                Some(Value::Object(map)) => map.values().collect(),
                Some(Value::Array(list)) => list.iter().collect(),
                _ => continue,
            };
            for item in items {
                let Some(id) = item_id(item) else {
                    continue;
                };
                cards.insert(id, item_tags(item));
            }
        }

        Ok(Self { cards })
    }

    pub fn insert(&mut self, card_id: &str, tags: impl IntoIterator<Item = String>) {
        let names = tags
            .into_iter()
            .map(|name| normalize_tag_name(&name))
            .filter(|name| !name.is_empty())
            .collect();
        self.cards.insert(card_id.to_string(), names);
    }

    pub fn tags_for(&self, card_id: &str) -> Option<&BTreeSet<String>> {
        self.cards.get(card_id)
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

fn item_id(item: &Value) -> Option<String> {
    match item.get("id")? {
        Value::String(id) if !id.is_empty() => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

fn item_tags(item: &Value) -> BTreeSet<String> {
    let Some(metadata) = item.get("_metadata").or_else(|| item.get("metadata")) else {
        return BTreeSet::new();
    };
    let Some(raw) = metadata.get("tags").or_else(|| metadata.get("tag")) else {
        return BTreeSet::new();
    };

    let mut names = BTreeSet::new();
    collect_tag_names(raw, &mut names);
    names
}

fn collect_tag_names(raw: &Value, names: &mut BTreeSet<String>) {
    match raw {
        Value::String(name) => {
            let normalized = normalize_tag_name(name);
            if !normalized.is_empty() {
                names.insert(normalized);
            }
        }
        Value::Array(list) => {
            for entry in list {
                collect_tag_names(entry, names);
            }
        }
        Value::Object(map) => {
            // Tag objects carry their label as `name` or `text`.
            if let Some(label) = map.get("name").or_else(|| map.get("text")) {
                collect_tag_names(label, names);
            } else {
                for entry in map.values() {
                    collect_tag_names(entry, names);
                }
            }
        }
        _ => {}
    }
}
