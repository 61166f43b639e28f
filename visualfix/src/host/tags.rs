// This file is part of the product VisualFix.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use super::scope::EntityScope;
use super::{HostError, read_yaml};

/// A tag as stored by the host's tag plugin.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TagRecord {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub entities_id: u64,
    #[serde(default)]
    pub is_recursive: bool,
}

fn default_active() -> bool {
    true
}

/// Selection criteria shared by counting and paging so both see the same set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagCriteria {
    pub term: String,
    pub scope: Option<EntityScope>,
}

impl TagCriteria {
    pub fn matches(&self, record: &TagRecord) -> bool {
        if !record.is_active {
            return false;
        }
        if !self.term.is_empty()
            && !record
                .name
                .to_lowercase()
                .contains(&self.term.to_lowercase())
        {
            return false;
        }
        match &self.scope {
            Some(scope) => scope.admits(record.entities_id, record.is_recursive),
            None => true,
        }
    }
}

/// Name ascending without regard to case, then identifier.
pub fn display_order(left: &TagRecord, right: &TagRecord) -> Ordering {
    left.name
        .to_lowercase()
        .cmp(&right.name.to_lowercase())
        .then(left.id.cmp(&right.id))
}

pub trait TagRepository: Send + Sync {
    /// Whether tag records belong to entities and need scoping.
    fn is_entity_assign(&self) -> bool;

    fn count(&self, criteria: &TagCriteria) -> Result<usize, HostError>;

    /// Records matching `criteria` in display order, skipping `offset`.
    fn page(
        &self,
        criteria: &TagCriteria,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<TagRecord>, HostError>;
}

#[derive(Debug, Deserialize)]
struct TagFile {
    #[serde(default = "default_entity_assign")]
    entity_assign: bool,
    #[serde(default)]
    tags: Vec<TagRecord>,
}

fn default_entity_assign() -> bool {
    true
}

/// Tag plugin records kept in `plugins/tag/tags.yaml`. The file is read for
/// every query.
#[derive(Debug, Clone)]
pub struct YamlTagStore {
    path: PathBuf,
}

impl YamlTagStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<TagFile, HostError> {
        read_yaml(&self.path)
    }

    fn matching(&self, criteria: &TagCriteria) -> Result<Vec<TagRecord>, HostError> {
        let mut records: Vec<TagRecord> = self
            .load()?
            .tags
            .into_iter()
            .filter(|record| criteria.matches(record))
            .collect();
        records.sort_by(display_order);
        Ok(records)
    }
}

impl TagRepository for YamlTagStore {
    fn is_entity_assign(&self) -> bool {
        // The entity flag lives in the file; an unreadable file fails later
        // in count or page with a proper error.
        self.load().map(|file| file.entity_assign).unwrap_or(true)
    }

    fn count(&self, criteria: &TagCriteria) -> Result<usize, HostError> {
        Ok(self.matching(criteria)?.len())
    }

    fn page(
        &self,
        criteria: &TagCriteria,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<TagRecord>, HostError> {
        Ok(self
            .matching(criteria)?
            .into_iter()
            .skip(offset)
            .take(limit)
            .collect())
    }
}
