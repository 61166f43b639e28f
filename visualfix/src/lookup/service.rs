// This file is part of the product VisualFix.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use std::sync::Arc;

use super::error::{LookupError, LookupErrorKind};
use super::query::SearchQuery;
use super::results::{Pagination, SearchResultPage, TagResult};
use crate::host::{Caller, EntityScope, TagCriteria, TagRepository};

pub const PAGE_SIZE: usize = 20;

/// Paginated, scoped search over active tags.
#[derive(Clone)]
pub struct LookupService {
    repository: Arc<dyn TagRepository>,
}

impl LookupService {
    pub fn new(repository: Arc<dyn TagRepository>) -> Self {
        Self { repository }
    }

    pub fn search(
        &self,
        caller: &Caller,
        query: &SearchQuery,
    ) -> Result<SearchResultPage, LookupError> {
        let scope = if self.repository.is_entity_assign() {
            Some(EntityScope::for_caller(caller))
        } else {
            None
        };
        let criteria = TagCriteria {
            term: query.term.clone(),
            scope,
        };

        let records = self
            .repository
            .page(&criteria, query.offset(PAGE_SIZE), PAGE_SIZE)
            .map_err(|error| {
                LookupError::with_source(LookupErrorKind::Repository, "Tag query failed", error)
            })?;
        let total = self.repository.count(&criteria).map_err(|error| {
            LookupError::with_source(LookupErrorKind::Repository, "Tag count failed", error)
        })?;

        let seen = u64::from(query.page).saturating_mul(PAGE_SIZE as u64);
        let page = SearchResultPage {
            results: records
                .into_iter()
                .map(|record| TagResult {
                    id: record.id,
                    text: record.name,
                    color: record.color.filter(|color| !color.trim().is_empty()),
                })
                .collect(),
            pagination: Pagination {
                more: seen < total as u64,
            },
        };

        log::debug!(
            "Tag lookup by {}: term '{}', page {}, {} result(s) of {}",
            caller.user,
            query.term,
            query.page,
            page.results.len(),
            total
        );
        for name in page.duplicate_names() {
            log::warn!(
                "Tag display name '{}' is shared by several tags; selection by name cannot tell them apart",
                name
            );
        }

        Ok(page)
    }
}
