// This file is part of the product VisualFix.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

//! Paginated tag search consumed by the kanban tag filter.

pub mod error;
pub mod handler;
pub mod query;
pub mod results;
pub mod service;

pub use error::{LookupError, LookupErrorKind, TAG_TYPE_UNAVAILABLE};
pub use handler::{configure, lookup_path};
pub use query::{LookupParams, SearchQuery, coerce_page};
pub use results::{Pagination, SearchResultPage, TagResult};
pub use service::{LookupService, PAGE_SIZE};
