// This file is part of the product VisualFix.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use serde::{Deserialize, Serialize};

/// Placeholder the selection widget sends when no term was typed yet.
const UNDEFINED_TERM: &str = "undefined";

/// Raw query string parameters of the lookup endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct LookupParams {
    #[serde(rename = "searchText")]
    pub search_text: Option<String>,
    pub page: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SearchQuery {
    #[serde(rename = "searchText")]
    pub term: String,
    pub page: u32,
}

impl SearchQuery {
    pub fn new(term: &str, page: u32) -> Self {
        let term = if term == UNDEFINED_TERM { "" } else { term };
        Self {
            term: term.to_string(),
            page: page.max(1),
        }
    }

    pub fn from_params(params: &LookupParams) -> Self {
        let page = params.page.as_deref().map(coerce_page).unwrap_or(1);
        Self::new(params.search_text.as_deref().unwrap_or(""), page)
    }

    pub fn next_page(&self) -> Self {
        Self {
            term: self.term.clone(),
            page: self.page.saturating_add(1),
        }
    }

    /// Zero-based index of the first record on this page.
    pub fn offset(&self, page_size: usize) -> usize {
        (self.page as usize - 1).saturating_mul(page_size)
    }
}

/// Loose integer reading of a page parameter: optional leading whitespace
/// and sign, then as many digits as there are. Anything below 1 is page 1.
pub fn coerce_page(raw: &str) -> u32 {
    let trimmed = raw.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let mut value: u64 = 0;
    for byte in digits.bytes().take_while(u8::is_ascii_digit) {
        value = value
            .saturating_mul(10)
            .saturating_add(u64::from(byte - b'0'));
    }

    if negative || value == 0 {
        1
    } else {
        u32::try_from(value).unwrap_or(u32::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(search_text: Option<&str>, page: Option<&str>) -> LookupParams {
        LookupParams {
            search_text: search_text.map(str::to_string),
            page: page.map(str::to_string),
        }
    }

    #[test]
    fn undefined_term_is_empty() {
        let query = SearchQuery::from_params(&params(Some("undefined"), None));
        assert_eq!(query, SearchQuery::new("", 1));
    }

    #[test]
    fn missing_parameters_default_to_first_page() {
        let query = SearchQuery::from_params(&params(None, None));
        assert_eq!(query.term, "");
        assert_eq!(query.page, 1);
    }

    #[test]
    fn page_is_coerced_like_a_loose_integer() {
        assert_eq!(coerce_page("3"), 3);
        assert_eq!(coerce_page(" 7abc"), 7);
        assert_eq!(coerce_page("+2"), 2);
        assert_eq!(coerce_page("abc"), 1);
        assert_eq!(coerce_page(""), 1);
        assert_eq!(coerce_page("0"), 1);
        assert_eq!(coerce_page("-4"), 1);
        assert_eq!(coerce_page("99999999999999999999"), u32::MAX);
    }

    #[test]
    fn offset_follows_page_size() {
        assert_eq!(SearchQuery::new("", 1).offset(20), 0);
        assert_eq!(SearchQuery::new("", 3).offset(20), 40);
        assert_eq!(SearchQuery::new("x", 1).next_page().page, 2);
    }
}
