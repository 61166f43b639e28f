// This file is part of the product VisualFix.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

//! State and rendering of the injected tag multi-select.
//!
//! Options come from the lookup endpoint page by page. Pages are cached per
//! `(term, page)` for the lifetime of the control; keystrokes are debounced by
//! a generation counter so only the latest term is fetched.

use futures_util::future::LocalBoxFuture;
use std::collections::HashMap;
use std::fmt;

use crate::dom::{Document, NodeId};
use crate::lookup::{SearchQuery, SearchResultPage, TagResult};
use crate::util::color::contrast_text_color;

pub const CHIPS_CLASS: &str = "visualfix-tags-chips";
pub const CHIP_CLASS: &str = "visualfix-tag-chip";
const DEFAULT_BADGE_CLASS: &str = "bg-secondary";

#[derive(Debug)]
pub enum LookupClientError {
    Request(reqwest::Error),
    Status { status: u16, body: String },
    Decode(serde_json::Error),
}

impl fmt::Display for LookupClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupClientError::Request(err) => write!(f, "Tag lookup request failed: {}", err),
            LookupClientError::Status { status, body } => {
                write!(f, "Tag lookup returned HTTP {}: {}", status, body)
            }
            LookupClientError::Decode(err) => {
                write!(f, "Tag lookup response is not a result page: {}", err)
            }
        }
    }
}

impl std::error::Error for LookupClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LookupClientError::Request(err) => Some(err),
            LookupClientError::Status { .. } => None,
            LookupClientError::Decode(err) => Some(err),
        }
    }
}

/// Where the control gets its result pages from.
pub trait LookupSource {
    fn fetch(
        &self,
        query: SearchQuery,
    ) -> LocalBoxFuture<'static, Result<SearchResultPage, LookupClientError>>;
}

/// Lookup endpoint reached over HTTP with the host session cookie.
#[derive(Clone)]
pub struct HttpLookupSource {
    client: reqwest::Client,
    url: String,
    cookie: Option<String>,
}

impl HttpLookupSource {
    pub fn new(url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.to_string(),
            cookie: None,
        }
    }

    pub fn with_session(mut self, cookie_name: &str, token: &str) -> Self {
        self.cookie = Some(format!("{}={}", cookie_name, token));
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl LookupSource for HttpLookupSource {
    fn fetch(
        &self,
        query: SearchQuery,
    ) -> LocalBoxFuture<'static, Result<SearchResultPage, LookupClientError>> {
        let mut request = self
            .client
            .get(&self.url)
            .query(&query)
            .header(reqwest::header::ACCEPT, "application/json");
        if let Some(cookie) = &self.cookie {
            request = request.header(reqwest::header::COOKIE, cookie.clone());
        }

        Box::pin(async move {
            log::debug!(
                "VisualFix: tag search request with term '{}', page {}",
                query.term,
                query.page
            );
            let response = request.send().await.map_err(LookupClientError::Request)?;
            let status = response.status();
            let body = response.text().await.map_err(LookupClientError::Request)?;
            if !status.is_success() {
                return Err(LookupClientError::Status {
                    status: status.as_u16(),
                    body,
                });
            }
            serde_json::from_str(&body).map_err(LookupClientError::Decode)
        })
    }
}

/// The control's view state. Node handles point into the page document.
#[derive(Debug, Clone)]
pub struct TagSelect {
    container: NodeId,
    select: NodeId,
    options: Vec<TagResult>,
    selected: Vec<TagResult>,
    cache: HashMap<SearchQuery, SearchResultPage>,
    query: SearchQuery,
    more: bool,
    generation: u64,
}

impl TagSelect {
    pub fn new(container: NodeId, select: NodeId) -> Self {
        Self {
            container,
            select,
            options: Vec::new(),
            selected: Vec::new(),
            cache: HashMap::new(),
            query: SearchQuery::new("", 1),
            more: false,
            generation: 0,
        }
    }

    pub fn container(&self) -> NodeId {
        self.container
    }

    pub fn select_node(&self) -> NodeId {
        self.select
    }

    pub fn options(&self) -> &[TagResult] {
        &self.options
    }

    pub fn selected(&self) -> &[TagResult] {
        &self.selected
    }

    pub fn query(&self) -> &SearchQuery {
        &self.query
    }

    pub fn has_more(&self) -> bool {
        self.more
    }

    /// Start a new debounce window; earlier pending terms become stale.
    pub fn begin_query(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.generation == generation
    }

    pub fn cached(&self, query: &SearchQuery) -> Option<SearchResultPage> {
        self.cache.get(query).cloned()
    }

    pub fn remember(&mut self, query: SearchQuery, page: SearchResultPage) {
        self.cache.insert(query, page);
    }

    /// Show a result page. A follow-up page extends the current options.
    pub fn apply_page(&mut self, query: SearchQuery, page: SearchResultPage, append: bool) {
        let duplicates = page.duplicate_names();
        if !duplicates.is_empty() {
            log::warn!(
                "VisualFix: tag names {:?} are ambiguous; filtering matches them by name",
                duplicates
            );
        }

        if append {
            for result in page.results {
                if !self.options.iter().any(|option| option.id == result.id) {
                    self.options.push(result);
                }
            }
        } else {
            self.options = page.results;
        }
        self.more = page.pagination.more;
        self.query = query;
    }

    /// Pick options by identifier, in the order given. Identifiers of options
    /// no longer listed keep their previous selection entry.
    pub fn choose(&mut self, ids: &[u64]) {
        let mut chosen = Vec::new();
        for id in ids {
            let known = self
                .options
                .iter()
                .chain(self.selected.iter())
                .find(|option| option.id == *id)
                .cloned();
            match known {
                Some(option) if !chosen.iter().any(|c: &TagResult| c.id == option.id) => {
                    chosen.push(option)
                }
                Some(_) => {}
                None => log::warn!("VisualFix: ignoring unknown tag id {}", id),
            }
        }
        self.selected = chosen;
    }

    pub fn selected_names(&self) -> Vec<String> {
        self.selected.iter().map(|tag| tag.text.clone()).collect()
    }

    /// Rebuild the `<option>` list and the selected chips.
    pub fn render(&self, document: &mut Document) {
        document.set_text_content(self.select, "");
        let unselected = self
            .options
            .iter()
            .filter(|option| !self.selected.iter().any(|tag| tag.id == option.id));
        for tag in self.selected.iter() {
            let option = render_option(document, tag, true);
            document.append_child(self.select, option);
        }
        for tag in unselected {
            let option = render_option(document, tag, false);
            document.append_child(self.select, option);
        }

        let chips = match document.select_first(self.container, &format!(".{}", CHIPS_CLASS)) {
            Some(chips) => chips,
            None => {
                let chips = document.create_element("div");
                document.set_attr(chips, "class", CHIPS_CLASS);
                document.append_child(self.container, chips);
                chips
            }
        };
        document.set_text_content(chips, "");
        for tag in &self.selected {
            let chip = document.create_element("span");
            apply_badge_style(document, chip, tag, CHIP_CLASS);
            let label = document.create_text(&tag.text);
            document.append_child(chip, label);
            document.append_child(chips, chip);
        }
    }
}

fn render_option(document: &mut Document, tag: &TagResult, selected: bool) -> NodeId {
    let option = document.create_element("option");
    document.set_attr(option, "value", &tag.id.to_string());
    if selected {
        document.set_attr(option, "selected", "");
    }
    if let Some(color) = &tag.color {
        document.set_attr(option, "data-color", color);
    }
    if let Some(style) = badge_style(tag) {
        document.set_attr(option, "style", &style);
    }
    let label = document.create_text(&tag.text);
    document.append_child(option, label);
    option
}

fn apply_badge_style(document: &mut Document, node: NodeId, tag: &TagResult, class: &str) {
    match badge_style(tag) {
        Some(style) => {
            document.set_attr(node, "class", &format!("badge {}", class));
            document.set_attr(node, "style", &style);
        }
        None => {
            document.set_attr(
                node,
                "class",
                &format!("badge {} {}", DEFAULT_BADGE_CLASS, class),
            );
        }
    }
}

/// Inline style for a coloured tag; `None` leaves the host's badge style.
pub fn badge_style(tag: &TagResult) -> Option<String> {
    let color = tag.color.as_deref()?.trim();
    let text = contrast_text_color(color)?;
    Some(format!("background-color: {}; color: {};", color, text))
}
