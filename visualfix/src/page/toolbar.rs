// This file is part of the product VisualFix.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use crate::dom::{Document, EventKind, NodeId};

const PROJECT_KANBAN_SELECTOR: &str = r#".kanban[data-itemtype="Project"]"#;
const TOOLBAR_SELECTOR: &str = ".kanban-toolbar";
const SEARCH_INPUT_SELECTOR: &str = ".search-input";
const SEARCH_FALLBACK_SELECTOR: &str = "[data-search-tokenizer], .search-bar, .input-group";
const SEARCH_BAR_FALLBACK_SELECTOR: &str = "[data-search-tokenizer], .kanban-search, .search-bar";
const TAG_TOKEN_SELECTOR: &str = r#".search-input-tag[data-tag="tag"]"#;
const TAG_INPUT_SELECTOR: &str = ".search-input-tag-input";

pub const FILTER_MARKER_CLASS: &str = "visualfix-tags-filter";
pub const SELECT_NAME: &str = "visualfix-tags-filter-select";
const SELECT_PLACEHOLDER: &str = "Filter by tags";
const CONTAINER_STYLE: &str = "min-width: 200px; z-index: 1000;";
pub const RESULT_CHANGE_EVENT: &str = "result_change";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectOutcome {
    NotProjectKanban,
    NoToolbar,
    AlreadyPresent,
    Injected { container: NodeId, select: NodeId },
}

/// Project boards only; the project type board has no tags.
pub fn is_project_kanban(document: &Document, root: NodeId, url: &str) -> bool {
    if document.select_first(root, PROJECT_KANBAN_SELECTOR).is_some() {
        return true;
    }
    let url = url.to_ascii_lowercase();
    url.contains("project") && !url.contains("projecttype")
}

/// Add the tag filter control to the board toolbar unless it is already there.
pub fn inject(document: &mut Document, root: NodeId, url: &str) -> InjectOutcome {
    if !is_project_kanban(document, root, url) {
        return InjectOutcome::NotProjectKanban;
    }
    let Some(toolbar) = document.select_first(root, TOOLBAR_SELECTOR) else {
        return InjectOutcome::NoToolbar;
    };
    if document
        .select_first(toolbar, &format!(".{}", FILTER_MARKER_CLASS))
        .is_some()
    {
        return InjectOutcome::AlreadyPresent;
    }

    let container = document.create_element("div");
    document.set_attr(container, "class", &format!("{} me-2", FILTER_MARKER_CLASS));
    document.set_attr(container, "style", CONTAINER_STYLE);

    let select = document.create_element("select");
    document.set_attr(
        select,
        "class",
        "form-select select2 visualfix-tags-select",
    );
    document.set_attr(select, "name", SELECT_NAME);
    document.set_attr(select, "multiple", "");
    document.set_attr(select, "data-placeholder", SELECT_PLACEHOLDER);
    document.append_child(container, select);

    let chips = document.create_element("div");
    document.set_attr(chips, "class", super::select::CHIPS_CLASS);
    document.append_child(container, chips);

    let anchor = document
        .select_first(toolbar, SEARCH_INPUT_SELECTOR)
        .or_else(|| document.select_first(toolbar, SEARCH_FALLBACK_SELECTOR));
    match anchor.and_then(|anchor| document.parent(anchor).map(|parent| (parent, anchor))) {
        Some((parent, anchor)) => document.insert_before(parent, container, anchor),
        None => document.append_child(toolbar, container),
    }

    log::debug!("VisualFix: tag filter added to the kanban toolbar");
    InjectOutcome::Injected { container, select }
}

fn token_text(values: &[String]) -> String {
    values
        .iter()
        .map(|value| {
            if value.contains(' ') {
                format!("tag:\"{}\" ", value)
            } else {
                format!("tag:{} ", value)
            }
        })
        .collect()
}

/// Mirror the selected tag names into the host's token search bar.
///
/// Returns `false` when the page has no search bar to sync.
pub fn sync_search_bar(document: &mut Document, root: NodeId, values: &[String]) -> bool {
    let search = document
        .select_first(root, SEARCH_INPUT_SELECTOR)
        .or_else(|| document.select_first(root, SEARCH_BAR_FALLBACK_SELECTOR));
    let Some(search) = search else {
        log::error!("VisualFix: no search input found");
        return false;
    };

    for token in document.select(search, TAG_TOKEN_SELECTOR) {
        document.remove(token);
    }

    if values.is_empty() {
        document.dispatch_event(
            search,
            EventKind::Custom(RESULT_CHANGE_EVENT.to_string()),
            true,
            false,
        );
        return true;
    }

    let Some(input) = document.select(search, TAG_INPUT_SELECTOR).last().copied() else {
        log::warn!("VisualFix: .search-input-tag-input not found inside search bar");
        return true;
    };

    document.focus(input);
    document.set_text_content(input, &token_text(values));
    document.dispatch_event(input, EventKind::Input, true, false);
    document.dispatch_event(
        input,
        EventKind::KeyDown {
            key: "Enter".to_string(),
            code: "Enter".to_string(),
            key_code: 13,
        },
        true,
        true,
    );
    document.dispatch_event(search, EventKind::Change, true, false);
    document.dispatch_event(
        search,
        EventKind::Custom(RESULT_CHANGE_EVENT.to_string()),
        true,
        false,
    );
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOARD: &str = r#"<div class="kanban" data-itemtype="Project"><div class="kanban-toolbar"><div class="search-input"><span class="search-input-tag" data-tag="tag"><span class="search-input-tag-value">old</span></span><span class="search-input-tag" data-tag="name">x</span><span class="search-input-tag-input"></span></div></div></div>"#;

    #[test]
    fn injects_before_search_input_once() {
        let mut document = Document::parse(BOARD);
        let root = document.root();
        let outcome = inject(&mut document, root, "/front/project.form.php?id=1");
        let InjectOutcome::Injected { container, select } = outcome else {
            panic!("expected injection, got {:?}", outcome);
        };

        let toolbar = document.select_first(root, ".kanban-toolbar").unwrap();
        assert_eq!(document.element_children(toolbar)[0], container);
        assert_eq!(document.attr(select, "name"), Some(SELECT_NAME));
        assert_eq!(document.attr(container, "style"), Some(CONTAINER_STYLE));
        assert!(document.has_class(container, "me-2"));

        assert_eq!(
            inject(&mut document, root, "/front/project.form.php?id=1"),
            InjectOutcome::AlreadyPresent
        );
        assert_eq!(document.select(root, ".visualfix-tags-filter").len(), 1);
    }

    #[test]
    fn project_detection_by_markup_or_url() {
        let plain = Document::parse(r#"<div class="kanban"><div class="kanban-toolbar"></div></div>"#);
        let root = plain.root();
        assert!(is_project_kanban(&plain, root, "/front/project.form.php"));
        assert!(!is_project_kanban(&plain, root, "/front/projecttype.form.php"));
        assert!(!is_project_kanban(&plain, root, "/front/ticket.php"));

        let marked = Document::parse(BOARD);
        assert!(is_project_kanban(&marked, marked.root(), "/front/anything.php"));
    }

    #[test]
    fn appends_when_toolbar_has_no_search() {
        let mut document =
            Document::parse(r#"<div class="kanban-toolbar"><button>Add</button></div>"#);
        let root = document.root();
        let outcome = inject(&mut document, root, "/front/project.php");
        let InjectOutcome::Injected { container, .. } = outcome else {
            panic!("expected injection");
        };
        let toolbar = document.select_first(root, ".kanban-toolbar").unwrap();
        assert_eq!(document.element_children(toolbar).last(), Some(&container));
    }

    #[test]
    fn missing_toolbar_is_reported() {
        let mut document = Document::parse(r#"<div class="kanban" data-itemtype="Project"></div>"#);
        let root = document.root();
        assert_eq!(inject(&mut document, root, ""), InjectOutcome::NoToolbar);
        assert_eq!(
            inject(&mut Document::parse("<p></p>"), root, "/front/ticket.php"),
            InjectOutcome::NotProjectKanban
        );
    }

    #[test]
    fn sync_replaces_tag_tokens_and_fires_events() {
        let mut document = Document::parse(BOARD);
        let root = document.root();
        let values = vec!["Urgent".to_string(), "On hold".to_string()];
        assert!(sync_search_bar(&mut document, root, &values));

        assert!(document.select(root, r#"[data-tag="tag"]"#).is_empty());
        assert_eq!(document.select(root, r#"[data-tag="name"]"#).len(), 1);

        let input = document.select_first(root, ".search-input-tag-input").unwrap();
        assert_eq!(document.text_content(input), "tag:Urgent tag:\"On hold\" ");
        assert_eq!(document.focused(), Some(input));

        let search = document.select_first(root, ".search-input").unwrap();
        let events = document.take_events();
        let kinds: Vec<(NodeId, EventKind)> =
            events.iter().map(|e| (e.target, e.kind.clone())).collect();
        assert_eq!(
            kinds,
            vec![
                (input, EventKind::Input),
                (
                    input,
                    EventKind::KeyDown {
                        key: "Enter".to_string(),
                        code: "Enter".to_string(),
                        key_code: 13
                    }
                ),
                (search, EventKind::Change),
                (search, EventKind::Custom(RESULT_CHANGE_EVENT.to_string())),
            ]
        );
        assert!(events[1].cancelable && events[1].bubbles);
    }

    #[test]
    fn empty_sync_only_signals_result_change() {
        let mut document = Document::parse(BOARD);
        let root = document.root();
        assert!(sync_search_bar(&mut document, root, &[]));
        let events = document.take_events();
        assert_eq!(events.len(), 1);
        assert_eq!(
            events[0].kind,
            EventKind::Custom(RESULT_CHANGE_EVENT.to_string())
        );
        assert!(document.select(root, r#"[data-tag="tag"]"#).is_empty());
    }

    #[test]
    fn sync_without_search_bar_does_nothing() {
        let mut document = Document::parse("<div></div>");
        let root = document.root();
        assert!(!sync_search_bar(&mut document, root, &["a".to_string()]));
        assert!(document.take_events().is_empty());
    }
}
