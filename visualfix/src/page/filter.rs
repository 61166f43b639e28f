// This file is part of the product VisualFix.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use std::collections::BTreeSet;

use super::snapshot::BoardSnapshot;
use crate::dom::{Document, NodeId};

pub const CARD_SELECTOR: &str = ".kanban-item";
pub const CARD_TITLE_SELECTOR: &str = ".kanban-item-title";
pub const CARD_CONTENT_SELECTOR: &str = ".kanban-item-content";
pub const SCRAPED_BADGE_SELECTOR: &str = ".badge, .label, .tag";
pub const FILTERED_OUT_CLASS: &str = "visualfix-filtered-out";
pub const CARD_TAGS_CLASS: &str = "visualfix-card-tags";
pub const CARD_TAG_BADGE_CLASS: &str = "visualfix-tag-badge";

/// Scraped labels longer than this are card text, not tags.
const MAX_SCRAPED_TAG_CHARS: usize = 40;

pub fn normalize_tag_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Tag names currently selected in the injected control.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSelection {
    names: BTreeSet<String>,
}

impl FilterSelection {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names = names
            .into_iter()
            .map(|name| normalize_tag_name(name.as_ref()))
            .filter(|name| !name.is_empty())
            .collect();
        Self { names }
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Every selected name must be present in `tags`.
    pub fn admits(&self, tags: &BTreeSet<String>) -> bool {
        self.names.iter().all(|name| tags.contains(name))
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FilterReport {
    pub cards: usize,
    pub hidden: usize,
    pub annotated: usize,
}

/// Recompute visibility for every card below `root` and annotate cards the
/// snapshot knows about.
pub fn apply(
    document: &mut Document,
    root: NodeId,
    selection: &FilterSelection,
    snapshot: Option<&BoardSnapshot>,
) -> FilterReport {
    let mut report = FilterReport::default();

    for card in document.select(root, CARD_SELECTOR) {
        report.cards += 1;

        let captured = card_id(document, card)
            .and_then(|id| snapshot.and_then(|snapshot| snapshot.tags_for(&id)))
            .cloned();

        if let Some(tags) = &captured
            && render_card_badges(document, card, tags)
        {
            report.annotated += 1;
        }

        let visible = if selection.is_empty() {
            true
        } else {
            let tags = match captured {
                Some(tags) => tags,
                None => scrape_card_tags(document, card),
            };
            selection.admits(&tags)
        };

        document.set_class(card, FILTERED_OUT_CLASS, !visible);
        if !visible {
            report.hidden += 1;
        }
    }

    report
}

fn card_id(document: &Document, card: NodeId) -> Option<String> {
    document
        .attr(card, "id")
        .or_else(|| document.attr(card, "data-id"))
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

/// Best-effort tag names from the badges rendered inside a card.
pub fn scrape_card_tags(document: &Document, card: NodeId) -> BTreeSet<String> {
    let titles = document.select(card, CARD_TITLE_SELECTOR);
    let mut tags = BTreeSet::new();

    for badge in document.select(card, SCRAPED_BADGE_SELECTOR) {
        if titles
            .iter()
            .any(|title| document.is_inclusive_descendant(badge, *title))
        {
            continue;
        }
        let text = document.text_content(badge);
        let name = normalize_tag_name(&text);
        if name.is_empty() || name.contains(':') || name.chars().count() > MAX_SCRAPED_TAG_CHARS {
            continue;
        }
        tags.insert(name);
    }

    tags
}

/// Render the captured tag names into the card once. Returns true when
/// badges were added.
fn render_card_badges(document: &mut Document, card: NodeId, tags: &BTreeSet<String>) -> bool {
    if tags.is_empty() {
        return false;
    }
    if document
        .select_first(card, &format!(".{}", CARD_TAGS_CLASS))
        .is_some()
    {
        return false;
    }
    if document.select_first(card, ".badge").is_some() {
        return false;
    }

    let container = document
        .select_first(card, CARD_CONTENT_SELECTOR)
        .unwrap_or(card);
    let wrapper = document.create_element("div");
    document.set_attr(wrapper, "class", CARD_TAGS_CLASS);
    for name in tags {
        let badge = document.create_element("span");
        document.set_attr(
            badge,
            "class",
            &format!("badge bg-secondary-lt {}", CARD_TAG_BADGE_CLASS),
        );
        let label = document.create_text(name);
        document.append_child(badge, label);
        document.append_child(wrapper, badge);
    }
    document.append_child(container, wrapper);
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOARD: &str = r#"<div class="kanban">
<li id="ProjectTask-1" class="kanban-item"><div class="kanban-item-title">Fix: login</div><div class="kanban-item-content"><span class="badge">Urgent</span></div></li>
<li id="ProjectTask-2" class="kanban-item"><div class="kanban-item-title"><span class="badge">title-badge</span></div><div class="kanban-item-content"><span class="badge">Urgent</span><span class="badge">Billing</span><span class="badge">Extra</span></div></li>
<li id="ProjectTask-3" class="kanban-item"><div class="kanban-item-content"><span class="badge">Status: open</span><span class="badge">Billing</span></div></li>
</div>"#;

    fn hidden_cards(document: &Document) -> Vec<String> {
        document
            .select(document.root(), CARD_SELECTOR)
            .into_iter()
            .filter(|card| document.has_class(*card, FILTERED_OUT_CLASS))
            .filter_map(|card| document.attr(card, "id").map(str::to_string))
            .collect()
    }

    #[test]
    fn selection_requires_every_tag() {
        let mut document = Document::parse(BOARD);
        let root = document.root();
        let selection = FilterSelection::new(["Urgent", " billing "]);
        let report = apply(&mut document, root, &selection, None);
        assert_eq!(report.cards, 3);
        assert_eq!(
            hidden_cards(&document),
            vec!["ProjectTask-1".to_string(), "ProjectTask-3".to_string()]
        );
    }

    #[test]
    fn empty_selection_reveals_everything() {
        let mut document = Document::parse(BOARD);
        let root = document.root();
        apply(&mut document, root, &FilterSelection::new(["urgent"]), None);
        assert!(!hidden_cards(&document).is_empty());
        apply(&mut document, root, &FilterSelection::default(), None);
        assert!(hidden_cards(&document).is_empty());
    }

    #[test]
    fn scraping_skips_titles_colons_and_long_labels() {
        let mut document = Document::parse(BOARD);
        let long_label = "x".repeat(MAX_SCRAPED_TAG_CHARS + 1);
        let card = document
            .select_first(document.root(), "#ProjectTask-3 .kanban-item-content")
            .expect("content");
        let badge = document.create_element("span");
        document.set_attr(badge, "class", "badge");
        document.set_text_content(badge, &long_label);
        document.append_child(card, badge);

        let second = document
            .select_first(document.root(), "#ProjectTask-2")
            .expect("card 2");
        let third = document
            .select_first(document.root(), "#ProjectTask-3")
            .expect("card 3");
        let second_tags = scrape_card_tags(&document, second);
        assert!(!second_tags.contains("title-badge"));
        assert_eq!(second_tags.len(), 3);
        let third_tags = scrape_card_tags(&document, third);
        assert_eq!(third_tags.into_iter().collect::<Vec<_>>(), vec!["billing"]);
    }

    #[test]
    fn snapshot_is_authoritative_over_scraped_badges() {
        let mut document = Document::parse(BOARD);
        let root = document.root();
        let mut snapshot = BoardSnapshot::default();
        snapshot.insert("ProjectTask-1", ["Urgent".to_string(), "Billing".to_string()]);
        snapshot.insert("ProjectTask-2", ["Urgent".to_string()]);
        let selection = FilterSelection::new(["urgent", "billing"]);
        apply(&mut document, root, &selection, Some(&snapshot));
        assert_eq!(
            hidden_cards(&document),
            vec!["ProjectTask-2".to_string(), "ProjectTask-3".to_string()]
        );
    }

    #[test]
    fn badges_render_once_for_cards_without_badges() {
        let mut document = Document::parse(
            r#"<li id="Project-9" class="kanban-item"><div class="kanban-item-title">Plan</div><div class="kanban-item-content"></div></li>"#,
        );
        let root = document.root();
        let mut snapshot = BoardSnapshot::default();
        snapshot.insert("Project-9", ["Ops".to_string(), "Infra".to_string()]);
        let selection = FilterSelection::default();

        let first = apply(&mut document, root, &selection, Some(&snapshot));
        let after_first = document.inner_html(root);
        let second = apply(&mut document, root, &selection, Some(&snapshot));

        assert_eq!(first.annotated, 1);
        assert_eq!(second.annotated, 0);
        assert_eq!(document.inner_html(root), after_first);
        assert_eq!(
            document
                .select(root, &format!(".{}", CARD_TAG_BADGE_CLASS))
                .len(),
            2
        );
    }

    #[test]
    fn larger_selection_never_reveals_hidden_cards() {
        let mut snapshot = BoardSnapshot::default();
        snapshot.insert("ProjectTask-1", ["a".to_string(), "b".to_string()]);
        snapshot.insert("ProjectTask-2", ["a".to_string()]);
        snapshot.insert("ProjectTask-3", ["b".to_string(), "c".to_string()]);

        let subsets: [&[&str]; 4] = [&["a"], &["a", "b"], &["b"], &["b", "c"]];
        let supersets: [&[&str]; 4] = [&["a", "b"], &["a", "b", "c"], &["b", "c"], &["a", "b", "c"]];

        for (small, large) in subsets.iter().zip(supersets.iter()) {
            let mut document = Document::parse(BOARD);
            let root = document.root();
            apply(&mut document, root, &FilterSelection::new(small.iter()), Some(&snapshot));
            let hidden_small = hidden_cards(&document);
            apply(&mut document, root, &FilterSelection::new(large.iter()), Some(&snapshot));
            let hidden_large = hidden_cards(&document);
            for card in hidden_small {
                assert!(hidden_large.contains(&card), "{} reappeared", card);
            }
        }
    }
}
