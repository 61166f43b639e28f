// This file is part of the product VisualFix.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

//! Repairs markup the host rendered as literal text.
//!
//! Three places are affected: the suggestion list of the token search
//! popover, tokens already committed to the search bar, and tokens the search
//! tokenizer split in the middle of an icon tag. Every repair is idempotent:
//! a repaired fragment no longer contains the trigger pattern.

use crate::dom::{Document, NodeId, decode_entities, escape_text, fragment_text};

const SUGGESTION_SELECTOR: &str = ".popover.show .list-group-item, .popover.show .list-group-item span, .popover.show .list-group-item div";
const SEARCH_INPUT_SELECTOR: &str = ".search-input";
const TOKEN_VALUE_SELECTOR: &str = ".search-input-tag-value";
const LIST_ITEM_CLASS: &str = "list-group-item";

const ICON_MARKUP: &str = "<i class=";
const ESCAPED_ICON_MARKUP: &str = "&lt;i class=";
const ICON_OPEN: &str = "<i";
const ESCAPED_ICON_OPEN: &str = "&lt;i";

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RepairReport {
    pub suggestions: usize,
    pub token_values: usize,
    pub merged_tokens: usize,
}

impl RepairReport {
    pub fn total(&self) -> usize {
        self.suggestions + self.token_values + self.merged_tokens
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// Run every repair below `root`.
pub fn repair(document: &mut Document, root: NodeId) -> RepairReport {
    let mut report = RepairReport {
        suggestions: repair_suggestions(document, root),
        ..RepairReport::default()
    };
    for input in document.select(root, SEARCH_INPUT_SELECTOR) {
        report.token_values += repair_token_values(document, input);
        report.merged_tokens += merge_split_tokens(document, input);
    }
    if !report.is_empty() {
        log::debug!(
            "VisualFix: repaired {} suggestion(s), {} token value(s), {} split token(s)",
            report.suggestions,
            report.token_values,
            report.merged_tokens
        );
    }
    report
}

/// Suggestions whose text shows icon markup are reinterpreted as markup.
pub fn repair_suggestions(document: &mut Document, root: NodeId) -> usize {
    let mut repaired = 0;
    for element in document.select(root, SUGGESTION_SELECTOR) {
        // An earlier repair of the enclosing list item may have replaced it.
        if !document.is_inclusive_descendant(element, root) {
            continue;
        }
        if !document.element_children(element).is_empty()
            && !document.has_class(element, LIST_ITEM_CLASS)
        {
            continue;
        }

        let text = document.text_content(element);
        if !text.contains(ICON_MARKUP) && !text.contains(ESCAPED_ICON_MARKUP) {
            continue;
        }

        let mut changed = replace_markup(document, element, &decode_entities(&text));
        let second = document.text_content(element);
        if second.contains(ICON_MARKUP) {
            changed |= replace_markup(document, element, &second);
        }
        if changed {
            repaired += 1;
        }
    }
    repaired
}

/// Committed token values whose markup carries an escaped icon.
pub fn repair_token_values(document: &mut Document, search_input: NodeId) -> usize {
    let mut repaired = 0;
    for value in document.select(search_input, TOKEN_VALUE_SELECTOR) {
        let markup = document.inner_html(value);
        if !markup.contains(ESCAPED_ICON_MARKUP) {
            continue;
        }
        let restored = markup.replace("&lt;", "<").replace("&gt;", ">");
        if replace_markup(document, value, &restored) {
            repaired += 1;
        }
    }
    repaired
}

/// Set `markup` as the content of `element` unless it parses to what is
/// already there. Markers that never form an element stay text.
fn replace_markup(document: &mut Document, element: NodeId, markup: &str) -> bool {
    let parsed = Document::parse(markup);
    if parsed.inner_html(parsed.root()) == document.inner_html(element) {
        return false;
    }
    document.set_inner_html(element, markup);
    true
}

/// Re-join tokens the host tokenizer split inside an icon tag.
///
/// Works on the live child list: after a merge the second node is gone and
/// the same position is examined again against its new neighbour.
pub fn merge_split_tokens(document: &mut Document, search_input: NodeId) -> usize {
    let mut merged = 0;
    let mut index = 0;

    loop {
        let children = document.children(search_input);
        let (Some(&current), Some(&next)) = (children.get(index), children.get(index + 1)) else {
            break;
        };

        let current_text = document.text_content(current);
        let next_text = document.text_content(next);
        let next_text = next_text.trim();

        let opens_icon =
            current_text.contains(ICON_OPEN) || current_text.contains(ESCAPED_ICON_OPEN);
        if !opens_icon || !next_text.starts_with("class=") {
            index += 1;
            continue;
        }

        let joined = format!("{} {}", current_text.trim_end(), next_text);
        let plain = fragment_text(&decode_entities(&joined));

        let label = document.select_first(current, "b");
        let (prefix, value) = match label {
            Some(label) => {
                let label_text = document.text_content(label);
                let value = plain.replacen(&format!("{}:", label_text), "", 1);
                (
                    format!("{}:", document.outer_html(label)),
                    value.trim().to_string(),
                )
            }
            None => (String::new(), plain.trim().to_string()),
        };

        document.set_inner_html(current, &format!("{}{}", prefix, escape_text(&value)));
        document.remove(next);
        merged += 1;
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    const ESCAPED_URGENT: &str = "&amp;lt;i class=&amp;quot;ti ti-tag&amp;quot;&amp;gt;&amp;lt;/i&amp;gt; Urgent";

    fn popover(item: &str) -> String {
        format!(
            r#"<div class="popover show"><ul class="list-group">{}</ul></div>"#,
            item
        )
    }

    #[test]
    fn escaped_suggestion_becomes_icon_and_text() {
        let html = popover(&format!(r#"<li class="list-group-item">{}</li>"#, ESCAPED_URGENT));
        let mut document = Document::parse(&html);
        let root = document.root();
        let item = document.select_first(root, ".list-group-item").expect("item");
        assert_eq!(
            document.text_content(item),
            "&lt;i class=&quot;ti ti-tag&quot;&gt;&lt;/i&gt; Urgent"
        );

        let report = repair(&mut document, root);
        assert_eq!(report.suggestions, 1);
        assert_eq!(
            document.inner_html(item),
            r#"<i class="ti ti-tag"></i> Urgent"#
        );
    }

    #[test]
    fn repair_is_idempotent() {
        let html = format!(
            r#"{}<div class="search-input"><span class="search-input-tag"><span class="search-input-tag-value">&lt;i class="ti"&gt;&lt;/i&gt; Ops</span></span></div>"#,
            popover(&format!(
                r#"<li class="list-group-item"><span>{}</span></li>"#,
                ESCAPED_URGENT
            ))
        );
        let mut document = Document::parse(&html);
        let root = document.root();
        let first = repair(&mut document, root);
        assert!(!first.is_empty());
        let once = document.inner_html(root);

        let second = repair(&mut document, root);
        assert!(second.is_empty());
        assert_eq!(document.inner_html(root), once);
    }

    #[test]
    fn doubly_escaped_suggestion_takes_a_second_pass() {
        let html = popover(
            r#"<li class="list-group-item">&amp;lt;i class=a&amp;gt;&amp;lt;/i&amp;gt; &amp;amp;lt;i class=b&amp;amp;gt;&amp;amp;lt;/i&amp;amp;gt; X</li>"#,
        );
        let mut document = Document::parse(&html);
        let root = document.root();
        let item = document.select_first(root, ".list-group-item").expect("item");
        assert_eq!(
            document.text_content(item),
            "&lt;i class=a&gt;&lt;/i&gt; &amp;lt;i class=b&amp;gt;&amp;lt;/i&amp;gt; X"
        );

        assert_eq!(repair_suggestions(&mut document, root), 1);
        // The second pass rebuilds from text, so only the inner icon survives.
        assert_eq!(document.inner_html(item), r#" <i class="b"></i> X"#);

        document.take_mutations();
        assert_eq!(repair_suggestions(&mut document, root), 0);
        assert_eq!(document.inner_html(item), r#" <i class="b"></i> X"#);
        assert!(!document.has_pending_mutations());
    }

    #[test]
    fn unparsable_marker_is_left_untouched() {
        let html = popover(r#"<li class="list-group-item">use &lt;i class= for icons</li>"#);
        let mut document = Document::parse(&html);
        let root = document.root();
        let before = document.inner_html(root);

        assert_eq!(repair(&mut document, root), RepairReport::default());
        assert_eq!(document.inner_html(root), before);
        assert!(!document.has_pending_mutations());
    }

    #[test]
    fn literal_markup_text_is_reinterpreted() {
        let html = popover(r#"<li class="list-group-item"><div>&lt;i class="ti ti-star"&gt;&lt;/i&gt; Starred</div></li>"#);
        let mut document = Document::parse(&html);
        let root = document.root();
        repair(&mut document, root);
        let icon = document.select_first(root, ".list-group-item i").expect("icon");
        assert_eq!(document.attr(icon, "class"), Some("ti ti-star"));
        let item = document.select_first(root, ".list-group-item").expect("item");
        assert_eq!(document.text_content(item), " Starred");
    }

    #[test]
    fn hidden_popovers_are_left_alone() {
        let html = format!(
            r#"<div class="popover"><ul><li class="list-group-item">{}</li></ul></div>"#,
            ESCAPED_URGENT
        );
        let mut document = Document::parse(&html);
        let root = document.root();
        let before = document.inner_html(root);
        assert_eq!(repair_suggestions(&mut document, root), 0);
        assert_eq!(document.inner_html(root), before);
    }

    #[test]
    fn committed_token_value_is_unescaped() {
        let mut document = Document::parse(
            r#"<div class="search-input"><span class="search-input-tag-value">&lt;i class="ti ti-tag"&gt;&lt;/i&gt; Billing</span></div>"#,
        );
        let input = document.select_first(document.root(), ".search-input").expect("input");
        assert_eq!(repair_token_values(&mut document, input), 1);
        let value = document
            .select_first(input, ".search-input-tag-value")
            .expect("value");
        assert_eq!(
            document.inner_html(value),
            r#"<i class="ti ti-tag"></i> Billing"#
        );
    }

    #[test]
    fn split_tokens_are_merged_with_label() {
        let mut document = Document::parse(
            r#"<div class="search-input"><span class="search-input-tag"><b>tag</b>:&lt;i</span><span class="search-input-tag">class="ti ti-tag"&gt;&lt;/i&gt; Urgent</span><span class="search-input-tag-input"></span></div>"#,
        );
        let input = document.select_first(document.root(), ".search-input").expect("input");
        assert_eq!(merge_split_tokens(&mut document, input), 1);
        assert_eq!(
            document.inner_html(input),
            r#"<span class="search-input-tag"><b>tag</b>:Urgent</span><span class="search-input-tag-input"></span>"#
        );
        assert_eq!(merge_split_tokens(&mut document, input), 0);
    }

    #[test]
    fn chained_split_fragments_collapse_in_one_pass() {
        let mut document = Document::parse(
            r#"<div class="search-input"><span>&lt;i</span><span>class="a"&gt;&lt;/i&gt;&lt;i</span><span>class="b"&gt;&lt;/i&gt; Two</span></div>"#,
        );
        let input = document.select_first(document.root(), ".search-input").expect("input");
        assert_eq!(merge_split_tokens(&mut document, input), 2);
        assert_eq!(document.children(input).len(), 1);
        assert_eq!(document.text_content(input), "Two");
    }
}
