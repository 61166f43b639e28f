// This file is part of the product VisualFix.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use super::entities::{escape_attribute, escape_text};
use super::parse::{is_raw_text_element, is_void_element};
use super::{Document, NodeData, NodeId};

pub(super) fn inner_html(document: &Document, node: NodeId) -> String {
    let mut out = String::new();
    let raw = document
        .tag_name(node)
        .map(is_raw_text_element)
        .unwrap_or(false);
    for child in document.children(node) {
        write_node(document, *child, raw, &mut out);
    }
    out
}

pub(super) fn outer_html(document: &Document, node: NodeId) -> String {
    let mut out = String::new();
    write_node(document, node, false, &mut out);
    out
}

fn write_node(document: &Document, node: NodeId, raw_parent: bool, out: &mut String) {
    match document.data(node) {
        NodeData::Document => {
            for child in document.children(node) {
                write_node(document, *child, false, out);
            }
        }
        NodeData::Text(text) => {
            if raw_parent {
                out.push_str(text);
            } else {
                out.push_str(&escape_text(text));
            }
        }
        NodeData::Comment(text) => {
            out.push_str("<!--");
            out.push_str(text);
            out.push_str("-->");
        }
        NodeData::Doctype(text) => {
            out.push_str("<!");
            out.push_str(text);
            out.push('>');
        }
        NodeData::Element(element) => {
            out.push('<');
            out.push_str(&element.name);
            for (name, value) in &element.attrs {
                out.push(' ');
                out.push_str(name);
                out.push_str("=\"");
                out.push_str(&escape_attribute(value));
                out.push('"');
            }
            out.push('>');
            if is_void_element(&element.name) {
                return;
            }
            let raw = is_raw_text_element(&element.name);
            for child in document.children(node) {
                write_node(document, *child, raw, out);
            }
            out.push_str("</");
            out.push_str(&element.name);
            out.push('>');
        }
    }
}
